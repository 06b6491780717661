//! Comparing the keys a template expects with the keys actually provided.
//!
//! Two checks exist:
//!
//! - [`reconcile`] runs before anything is applied and compares two parsed
//!   files.
//! - [`verify_live`] runs later and compares a template with whatever the
//!   environment holds right now.
//!
//! Both report every offending key at once, sorted, rather than stopping at
//! the first one.

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::env::Environment;
use crate::parse::EnvMap;

/// How strictly the provided keys must follow the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationPolicy {
  /// Reject keys that the template does not declare.
  pub require_exact_key_match: bool,
  /// Accept a declared key whose value is empty.
  pub allow_empty_values: bool,
}

impl Default for ReconciliationPolicy {
  fn default() -> Self {
    Self {
      require_exact_key_match: true,
      allow_empty_values: true,
    }
  }
}

/// Checks the parsed main file against the parsed template.
///
/// Every key of `expected` must be present in `actual`. With
/// `require_exact_key_match`, `actual` may not hold any other key. Neither map
/// is modified.
pub fn reconcile(
  actual: &EnvMap<'_>,
  expected: &EnvMap<'_>,
  policy: &ReconciliationPolicy,
) -> Result<(), ReconcileError> {
  #[cfg(feature = "tracing")]
  debug!(
    "Reconciling {} variables against {} expected",
    actual.len(),
    expected.len()
  );

  let missing: Vec<String> = expected
    .keys()
    .filter(|key| !actual.contains_key(key))
    .map(str::to_string)
    .collect();

  let extra: Vec<String> = if policy.require_exact_key_match {
    actual
      .keys()
      .filter(|key| !expected.contains_key(key))
      .map(str::to_string)
      .collect()
  } else {
    Vec::new()
  };

  if !missing.is_empty() || !extra.is_empty() {
    return Err(ReconcileError::KeySetMismatch { missing, extra });
  }

  if !policy.allow_empty_values {
    let keys: Vec<String> = expected
      .keys()
      .filter(|key| actual.get(key).is_some_and(str::is_empty))
      .map(str::to_string)
      .collect();

    if !keys.is_empty() {
      return Err(ReconcileError::EmptyValue { keys });
    }
  }

  Ok(())
}

/// Checks that every key of `expected` is set in `env`.
///
/// Only `allow_empty_values` applies here; the live environment always holds
/// unrelated variables, so extra keys are never an error.
pub fn verify_live<E: Environment + ?Sized>(
  expected: &EnvMap<'_>,
  env: &E,
  policy: &ReconciliationPolicy,
) -> Result<(), ReconcileError> {
  #[cfg(feature = "tracing")]
  debug!("Verifying {} expected variables", expected.len());

  let mut missing = Vec::new();
  let mut empty = Vec::new();

  for key in expected.keys() {
    match env.var(key) {
      None => {
        #[cfg(feature = "tracing")]
        trace!("{} is not set", key);
        missing.push(key.to_string());
      }
      Some(value) if value.is_empty() && !policy.allow_empty_values => {
        #[cfg(feature = "tracing")]
        trace!("{} is empty", key);
        empty.push(key.to_string());
      }
      Some(_) => {}
    }
  }

  if !missing.is_empty() {
    Err(ReconcileError::KeySetMismatch {
      missing,
      extra: Vec::new(),
    })
  } else if !empty.is_empty() {
    Err(ReconcileError::EmptyValue { keys: empty })
  } else {
    Ok(())
  }
}

fn describe_mismatch(missing: &[String], extra: &[String]) -> String {
  match (missing.is_empty(), extra.is_empty()) {
    (false, true) => format!("Missing environment variables: {}", missing.join(", ")),
    (true, false) => format!("Undeclared environment variables: {}", extra.join(", ")),
    _ => format!(
      "Missing environment variables: {}; undeclared environment variables: {}",
      missing.join(", "),
      extra.join(", ")
    ),
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
  /// Keys declared by the template but not provided, and keys provided but
  /// not declared
  #[error("{}", describe_mismatch(.missing, .extra))]
  KeySetMismatch {
    missing: Vec<String>,
    extra: Vec<String>,
  },
  /// Declared keys whose value is empty
  #[error("Environment variables must not be empty: {}", .keys.join(", "))]
  EmptyValue { keys: Vec<String> },
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::env::MemoryEnv;

  fn map(input: &str) -> EnvMap<'_> {
    EnvMap::try_from(input).unwrap()
  }

  const STRICT: ReconciliationPolicy = ReconciliationPolicy {
    require_exact_key_match: true,
    allow_empty_values: false,
  };

  #[test]
  fn test_exact_match_rejects_extra_key() {
    let actual = map("A=1\nB=2");
    let expected = map("A=1");

    let err = reconcile(&actual, &expected, &ReconciliationPolicy::default()).unwrap_err();

    assert_eq!(
      err,
      ReconcileError::KeySetMismatch {
        missing: vec![],
        extra: vec!["B".to_string()]
      }
    );
    assert_eq!(err.to_string(), "Undeclared environment variables: B");
  }

  #[test]
  fn test_superset_mode_accepts_extra_key() {
    let actual = map("A=1\nB=2");
    let expected = map("A=1");
    let policy = ReconciliationPolicy {
      require_exact_key_match: false,
      ..Default::default()
    };

    assert!(reconcile(&actual, &expected, &policy).is_ok());
  }

  #[test]
  fn test_missing_key_is_reported_in_any_mode() {
    let actual = map("A=1");
    let expected = map("A=\nB=\nC=");
    let policy = ReconciliationPolicy {
      require_exact_key_match: false,
      ..Default::default()
    };

    let err = reconcile(&actual, &expected, &policy).unwrap_err();
    assert_eq!(
      err,
      ReconcileError::KeySetMismatch {
        missing: vec!["B".to_string(), "C".to_string()],
        extra: vec![]
      }
    );
  }

  #[test]
  fn test_full_symmetric_difference() {
    let actual = map("A=1\nX=2");
    let expected = map("A=\nB=");

    let err = reconcile(&actual, &expected, &STRICT).unwrap_err();
    assert_eq!(
      err.to_string(),
      "Missing environment variables: B; undeclared environment variables: X"
    );
  }

  #[test]
  fn test_empty_values_at_load_time() {
    let actual = map("A=1\nB=");
    let expected = map("A=\nB=");

    assert!(reconcile(&actual, &expected, &ReconciliationPolicy::default()).is_ok());
    assert_eq!(
      reconcile(&actual, &expected, &STRICT),
      Err(ReconcileError::EmptyValue {
        keys: vec!["B".to_string()]
      })
    );
  }

  #[test]
  fn test_reconcile_leaves_inputs_untouched() {
    let actual = map("A=1\nB=2");
    let expected = map("A=1");
    let (actual_before, expected_before) = (actual.clone(), expected.clone());

    let _ = reconcile(&actual, &expected, &STRICT);

    assert_eq!(actual, actual_before);
    assert_eq!(expected, expected_before);
  }

  #[test]
  fn test_verify_live_missing_key() {
    let expected = map("DB_HOST=\nDB_PORT=");
    let env: MemoryEnv = [("DB_HOST", "localhost")].into_iter().collect();

    let err = verify_live(&expected, &env, &ReconciliationPolicy::default()).unwrap_err();
    assert_eq!(
      err,
      ReconcileError::KeySetMismatch {
        missing: vec!["DB_PORT".to_string()],
        extra: vec![]
      }
    );
  }

  #[test]
  fn test_verify_live_empty_value() {
    let expected = map("DB_HOST=");
    let env: MemoryEnv = [("DB_HOST", ""), ("UNRELATED", "x")].into_iter().collect();

    let allow = ReconciliationPolicy::default();
    let deny = ReconciliationPolicy {
      allow_empty_values: false,
      ..Default::default()
    };

    assert!(verify_live(&expected, &env, &allow).is_ok());
    assert_eq!(
      verify_live(&expected, &env, &deny),
      Err(ReconcileError::EmptyValue {
        keys: vec!["DB_HOST".to_string()]
      })
    );
  }

  #[test]
  fn test_verify_live_reports_missing_before_empty() {
    let expected = map("A=\nB=");
    let env: MemoryEnv = [("A", "")].into_iter().collect();

    let err = verify_live(&expected, &env, &STRICT).unwrap_err();
    assert!(matches!(err, ReconcileError::KeySetMismatch { .. }));
  }
}
