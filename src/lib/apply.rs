//! Committing a parsed [`EnvMap`] into an [`Environment`].
//!
//! There is no rollback: keys set before a failure stay set. [`ApplyError`]
//! lists which keys were committed so the caller can tell.

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

use crate::env::{Environment, SetVarError};
use crate::parse::EnvMap;

/// What to do when the environment rejects a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
  /// Keep setting the remaining variables, then report every failure.
  #[default]
  Continue,
  /// Stop at the first rejected variable.
  FailFast,
}

/// Sets every pair of `vars` in `env`, in key order.
///
/// Returns the keys that were set.
pub fn apply<E: Environment + ?Sized>(
  vars: &EnvMap<'_>,
  env: &mut E,
  mode: ApplyMode,
) -> Result<Vec<String>, ApplyError> {
  #[cfg(feature = "tracing")]
  debug!("Applying {} variables ({:?})", vars.len(), mode);

  let mut applied = Vec::with_capacity(vars.len());
  let mut failures = Vec::new();

  for (key, value) in vars.iter() {
    match env.set_var(key, value) {
      Ok(()) => {
        #[cfg(feature = "tracing")]
        trace!("Set {}", key);
        applied.push(key.to_string());
      }
      Err(err) => {
        #[cfg(feature = "tracing")]
        warn!("Could not set {:?}: {}", key, err);
        failures.push(err);

        if mode == ApplyMode::FailFast {
          break;
        }
      }
    }
  }

  if failures.is_empty() {
    Ok(applied)
  } else {
    Err(ApplyError { applied, failures })
  }
}

fn last_failure(failures: &[SetVarError]) -> String {
  failures.last().map(ToString::to_string).unwrap_or_default()
}

/// The environment rejected at least one variable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
  "Failed to set {} environment variable(s), {} applied; last error: {}",
  .failures.len(),
  .applied.len(),
  last_failure(.failures)
)]
pub struct ApplyError {
  /// Keys committed before (and, in `Continue` mode, after) the failures.
  pub applied: Vec<String>,
  /// Every rejection, in the order encountered.
  pub failures: Vec<SetVarError>,
}
