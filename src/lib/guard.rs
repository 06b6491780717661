//! Loading and verifying environment files.
//!
//! [`EnvGuard`] runs the two public operations as straight pipelines:
//!
//! - **configure**: resolve files, parse the main file, parse the template and
//!   reconcile the two (when enabled), then apply the main file to the
//!   environment. Nothing is applied unless every earlier step succeeds.
//! - **verify**: resolve and parse the template, then check that the live
//!   environment provides every key it declares. The main file is not read and
//!   the environment is not modified.
//!
//! Calls are not synchronized with each other. Running two of them at once
//! against the process environment is the caller's responsibility to avoid.
//!
//! # Examples
//!
//! ```rust,no_run
//! use env_guard::guard::{ConfigureOptions, EnvGuard};
//! use env_guard::env::ProcessEnv;
//! use std::path::PathBuf;
//!
//! let options = ConfigureOptions {
//!   dir: Some(PathBuf::from("config")),
//!   ..Default::default()
//! };
//!
//! EnvGuard::configure_with_options(&options, &mut ProcessEnv).unwrap();
//! ```

use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::apply::{ApplyError, ApplyMode, apply};
use crate::env::{Environment, ProcessEnv};
use crate::parse::{EnvMap, ParseError};
use crate::reconcile::{ReconcileError, ReconciliationPolicy, reconcile, verify_live};
use crate::resolve::{FileLayout, ResolveError};

/// Entry point for both operations.
pub struct EnvGuard;

impl EnvGuard {
  /// Loads the main file into `env`, validated against the template when
  /// `options.use_template` is set.
  ///
  /// Returns the keys that were set.
  pub fn configure_with_options<E: Environment + ?Sized>(
    options: &ConfigureOptions,
    env: &mut E,
  ) -> Result<Vec<String>, EnvGuardError> {
    #[cfg(feature = "tracing")]
    info!("Starting configure");

    let dir = base_dir(options.dir.as_deref());

    let main_path = options.layout.resolve_main(&dir)?;
    let template_path = if options.use_template {
      Some(options.layout.resolve_template(&dir)?)
    } else {
      None
    };

    #[cfg(feature = "tracing")]
    debug!(?main_path, ?template_path, "Resolved file paths");

    let main_str = read(&main_path)?;
    let main = parse(&main_str, &main_path)?;

    if let Some(template_path) = template_path {
      let template_str = read(&template_path)?;
      let template = parse(&template_str, &template_path)?;

      reconcile(&main, &template, &options.policy)?;
    }

    let applied = apply(&main, env, options.apply_mode)?;

    #[cfg(feature = "tracing")]
    info!("Configured {} variables", applied.len());

    Ok(applied)
  }

  /// Checks that `env` provides every key the template declares.
  pub fn verify_with_options<E: Environment + ?Sized>(
    options: &VerifyOptions,
    env: &E,
  ) -> Result<(), EnvGuardError> {
    #[cfg(feature = "tracing")]
    info!("Starting verify");

    let dir = base_dir(options.dir.as_deref());
    let template_path = options.layout.resolve_template(&dir)?;

    let template_str = read(&template_path)?;
    let template = parse(&template_str, &template_path)?;

    let policy = ReconciliationPolicy {
      require_exact_key_match: false,
      allow_empty_values: options.allow_empty_values,
    };
    verify_live(&template, env, &policy)?;

    #[cfg(feature = "tracing")]
    info!("All {} declared variables are set", template.len());

    Ok(())
  }
}

/// Loads `dir/.env` into the process environment, optionally validated
/// against `dir/.env.sample` (or `dir/.env.example`).
///
/// `dir` is relative to the current working directory; `None` means the
/// current working directory itself.
pub fn configure<P: AsRef<Path>>(
  dir: Option<P>,
  use_template: bool,
) -> Result<Vec<String>, EnvGuardError> {
  let options = ConfigureOptions {
    dir: dir.map(|dir| dir.as_ref().to_path_buf()),
    use_template,
    ..Default::default()
  };

  EnvGuard::configure_with_options(&options, &mut ProcessEnv)
}

/// Checks the process environment against `dir/.env.sample` (or
/// `dir/.env.example`).
pub fn verify<P: AsRef<Path>>(dir: Option<P>, allow_empty_values: bool) -> Result<(), EnvGuardError> {
  let options = VerifyOptions {
    dir: dir.map(|dir| dir.as_ref().to_path_buf()),
    allow_empty_values,
    ..Default::default()
  };

  EnvGuard::verify_with_options(&options, &ProcessEnv)
}

fn base_dir(dir: Option<&Path>) -> PathBuf {
  let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
  match dir {
    Some(dir) => cwd.join(dir),
    None => cwd,
  }
}

fn read(path: &Path) -> Result<String, EnvGuardError> {
  #[cfg(feature = "tracing")]
  debug!("Reading {:?}", path);

  std::fs::read_to_string(path).map_err(|source| EnvGuardError::Read {
    path: path.to_path_buf(),
    source,
  })
}

fn parse<'a>(contents: &'a str, path: &Path) -> Result<EnvMap<'a>, EnvGuardError> {
  EnvMap::try_from(contents).map_err(|source| EnvGuardError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Errors that can occur while configuring or verifying the environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvGuardError {
  /// A required file does not exist
  #[error(transparent)]
  Resolve(#[from] ResolveError),
  /// Error reading a resolved file
  #[error("Failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  /// A file is not valid `KEY=VALUE` text
  #[error("Failed to parse {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: ParseError,
  },
  /// The provided keys do not match the template
  #[error(transparent)]
  Reconcile(#[from] ReconcileError),
  /// The environment rejected some variables
  #[error(transparent)]
  Apply(#[from] ApplyError),
}

/// Options for [`EnvGuard::configure_with_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureOptions {
  /// Directory holding the files. If None, defaults to the current directory.
  pub dir: Option<PathBuf>,
  /// File names to look for.
  pub layout: FileLayout,
  /// Require and reconcile against the template file.
  pub use_template: bool,
  /// Strictness of the reconciliation.
  pub policy: ReconciliationPolicy,
  /// Behavior when the environment rejects a variable.
  pub apply_mode: ApplyMode,
}

impl Default for ConfigureOptions {
  fn default() -> Self {
    Self {
      dir: None,
      layout: FileLayout::default(),
      use_template: true,
      policy: ReconciliationPolicy::default(),
      apply_mode: ApplyMode::default(),
    }
  }
}

/// Options for [`EnvGuard::verify_with_options`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerifyOptions {
  /// Directory holding the template. If None, defaults to the current directory.
  pub dir: Option<PathBuf>,
  /// File names to look for. Only the template names are used.
  pub layout: FileLayout,
  /// Accept declared variables that are set to an empty string.
  pub allow_empty_values: bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::env::MemoryEnv;
  use crate::resolve::FileRole;
  use std::fs;
  use tempfile::TempDir;

  fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
      fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
  }

  fn configure_options(dir: &TempDir) -> ConfigureOptions {
    ConfigureOptions {
      dir: Some(dir.path().to_path_buf()),
      ..Default::default()
    }
  }

  #[test]
  fn test_configure_applies_main_file() {
    let dir = fixture(&[(".env", "A=1\nB=2\n"), (".env.sample", "A=\nB=\n")]);
    let mut env = MemoryEnv::new();

    let applied = EnvGuard::configure_with_options(&configure_options(&dir), &mut env).unwrap();

    assert_eq!(applied, vec!["A", "B"]);
    assert_eq!(env.var("A"), Some("1".to_string()));
    assert_eq!(env.var("B"), Some("2".to_string()));
  }

  #[test]
  fn test_configure_mismatch_applies_nothing() {
    let dir = fixture(&[(".env", "A=1\nB=2\n"), (".env.sample", "A=\n")]);
    let mut env = MemoryEnv::new();

    let err = EnvGuard::configure_with_options(&configure_options(&dir), &mut env).unwrap_err();

    assert!(matches!(
      err,
      EnvGuardError::Reconcile(ReconcileError::KeySetMismatch { .. })
    ));
    assert!(env.is_empty());
  }

  #[test]
  fn test_configure_without_template() {
    let dir = fixture(&[(".env", "ONLY=here\n")]);
    let mut env = MemoryEnv::new();
    let options = ConfigureOptions {
      use_template: false,
      ..configure_options(&dir)
    };

    EnvGuard::configure_with_options(&options, &mut env).unwrap();
    assert_eq!(env.var("ONLY"), Some("here".to_string()));
  }

  #[test]
  fn test_configure_requires_main_file() {
    let dir = fixture(&[(".env.sample", "A=\n")]);
    let mut env = MemoryEnv::new();

    let err = EnvGuard::configure_with_options(&configure_options(&dir), &mut env).unwrap_err();

    assert!(matches!(
      err,
      EnvGuardError::Resolve(ResolveError::MissingFile {
        role: FileRole::Main,
        ..
      })
    ));
  }

  #[test]
  fn test_parse_error_names_file_and_line() {
    let dir = fixture(&[(".env", "A=1\nbroken\n"), (".env.sample", "A=\n")]);
    let mut env = MemoryEnv::new();

    let err = EnvGuard::configure_with_options(&configure_options(&dir), &mut env).unwrap_err();

    match &err {
      EnvGuardError::Parse { path, source } => {
        assert_eq!(path, &dir.path().join(".env"));
        assert_eq!(source.line(), 2);
      }
      _ => panic!("Expected Parse error"),
    }
    assert!(err.to_string().contains("broken"));
    assert!(env.is_empty());
  }

  #[test]
  fn test_verify_uses_only_the_template() {
    let dir = fixture(&[(".env.example", "A=\nB=\n")]);
    let env: MemoryEnv = [("A", "1"), ("B", "")].into_iter().collect();

    let mut options = VerifyOptions {
      dir: Some(dir.path().to_path_buf()),
      allow_empty_values: true,
      ..Default::default()
    };
    EnvGuard::verify_with_options(&options, &env).unwrap();

    options.allow_empty_values = false;
    let err = EnvGuard::verify_with_options(&options, &env).unwrap_err();
    assert!(matches!(
      err,
      EnvGuardError::Reconcile(ReconcileError::EmptyValue { .. })
    ));
  }

  #[test]
  fn test_verify_without_template() {
    let dir = fixture(&[(".env", "A=1\n")]);
    let options = VerifyOptions {
      dir: Some(dir.path().to_path_buf()),
      ..Default::default()
    };

    let err = EnvGuard::verify_with_options(&options, &MemoryEnv::new()).unwrap_err();
    assert!(matches!(
      err,
      EnvGuardError::Resolve(ResolveError::MissingFile {
        role: FileRole::Template,
        ..
      })
    ));
  }
}
