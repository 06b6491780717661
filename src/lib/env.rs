//! Access to environment variables.
//!
//! The process environment is global, mutable state. Everything in this crate
//! that reads or writes variables goes through [`Environment`] so callers can
//! substitute [`MemoryEnv`] for the real [`ProcessEnv`].

use std::collections::HashMap;

/// Reads and writes environment variables.
pub trait Environment {
  /// Returns the value of `key`, or `None` if it is not set.
  fn var(&self, key: &str) -> Option<String>;

  /// Sets `key` to `value`.
  fn set_var(&mut self, key: &str, value: &str) -> Result<(), SetVarError>;
}

/// The environment of the current process.
///
/// The process environment has no lock of its own. Callers must make sure no
/// other thread reads or writes environment variables while
/// [`ProcessEnv::set_var`] runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
  fn var(&self, key: &str) -> Option<String> {
    std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
  }

  fn set_var(&mut self, key: &str, value: &str) -> Result<(), SetVarError> {
    validate(key, value)?;

    // SAFETY: `validate` rules out the inputs `set_var` panics on, and the
    // type's contract leaves serializing environment access to the caller.
    unsafe {
      std::env::set_var(key, value);
    }

    Ok(())
  }
}

/// An environment kept in memory, applying the same name rules as
/// [`ProcessEnv`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnv {
  vars: HashMap<String, String>,
}

impl MemoryEnv {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  pub fn remove_var(&mut self, key: &str) -> Option<String> {
    self.vars.remove(key)
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryEnv {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self {
      vars: iter
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect(),
    }
  }
}

impl Environment for MemoryEnv {
  fn var(&self, key: &str) -> Option<String> {
    self.vars.get(key).cloned()
  }

  fn set_var(&mut self, key: &str, value: &str) -> Result<(), SetVarError> {
    validate(key, value)?;
    self.vars.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// Checks that the host can store `key=value`.
pub fn validate(key: &str, value: &str) -> Result<(), SetVarError> {
  if key.is_empty() {
    Err(SetVarError::EmptyKey)
  } else if key.contains('=') {
    Err(SetVarError::KeyContainsEquals(key.to_string()))
  } else if key.contains('\0') {
    Err(SetVarError::KeyContainsNul(key.to_string()))
  } else if value.contains('\0') {
    Err(SetVarError::ValueContainsNul(key.to_string()))
  } else {
    Ok(())
  }
}

/// A variable the environment refused to store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetVarError {
  #[error("Environment variable name is empty")]
  EmptyKey,
  #[error("Environment variable name {0:?} contains '='")]
  KeyContainsEquals(String),
  #[error("Environment variable name {0:?} contains a NUL byte")]
  KeyContainsNul(String),
  #[error("Value of environment variable {0:?} contains a NUL byte")]
  ValueContainsNul(String),
}

impl SetVarError {
  /// The rejected key.
  pub fn key(&self) -> &str {
    match self {
      SetVarError::EmptyKey => "",
      SetVarError::KeyContainsEquals(key)
      | SetVarError::KeyContainsNul(key)
      | SetVarError::ValueContainsNul(key) => key,
    }
  }
}
