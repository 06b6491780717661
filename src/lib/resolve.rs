//! Locating the main and template files inside a directory.
//!
//! Resolution only asks the filesystem whether paths exist; it never reads
//! them.

use std::{
  fmt,
  path::{Path, PathBuf},
};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

pub const DEFAULT_MAIN_FILENAME: &str = ".env";
pub const DEFAULT_TEMPLATE_FILENAMES: [&str; 2] = [".env.sample", ".env.example"];

/// Which of the two files a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
  Main,
  Template,
}

impl fmt::Display for FileRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FileRole::Main => write!(f, "Main"),
      FileRole::Template => write!(f, "Template"),
    }
  }
}

/// File names looked up relative to a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLayout {
  /// Name of the file holding the actual values.
  pub main: String,
  /// Template names in priority order; the first one found is used.
  pub templates: Vec<String>,
}

impl Default for FileLayout {
  fn default() -> Self {
    Self {
      main: DEFAULT_MAIN_FILENAME.to_string(),
      templates: DEFAULT_TEMPLATE_FILENAMES
        .iter()
        .map(|name| name.to_string())
        .collect(),
    }
  }
}

/// Paths of both files once they are known to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFiles {
  pub main: PathBuf,
  pub template: PathBuf,
}

impl FileLayout {
  /// Returns the main file path, failing if it does not exist.
  pub fn resolve_main(&self, dir: &Path) -> Result<PathBuf, ResolveError> {
    let path = dir.join(&self.main);

    if exists(&path)? {
      #[cfg(feature = "tracing")]
      debug!(?path, "Resolved main file");
      Ok(path)
    } else {
      Err(ResolveError::MissingFile {
        role: FileRole::Main,
        candidates: vec![path],
      })
    }
  }

  /// Returns the first template candidate that exists.
  pub fn resolve_template(&self, dir: &Path) -> Result<PathBuf, ResolveError> {
    let candidates: Vec<PathBuf> = self.templates.iter().map(|name| dir.join(name)).collect();

    for path in &candidates {
      #[cfg(feature = "tracing")]
      trace!(?path, "Checking template candidate");

      if exists(path)? {
        #[cfg(feature = "tracing")]
        debug!(?path, "Resolved template file");
        return Ok(path.clone());
      }
    }

    Err(ResolveError::MissingFile {
      role: FileRole::Template,
      candidates,
    })
  }

  /// Resolves both files. The main file is checked first, so a missing main
  /// file is reported even when no template exists either.
  pub fn resolve(&self, dir: &Path) -> Result<ResolvedFiles, ResolveError> {
    let main = self.resolve_main(dir)?;
    let template = self.resolve_template(dir)?;
    Ok(ResolvedFiles { main, template })
  }
}

fn exists(path: &Path) -> Result<bool, ResolveError> {
  path.try_exists().map_err(|source| ResolveError::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn join_paths(paths: &[PathBuf]) -> String {
  paths
    .iter()
    .map(|path| path.display().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
  /// None of the candidate paths for a file exist
  #[error("{role} file not found, looked for: {}", join_paths(.candidates))]
  MissingFile {
    role: FileRole,
    candidates: Vec<PathBuf>,
  },
  /// The filesystem could not tell whether a path exists
  #[error("Failed to check {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
