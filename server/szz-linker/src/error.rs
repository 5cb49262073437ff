//! Structured error types for the linker.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the version-control capability.
#[derive(Debug, Error)]
pub enum VcsError {
  #[error("working copy unavailable: {}: {reason}", path.display())]
  Unavailable { path: PathBuf, reason: String },

  #[error("working copy busy: {} is already being linked", path.display())]
  Busy { path: PathBuf },

  #[error("unknown revision: {0}")]
  UnknownRevision(String),

  #[error("git: {0}")]
  Git(#[from] git2::Error),
}

impl VcsError {
  pub fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
    Self::Unavailable {
      path: path.into(),
      reason: reason.into(),
    }
  }

  /// Systemic errors mean diff/blame cannot run at all against the working copy.
  /// Anything else is a miss local to one commit or one region.
  pub fn is_systemic(&self) -> bool {
    match self {
      Self::Unavailable { .. } | Self::Busy { .. } => true,
      Self::UnknownRevision(_) => false,
      Self::Git(e) => {
        e.code() != git2::ErrorCode::NotFound
          && matches!(
            e.class(),
            git2::ErrorClass::Os
              | git2::ErrorClass::NoMemory
              | git2::ErrorClass::Repository
              | git2::ErrorClass::Odb
              | git2::ErrorClass::Zlib
              | git2::ErrorClass::Filesystem
          )
      }
    }
  }
}

/// Failures loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io: {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("toml: {0}")]
  Toml(#[from] toml::de::Error),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid config: {field}: {reason}")]
  Invalid { field: String, reason: String },
}

impl ConfigError {
  pub fn invalid(field: &str, reason: &str) -> Self {
    Self::Invalid {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }
}

/// Errors that abort a linkage batch.
#[derive(Debug, Error)]
pub enum LinkError {
  #[error("linking {commit}: {source}")]
  WorkingCopy {
    commit: String,
    #[source]
    source: VcsError,
  },

  #[error(transparent)]
  Vcs(#[from] VcsError),

  #[error("config: {0}")]
  Config(#[from] ConfigError),
}

impl LinkError {
  pub fn working_copy(commit: &str, source: VcsError) -> Self {
    Self::WorkingCopy {
      commit: commit.to_string(),
      source,
    }
  }

  /// The corrective commit whose processing triggered the failure, if any.
  pub fn commit(&self) -> Option<&str> {
    match self {
      Self::WorkingCopy { commit, .. } => Some(commit),
      _ => None,
    }
  }
}
