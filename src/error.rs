//! Fatal error taxonomy for the bundling pipeline.
//!
//! Every error aborts the current build invocation. There is no retry
//! anywhere in this crate: each failure mode is either a configuration
//! mistake or a hard capacity limit.

use std::io;
use std::path::PathBuf;

/// Result type collaborator seams (dependency oracle, bundle compiler)
/// report through; the pipeline wraps failures into
/// [`BuildError::Collaborator`] without retrying.
pub type CollaboratorResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Errors raised while loading or validating a rule set.
#[derive(Debug)]
pub enum ConfigError {
  /// The rule-set file could not be read from disk.
  Unreadable {
    /// Path of the rule-set file.
    path: PathBuf,
    /// Source I/O error.
    source: io::Error,
  },
  /// The rule-set file could not be parsed.
  Parse {
    /// Path of the rule-set file.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
  /// A `directory` or `all` scoped rule points at a missing directory.
  MissingDirectory {
    /// Rule path that does not exist on disk.
    path: String,
  },
  /// Two rules declare an identical path.
  DuplicatePath {
    /// The repeated rule path.
    path: String,
  },
}

/// Errors that abort a build after validation has passed.
#[derive(Debug)]
pub enum BuildError {
  /// The rule set is invalid.
  Config(ConfigError),
  /// One or more assets could not be assigned to any bundle. Reported as a
  /// single aggregated list so the operator can fix the rule set in one pass.
  Unmatched {
    /// Every asset path that failed bundle-name resolution.
    assets: Vec<String>,
  },
  /// A 16-bit count field in the manifest encoding would overflow.
  Capacity {
    /// What overflowed, for example `"asset count"`.
    what: &'static str,
    /// The observed count.
    count: usize,
    /// The encoding limit.
    limit: usize,
  },
  /// The dependency oracle or the bundle compiler failed.
  Collaborator {
    /// Pipeline stage the collaborator was serving.
    stage: &'static str,
    /// The propagated failure.
    source: Box<dyn std::error::Error + Send + Sync>,
  },
  /// A filesystem operation failed.
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: io::Error,
  },
  /// One or more stale-artifact deletions failed. The remaining deletions
  /// still ran; the failures are aggregated after the pool drained.
  Clean {
    /// Every path that could not be deleted, with the failure reason.
    failures: Vec<(PathBuf, io::Error)>,
  },
}

impl From<ConfigError> for BuildError {
  fn from(err: ConfigError) -> Self {
    Self::Config(err)
  }
}

impl std::fmt::Display for ConfigError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Unreadable { path, source } => {
        write!(f, "failed to read rule set {}: {}", path.display(), source)
      }
      Self::Parse { path, source } => {
        write!(f, "failed to parse rule set {}: {}", path.display(), source)
      }
      Self::MissingDirectory { path } => {
        write!(f, "rule directory does not exist: {path}")
      }
      Self::DuplicatePath { path } => {
        write!(f, "duplicate rule path: {path}")
      }
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Unreadable { source, .. } => Some(source),
      Self::Parse { source, .. } => Some(source),
      Self::MissingDirectory { .. } | Self::DuplicatePath { .. } => None,
    }
  }
}

impl std::fmt::Display for BuildError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Config(err) => write!(f, "{err}"),
      Self::Unmatched { assets } => {
        writeln!(f, "{} asset(s) matched no rule, or failed its suffix filter:", assets.len())?;
        for asset in assets {
          writeln!(f, "  {asset}")?;
        }
        Ok(())
      }
      Self::Capacity { what, count, limit } => {
        write!(f, "{what} {count} exceeds the encoding limit of {limit}")
      }
      Self::Collaborator { stage, source } => {
        write!(f, "{stage} failed: {source}")
      }
      Self::Io { path, source } => {
        write!(f, "io error on {}: {}", path.display(), source)
      }
      Self::Clean { failures } => {
        writeln!(f, "{} stale artifact(s) could not be deleted:", failures.len())?;
        for (path, source) in failures {
          writeln!(f, "  {}: {}", path.display(), source)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for BuildError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Config(err) => Some(err),
      Self::Collaborator { source, .. } => Some(source.as_ref()),
      Self::Io { source, .. } => Some(source),
      Self::Unmatched { .. } | Self::Capacity { .. } | Self::Clean { .. } => None,
    }
  }
}
