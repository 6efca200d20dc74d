//! Parallel deletion of stale build artifacts from previous builds.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;

use walkdir::WalkDir;

use crate::error::BuildError;
use crate::models::{BUNDLE_MANIFEST_SUFFIX, BUNDLE_SUFFIX, BundleTable, MANIFEST_BUNDLE_NAME};
use crate::progress::{CLEAR_BUNDLES, ProgressObserver};

/// Outcome of a stale-artifact sweep.
#[derive(Debug, Default)]
pub struct CleanReport {
  /// Paths that were deleted.
  pub removed: Vec<PathBuf>,
  /// Paths that could not be deleted, with the failure reason. A failed
  /// item never aborts the remaining deletions.
  pub failures: Vec<(PathBuf, io::Error)>,
}

impl CleanReport {
  /// Convert the report into a build result: any failure is fatal, carrying
  /// the whole aggregated list.
  pub fn into_result(self) -> Result<Vec<PathBuf>, BuildError> {
    if self.failures.is_empty() {
      Ok(self.removed)
    } else {
      Err(BuildError::Clean { failures: self.failures })
    }
  }
}

/// Delete every file under `build_dir` that is not a produced bundle, its
/// companion manifest, or the manifest bundle pair.
///
/// Deletions are independent, so they are dispatched across a worker pool
/// sized to twice the available hardware parallelism. Workers share only
/// the worklist and the result vectors; there is no ordering requirement
/// and no cancellation.
pub fn clear_stale_artifacts(
  build_dir: &Path,
  bundles: &BundleTable,
  progress: &dyn ProgressObserver,
) -> Result<CleanReport, BuildError> {
  progress.report("clean", "scanning", CLEAR_BUNDLES.start);

  let mut keep: BTreeSet<PathBuf> = BTreeSet::new();
  for name in bundles.keys() {
    keep.insert(build_dir.join(name));
    keep.insert(build_dir.join(format!("{name}{BUNDLE_MANIFEST_SUFFIX}")));
  }
  let manifest_bundle = format!("{MANIFEST_BUNDLE_NAME}{BUNDLE_SUFFIX}");
  keep.insert(build_dir.join(&manifest_bundle));
  keep.insert(build_dir.join(format!("{manifest_bundle}{BUNDLE_MANIFEST_SUFFIX}")));

  let mut stale = Vec::new();
  for entry in WalkDir::new(build_dir) {
    let entry = entry.map_err(|err| {
      let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| build_dir.to_path_buf());
      BuildError::Io { path, source: err.into() }
    })?;
    if entry.file_type().is_file() && !keep.contains(entry.path()) {
      stale.push(entry.path().to_path_buf());
    }
  }

  let report = delete_all(stale);
  progress.report("clean", "done", CLEAR_BUNDLES.end);
  tracing::debug!(
    removed = report.removed.len(),
    failed = report.failures.len(),
    "cleared stale artifacts"
  );
  Ok(report)
}

fn delete_all(stale: Vec<PathBuf>) -> CleanReport {
  if stale.is_empty() {
    return CleanReport::default();
  }

  let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(4) * 2;
  let workers = workers.min(stale.len());

  let worklist = Mutex::new(stale);
  let removed = Mutex::new(Vec::new());
  let failures = Mutex::new(Vec::new());

  thread::scope(|scope| {
    for _ in 0..workers {
      scope.spawn(|| {
        loop {
          let Some(path) = worklist.lock().expect("delete worklist poisoned").pop() else {
            break;
          };
          match fs::remove_file(&path) {
            Ok(()) => removed.lock().expect("delete results poisoned").push(path),
            Err(err) => failures.lock().expect("delete results poisoned").push((path, err)),
          }
        }
      });
    }
  });

  CleanReport {
    removed: removed.into_inner().expect("delete results poisoned"),
    failures: failures.into_inner().expect("delete results poisoned"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::progress::NoopProgress;
  use tempfile::tempdir;

  fn bundle_table(names: &[&str]) -> BundleTable {
    names.iter().map(|n| (n.to_string(), Vec::new())).collect()
  }

  #[test]
  fn removes_only_files_outside_the_keep_set() {
    let temp = tempdir().unwrap();
    let build_dir = temp.path();

    fs::create_dir_all(build_dir.join("models")).unwrap();
    fs::write(build_dir.join("models/current.bundle"), b"keep").unwrap();
    fs::write(build_dir.join("models/current.bundle.manifest"), b"keep").unwrap();
    fs::write(build_dir.join("manifest.bundle"), b"keep").unwrap();
    fs::write(build_dir.join("manifest.bundle.manifest"), b"keep").unwrap();
    fs::write(build_dir.join("models/old.bundle"), b"stale").unwrap();
    fs::write(build_dir.join("leftover.tmp"), b"stale").unwrap();

    let bundles = bundle_table(&["models/current.bundle"]);
    let report = clear_stale_artifacts(build_dir, &bundles, &NoopProgress).unwrap();

    assert!(build_dir.join("models/current.bundle").exists());
    assert!(build_dir.join("models/current.bundle.manifest").exists());
    assert!(build_dir.join("manifest.bundle").exists());
    assert!(!build_dir.join("models/old.bundle").exists());
    assert!(!build_dir.join("leftover.tmp").exists());
    assert_eq!(report.removed.len(), 2);
    assert!(report.failures.is_empty());
  }

  #[test]
  fn deleting_many_files_drains_the_whole_worklist() {
    let temp = tempdir().unwrap();
    for i in 0..200 {
      fs::write(temp.path().join(format!("stale-{i:03}.tmp")), b"x").unwrap();
    }

    let report =
      clear_stale_artifacts(temp.path(), &bundle_table(&[]), &NoopProgress).unwrap();
    assert_eq!(report.removed.len(), 200);
    assert!(fs::read_dir(temp.path()).unwrap().next().is_none());
  }

  #[test]
  fn empty_report_converts_to_ok() {
    let report = CleanReport::default();
    assert!(report.into_result().unwrap().is_empty());
  }

  #[test]
  fn failures_convert_into_an_aggregated_error() {
    let report = CleanReport {
      removed: Vec::new(),
      failures: vec![(
        PathBuf::from("locked.bundle"),
        io::Error::new(io::ErrorKind::PermissionDenied, "locked"),
      )],
    };
    let err = report.into_result().unwrap_err();
    assert!(matches!(err, BuildError::Clean { failures } if failures.len() == 1));
  }
}
