//! Replace-semantics output of the encoded manifest table pairs.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::manifest::encoding::ManifestTables;
use crate::progress::{GENERATE_MANIFEST, ProgressObserver};

/// Paths of the six table files written under the temp directory.
#[derive(Debug, Clone)]
pub struct TableFiles {
  /// Binary resource index.
  pub resource_binary: PathBuf,
  /// Text mirror of the resource index.
  pub resource_text: PathBuf,
  /// Binary bundle membership table.
  pub bundle_binary: PathBuf,
  /// Text mirror of the bundle membership table.
  pub bundle_text: PathBuf,
  /// Binary dependency chain table.
  pub dependency_binary: PathBuf,
  /// Text mirror of the dependency chain table.
  pub dependency_text: PathBuf,
}

/// Write the three binary/text table pairs into `table_dir`.
///
/// Each write replaces: a pre-existing file at the destination is deleted
/// first, so an abort mid-encode leaves no stale-but-plausible file behind.
/// The bundle table gets its own file pair, distinct from the resource
/// table's.
pub fn write_tables(
  table_dir: &Path,
  tables: &ManifestTables,
  progress: &dyn ProgressObserver,
) -> Result<TableFiles, BuildError> {
  fs::create_dir_all(table_dir).map_err(|source| BuildError::Io {
    path: table_dir.to_path_buf(),
    source,
  })?;

  let files = TableFiles {
    resource_binary: table_dir.join("resource.bytes"),
    resource_text: table_dir.join("resource.txt"),
    bundle_binary: table_dir.join("bundle.bytes"),
    bundle_text: table_dir.join("bundle.txt"),
    dependency_binary: table_dir.join("dependency.bytes"),
    dependency_text: table_dir.join("dependency.txt"),
  };

  progress.report("manifest", "resource table", GENERATE_MANIFEST.at(0.0));
  replace_write(&files.resource_binary, &tables.resource_binary)?;
  replace_write(&files.resource_text, tables.resource_text.as_bytes())?;

  progress.report("manifest", "bundle table", GENERATE_MANIFEST.at(0.3));
  replace_write(&files.bundle_binary, &tables.bundle_binary)?;
  replace_write(&files.bundle_text, tables.bundle_text.as_bytes())?;

  progress.report("manifest", "dependency table", GENERATE_MANIFEST.at(0.8));
  replace_write(&files.dependency_binary, &tables.dependency_binary)?;
  replace_write(&files.dependency_text, tables.dependency_text.as_bytes())?;

  progress.report("manifest", "done", GENERATE_MANIFEST.end);
  Ok(files)
}

/// Delete any pre-existing file at `path`, then write `contents`.
pub(crate) fn replace_write(path: &Path, contents: &[u8]) -> Result<(), BuildError> {
  let io_error = |source| BuildError::Io { path: path.to_path_buf(), source };

  match fs::remove_file(path) {
    Ok(()) => {}
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => return Err(io_error(err)),
  }
  fs::write(path, contents).map_err(io_error)
}
