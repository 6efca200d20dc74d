//! Bundle compiler seam and a filesystem reference implementation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CollaboratorResult;
use crate::manifest::writing::replace_write;
use crate::models::{BUNDLE_MANIFEST_SUFFIX, BundleTable};

/// Turns grouped asset paths into physical bundle artifacts.
///
/// The pipeline treats implementations as opaque: failures propagate as
/// collaborator errors and abort the build without retry.
pub trait BundleCompiler {
  /// Build one artifact per bundle under `output_dir`.
  fn build_bundles(&self, output_dir: &Path, bundles: &BundleTable) -> CollaboratorResult<()>;

  /// Build the manifest bundle whose payload is exactly the named binary
  /// tables, under `output_dir` with the given bundle file name.
  fn build_manifest_bundle(
    &self,
    output_dir: &Path,
    bundle_name: &str,
    tables: &[(&str, &[u8])],
  ) -> CollaboratorResult<()>;
}

/// Reference compiler that packs each bundle into a flat container file.
///
/// The container holds length-prefixed member paths and contents. Each
/// bundle gets a companion `.manifest` file carrying the BLAKE3 content
/// hash of the container and the member list, which makes bundles
/// content-addressable and byte-diffable across builds.
#[derive(Debug, Clone)]
pub struct ArchiveBundleCompiler {
  source_root: PathBuf,
}

impl ArchiveBundleCompiler {
  /// Create a compiler reading asset contents relative to `source_root`.
  pub fn new(source_root: impl Into<PathBuf>) -> Self {
    Self { source_root: source_root.into() }
  }

  fn pack(&self, members: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(members.len() as u32).to_le_bytes());
    for (path, contents) in members {
      payload.extend_from_slice(&(path.len() as u16).to_le_bytes());
      payload.extend_from_slice(path.as_bytes());
      payload.extend_from_slice(&(contents.len() as u32).to_le_bytes());
      payload.extend_from_slice(contents);
    }
    payload
  }

  fn write_bundle(
    &self,
    output_dir: &Path,
    name: &str,
    members: &[(String, Vec<u8>)],
  ) -> CollaboratorResult<()> {
    let payload = self.pack(members);
    let hash = blake3::hash(&payload);

    let bundle_path = output_dir.join(name);
    if let Some(parent) = bundle_path.parent() {
      fs::create_dir_all(parent)?;
    }
    replace_write(&bundle_path, &payload)?;

    let mut companion = format!("blake3:{}\n", hash.to_hex());
    for (path, _) in members {
      companion.push_str(path);
      companion.push('\n');
    }
    let companion_path = output_dir.join(format!("{name}{BUNDLE_MANIFEST_SUFFIX}"));
    replace_write(&companion_path, companion.as_bytes())?;
    Ok(())
  }
}

impl BundleCompiler for ArchiveBundleCompiler {
  fn build_bundles(&self, output_dir: &Path, bundles: &BundleTable) -> CollaboratorResult<()> {
    fs::create_dir_all(output_dir)?;
    for (name, assets) in bundles {
      let mut members = Vec::with_capacity(assets.len());
      for asset in assets {
        let contents = fs::read(self.source_root.join(asset))?;
        members.push((asset.clone(), contents));
      }
      self.write_bundle(output_dir, name, &members)?;
    }
    tracing::debug!(bundles = bundles.len(), "compiled bundle archives");
    Ok(())
  }

  fn build_manifest_bundle(
    &self,
    output_dir: &Path,
    bundle_name: &str,
    tables: &[(&str, &[u8])],
  ) -> CollaboratorResult<()> {
    fs::create_dir_all(output_dir)?;
    let members: Vec<(String, Vec<u8>)> =
      tables.iter().map(|(name, bytes)| (name.to_string(), bytes.to_vec())).collect();
    self.write_bundle(output_dir, bundle_name, &members)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn fixture(root: &Path) -> BundleTable {
    fs::create_dir_all(root.join("models")).unwrap();
    fs::write(root.join("models/a.prefab"), b"prefab a").unwrap();
    fs::write(root.join("models/b.prefab"), b"prefab b").unwrap();

    let mut bundles = BundleTable::new();
    bundles.insert(
      "models.bundle".into(),
      vec!["models/a.prefab".into(), "models/b.prefab".into()],
    );
    bundles
  }

  #[test]
  fn writes_bundle_and_companion_manifest() {
    let temp = tempdir().unwrap();
    let output = temp.path().join("out");
    let bundles = fixture(temp.path());

    let compiler = ArchiveBundleCompiler::new(temp.path());
    compiler.build_bundles(&output, &bundles).unwrap();

    assert!(output.join("models.bundle").exists());
    let companion = fs::read_to_string(output.join("models.bundle.manifest")).unwrap();
    assert!(companion.starts_with("blake3:"));
    assert!(companion.contains("models/a.prefab"));
    assert!(companion.contains("models/b.prefab"));
  }

  #[test]
  fn bundle_contents_are_deterministic() {
    let temp = tempdir().unwrap();
    let output = temp.path().join("out");
    let bundles = fixture(temp.path());
    let compiler = ArchiveBundleCompiler::new(temp.path());

    compiler.build_bundles(&output, &bundles).unwrap();
    let first = fs::read(output.join("models.bundle")).unwrap();
    compiler.build_bundles(&output, &bundles).unwrap();
    let second = fs::read(output.join("models.bundle")).unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn missing_asset_contents_fail_the_compile() {
    let temp = tempdir().unwrap();
    let mut bundles = BundleTable::new();
    bundles.insert("ghost.bundle".into(), vec!["ghost/missing.prefab".into()]);

    let compiler = ArchiveBundleCompiler::new(temp.path());
    assert!(compiler.build_bundles(&temp.path().join("out"), &bundles).is_err());
  }

  #[test]
  fn manifest_bundle_packs_the_named_tables() {
    let temp = tempdir().unwrap();
    let output = temp.path().join("out");
    let compiler = ArchiveBundleCompiler::new(temp.path());

    compiler
      .build_manifest_bundle(&output, "manifest.bundle", &[
        ("resource.bytes", &[1u8, 0][..]),
        ("bundle.bytes", &[2u8, 0][..]),
        ("dependency.bytes", &[0u8, 0][..]),
      ])
      .unwrap();

    assert!(output.join("manifest.bundle").exists());
    let companion = fs::read_to_string(output.join("manifest.bundle.manifest")).unwrap();
    assert!(companion.contains("resource.bytes"));
    assert!(companion.contains("dependency.bytes"));
  }
}
