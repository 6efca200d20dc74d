//! Transitive dependency resolution over an external dependency oracle.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{BuildError, CollaboratorResult, ConfigError};
use crate::models::{DependencyMap, asset_extension};
use crate::progress::{COLLECT_DEPENDENCIES, ProgressObserver};

/// Answers direct-dependency queries for a fixed asset-tree snapshot.
///
/// Implementations must be deterministic: the same asset path yields the
/// same ordered reference list for the lifetime of a build.
pub trait DependencyOracle {
  /// The asset paths directly referenced by `asset`, non-transitive.
  fn direct_dependencies(&self, asset: &str) -> CollaboratorResult<Vec<String>>;
}

/// Oracle backed by an in-memory reference map. Assets absent from the map
/// have no dependencies.
///
/// The CLI loads one from a JSON sidecar file of the shape
/// `{"asset/path.prefab": ["referenced/texture.png", ...]}`.
#[derive(Debug, Default, Clone)]
pub struct StaticOracle {
  references: BTreeMap<String, Vec<String>>,
}

impl StaticOracle {
  /// Build an oracle from explicit reference edges.
  pub fn new(references: BTreeMap<String, Vec<String>>) -> Self {
    Self { references }
  }

  /// Load reference edges from a JSON sidecar file.
  pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
      path: path.to_path_buf(),
      source,
    })?;
    let references = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(Self { references })
  }

  /// Record that `asset` directly references `dependencies`.
  pub fn insert(&mut self, asset: &str, dependencies: &[&str]) {
    self
      .references
      .insert(asset.to_string(), dependencies.iter().map(|d| d.to_string()).collect());
  }
}

impl DependencyOracle for StaticOracle {
  fn direct_dependencies(&self, asset: &str) -> CollaboratorResult<Vec<String>> {
    Ok(self.references.get(asset).cloned().unwrap_or_default())
  }
}

/// Expand `initial` transitively through the oracle.
///
/// The worklist grows by previously unseen references only, so it is finite
/// and monotonic even when the reference graph contains cycles. References
/// with no extension or with a non-packageable extension are dropped before
/// they can enter the universe. Every processed asset gets an entry, empty
/// lists included.
pub fn resolve_dependencies(
  initial: &BTreeSet<String>,
  oracle: &dyn DependencyOracle,
  non_packageable: &[String],
  progress: &dyn ProgressObserver,
) -> Result<DependencyMap, BuildError> {
  let mut worklist: Vec<String> = initial.iter().cloned().collect();
  let mut seen: BTreeSet<String> = initial.iter().cloned().collect();
  let mut dependencies = DependencyMap::new();

  let mut index = 0;
  while index < worklist.len() {
    let asset = worklist[index].clone();
    index += 1;

    if index % 10 == 0 {
      progress.report(
        "dependencies",
        &asset,
        COLLECT_DEPENDENCIES.at(index as f32 / worklist.len() as f32),
      );
    }

    let references =
      oracle
        .direct_dependencies(&asset)
        .map_err(|source| BuildError::Collaborator {
          stage: "dependency oracle",
          source,
        })?;

    let mut kept = Vec::with_capacity(references.len());
    for reference in references {
      match asset_extension(&reference) {
        None => continue,
        Some(extension) if non_packageable.contains(&extension) => continue,
        Some(_) => {}
      }
      if seen.insert(reference.clone()) {
        worklist.push(reference.clone());
      }
      kept.push(reference);
    }

    dependencies.insert(asset, kept);
  }

  progress.report("dependencies", "done", COLLECT_DEPENDENCIES.end);
  tracing::debug!(
    assets = dependencies.len(),
    discovered = dependencies.len().saturating_sub(initial.len()),
    "resolved dependency graph"
  );
  Ok(dependencies)
}
