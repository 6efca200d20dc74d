//! Sequential build orchestrator: collection, dependency resolution,
//! grouping, manifest encoding, bundle compilation and housekeeping.

use std::collections::{BTreeMap, BTreeSet};

use crate::bundle::clean::clear_stale_artifacts;
use crate::bundle::compiler::BundleCompiler;
use crate::collect::bundles::group_into_bundles;
use crate::collect::dependencies::{DependencyOracle, resolve_dependencies};
use crate::collect::rules::collect_ruled_files;
use crate::config::RuleSet;
use crate::error::BuildError;
use crate::manifest::encoding::encode_manifest;
use crate::manifest::writing::write_tables;
use crate::models::{
  BUNDLE_SUFFIX, BuildSummary, DependencyMap, MANIFEST_BUNDLE_NAME, ResourceKind,
};
use crate::progress::{BUILD_BUNDLES, BUILD_MANIFEST, ProgressObserver};

/// Everything one build invocation needs, passed by reference rather than
/// held in ambient globals so multiple builds can run in one process
/// without sharing state.
pub struct BuildContext<'a> {
  /// Validated rule set. Mutated only for per-rule diagnostics.
  pub rule_set: RuleSet,
  /// Answers direct-dependency queries.
  pub oracle: &'a dyn DependencyOracle,
  /// Produces the physical bundle artifacts.
  pub compiler: &'a dyn BundleCompiler,
  /// Receives fire-and-forget stage progress.
  pub progress: &'a dyn ProgressObserver,
}

/// Runs the full, from-scratch bundling pipeline.
pub struct BundleBuilder<'a> {
  context: BuildContext<'a>,
}

impl<'a> BundleBuilder<'a> {
  /// Create a builder for the provided build context.
  pub fn new(context: BuildContext<'a>) -> Self {
    Self { context }
  }

  /// Execute the pipeline: collect, resolve, group, encode, compile, clean.
  ///
  /// Strictly sequential; each stage fully consumes its predecessor's
  /// output. The first fatal error aborts the whole build.
  pub fn build(&mut self) -> Result<BuildSummary, BuildError> {
    let oracle = self.context.oracle;
    let compiler = self.context.compiler;
    let progress = self.context.progress;
    let rule_set = &mut self.context.rule_set;

    tracing::info!(
      project = %rule_set.project_name,
      platform = %rule_set.platform,
      rules = rule_set.rules.len(),
      "starting bundle build"
    );

    let source_root = rule_set.source_root.clone();
    let files = collect_ruled_files(&mut rule_set.rules, &source_root, progress)?;
    let dependencies =
      resolve_dependencies(&files, oracle, &rule_set.non_packageable, progress)?;
    let assets = classify_assets(&files, &dependencies);
    let bundles = group_into_bundles(&assets, &mut rule_set.rules, progress)?;

    let tables = encode_manifest(&assets, &bundles, &dependencies)?;
    write_tables(&rule_set.table_dir(), &tables, progress)?;

    let build_dir = rule_set.platform_build_dir();
    progress.report("build", "compiling bundles", BUILD_BUNDLES.start);
    compiler
      .build_bundles(&build_dir, &bundles)
      .map_err(|source| BuildError::Collaborator { stage: "bundle compiler", source })?;
    progress.report("build", "done", BUILD_BUNDLES.end);

    clear_stale_artifacts(&build_dir, &bundles, progress)?.into_result()?;

    progress.report("manifest-bundle", "packing tables", BUILD_MANIFEST.start);
    compiler
      .build_manifest_bundle(
        &build_dir,
        &format!("{MANIFEST_BUNDLE_NAME}{BUNDLE_SUFFIX}"),
        &[
          ("resource.bytes", tables.resource_binary.as_slice()),
          ("bundle.bytes", tables.bundle_binary.as_slice()),
          ("dependency.bytes", tables.dependency_binary.as_slice()),
        ],
      )
      .map_err(|source| BuildError::Collaborator { stage: "manifest bundle compiler", source })?;
    progress.report("manifest-bundle", "done", BUILD_MANIFEST.end);

    for rule in &rule_set.rules {
      tracing::debug!(path = %rule.path, matched = rule.match_count, "rule diagnostics");
    }

    let summary = BuildSummary {
      asset_count: assets.len(),
      bundle_count: bundles.len(),
      chain_count: tables.chain_count,
      build_dir,
    };
    tracing::info!(
      assets = summary.asset_count,
      bundles = summary.bundle_count,
      chains = summary.chain_count,
      "bundle build finished"
    );
    Ok(summary)
  }
}

/// Mark every asset in the universe as directly collected or
/// dependency-discovered. Direct takes precedence when an asset is both.
pub fn classify_assets(
  files: &BTreeSet<String>,
  dependencies: &DependencyMap,
) -> BTreeMap<String, ResourceKind> {
  let mut assets: BTreeMap<String, ResourceKind> =
    files.iter().map(|file| (file.clone(), ResourceKind::Direct)).collect();
  for asset in dependencies.keys() {
    assets.entry(asset.clone()).or_insert(ResourceKind::Dependency);
  }
  assets
}
