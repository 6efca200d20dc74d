//! Data structures shared across the bundling pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

/// Suffix appended to every produced bundle file name.
pub const BUNDLE_SUFFIX: &str = ".bundle";

/// Suffix of the companion file written next to every bundle.
pub const BUNDLE_MANIFEST_SUFFIX: &str = ".manifest";

/// Base name of the bundle that carries the three encoded manifest tables.
pub const MANIFEST_BUNDLE_NAME: &str = "manifest";

/// Maximum number of assets a manifest can describe (16-bit count field).
pub const MAX_ASSET_COUNT: usize = u16::MAX as usize;

/// Maximum number of IDs in a single dependency chain (16-bit count field).
pub const MAX_CHAIN_LENGTH: usize = u16::MAX as usize;

/// Granularity at which a matched path becomes one bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// Every matched file becomes its own bundle.
    File,
    /// Every matched file joins the bundle named after its containing directory.
    Directory,
    /// Every matched file joins one bundle named after the rule path.
    All,
}

/// How a rule participates in asset discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// The rule's subtree is walked and collected directly.
    Direct,
    /// The rule only receives assets discovered through the dependency graph.
    Dependency,
}

/// How an asset entered the build universe. `Direct` wins when an asset is
/// both collected and referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Discovered by walking a direct rule's file-system scope.
    Direct,
    /// Reached only by following reference edges from other assets.
    Dependency,
}

/// A validated packaging rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Bundle granularity for paths matched by this rule.
    pub scope: RuleScope,
    /// Root path this rule governs, relative to the source root.
    pub path: String,
    /// Whether the rule collects files itself or only accepts dependencies.
    pub kind: RuleKind,
    /// Parsed file-extension filters, lower-cased, with the leading dot.
    pub suffixes: Vec<String>,
    /// Paths of more specific nested rules that own their own subtrees.
    /// Recomputed from the full rule set on every collection run.
    pub ignored_subpaths: Vec<String>,
    /// Number of assets resolved to this rule. Diagnostic only.
    pub match_count: usize,
}

impl Rule {
    /// Whether `asset` carries one of this rule's suffixes. An empty suffix
    /// set matches every file.
    pub fn matches_suffix(&self, asset: &str) -> bool {
        self.suffixes.is_empty() || self.suffixes.iter().any(|suffix| asset.ends_with(suffix))
    }
}

/// Asset path mapped to its ordered list of directly referenced asset paths.
pub type DependencyMap = BTreeMap<String, Vec<String>>;

/// Bundle name mapped to its sorted, de-duplicated asset paths.
pub type BundleTable = BTreeMap<String, Vec<String>>;

/// Figures reported after a successful build.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Total number of distinct assets in the build universe.
    pub asset_count: usize,
    /// Number of bundles produced.
    pub bundle_count: usize,
    /// Number of encoded dependency chains.
    pub chain_count: usize,
    /// Platform-named directory the bundles were written to.
    pub build_dir: std::path::PathBuf,
}

/// Lower-cased extension of `path` including the leading dot, or `None`
/// when the path has no extension.
pub fn asset_extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}
