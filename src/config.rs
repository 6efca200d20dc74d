//! Rule-set configuration loading and validation.
//!
//! A build is described by a JSON rule-set file. Loading yields an
//! unvalidated [`BuildConfig`]; validation turns it into a read-only
//! [`RuleSet`] or fails with a [`ConfigError`] before any collection starts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::{Rule, RuleKind, RuleScope};

/// Default rule-set file name searched for in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "rulepack.json";

/// Extensions that are never packaged even when referenced, unless the
/// rule-set file overrides the list. Source and compiled code stay out of
/// bundles.
pub const DEFAULT_NON_PACKAGEABLE: &[&str] = &[".cs", ".dll"];

/// One rule as declared in the rule-set file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    /// Bundle granularity.
    #[serde(default = "default_scope")]
    pub scope: RuleScope,
    /// Root path the rule governs, relative to the source root.
    pub path: String,
    /// Direct collection rule or dependency-only rule.
    #[serde(default = "default_kind")]
    pub kind: RuleKind,
    /// Pipe-delimited extension filter, for example `".prefab|.png"`.
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_scope() -> RuleScope {
    RuleScope::File
}

fn default_kind() -> RuleKind {
    RuleKind::Direct
}

fn default_suffix() -> String {
    ".prefab".to_string()
}

/// Unvalidated rule-set file contents.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
    /// Human readable project name, used in logs only.
    pub project_name: String,
    /// Global suffix hints declared next to the rules. Informational; each
    /// rule carries its own filter.
    pub suffix_list: Vec<String>,
    /// Root directory bundles are written under.
    pub build_root: String,
    /// Root directory rule paths are resolved against.
    pub source_root: String,
    /// Platform subdirectory name. Defaults to the host OS name.
    pub platform: String,
    /// Extensions excluded from dependency packaging.
    pub non_packageable: Vec<String>,
    /// Ordered list of packaging rules.
    pub rules: Vec<RuleConfig>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            suffix_list: Vec::new(),
            build_root: "build".into(),
            source_root: ".".into(),
            platform: String::new(),
            non_packageable: DEFAULT_NON_PACKAGEABLE.iter().map(|s| s.to_string()).collect(),
            rules: Vec::new(),
        }
    }
}

impl BuildConfig {
    /// Read a rule-set file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the configuration into a read-only rule set.
    ///
    /// Checks that every `directory`/`all` rule points at an existing
    /// directory, parses the pipe-delimited suffix filters, rejects
    /// duplicate rule paths and normalises the build root to an absolute,
    /// forward-slash path.
    pub fn validate(self) -> Result<RuleSet, ConfigError> {
        let source_root = PathBuf::from(&self.source_root);
        let build_root = normalise_build_root(&self.build_root);
        let platform = if self.platform.is_empty() {
            std::env::consts::OS.to_string()
        } else {
            self.platform
        };

        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        let mut rules = Vec::with_capacity(self.rules.len());

        for (position, item) in self.rules.into_iter().enumerate() {
            if item.scope == RuleScope::Directory || item.scope == RuleScope::All {
                let on_disk = source_root.join(item.path.trim_end_matches('/'));
                if !on_disk.is_dir() {
                    return Err(ConfigError::MissingDirectory { path: item.path });
                }
            }

            if index.insert(item.path.clone(), position).is_some() {
                return Err(ConfigError::DuplicatePath { path: item.path });
            }

            rules.push(Rule {
                scope: item.scope,
                path: item.path,
                kind: item.kind,
                suffixes: parse_suffixes(&item.suffix),
                ignored_subpaths: Vec::new(),
                match_count: 0,
            });
        }

        Ok(RuleSet {
            project_name: self.project_name,
            suffix_list: self.suffix_list,
            build_root,
            source_root,
            platform,
            non_packageable: self.non_packageable,
            rules,
        })
    }
}

/// Validated, read-only rule set driving one build invocation.
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// Human readable project name.
    pub project_name: String,
    /// Global suffix hints from the rule-set file.
    pub suffix_list: Vec<String>,
    /// Absolute, forward-slash build root.
    pub build_root: String,
    /// Root directory rule paths are resolved against.
    pub source_root: PathBuf,
    /// Platform subdirectory name under the build root.
    pub platform: String,
    /// Extensions excluded from dependency packaging.
    pub non_packageable: Vec<String>,
    /// Ordered, validated rules.
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Platform-named directory all bundle artifacts are written to.
    pub fn platform_build_dir(&self) -> PathBuf {
        Path::new(&self.build_root).join(&self.platform)
    }

    /// Temp directory holding the encoded manifest table pairs.
    pub fn table_dir(&self) -> PathBuf {
        Path::new(&self.build_root).join("temp")
    }
}

/// Split a pipe-delimited suffix string, trimming whitespace and dropping
/// empty entries.
fn parse_suffixes(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(|suffix| suffix.trim().to_ascii_lowercase())
        .filter(|suffix| !suffix.is_empty())
        .collect()
}

fn normalise_build_root(raw: &str) -> String {
    let absolute = std::path::absolute(raw).unwrap_or_else(|_| PathBuf::from(raw));
    let mut root = absolute.to_string_lossy().replace('\\', "/");
    while root.ends_with('/') && root.len() > 1 {
        root.pop();
    }
    root
}
