//! Bundle grouping: longest-prefix rule matching and bundle-name derivation.

use std::collections::BTreeMap;

use crate::error::BuildError;
use crate::models::{
  BUNDLE_SUFFIX, BundleTable, ResourceKind, Rule, RuleKind, RuleScope, asset_extension,
};
use crate::progress::{COLLECT_BUNDLES, ProgressObserver};

/// Assign every asset to exactly one bundle.
///
/// Unmatched assets are accumulated rather than failed individually; a
/// non-empty list after processing every asset fails the whole operation
/// with one aggregated [`BuildError::Unmatched`]. On success every bundle's
/// asset list is sorted and de-duplicated for determinism.
pub fn group_into_bundles(
  assets: &BTreeMap<String, ResourceKind>,
  rules: &mut [Rule],
  progress: &dyn ProgressObserver,
) -> Result<BundleTable, BuildError> {
  let mut bundles = BundleTable::new();
  let mut unmatched = Vec::new();

  for (index, (asset, kind)) in assets.iter().enumerate() {
    match bundle_name(asset, *kind, rules) {
      Some(name) => bundles.entry(name).or_default().push(asset.clone()),
      None => unmatched.push(asset.clone()),
    }
    if index % 10 == 0 {
      progress.report(
        "bundles",
        asset,
        COLLECT_BUNDLES.at(index as f32 / assets.len() as f32),
      );
    }
  }

  if !unmatched.is_empty() {
    return Err(BuildError::Unmatched { assets: unmatched });
  }

  for members in bundles.values_mut() {
    members.sort();
    members.dedup();
  }

  progress.report("bundles", "done", COLLECT_BUNDLES.end);
  tracing::debug!(bundles = bundles.len(), "grouped assets into bundles");
  Ok(bundles)
}

/// Resolve the bundle name for one asset, or `None` when no rule covers it.
///
/// The winning rule is the one with the longest path prefix of the asset;
/// ties keep the first-declared rule. Dependency-discovered assets must
/// additionally pass the winning rule's suffix filter, and a failed filter
/// is not retried against other rules: the asset counts as unmatched.
pub fn bundle_name(asset: &str, kind: ResourceKind, rules: &mut [Rule]) -> Option<String> {
  let winner = best_rule_index(asset, rules)?;
  let rule = &mut rules[winner];

  if rule.kind == RuleKind::Dependency {
    // Dependency rules accept nothing without an explicit suffix match.
    let extension = asset_extension(asset)?;
    if !rule.suffixes.contains(&extension) {
      return None;
    }
  } else if kind == ResourceKind::Dependency && !rule.matches_suffix(asset) {
    return None;
  }

  let name = match rule.scope {
    RuleScope::All => format!("{}{}", rule.path.trim_end_matches('/'), BUNDLE_SUFFIX),
    RuleScope::Directory => {
      let parent = match asset.rfind('/') {
        Some(position) => &asset[..position],
        None => asset,
      };
      format!("{parent}{BUNDLE_SUFFIX}")
    }
    RuleScope::File => format!("{asset}{BUNDLE_SUFFIX}"),
  };

  rule.match_count += 1;
  Some(name.to_lowercase())
}

fn best_rule_index(asset: &str, rules: &[Rule]) -> Option<usize> {
  let mut best: Option<usize> = None;
  for (index, rule) in rules.iter().enumerate() {
    if !asset.starts_with(&rule.path) {
      continue;
    }
    match best {
      Some(current) if rules[current].path.len() >= rule.path.len() => {}
      _ => best = Some(index),
    }
  }
  best
}
