//! Collection of directly ruled files, with nested-rule overlap resolution.

use std::collections::BTreeSet;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::BuildError;
use crate::models::{Rule, RuleKind};
use crate::progress::{COLLECT_RULE_FILES, ProgressObserver};

/// Walk every direct rule's subtree and return the set of directly ruled
/// files, in rule-relative forward-slash form.
///
/// Nested direct rules own their subtrees: a file under a more specific
/// rule's path is excluded from the broader parent rule's walk. The ignore
/// lists are recomputed from scratch on every call because they depend on
/// the full rule set.
pub fn collect_ruled_files(
  rules: &mut [Rule],
  source_root: &Path,
  progress: &dyn ProgressObserver,
) -> Result<BTreeSet<String>, BuildError> {
  compute_ignored_subpaths(rules);

  let mut files = BTreeSet::new();
  let rule_count = rules.iter().filter(|rule| rule.kind == RuleKind::Direct).count();
  let mut walked = 0usize;

  for rule in rules.iter().filter(|rule| rule.kind == RuleKind::Direct) {
    progress.report(
      "collect",
      &rule.path,
      COLLECT_RULE_FILES.at(walked as f32 / rule_count.max(1) as f32),
    );
    walked += 1;

    let base = rule.path.trim_end_matches('/');
    let root = source_root.join(base);
    if root.is_file() {
      // A file-scoped rule may name a single file rather than a directory.
      if rule.matches_suffix(&rule.path) {
        files.insert(base.to_string());
      }
      continue;
    }

    for entry in WalkDir::new(&root) {
      let entry = entry.map_err(|err| {
        let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
        BuildError::Io { path, source: err.into() }
      })?;
      if !entry.file_type().is_file() {
        continue;
      }

      let relative = match entry.path().strip_prefix(&root) {
        Ok(relative) => relative,
        Err(_) => continue,
      };
      let asset = format!("{}/{}", base, relative.to_string_lossy().replace('\\', "/"));

      if !rule.matches_suffix(&asset) {
        continue;
      }
      if is_ignored(&rule.ignored_subpaths, &asset) {
        continue;
      }

      files.insert(asset);
    }
  }

  progress.report("collect", "done", COLLECT_RULE_FILES.end);
  tracing::debug!(files = files.len(), "collected directly ruled files");
  Ok(files)
}

/// Whether `asset` falls under any of the listed subpaths.
pub fn is_ignored(ignored_subpaths: &[String], asset: &str) -> bool {
  ignored_subpaths
    .iter()
    .any(|subpath| !subpath.is_empty() && asset.starts_with(subpath.as_str()))
}

fn compute_ignored_subpaths(rules: &mut [Rule]) {
  let direct_paths: Vec<String> = rules
    .iter()
    .filter(|rule| rule.kind == RuleKind::Direct)
    .map(|rule| rule.path.clone())
    .collect();

  for rule in rules.iter_mut() {
    rule.ignored_subpaths.clear();
    if rule.kind != RuleKind::Direct {
      continue;
    }
    for other in &direct_paths {
      if other != &rule.path && other.starts_with(&rule.path) {
        rule.ignored_subpaths.push(other.clone());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::RuleScope;
  use crate::progress::NoopProgress;
  use std::fs;
  use tempfile::tempdir;

  fn direct_rule(path: &str, suffix: &[&str]) -> Rule {
    Rule {
      scope: RuleScope::All,
      path: path.into(),
      kind: RuleKind::Direct,
      suffixes: suffix.iter().map(|s| s.to_string()).collect(),
      ignored_subpaths: Vec::new(),
      match_count: 0,
    }
  }

  fn write_file(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"asset").unwrap();
  }

  #[test]
  fn collects_suffix_filtered_files_under_a_rule() {
    let temp = tempdir().unwrap();
    write_file(temp.path(), "models/a.prefab");
    write_file(temp.path(), "models/nested/b.prefab");
    write_file(temp.path(), "models/readme.txt");

    let mut rules = vec![direct_rule("models/", &[".prefab"])];
    let files = collect_ruled_files(&mut rules, temp.path(), &NoopProgress).unwrap();

    let expected: BTreeSet<String> =
      ["models/a.prefab", "models/nested/b.prefab"].iter().map(|s| s.to_string()).collect();
    assert_eq!(files, expected);
  }

  #[test]
  fn nested_rule_owns_its_subtree() {
    let temp = tempdir().unwrap();
    write_file(temp.path(), "a/top.prefab");
    write_file(temp.path(), "a/b/owned.prefab");
    write_file(temp.path(), "a/b/deep/also_owned.prefab");

    let mut rules = vec![direct_rule("a/", &[".prefab"]), direct_rule("a/b/", &[".prefab"])];
    let files = collect_ruled_files(&mut rules, temp.path(), &NoopProgress).unwrap();

    // The parent rule must not re-collect files the nested rule owns, but
    // the union still contains them once via the nested rule's own walk.
    assert_eq!(rules[0].ignored_subpaths, vec!["a/b/".to_string()]);
    assert!(rules[1].ignored_subpaths.is_empty());
    assert!(files.contains("a/top.prefab"));
    assert!(files.contains("a/b/owned.prefab"));
    assert!(files.contains("a/b/deep/also_owned.prefab"));
    assert_eq!(files.len(), 3);
  }

  #[test]
  fn ignore_lists_are_recomputed_per_run() {
    let temp = tempdir().unwrap();
    write_file(temp.path(), "a/top.prefab");

    let mut rules = vec![direct_rule("a/", &[".prefab"])];
    rules[0].ignored_subpaths.push("stale/".into());

    collect_ruled_files(&mut rules, temp.path(), &NoopProgress).unwrap();
    assert!(rules[0].ignored_subpaths.is_empty());
  }

  #[test]
  fn dependency_rules_never_drive_a_walk() {
    let temp = tempdir().unwrap();
    write_file(temp.path(), "shared/tex.png");

    let mut rules = vec![Rule {
      kind: RuleKind::Dependency,
      ..direct_rule("shared/", &[".png"])
    }];
    let files = collect_ruled_files(&mut rules, temp.path(), &NoopProgress).unwrap();
    assert!(files.is_empty());
  }

  #[test]
  fn empty_suffix_set_collects_every_file() {
    let temp = tempdir().unwrap();
    write_file(temp.path(), "data/one.bin");
    write_file(temp.path(), "data/two.txt");

    let mut rules = vec![direct_rule("data/", &[])];
    let files = collect_ruled_files(&mut rules, temp.path(), &NoopProgress).unwrap();
    assert_eq!(files.len(), 2);
  }

  #[test]
  fn file_scoped_rule_can_name_a_single_file() {
    let temp = tempdir().unwrap();
    write_file(temp.path(), "single/one.prefab");

    let mut rules = vec![direct_rule("single/one.prefab", &[".prefab"])];
    let files = collect_ruled_files(&mut rules, temp.path(), &NoopProgress).unwrap();
    assert!(files.contains("single/one.prefab"));
  }

  #[test]
  fn sibling_rules_collapse_duplicates_through_the_set_union() {
    let temp = tempdir().unwrap();
    write_file(temp.path(), "models/a.prefab");

    // Two sibling rules over the same tree are a configuration smell, but
    // the collector still yields each file once.
    let mut rules = vec![direct_rule("models/", &[".prefab"]), direct_rule("models/a.prefab", &[".prefab"])];
    let files = collect_ruled_files(&mut rules, temp.path(), &NoopProgress).unwrap();
    assert_eq!(files.len(), 1);
  }
}
