//! Binary manifest table encoding and decoding.
//!
//! All integers are little-endian fixed width: counts and asset IDs are
//! `u16`, strings are a `u16` byte length followed by UTF-8 text. The
//! format must stay byte-stable across builds of the same rule set so the
//! emitted tables can be diffed.

use std::collections::BTreeMap;

use crate::error::BuildError;
use crate::models::{
  BundleTable, DependencyMap, MAX_ASSET_COUNT, MAX_CHAIN_LENGTH, ResourceKind,
};

/// The three encoded manifest tables plus their plain-text mirrors.
#[derive(Debug, Clone)]
pub struct ManifestTables {
  /// Resource index: asset ID to path, in ID order.
  pub resource_binary: Vec<u8>,
  /// One `"{id} {path}"` line per resource.
  pub resource_text: String,
  /// Bundle membership: per bundle, its name and member asset IDs.
  pub bundle_binary: Vec<u8>,
  /// Per bundle, its name followed by one tab-indented member line.
  pub bundle_text: String,
  /// Dependency chains: `[selfID, depID, ...]` per asset with dependencies.
  pub dependency_binary: Vec<u8>,
  /// One `"asset\tdep\tdep"` line per chain.
  pub dependency_text: String,
  /// Number of encoded dependency chains.
  pub chain_count: usize,
}

/// Assign sequential IDs to every asset by lexicographic path order.
///
/// IDs are exactly `0..N-1`; the ID of a path equals its rank in the sorted
/// list of all asset paths. Fails when the total exceeds the 16-bit limit.
pub fn assign_asset_ids(
  assets: &BTreeMap<String, ResourceKind>,
) -> Result<BTreeMap<String, u16>, BuildError> {
  if assets.len() > MAX_ASSET_COUNT {
    return Err(BuildError::Capacity {
      what: "asset count",
      count: assets.len(),
      limit: MAX_ASSET_COUNT,
    });
  }

  Ok(
    assets
      .keys()
      .enumerate()
      .map(|(id, path)| (path.clone(), id as u16))
      .collect(),
  )
}

/// Encode the three manifest tables from the finished pipeline outputs.
pub fn encode_manifest(
  assets: &BTreeMap<String, ResourceKind>,
  bundles: &BundleTable,
  dependencies: &DependencyMap,
) -> Result<ManifestTables, BuildError> {
  let ids = assign_asset_ids(assets)?;

  // Resource table: count, then each path in ID order.
  let mut resource_binary = Vec::new();
  let mut resource_text = String::new();
  write_u16(&mut resource_binary, assets.len() as u16);
  for (path, id) in assets.keys().zip(0u16..) {
    write_string(&mut resource_binary, path)?;
    resource_text.push_str(&format!("{id} {path}\n"));
  }

  // Bundle table. The leading count is the total asset count, a declared
  // capacity for the reader's ID table rather than the bundle count.
  let mut bundle_binary = Vec::new();
  let mut bundle_text = String::new();
  write_u16(&mut bundle_binary, assets.len() as u16);
  for (name, members) in bundles {
    write_string(&mut bundle_binary, name)?;
    write_u16(&mut bundle_binary, members.len() as u16);
    bundle_text.push_str(name);
    bundle_text.push('\n');
    for member in members {
      write_u16(&mut bundle_binary, ids[member]);
      bundle_text.push_str(&format!("\t{member}\n"));
    }
  }

  // Dependency chains: only assets with at least one dependency.
  let mut chains: Vec<Vec<u16>> = Vec::new();
  let mut dependency_text = String::new();
  for (asset, direct) in dependencies {
    if direct.is_empty() {
      continue;
    }

    let mut chain = Vec::with_capacity(direct.len() + 1);
    chain.push(ids[asset]);
    dependency_text.push_str(asset);
    for dependency in direct {
      chain.push(ids[dependency]);
      dependency_text.push_str(&format!("\t{dependency}"));
    }
    dependency_text.push('\n');

    if chain.len() > MAX_CHAIN_LENGTH {
      return Err(BuildError::Capacity {
        what: "dependency chain length",
        count: chain.len(),
        limit: MAX_CHAIN_LENGTH,
      });
    }
    chains.push(chain);
  }

  let mut dependency_binary = Vec::new();
  write_u16(&mut dependency_binary, chains.len() as u16);
  for chain in &chains {
    write_u16(&mut dependency_binary, chain.len() as u16);
    for id in chain {
      write_u16(&mut dependency_binary, *id);
    }
  }

  Ok(ManifestTables {
    resource_binary,
    resource_text,
    bundle_binary,
    bundle_text,
    dependency_binary,
    dependency_text,
    chain_count: chains.len(),
  })
}

/// Decode a resource table back into its ID-ordered path list.
pub fn decode_resource_table(bytes: &[u8]) -> Result<Vec<String>, DecodeError> {
  let mut reader = Reader::new(bytes);
  let count = reader.read_u16()? as usize;
  let mut paths = Vec::with_capacity(count);
  for _ in 0..count {
    paths.push(reader.read_string()?);
  }
  reader.finish()?;
  Ok(paths)
}

/// Decode a bundle table into its declared asset capacity and the ordered
/// bundle membership lists.
pub fn decode_bundle_table(bytes: &[u8]) -> Result<(u16, Vec<(String, Vec<u16>)>), DecodeError> {
  let mut reader = Reader::new(bytes);
  let declared_assets = reader.read_u16()?;
  let mut bundles = Vec::new();
  while !reader.is_empty() {
    let name = reader.read_string()?;
    let member_count = reader.read_u16()? as usize;
    let mut members = Vec::with_capacity(member_count);
    for _ in 0..member_count {
      members.push(reader.read_u16()?);
    }
    bundles.push((name, members));
  }
  Ok((declared_assets, bundles))
}

/// Decode a dependency table into its chains, each `[selfID, depID, ...]`.
pub fn decode_dependency_table(bytes: &[u8]) -> Result<Vec<Vec<u16>>, DecodeError> {
  let mut reader = Reader::new(bytes);
  let chain_count = reader.read_u16()? as usize;
  let mut chains = Vec::with_capacity(chain_count);
  for _ in 0..chain_count {
    let id_count = reader.read_u16()? as usize;
    let mut chain = Vec::with_capacity(id_count);
    for _ in 0..id_count {
      chain.push(reader.read_u16()?);
    }
    chains.push(chain);
  }
  reader.finish()?;
  Ok(chains)
}

/// A malformed or truncated binary table.
#[derive(Debug)]
pub struct DecodeError {
  /// Byte offset the decoder stopped at.
  pub offset: usize,
  /// What went wrong.
  pub reason: &'static str,
}

impl std::fmt::Display for DecodeError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "malformed manifest table at byte {}: {}", self.offset, self.reason)
  }
}

impl std::error::Error for DecodeError {}

fn write_u16(buffer: &mut Vec<u8>, value: u16) {
  buffer.extend_from_slice(&value.to_le_bytes());
}

fn write_string(buffer: &mut Vec<u8>, value: &str) -> Result<(), BuildError> {
  if value.len() > u16::MAX as usize {
    return Err(BuildError::Capacity {
      what: "string byte length",
      count: value.len(),
      limit: u16::MAX as usize,
    });
  }
  write_u16(buffer, value.len() as u16);
  buffer.extend_from_slice(value.as_bytes());
  Ok(())
}

struct Reader<'a> {
  bytes: &'a [u8],
  offset: usize,
}

impl<'a> Reader<'a> {
  fn new(bytes: &'a [u8]) -> Self {
    Self { bytes, offset: 0 }
  }

  fn is_empty(&self) -> bool {
    self.offset >= self.bytes.len()
  }

  fn read_u16(&mut self) -> Result<u16, DecodeError> {
    let end = self.offset + 2;
    let slice = self.bytes.get(self.offset..end).ok_or(DecodeError {
      offset: self.offset,
      reason: "truncated u16",
    })?;
    self.offset = end;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
  }

  fn read_string(&mut self) -> Result<String, DecodeError> {
    let length = self.read_u16()? as usize;
    let end = self.offset + length;
    let slice = self.bytes.get(self.offset..end).ok_or(DecodeError {
      offset: self.offset,
      reason: "truncated string",
    })?;
    let value = std::str::from_utf8(slice).map_err(|_| DecodeError {
      offset: self.offset,
      reason: "string is not valid UTF-8",
    })?;
    self.offset = end;
    Ok(value.to_string())
  }

  fn finish(&self) -> Result<(), DecodeError> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(DecodeError {
        offset: self.offset,
        reason: "trailing bytes after table",
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn universe(paths: &[&str]) -> BTreeMap<String, ResourceKind> {
    paths.iter().map(|p| (p.to_string(), ResourceKind::Direct)).collect()
  }

  fn sample() -> (BTreeMap<String, ResourceKind>, BundleTable, DependencyMap) {
    let assets = universe(&["a/one.prefab", "a/two.png", "b/three.mat"]);
    let mut bundles = BundleTable::new();
    bundles.insert("a.bundle".into(), vec!["a/one.prefab".into(), "a/two.png".into()]);
    bundles.insert("b.bundle".into(), vec!["b/three.mat".into()]);
    let mut dependencies = DependencyMap::new();
    dependencies.insert("a/one.prefab".into(), vec!["a/two.png".into(), "b/three.mat".into()]);
    dependencies.insert("a/two.png".into(), Vec::new());
    (assets, bundles, dependencies)
  }

  #[test]
  fn ids_follow_lexicographic_rank() {
    let assets = universe(&["z.png", "a.png", "m.png"]);
    let ids = assign_asset_ids(&assets).unwrap();
    assert_eq!(ids["a.png"], 0);
    assert_eq!(ids["m.png"], 1);
    assert_eq!(ids["z.png"], 2);
  }

  #[test]
  fn capacity_boundary_is_exact() {
    let at_limit: BTreeMap<String, ResourceKind> =
      (0..MAX_ASSET_COUNT).map(|i| (format!("asset/{i:05}.png"), ResourceKind::Direct)).collect();
    assert!(assign_asset_ids(&at_limit).is_ok());

    let over_limit: BTreeMap<String, ResourceKind> = (0..=MAX_ASSET_COUNT)
      .map(|i| (format!("asset/{i:05}.png"), ResourceKind::Direct))
      .collect();
    let err = assign_asset_ids(&over_limit).unwrap_err();
    match err {
      BuildError::Capacity { what, count, limit } => {
        assert_eq!(what, "asset count");
        assert_eq!(count, 65536);
        assert_eq!(limit, 65535);
      }
      other => panic!("expected Capacity, got {other}"),
    }
  }

  #[test]
  fn resource_table_round_trips() {
    let (assets, bundles, dependencies) = sample();
    let tables = encode_manifest(&assets, &bundles, &dependencies).unwrap();

    let decoded = decode_resource_table(&tables.resource_binary).unwrap();
    let expected: Vec<String> = assets.keys().cloned().collect();
    assert_eq!(decoded, expected);
  }

  #[test]
  fn bundle_table_round_trips_with_declared_capacity() {
    let (assets, bundles, dependencies) = sample();
    let tables = encode_manifest(&assets, &bundles, &dependencies).unwrap();

    let (declared, decoded) = decode_bundle_table(&tables.bundle_binary).unwrap();
    assert_eq!(declared as usize, assets.len());
    assert_eq!(decoded, vec![
      ("a.bundle".to_string(), vec![0u16, 1]),
      ("b.bundle".to_string(), vec![2u16]),
    ]);
  }

  #[test]
  fn dependency_table_round_trips_and_skips_empty_lists() {
    let (assets, bundles, dependencies) = sample();
    let tables = encode_manifest(&assets, &bundles, &dependencies).unwrap();

    let decoded = decode_dependency_table(&tables.dependency_binary).unwrap();
    assert_eq!(decoded, vec![vec![0u16, 1, 2]]);
    assert_eq!(tables.chain_count, 1);
  }

  #[test]
  fn encoding_is_deterministic() {
    let (assets, bundles, dependencies) = sample();
    let first = encode_manifest(&assets, &bundles, &dependencies).unwrap();
    let second = encode_manifest(&assets, &bundles, &dependencies).unwrap();
    assert_eq!(first.resource_binary, second.resource_binary);
    assert_eq!(first.bundle_binary, second.bundle_binary);
    assert_eq!(first.dependency_binary, second.dependency_binary);
  }

  #[test]
  fn text_mirrors_match_binary_content() {
    let (assets, bundles, dependencies) = sample();
    let tables = encode_manifest(&assets, &bundles, &dependencies).unwrap();

    assert_eq!(
      tables.resource_text,
      "0 a/one.prefab\n1 a/two.png\n2 b/three.mat\n"
    );
    assert_eq!(
      tables.bundle_text,
      "a.bundle\n\ta/one.prefab\n\ta/two.png\nb.bundle\n\tb/three.mat\n"
    );
    assert_eq!(tables.dependency_text, "a/one.prefab\ta/two.png\tb/three.mat\n");
  }

  #[test]
  fn truncated_tables_fail_to_decode() {
    let (assets, bundles, dependencies) = sample();
    let tables = encode_manifest(&assets, &bundles, &dependencies).unwrap();

    let truncated = &tables.resource_binary[..tables.resource_binary.len() - 1];
    assert!(decode_resource_table(truncated).is_err());

    assert!(decode_dependency_table(&[0x01]).is_err());
  }
}
