//! Manifest table encoding and replace-semantics file output.
//!
//! The three binary tables (resource index, bundle membership, dependency
//! chains) are the durable on-disk contract consumed by the runtime loader.
//! Each table has a parallel plain-text rendering for human diffing.

pub mod encoding;
pub mod writing;

pub use encoding::{
  DecodeError, ManifestTables, assign_asset_ids, decode_bundle_table, decode_dependency_table,
  decode_resource_table, encode_manifest,
};
pub use writing::{TableFiles, write_tables};
