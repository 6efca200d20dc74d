//! Bundle compilation seam and stale-artifact housekeeping.

pub mod clean;
pub mod compiler;

pub use clean::{CleanReport, clear_stale_artifacts};
pub use compiler::{ArchiveBundleCompiler, BundleCompiler};
