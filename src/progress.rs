//! Progress-observer seam for the build pipeline.
//!
//! Reporting is fire-and-forget: observers receive a stage name, a human
//! label and a fraction in `[0, 1]`, and there is no delivery contract.
//! The library never prints; the CLI plugs in a terminal bar.

/// Receives progress notifications from pipeline stages.
pub trait ProgressObserver {
  /// Report `fraction` of overall build completion for `stage`.
  fn report(&self, stage: &str, label: &str, fraction: f32);
}

/// Observer that discards every report. Used in tests and library embeddings
/// that do not surface progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
  fn report(&self, _stage: &str, _label: &str, _fraction: f32) {}
}

/// Fraction window a pipeline stage occupies within the overall build.
#[derive(Debug, Clone, Copy)]
pub struct StageWindow {
  /// Overall fraction when the stage starts.
  pub start: f32,
  /// Overall fraction when the stage completes.
  pub end: f32,
}

impl StageWindow {
  /// Map a stage-local fraction into the overall build fraction.
  pub fn at(&self, fraction: f32) -> f32 {
    self.start + (self.end - self.start) * fraction.clamp(0.0, 1.0)
  }
}

/// Collecting files from direct rules.
pub const COLLECT_RULE_FILES: StageWindow = StageWindow { start: 0.0, end: 0.2 };
/// Expanding the file set through the dependency oracle.
pub const COLLECT_DEPENDENCIES: StageWindow = StageWindow { start: 0.2, end: 0.4 };
/// Grouping assets into bundles.
pub const COLLECT_BUNDLES: StageWindow = StageWindow { start: 0.4, end: 0.5 };
/// Encoding and writing the manifest tables.
pub const GENERATE_MANIFEST: StageWindow = StageWindow { start: 0.5, end: 0.6 };
/// Compiling the physical bundles.
pub const BUILD_BUNDLES: StageWindow = StageWindow { start: 0.6, end: 0.7 };
/// Clearing stale artifacts from previous builds.
pub const CLEAR_BUNDLES: StageWindow = StageWindow { start: 0.7, end: 0.8 };
/// Building the manifest bundle from the encoded tables.
pub const BUILD_MANIFEST: StageWindow = StageWindow { start: 0.9, end: 1.0 };
