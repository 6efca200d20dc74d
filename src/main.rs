//! `rulepack` command line entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use rulepack_bundler::bundle::ArchiveBundleCompiler;
use rulepack_bundler::collect::StaticOracle;
use rulepack_bundler::config::{BuildConfig, DEFAULT_SETTINGS_FILE};
use rulepack_bundler::progress::ProgressObserver;
use rulepack_bundler::{BuildContext, BundleBuilder};

#[derive(Parser)]
#[command(name = "rulepack", version, about = "Pack rule-described assets into bundles")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run the full collection, manifest and bundle build.
  Build {
    /// Rule-set file driving the build.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
    /// JSON sidecar mapping asset paths to their direct references.
    #[arg(long)]
    dependencies: Option<PathBuf>,
    /// Override the platform subdirectory name.
    #[arg(long)]
    platform: Option<String>,
  },
  /// Load and validate a rule set without building anything.
  Check {
    /// Rule-set file to validate.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
  },
}

struct BarProgress {
  bar: ProgressBar,
}

impl BarProgress {
  fn new() -> Self {
    let bar = ProgressBar::new(100);
    bar.set_style(
      ProgressStyle::default_bar()
        .template("[{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    Self { bar }
  }

  fn finish(&self) {
    self.bar.finish_and_clear();
  }
}

impl ProgressObserver for BarProgress {
  fn report(&self, stage: &str, label: &str, fraction: f32) {
    self.bar.set_position((fraction * 100.0) as u64);
    self.bar.set_message(format!("{stage}: {label}"));
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  match Cli::parse().command {
    Command::Build { settings, dependencies, platform } => build(settings, dependencies, platform),
    Command::Check { settings } => check(settings),
  }
}

fn build(
  settings: PathBuf,
  dependencies: Option<PathBuf>,
  platform: Option<String>,
) -> Result<()> {
  let mut config = BuildConfig::load(&settings)
    .with_context(|| format!("failed to load rule set {}", settings.display()))?;
  if let Some(platform) = platform {
    config.platform = platform;
  }
  let rule_set = config.validate().context("rule set validation failed")?;

  let oracle = match dependencies {
    Some(path) => StaticOracle::load_from_path(&path)
      .with_context(|| format!("failed to load dependency sidecar {}", path.display()))?,
    None => StaticOracle::default(),
  };
  let compiler = ArchiveBundleCompiler::new(rule_set.source_root.clone());
  let progress = BarProgress::new();

  let mut builder = BundleBuilder::new(BuildContext {
    rule_set,
    oracle: &oracle,
    compiler: &compiler,
    progress: &progress,
  });
  let result = builder.build();
  progress.finish();

  let summary = result?;
  println!(
    "built {} bundle(s) from {} asset(s), {} dependency chain(s) -> {}",
    summary.bundle_count,
    summary.asset_count,
    summary.chain_count,
    summary.build_dir.display()
  );
  Ok(())
}

fn check(settings: PathBuf) -> Result<()> {
  let config = BuildConfig::load(&settings)
    .with_context(|| format!("failed to load rule set {}", settings.display()))?;
  let rule_set = config.validate().context("rule set validation failed")?;
  println!(
    "rule set ok: {} rule(s), build root {}",
    rule_set.rules.len(),
    rule_set.build_root
  );
  Ok(())
}
