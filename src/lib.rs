#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod builder;
pub mod bundle;
pub mod collect;
pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod progress;

pub use builder::{BuildContext, BundleBuilder, classify_assets};
pub use bundle::{ArchiveBundleCompiler, BundleCompiler};
pub use collect::{DependencyOracle, StaticOracle};
pub use config::{BuildConfig, RuleSet};
pub use error::{BuildError, CollaboratorResult, ConfigError};
pub use models::BuildSummary;
pub use progress::{NoopProgress, ProgressObserver};
