//! Asset discovery: rule-driven collection, transitive dependency
//! resolution and bundle grouping.

pub mod bundles;
pub mod dependencies;
pub mod rules;

pub use bundles::group_into_bundles;
pub use dependencies::{DependencyOracle, StaticOracle, resolve_dependencies};
pub use rules::collect_ruled_files;
