// Library exports for the markmap-kit binary and integration tests.
//
// The extraction, bridge and config layers live in their own workspace
// crates and are re-exported here so callers need a single dependency.

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod debug;
pub mod pipeline;

pub use markmap_kit_bridge as bridge;
pub use markmap_kit_config as config;
pub use markmap_kit_extract as extract;
