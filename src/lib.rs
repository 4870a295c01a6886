//! # Plugin Profiler
//!
//! Finds the WordPress plugins that slow a site down:
//! - one isolated homepage fetch per installed plugin
//! - the original activation set restored on every exit path
//! - a durable snapshot journal so a killed run can be recovered
//! - table, JSON and CSV reports

pub mod backend;
pub mod config;
pub mod metrics;
pub mod report;
pub mod utils;

pub use homepage_probe;
pub use latency_profiler;
pub use plugin_registry;

pub use backend::{build_profiler, build_registry, SiteProfiler};
pub use config::ProfilerConfig;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
