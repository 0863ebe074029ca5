//! Log output for Rivulet networks.
//!
//! The runtime logs through `tracing`. Every runner executes inside a
//! `component` span carrying the component name and type, and `Network::go`
//! opens a `network` span. This module installs a subscriber for binaries
//! and tests that want to see that output.
//!
//! # Configuration
//!
//! Logging format is controlled via `RIVULET_LOG_FORMAT`:
//! - `json` - Structured JSON output
//! - `pretty` - Human-readable multi-line output (default for a TTY)
//! - `compact` - Compact single-line output
//!
//! # Example
//!
//! ```ignore
//! use rivulet_executor::observability::{TracingConfig, init_tracing};
//!
//! init_tracing(TracingConfig::builder().log_filter("debug").build())?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::init_tracing;

/// Create the span a runner executes in.
#[macro_export]
macro_rules! component_span {
    ($name:expr, $type_name:expr) => {
        tracing::info_span!("component", name = %$name, component_type = %$type_name)
    };
}
