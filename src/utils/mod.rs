//! # Utility Modules
//!
//! Supporting utilities for compression, logging and metrics.
//!
//! ## Components
//! - **Compression**: zlib with a decompressed size limit
//! - **Logging**: `tracing-subscriber` setup from [`crate::config::LoggingConfig`]
//! - **Metrics**: Thread-safe observability counters
//!
//! ## Safety Limits
//! - Decompression bomb protection (8 MiB, the maximum packet body)

pub mod compression;
pub mod logging;
pub mod metrics;

pub use metrics::{global_metrics, Metrics, MetricsSnapshot};
