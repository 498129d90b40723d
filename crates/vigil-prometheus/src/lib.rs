//! Prometheus metrics backend for vigil coordinated tasks.
//!
//! This crate provides a [`PrometheusMetrics`] implementation of [`vigil_core::MetricsBackend`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use vigil_core::MetricsHandle;
//! use vigil_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: MetricsHandle = Arc::new(metrics.clone());
//! // CoordinatedTask::new(..)?.with_metrics(handle)
//! # drop(handle);
//! let body = metrics.encode()?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `vigil_cycles_total{lock, outcome}` - Counter
//! - `vigil_cycle_duration_seconds{lock}` - Histogram
//! - `vigil_lock_contention_total{lock}` - Counter
//! - `vigil_lock_store_errors_total{lock}` - Counter
//!
//! Serving `/metrics` is left to the HTTP layer (`vigil-server` mounts it).

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
