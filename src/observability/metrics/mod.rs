//! # Metrics Module
//!
//! Prometheus metrics for monitoring the provider, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text encoding
//! - `controller_metrics` - Reconciliation metrics (per kind), requeues and AWS calls

pub mod controller_metrics;
pub mod registry;

pub use controller_metrics::*;
pub use registry::*;
