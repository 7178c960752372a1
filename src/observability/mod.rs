//! # Observability
//!
//! Prometheus metrics for the provider. Logging goes through `tracing` and is
//! configured in `runtime::initialization`.

pub mod metrics;
