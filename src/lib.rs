//! # AWS Provider
//!
//! Kubernetes controllers that converge AWS infrastructure to declarative
//! managed resources.
//!
//! Each managed kind (ACM certificates, private CAs and their permissions,
//! EC2 networking, S3 bucket policies and S3 access points) gets its own
//! controller. They all share one reconciliation engine that observes the
//! external resource, creates, updates or deletes it, late-initialises
//! unset spec fields and reports `Ready`/`Synced` conditions.
//!
//! ## Layout
//!
//! - [`crd`]: managed resource and `ProviderConfig` types
//! - [`controller`]: the engine, reference resolution, late-init and JSON patch
//! - [`provider`]: per-service AWS clients and diff helpers
//! - [`runtime`]: startup and the kube-runtime watch loops

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod provider;
pub mod runtime;
