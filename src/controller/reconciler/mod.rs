//! # Reconciler
//!
//! The managed-resource reconciliation engine and the seams it talks through:
//! per-kind [`ExternalClient`]s, the [`ManagedStore`], and the
//! [`ConnectionPublisher`].

pub mod error;
mod policies;
pub mod publisher;
pub mod reconcile;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::*;
pub use policies::ManagementPolicies;
pub use publisher::*;
pub use reconcile::Engine;
pub use store::*;
pub use types::*;
