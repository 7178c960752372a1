//! # Controller
//!
//! The managed-resource engine and the building blocks handlers use.
//!
//! - `reconciler` - the per-resource state machine and its seams
//! - `reference` - binds `Ref`/`Selector` fields to external identifiers
//! - `lateinit` - copies server defaults into empty spec fields
//! - `jsonpatch` - sparse desired-vs-current diff for drift checks
//! - `backoff` - per-resource error backoff
//! - `server` - metrics and probe endpoints

pub mod backoff;
pub mod jsonpatch;
pub mod lateinit;
pub mod reconciler;
pub mod reference;
pub mod server;
