//! # Runtime Module
//!
//! Process startup, the per-kind watch loops and the error backoff policy.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use error_policy::*;
pub use initialization::*;
pub use watch_loop::*;
