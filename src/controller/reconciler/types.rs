//! # Engine Types
//!
//! The contract between the reconciliation engine and per-kind handlers.

use crate::controller::reconciler::ReconcilerError;
use crate::crd::Managed;
use async_trait::async_trait;
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use std::time::Duration;

/// Opaque key/value pairs published to the connection Secret
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// What `observe` learned about the external resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    /// The handler filled server defaults into the spec
    pub resource_late_initialized: bool,
    pub connection_details: ConnectionDetails,
}

impl ExternalObservation {
    /// The external resource does not exist
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn exists(up_to_date: bool) -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            ..Default::default()
        }
    }

    pub fn late_initialized(mut self, late_initialized: bool) -> Self {
        self.resource_late_initialized = late_initialized;
        self
    }

    pub fn with_connection_details(mut self, details: ConnectionDetails) -> Self {
        self.connection_details = details;
        self
    }
}

/// Result of a successful create
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCreation {
    /// Identifier AWS assigned; the engine writes it to the external-name annotation
    pub external_name: Option<String>,
    pub connection_details: ConnectionDetails,
}

impl ExternalCreation {
    pub fn named(external_name: impl Into<String>) -> Self {
        Self {
            external_name: Some(external_name.into()),
            ..Default::default()
        }
    }
}

/// Result of a successful update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// Per-kind external operations
///
/// Handlers may set `Ready` conditions and `status.atProvider` on the resource
/// they receive. Spec writes are limited to late initialization during
/// `observe` and to clearing one-shot flags during `update`.
#[async_trait]
pub trait ExternalClient<K: Managed>: Send + Sync {
    async fn observe(&self, mg: &mut K) -> Result<ExternalObservation, ReconcilerError>;

    async fn create(&self, mg: &mut K) -> Result<ExternalCreation, ReconcilerError>;

    async fn update(&self, mg: &mut K) -> Result<ExternalUpdate, ReconcilerError>;

    /// Must tolerate an external resource that is already gone
    async fn delete(&self, mg: &mut K) -> Result<(), ReconcilerError>;

    /// External name of the resource a create collided with
    ///
    /// Called when `create` fails with an already-exists error. `None` means
    /// the existing resource cannot be identified from `mg` alone.
    async fn find_existing(&self, _mg: &K) -> Result<Option<String>, ReconcilerError> {
        Ok(None)
    }
}

/// Builds an [`ExternalClient`] for one reconciliation pass
#[async_trait]
pub trait Connector<K: Managed>: Send + Sync {
    async fn connect(&self, mg: &K) -> Result<Box<dyn ExternalClient<K>>, ReconcilerError>;
}

/// What the runtime should do after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Reconcile again after `after`; `reason` labels the requeue metric
    Requeue {
        after: Duration,
        reason: &'static str,
    },
    /// Nothing left to do until the object changes
    AwaitChange,
}

impl ReconcileOutcome {
    pub fn requeue(after: Duration, reason: &'static str) -> Self {
        ReconcileOutcome::Requeue { after, reason }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ReconcileOutcome::Requeue { reason, .. } => Some(reason),
            ReconcileOutcome::AwaitChange => None,
        }
    }
}

impl From<ReconcileOutcome> for Action {
    fn from(outcome: ReconcileOutcome) -> Self {
        match outcome {
            ReconcileOutcome::Requeue { after, .. } => Action::requeue(after),
            ReconcileOutcome::AwaitChange => Action::await_change(),
        }
    }
}

/// Requeue intervals used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub poll_interval: Duration,
    pub short_wait: Duration,
    pub create_requeue: Duration,
}

impl From<&crate::config::ControllerConfig> for Timing {
    fn from(config: &crate::config::ControllerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            short_wait: config.short_wait,
            create_requeue: config.create_requeue,
        }
    }
}
