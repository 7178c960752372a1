//! # Connection Publisher
//!
//! Writes connection details (endpoints, addresses, identifiers) to the Secret
//! named by `spec.writeConnectionSecretToRef`. Values are never logged.

use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::{ConnectionDetails, ReconcilerError};
use crate::crd::SecretReference;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::{ObjectMeta, Patch, PatchParams};
use kube::{Api, Client};
use std::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait ConnectionPublisher: Send + Sync {
    async fn publish(
        &self,
        secret: &SecretReference,
        owner: Option<OwnerReference>,
        details: &ConnectionDetails,
    ) -> Result<(), ReconcilerError>;
}

/// Publishes into Kubernetes Secrets with server-side apply
pub struct SecretPublisher {
    client: Client,
}

impl std::fmt::Debug for SecretPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretPublisher").finish_non_exhaustive()
    }
}

impl SecretPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Secret holding `details`, owned by the managed resource
pub fn connection_secret(
    secret: &SecretReference,
    owner: Option<OwnerReference>,
    details: &ConnectionDetails,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(secret.name.clone()),
            namespace: Some(secret.namespace.clone()),
            owner_references: owner.map(|o| vec![o]),
            ..Default::default()
        },
        data: Some(
            details
                .iter()
                .map(|(key, value)| (key.clone(), ByteString(value.clone())))
                .collect(),
        ),
        type_: Some("connection.microscaler.io/v1alpha1".to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ConnectionPublisher for SecretPublisher {
    async fn publish(
        &self,
        secret: &SecretReference,
        owner: Option<OwnerReference>,
        details: &ConnectionDetails,
    ) -> Result<(), ReconcilerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &secret.namespace);
        let object = connection_secret(secret, owner, details);
        api.patch(
            &secret.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&object),
        )
        .await?;
        debug!(
            "Published {} connection detail(s) to {}/{}",
            details.len(),
            secret.namespace,
            secret.name
        );
        Ok(())
    }
}

/// Discards connection details
#[derive(Debug, Default)]
pub struct NoopPublisher;

#[async_trait]
impl ConnectionPublisher for NoopPublisher {
    async fn publish(
        &self,
        _secret: &SecretReference,
        _owner: Option<OwnerReference>,
        _details: &ConnectionDetails,
    ) -> Result<(), ReconcilerError> {
        Ok(())
    }
}

/// Records what was published; used by tests
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    published: Mutex<Vec<(String, ConnectionDetails)>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(secret name, details)` in publication order
    pub fn published(&self) -> Vec<(String, ConnectionDetails)> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConnectionPublisher for InMemoryPublisher {
    async fn publish(
        &self,
        secret: &SecretReference,
        _owner: Option<OwnerReference>,
        details: &ConnectionDetails,
    ) -> Result<(), ReconcilerError> {
        if let Ok(mut published) = self.published.lock() {
            published.push((secret.name.clone(), details.clone()));
        }
        Ok(())
    }
}
