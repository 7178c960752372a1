//! # AWS Connector
//!
//! Resolves a managed resource's `ProviderConfig` into an `SdkConfig` and
//! hands it to a per-kind constructor that builds the handler for the pass.

use crate::controller::reconciler::{Connector, ExternalClient, ReconcilerError};
use crate::crd::{Managed, ProviderConfig, SecretKeySelector};
use crate::provider::aws::auth;
use async_trait::async_trait;
use aws_config::SdkConfig;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::sync::Arc;
use tracing::debug;

/// Kubernetes client plus the base AWS configuration loaded at startup
#[derive(Clone)]
pub struct AwsSession {
    client: Client,
    base: SdkConfig,
}

impl std::fmt::Debug for AwsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSession").finish_non_exhaustive()
    }
}

impl AwsSession {
    pub fn new(client: Client, base: SdkConfig) -> Self {
        Self { client, base }
    }

    async fn secret_value(&self, selector: &SecretKeySelector) -> Result<String, ReconcilerError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &selector.namespace);
        let secret = secrets.get(&selector.name).await?;
        let bytes = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&selector.key))
            .ok_or_else(|| {
                ReconcilerError::Connect(format!(
                    "secret {}/{} has no key {}",
                    selector.namespace, selector.name, selector.key
                ))
            })?;
        String::from_utf8(bytes.0.clone()).map_err(|e| {
            ReconcilerError::Connect(format!(
                "secret {}/{} key {} is not UTF-8: {}",
                selector.namespace, selector.name, selector.key, e
            ))
        })
    }

    /// Configuration for the region and `ProviderConfig` of `mg`
    pub async fn config_for<K: Managed>(&self, mg: &K) -> Result<SdkConfig, ReconcilerError> {
        let name = mg.provider_config_name();
        let configs: Api<ProviderConfig> = Api::all(self.client.clone());
        let provider_config = configs
            .get(name)
            .await
            .map_err(|e| ReconcilerError::Connect(format!("cannot get ProviderConfig {name}: {e}")))?;

        let secret = match &provider_config.spec.credentials.secret_ref {
            Some(selector) => Some(self.secret_value(selector).await?),
            None => None,
        };
        debug!(
            "Connecting to AWS in {} with ProviderConfig {}",
            mg.region(),
            name
        );
        auth::session_config(
            &self.base,
            &provider_config.spec,
            secret.as_deref(),
            mg.region(),
        )
        .await
        .map_err(|e| ReconcilerError::Connect(e.to_string()))
    }
}

/// Builds the handler for one kind from a session configuration
pub type ClientFactory<K> = fn(&SdkConfig) -> Box<dyn ExternalClient<K>>;

/// [`Connector`] shared by every kind
pub struct AwsConnector<K: Managed> {
    session: Arc<AwsSession>,
    build: ClientFactory<K>,
}

impl<K: Managed> std::fmt::Debug for AwsConnector<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConnector").finish_non_exhaustive()
    }
}

impl<K: Managed> AwsConnector<K> {
    pub fn new(session: Arc<AwsSession>, build: ClientFactory<K>) -> Self {
        Self { session, build }
    }
}

#[async_trait]
impl<K: Managed> Connector<K> for AwsConnector<K> {
    async fn connect(&self, mg: &K) -> Result<Box<dyn ExternalClient<K>>, ReconcilerError> {
        let config = self.session.config_for(mg).await?;
        Ok((self.build)(&config))
    }
}
