//! # AWS Authentication
//!
//! Builds the `SdkConfig` each reconciliation pass uses. The base config is
//! loaded once at startup from the pod's default credential chain (which
//! covers IRSA web identity tokens); a `ProviderConfig` can swap in static
//! credentials from a Secret, assume a role on top and override the endpoint.

use crate::crd::{CredentialsSource, ProviderConfigSpec};
use aws_config::meta::region::RegionProviderChain;
use aws_config::sts::AssumeRoleProvider;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Profile read from a credentials Secret
pub const DEFAULT_PROFILE: &str = "default";

/// Session name used when assuming a role
const SESSION_NAME: &str = "provider-aws";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("credentials profile [{0}] not found")]
    MissingProfile(String),
    #[error("credentials profile [{profile}] has no {key}")]
    MissingKey { profile: String, key: &'static str },
    #[error("credentials source Secret requires credentials.secretRef")]
    MissingSecretRef,
}

/// Load the process-wide base configuration
///
/// `timeout` bounds every AWS operation, retries included. `fallback_region`
/// applies only when the environment and profile name no region.
pub async fn base_config(timeout: Duration, fallback_region: &str) -> SdkConfig {
    let region = RegionProviderChain::default_provider()
        .or_else(Region::new(fallback_region.to_string()));
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(timeout)
                .build(),
        )
        .load()
        .await;
    info!(
        "Loaded AWS base configuration (default region: {})",
        config
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    config
}

/// Static credentials from an AWS shared-credentials (INI) document
pub fn parse_credentials(document: &str, profile: &str) -> Result<Credentials, AuthError> {
    let mut in_profile = false;
    let mut found = false;
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;

    for line in document.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_profile = section.trim() == profile;
            found |= in_profile;
            continue;
        }
        if !in_profile {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "aws_access_key_id" => access_key_id = Some(value),
            "aws_secret_access_key" => secret_access_key = Some(value),
            "aws_session_token" => session_token = Some(value),
            _ => {}
        }
    }

    if !found {
        return Err(AuthError::MissingProfile(profile.to_string()));
    }
    let missing = |key| AuthError::MissingKey {
        profile: profile.to_string(),
        key,
    };
    Ok(Credentials::new(
        access_key_id.ok_or_else(|| missing("aws_access_key_id"))?,
        secret_access_key.ok_or_else(|| missing("aws_secret_access_key"))?,
        session_token,
        None,
        "ProviderConfigSecret",
    ))
}

/// Configuration for one region and `ProviderConfig`
///
/// `secret` is the credentials document referenced by the `ProviderConfig`;
/// it is only consulted when the credentials source is `Secret`.
pub async fn session_config(
    base: &SdkConfig,
    spec: &ProviderConfigSpec,
    secret: Option<&str>,
    region: &str,
) -> Result<SdkConfig, AuthError> {
    let mut builder = base.to_builder().region(Region::new(region.to_string()));

    match spec.credentials.source {
        CredentialsSource::Irsa | CredentialsSource::InjectedIdentity => {
            debug!("Using the pod's default credential chain");
        }
        CredentialsSource::Secret => {
            let document = secret.ok_or(AuthError::MissingSecretRef)?;
            let credentials = parse_credentials(document, DEFAULT_PROFILE)?;
            builder = builder.credentials_provider(SharedCredentialsProvider::new(credentials));
        }
    }

    if let Some(endpoint) = &spec.endpoint {
        debug!("Routing AWS requests to {}", endpoint.url);
        builder = builder.endpoint_url(&endpoint.url);
    }

    let config = builder.build();
    let Some(role_arn) = &spec.assume_role_arn else {
        return Ok(config);
    };

    debug!("Assuming role {}", role_arn);
    let provider = AssumeRoleProvider::builder(role_arn)
        .session_name(SESSION_NAME)
        .configure(&config)
        .build()
        .await;
    Ok(config
        .to_builder()
        .credentials_provider(SharedCredentialsProvider::new(provider))
        .build())
}
