//! # Provider Configuration
//!
//! `ProviderConfig` selects the AWS credentials, optional role assumption and
//! optional endpoint override used for the managed resources that reference it.

use crate::crd::common::SecretKeySelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProviderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: aws.microscaler.io/v1beta1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   credentials:
///     source: IRSA
///   assumeRoleARN: arn:aws:iam::123456789012:role/provider-aws
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfig",
    group = "aws.microscaler.io",
    version = "v1beta1",
    status = "ProviderConfigStatus",
    shortname = "pc",
    printcolumn = r#"{"name":"Source", "type":"string", "jsonPath":".spec.credentials.source"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Where the AWS credentials come from
    pub credentials: ProviderCredentials,
    /// IAM role assumed on top of the base credentials
    #[serde(default, rename = "assumeRoleARN", skip_serializing_if = "Option::is_none")]
    pub assume_role_arn: Option<String>,
    /// Endpoint override for every AWS service (LocalStack and similar)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointConfig>,
}

/// AWS credential source
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub source: CredentialsSource,
    /// Secret key holding an AWS shared-credentials (INI) profile
    /// Required when `source` is `Secret`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
}

/// Credential sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum CredentialsSource {
    /// IAM Roles for Service Accounts (web identity token from the pod)
    #[serde(rename = "IRSA")]
    Irsa,
    /// Static credentials read from a Kubernetes Secret
    Secret,
    /// Whatever the default credential chain of the pod provides
    InjectedIdentity,
}

/// Custom AWS endpoint
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    /// Base URL used for every service, e.g. `http://localstack:4566`
    pub url: String,
}

/// ProviderConfig status
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigStatus {
    /// Number of managed resources last seen using this config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<i64>,
}
