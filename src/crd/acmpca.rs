//! # ACM Private CA Kinds
//!
//! `acmpca.aws.microscaler.io/v1beta1`: CertificateAuthority and
//! CertificateAuthorityPermission.

use crate::constants::ACM_SERVICE_PRINCIPAL;
use crate::controller::reference::{Extractor, ReferenceError, ResolveReferences, Resolver};
use crate::crd::common::{Reference, ResourceSpec, Selector, Tag};
use crate::crd::managed::impl_managed;
use crate::crd::status::Condition;
use async_trait::async_trait;
use kube::api::ApiResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A private certificate authority
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "CertificateAuthority",
    group = "acmpca.aws.microscaler.io",
    version = "v1beta1",
    status = "CertificateAuthorityStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"Status", "type":"string", "jsonPath":".status.atProvider.status"}, {"name":"Type", "type":"string", "jsonPath":".spec.forProvider.type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthoritySpec {
    pub for_provider: CertificateAuthorityParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

/// Desired state of a private CA
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthorityParameters {
    pub region: String,
    /// ROOT or SUBORDINATE
    #[serde(rename = "type")]
    pub r#type: String,
    pub certificate_authority_configuration: CertificateAuthorityConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_configuration: Option<RevocationConfiguration>,
    /// Days (7-30) the CA is restorable after deletion; AWS defaults to 30
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permanent_deletion_time_in_days: Option<i32>,
    /// ACTIVE or DISABLED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthorityConfiguration {
    /// RSA_2048, RSA_4096, EC_prime256v1 or EC_secp384r1
    pub key_algorithm: String,
    /// SHA256WITHRSA, SHA256WITHECDSA, ...
    pub signing_algorithm: String,
    pub subject: Subject,
}

/// Distinguished name of the CA
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub common_name: String,
    pub country: String,
    pub organization: String,
    pub organizational_unit: String,
    pub state: String,
    pub locality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinguished_name_qualifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_qualifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pseudonym: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevocationConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crl_configuration: Option<CrlConfiguration>,
}

/// Certificate revocation list published to S3
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrlConfiguration {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_cname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_in_days: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket_name: Option<String>,
}

/// Observed state of a private CA
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthorityObservation {
    #[serde(rename = "certificateAuthorityARN", skip_serializing_if = "Option::is_none")]
    pub certificate_authority_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// CREATING, PENDING_CERTIFICATE, ACTIVE, DELETED, DISABLED, EXPIRED or FAILED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthorityStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<CertificateAuthorityObservation>,
}

impl_managed!(CertificateAuthority);

#[async_trait]
impl ResolveReferences for CertificateAuthority {
    async fn resolve_references(&mut self, _resolver: &Resolver<'_>) -> Result<(), ReferenceError> {
        Ok(())
    }
}

/// Grants a service principal (ACM by default) permissions on a private CA
///
/// The external name is `<principal>/<CA ARN>`.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "CertificateAuthorityPermission",
    group = "acmpca.aws.microscaler.io",
    version = "v1beta1",
    status = "CertificateAuthorityPermissionStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"Principal", "type":"string", "jsonPath":".spec.forProvider.principal"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthorityPermissionSpec {
    pub for_provider: CertificateAuthorityPermissionParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

fn default_principal() -> String {
    ACM_SERVICE_PRINCIPAL.to_string()
}

/// Desired state of a CA permission
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthorityPermissionParameters {
    pub region: String,
    #[serde(rename = "certificateAuthorityARN", skip_serializing_if = "Option::is_none")]
    pub certificate_authority_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_arn_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_arn_selector: Option<Selector>,
    /// Service principal receiving the permissions
    #[serde(default = "default_principal")]
    pub principal: String,
    /// Account expected to call the principal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
}

impl Default for CertificateAuthorityPermissionParameters {
    fn default() -> Self {
        Self {
            region: String::new(),
            certificate_authority_arn: None,
            certificate_authority_arn_ref: None,
            certificate_authority_arn_selector: None,
            principal: default_principal(),
            source_account: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthorityPermissionStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl_managed!(CertificateAuthorityPermission);

#[async_trait]
impl ResolveReferences for CertificateAuthorityPermission {
    async fn resolve_references(&mut self, resolver: &Resolver<'_>) -> Result<(), ReferenceError> {
        let p = &mut self.spec.for_provider;
        resolver
            .resolve_field(
                &mut p.certificate_authority_arn,
                &mut p.certificate_authority_arn_ref,
                p.certificate_authority_arn_selector.as_ref(),
                ApiResource::erase::<CertificateAuthority>(&()),
                Extractor::ExternalName,
            )
            .await
    }
}
