//! # ACM Kinds
//!
//! `acm.aws.microscaler.io/v1beta1`: Certificate.

use crate::controller::reference::{Extractor, ReferenceError, ResolveReferences, Resolver};
use crate::crd::acmpca::CertificateAuthority;
use crate::crd::common::{Reference, ResourceSpec, Selector, Tag};
use crate::crd::managed::impl_managed;
use crate::crd::status::Condition;
use async_trait::async_trait;
use kube::api::ApiResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An ACM certificate, either Amazon-issued or issued by a private CA
///
/// # Example
///
/// ```yaml
/// apiVersion: acm.aws.microscaler.io/v1beta1
/// kind: Certificate
/// metadata:
///   name: example
/// spec:
///   forProvider:
///     region: us-east-1
///     domainName: example.com
///     validationMethod: DNS
///     tags:
///       - key: Env
///         value: prod
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Certificate",
    group = "acm.aws.microscaler.io",
    version = "v1beta1",
    status = "CertificateStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"Status", "type":"string", "jsonPath":".status.atProvider.status"}, {"name":"Domain", "type":"string", "jsonPath":".spec.forProvider.domainName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    pub for_provider: CertificateParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

/// Desired state of a certificate
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateParameters {
    pub region: String,
    /// Fully qualified domain name to secure
    pub domain_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_alternative_names: Vec<String>,
    /// DNS or EMAIL; ignored for private certificates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_validation_options: Vec<DomainValidationOption>,
    /// Private CA that issues the certificate
    #[serde(rename = "certificateAuthorityARN", skip_serializing_if = "Option::is_none")]
    pub certificate_authority_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_arn_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_arn_selector: Option<Selector>,
    /// ENABLED or DISABLED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_transparency_logging_preference: Option<String>,
    /// RSA_2048, EC_prime256v1, ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_algorithm: Option<String>,
    /// Request renewal of an eligible private certificate; cleared once issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renew_certificate: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Domain that receives the validation email for a domain name
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainValidationOption {
    pub domain_name: String,
    pub validation_domain: String,
}

/// Observed state of a certificate
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateObservation {
    #[serde(rename = "certificateARN", skip_serializing_if = "Option::is_none")]
    pub certificate_arn: Option<String>,
    /// PENDING_VALIDATION, ISSUED, INACTIVE, EXPIRED, VALIDATION_TIMED_OUT, REVOKED or FAILED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// IMPORTED, AMAZON_ISSUED or PRIVATE
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_eligibility: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub in_use_by: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<CertificateObservation>,
}

impl_managed!(Certificate);

#[async_trait]
impl ResolveReferences for Certificate {
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
