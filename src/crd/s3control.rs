//! # S3 Control Kinds
//!
//! `s3control.aws.microscaler.io/v1beta1`: AccessPoint, with its optional
//! access point policy.

use crate::controller::reference::{Extractor, ReferenceError, ResolveReferences, Resolver};
use crate::crd::common::{Reference, ResourceSpec, Selector};
use crate::crd::ec2::Vpc;
use crate::crd::managed::impl_managed;
use crate::crd::status::Condition;
use async_trait::async_trait;
use kube::api::ApiResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An S3 access point
///
/// The external name is the access point name, taken from the resource name
/// at creation.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "AccessPoint",
    group = "s3control.aws.microscaler.io",
    version = "v1beta1",
    status = "AccessPointStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"Bucket", "type":"string", "jsonPath":".spec.forProvider.bucket"}, {"name":"Alias", "type":"string", "jsonPath":".status.atProvider.alias"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AccessPointSpec {
    pub for_provider: AccessPointParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

/// Desired state of an access point
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessPointParameters {
    pub region: String,
    /// Owning account; defaults to the caller's account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Bucket the access point is attached to
    pub bucket: String,
    /// Restricts access to a single VPC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_configuration: Option<VpcConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_access_block_configuration: Option<PublicAccessBlockConfiguration>,
    /// IAM policy document as JSON; removed from AWS when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VpcConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id_selector: Option<Selector>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccessBlockConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_public_acls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_public_policy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_public_acls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict_public_buckets: Option<bool>,
}

/// Observed state of an access point
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessPointObservation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Internet or VPC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_account_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessPointStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<AccessPointObservation>,
}

impl_managed!(AccessPoint);

#[async_trait]
impl ResolveReferences for AccessPoint {
    async fn resolve_references(&mut self, resolver: &Resolver<'_>) -> Result<(), ReferenceError> {
        let Some(vpc) = self.spec.for_provider.vpc_configuration.as_mut() else {
            return Ok(());
        };
        resolver
            .resolve_field(
                &mut vpc.vpc_id,
                &mut vpc.vpc_id_ref,
                vpc.vpc_id_selector.as_ref(),
                ApiResource::erase::<Vpc>(&()),
                Extractor::ExternalName,
            )
            .await
    }
}
