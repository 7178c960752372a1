use crate::controller::reference::{Extractor, ReferenceError, ResolveReferences, Resolver};
use crate::crd::common::{Reference, ResourceSpec, Selector, Tag};
use crate::crd::ec2::Vpc;
use crate::crd::managed::impl_managed;
use crate::crd::status::Condition;
use async_trait::async_trait;
use kube::api::ApiResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An internet gateway, optionally attached to a VPC
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "InternetGateway",
    group = "ec2.aws.microscaler.io",
    version = "v1beta1",
    status = "InternetGatewayStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"ID", "type":"string", "jsonPath":".metadata.annotations.managed\\.microscaler\\.io/external-name"}, {"name":"VPC", "type":"string", "jsonPath":".spec.forProvider.vpcId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InternetGatewaySpec {
    pub for_provider: InternetGatewayParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

/// Desired state of an internet gateway
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InternetGatewayParameters {
    pub region: String,
    /// VPC the gateway is attached to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id_selector: Option<Selector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Observed state of an internet gateway
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InternetGatewayObservation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<InternetGatewayAttachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InternetGatewayAttachment {
    /// attaching, attached, detaching or detached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InternetGatewayStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<InternetGatewayObservation>,
}

impl_managed!(InternetGateway);

#[async_trait]
impl ResolveReferences for InternetGateway {
    async fn resolve_references(&mut self, resolver: &Resolver<'_>) -> Result<(), ReferenceError> {
        let p = &mut self.spec.for_provider;
        resolver
            .resolve_field(
                &mut p.vpc_id,
                &mut p.vpc_id_ref,
                p.vpc_id_selector.as_ref(),
                ApiResource::erase::<Vpc>(&()),
                Extractor::ExternalName,
            )
            .await
    }
}
