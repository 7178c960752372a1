use crate::controller::reference::{Extractor, ReferenceError, ResolveReferences, Resolver};
use crate::crd::common::{Reference, ResourceSpec, Selector, Tag};
use crate::crd::ec2::{Address, Subnet};
use crate::crd::managed::impl_managed;
use crate::crd::status::Condition;
use async_trait::async_trait;
use kube::api::ApiResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A NAT gateway
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "NATGateway",
    struct = "NatGateway",
    group = "ec2.aws.microscaler.io",
    version = "v1beta1",
    status = "NatGatewayStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"ID", "type":"string", "jsonPath":".metadata.annotations.managed\\.microscaler\\.io/external-name"}, {"name":"State", "type":"string", "jsonPath":".status.atProvider.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewaySpec {
    pub for_provider: NatGatewayParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

/// Desired state of a NAT gateway
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewayParameters {
    pub region: String,
    /// Allocation id of the Elastic IP; required for public gateways
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_id_selector: Option<Selector>,
    /// `public` or `private`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id_selector: Option<Selector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Observed state of a NAT gateway
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewayObservation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id: Option<String>,
    /// pending, failed, available, deleting or deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<NatGatewayAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewayAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interface_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewayStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<NatGatewayObservation>,
}

impl_managed!(NatGateway);

#[async_trait]
impl ResolveReferences for NatGateway {
    async fn resolve_references(&mut self, resolver: &Resolver<'_>) -> Result<(), ReferenceError> {
        let p = &mut self.spec.for_provider;
        resolver
            .resolve_field(
                &mut p.allocation_id,
                &mut p.allocation_id_ref,
                p.allocation_id_selector.as_ref(),
                ApiResource::erase::<Address>(&()),
                Extractor::AtProvider("allocationId"),
            )
            .await?;
        resolver
            .resolve_field(
                &mut p.subnet_id,
                &mut p.subnet_id_ref,
                p.subnet_id_selector.as_ref(),
                ApiResource::erase::<Subnet>(&()),
                Extractor::ExternalName,
            )
            .await
    }
}
