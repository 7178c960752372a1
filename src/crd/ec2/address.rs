use crate::controller::reference::{ReferenceError, ResolveReferences, Resolver};
use crate::crd::common::{ResourceSpec, Tag};
use crate::crd::managed::impl_managed;
use crate::crd::status::Condition;
use async_trait::async_trait;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Domain of an Elastic IP address
pub const ADDRESS_DOMAIN_VPC: &str = "vpc";
pub const ADDRESS_DOMAIN_STANDARD: &str = "standard";

/// An Elastic IP address
///
/// The external name is the allocation id for `vpc` addresses and the public
/// IP for `standard` addresses.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Address",
    group = "ec2.aws.microscaler.io",
    version = "v1beta1",
    status = "AddressStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"ID", "type":"string", "jsonPath":".metadata.annotations.managed\\.microscaler\\.io/external-name"}, {"name":"IP", "type":"string", "jsonPath":".status.atProvider.publicIp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpec {
    pub for_provider: AddressParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

/// Desired state of an Elastic IP address
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressParameters {
    pub region: String,
    /// `vpc` or `standard`; AWS defaults to `vpc`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Specific address to recover from an address pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ipv4_pool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_owned_ipv4_pool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_border_group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl AddressParameters {
    /// Whether the address is keyed by allocation id rather than public IP
    pub fn is_vpc_domain(&self) -> bool {
        self.domain.as_deref() != Some(ADDRESS_DOMAIN_STANDARD)
    }
}

/// Observed state of an Elastic IP address
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressObservation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub association_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interface_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<AddressObservation>,
}

impl_managed!(Address);

#[async_trait]
impl ResolveReferences for Address {
    async fn resolve_references(&mut self, _resolver: &Resolver<'_>) -> Result<(), ReferenceError> {
        Ok(())
    }
}
