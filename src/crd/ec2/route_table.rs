use crate::controller::reference::{Extractor, ReferenceError, ResolveReferences, Resolver};
use crate::crd::common::{Reference, ResourceSpec, Selector, Tag};
use crate::crd::ec2::{InternetGateway, NatGateway, Subnet, Vpc};
use crate::crd::managed::impl_managed;
use crate::crd::status::Condition;
use async_trait::async_trait;
use kube::api::ApiResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A VPC route table with its routes and subnet associations
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "RouteTable",
    group = "ec2.aws.microscaler.io",
    version = "v1beta1",
    status = "RouteTableStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"ID", "type":"string", "jsonPath":".metadata.annotations.managed\\.microscaler\\.io/external-name"}, {"name":"VPC", "type":"string", "jsonPath":".spec.forProvider.vpcId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableSpec {
    pub for_provider: RouteTableParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

/// Desired state of a route table
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableParameters {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id_selector: Option<Selector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<Association>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// A route; exactly one target should be set
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_ipv6_cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id_selector: Option<Selector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id_selector: Option<Selector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interface_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit_gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_peering_connection_id: Option<String>,
}

/// Subnet association of a route table
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id_selector: Option<Selector>,
}

/// Observed state of a route table
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableObservation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_table_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<AssociationState>,
}

/// Observed route
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_ipv6_cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interface_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit_gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_peering_connection_id: Option<String>,
    /// active or blackhole
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// CreateRouteTable, CreateRoute or EnableVgwRoutePropagation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Observed subnet association
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssociationState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub association_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<RouteTableObservation>,
}

impl_managed!(RouteTable);

#[async_trait]
impl ResolveReferences for RouteTable {
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
            .await?;

        for route in &mut p.routes {
            resolver
                .resolve_field(
                    &mut route.gateway_id,
                    &mut route.gateway_id_ref,
                    route.gateway_id_selector.as_ref(),
                    ApiResource::erase::<InternetGateway>(&()),
                    Extractor::ExternalName,
                )
                .await?;
            resolver
                .resolve_field(
                    &mut route.nat_gateway_id,
                    &mut route.nat_gateway_id_ref,
                    route.nat_gateway_id_selector.as_ref(),
                    ApiResource::erase::<NatGateway>(&()),
                    Extractor::ExternalName,
                )
                .await?;
        }

        for association in &mut p.associations {
            resolver
                .resolve_field(
                    &mut association.subnet_id,
                    &mut association.subnet_id_ref,
                    association.subnet_id_selector.as_ref(),
                    ApiResource::erase::<Subnet>(&()),
                    Extractor::ExternalName,
                )
                .await?;
        }
        Ok(())
    }
}
