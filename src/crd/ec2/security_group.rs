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

/// A VPC security group
///
/// The default "allow all" egress rule AWS adds on creation is revoked so the
/// spec fully controls egress.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "SecurityGroup",
    group = "ec2.aws.microscaler.io",
    version = "v1beta1",
    status = "SecurityGroupStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"ID", "type":"string", "jsonPath":".metadata.annotations.managed\\.microscaler\\.io/external-name"}, {"name":"VPC", "type":"string", "jsonPath":".spec.forProvider.vpcId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupSpec {
    pub for_provider: SecurityGroupParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

/// Desired state of a security group
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupParameters {
    pub region: String,
    pub group_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id_selector: Option<Selector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<IpPermission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<IpPermission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// One security group rule
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IpPermission {
    /// tcp, udp, icmp, icmpv6, a protocol number, or -1 for all
    pub ip_protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_ranges: Vec<IpRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv6_ranges: Vec<Ipv6Range>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix_list_ids: Vec<PrefixListId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_id_group_pairs: Vec<UserIdGroupPair>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IpRange {
    pub cidr_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ipv6Range {
    pub cidr_ipv6: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrefixListId {
    pub prefix_list_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Security group (optionally in another account or VPC) a rule refers to
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserIdGroupPair {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id_ref: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id_selector: Option<Selector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_peering_connection_id: Option<String>,
}

/// Observed state of a security group
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupObservation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<SecurityGroupObservation>,
}

impl_managed!(SecurityGroup);

#[async_trait]
impl ResolveReferences for SecurityGroup {
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

        for permission in p.ingress.iter_mut().chain(p.egress.iter_mut()) {
            for pair in &mut permission.user_id_group_pairs {
                resolver
                    .resolve_field(
                        &mut pair.group_id,
                        &mut pair.group_id_ref,
                        pair.group_id_selector.as_ref(),
                        ApiResource::erase::<SecurityGroup>(&()),
                        Extractor::ExternalName,
                    )
                    .await?;
            }
        }
        Ok(())
    }
}
