//! # Security Group
//!
//! External name: the group id. Ingress and egress rules are diffed as sets
//! (see [`super::permissions`]); the group name, description and VPC are fixed
//! at creation.

use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ErrorCategory, ExternalClient, ExternalCreation, ExternalObservation,
    ExternalUpdate, ReconcilerError,
};
use crate::crd::ec2::{
    IpPermission, IpRange, Ipv6Range, PrefixListId, SecurityGroup, SecurityGroupObservation,
    UserIdGroupPair,
};
use crate::crd::{Condition, Managed};
use crate::provider::aws::ec2::permissions::{diff_permissions, permissions_equal};
use crate::provider::aws::ec2::{
    found, observed_tags, required_external_name, sync_tags, Direction, Ec2Api, TAG_VALUES,
};
use crate::provider::aws::errors::{classify, ResourceKind};
use crate::provider::aws::tags::tags_up_to_date;
use async_trait::async_trait;
use aws_sdk_ec2::types as sdk;
use std::sync::Arc;
use tracing::{debug, info, warn};

const KIND: ResourceKind = ResourceKind::SecurityGroup;

pub struct SecurityGroupClient {
    api: Arc<dyn Ec2Api>,
}

impl std::fmt::Debug for SecurityGroupClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityGroupClient").finish_non_exhaustive()
    }
}

/// The rule AWS adds to every new VPC security group
fn default_egress() -> IpPermission {
    IpPermission {
        ip_protocol: "-1".to_string(),
        ip_ranges: vec![IpRange {
            cidr_ip: "0.0.0.0/0".to_string(),
            description: None,
        }],
        ..Default::default()
    }
}

fn spec_permission(permission: &sdk::IpPermission) -> IpPermission {
    IpPermission {
        ip_protocol: permission.ip_protocol().unwrap_or("-1").to_string(),
        from_port: permission.from_port(),
        to_port: permission.to_port(),
        ip_ranges: permission
            .ip_ranges()
            .iter()
            .filter_map(|r| {
                Some(IpRange {
                    cidr_ip: r.cidr_ip()?.to_string(),
                    description: r.description().map(str::to_string),
                })
            })
            .collect(),
        ipv6_ranges: permission
            .ipv6_ranges()
            .iter()
            .filter_map(|r| {
                Some(Ipv6Range {
                    cidr_ipv6: r.cidr_ipv6()?.to_string(),
                    description: r.description().map(str::to_string),
                })
            })
            .collect(),
        prefix_list_ids: permission
            .prefix_list_ids()
            .iter()
            .filter_map(|p| {
                Some(PrefixListId {
                    prefix_list_id: p.prefix_list_id()?.to_string(),
                    description: p.description().map(str::to_string),
                })
            })
            .collect(),
        user_id_group_pairs: permission
            .user_id_group_pairs()
            .iter()
            .map(|p| UserIdGroupPair {
                description: p.description().map(str::to_string),
                group_id: p.group_id().map(str::to_string),
                group_name: p.group_name().map(str::to_string),
                user_id: p.user_id().map(str::to_string),
                vpc_id: p.vpc_id().map(str::to_string),
                vpc_peering_connection_id: p.vpc_peering_connection_id().map(str::to_string),
                ..Default::default()
            })
            .collect(),
    }
}

fn spec_permissions(permissions: &[sdk::IpPermission]) -> Vec<IpPermission> {
    permissions.iter().map(spec_permission).collect()
}

impl SecurityGroupClient {
    pub fn new(api: Arc<dyn Ec2Api>) -> Self {
        Self { api }
    }

    async fn describe(&self, group_id: &str) -> Result<Option<sdk::SecurityGroup>, ReconcilerError> {
        found(
            KIND,
            "failed to describe security group",
            self.api.describe_security_group(group_id).await,
        )
    }

    /// Converges one direction's rules: stale descriptions are revoked first
    /// so the re-authorized entry does not collide with the old one
    async fn sync_rules(
        &self,
        group_id: &str,
        direction: Direction,
        want: &[IpPermission],
        have: &[IpPermission],
    ) -> Result<(), ReconcilerError> {
        let diff = diff_permissions(want, have);
        if !diff.stale.is_empty() {
            self.revoke(group_id, direction, &diff.stale).await?;
        }
        if !diff.add.is_empty() {
            match self.api.authorize(group_id, direction, &diff.add).await {
                Err(e) if classify(KIND, &e) == ErrorCategory::RuleAlreadyExists => {
                    debug!("{:?} rule already present on {}: {}", direction, group_id, e);
                }
                result => {
                    result.map_err(aws_error(KIND, "failed to authorize security group rules"))?
                }
            }
        }
        if !diff.remove.is_empty() {
            self.revoke(group_id, direction, &diff.remove).await?;
        }
        Ok(())
    }

    async fn revoke(
        &self,
        group_id: &str,
        direction: Direction,
        permissions: &[IpPermission],
    ) -> Result<(), ReconcilerError> {
        match self.api.revoke(group_id, direction, permissions).await {
            Err(e) if classify(KIND, &e) != ErrorCategory::NotFound => Err(
                ReconcilerError::external(KIND, "failed to revoke security group rules", e),
            ),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ExternalClient<SecurityGroup> for SecurityGroupClient {
    async fn observe(
        &self,
        mg: &mut SecurityGroup,
    ) -> Result<ExternalObservation, ReconcilerError> {
        let group_id = required_external_name(mg)?;
        let Some(group) = self.describe(&group_id).await? else {
            return Ok(ExternalObservation::not_found());
        };

        let p = &mut mg.spec.for_provider;
        let mut li = LateInitializer::new();
        li.value(&mut p.vpc_id, group.vpc_id().map(str::to_string));

        let up_to_date = permissions_equal(&p.ingress, &spec_permissions(group.ip_permissions()))
            && permissions_equal(&p.egress, &spec_permissions(group.ip_permissions_egress()))
            && tags_up_to_date(&p.tags, &observed_tags(group.tags()), TAG_VALUES);

        mg.status.get_or_insert_with(Default::default).at_provider =
            Some(SecurityGroupObservation {
                security_group_id: group.group_id().map(str::to_string),
                owner_id: group.owner_id().map(str::to_string),
            });
        mg.set_conditions([Condition::available()]);

        Ok(ExternalObservation::exists(up_to_date).late_initialized(li.changed()))
    }

    async fn create(&self, mg: &mut SecurityGroup) -> Result<ExternalCreation, ReconcilerError> {
        let p = &mg.spec.for_provider;
        let group_id = self
            .api
            .create_security_group(p.vpc_id.as_deref(), p)
            .await
            .map_err(aws_error(KIND, "failed to create security group"))?;
        info!("✅ Created security group {} ({})", p.group_name, group_id);

        // egress is governed by the spec alone
        if p.vpc_id.is_some() {
            if let Err(e) = self
                .api
                .revoke(&group_id, Direction::Egress, &[default_egress()])
                .await
            {
                warn!(
                    "Failed to revoke default egress rule of {}: {}",
                    group_id, e
                );
            }
        }
        Ok(ExternalCreation::named(group_id))
    }

    async fn update(&self, mg: &mut SecurityGroup) -> Result<ExternalUpdate, ReconcilerError> {
        let group_id = required_external_name(mg)?;
        let Some(group) = self.describe(&group_id).await? else {
            return Err(ReconcilerError::Invalid(format!(
                "security group {group_id} disappeared"
            )));
        };
        let p = &mg.spec.for_provider;

        self.sync_rules(
            &group_id,
            Direction::Ingress,
            &p.ingress,
            &spec_permissions(group.ip_permissions()),
        )
        .await?;
        self.sync_rules(
            &group_id,
            Direction::Egress,
            &p.egress,
            &spec_permissions(group.ip_permissions_egress()),
        )
        .await?;

        let tags = observed_tags(group.tags());
        sync_tags(self.api.as_ref(), KIND, &group_id, &p.tags, &tags).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut SecurityGroup) -> Result<(), ReconcilerError> {
        let group_id = required_external_name(mg)?;
        self.api
            .delete_security_group(&group_id)
            .await
            .map_err(aws_error(KIND, "failed to delete security group"))?;
        info!("🗑️  Deleted security group {}", group_id);
        Ok(())
    }

    async fn find_existing(&self, mg: &SecurityGroup) -> Result<Option<String>, ReconcilerError> {
        let p = &mg.spec.for_provider;
        self.api
            .find_security_group(p.vpc_id.as_deref(), &p.group_name)
            .await
            .map_err(aws_error(KIND, "failed to look up security group by name"))
    }
}
