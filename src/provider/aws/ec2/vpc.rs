//! # VPC
//!
//! External name: the VPC id. Tenancy and the two DNS attributes are
//! late-initialized from AWS and are the only mutable fields besides tags.

use crate::controller::jsonpatch::create_patch;
use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::ec2::{
    Vpc, VpcCidrBlockAssociation, VpcIpv6CidrBlockAssociation, VpcObservation, VpcParameters,
};
use crate::crd::{Condition, Managed};
use crate::provider::aws::ec2::{
    found, observed_tags, required_external_name, sync_tags, Ec2Api, VpcAttribute, TAG_VALUES,
};
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::tags::tags_up_to_date;
use async_trait::async_trait;
use aws_sdk_ec2::types as sdk;
use std::sync::Arc;
use tracing::{info, warn};

const KIND: ResourceKind = ResourceKind::Vpc;

const DEFAULT_TENANCY: &str = "default";

pub struct VpcClient {
    api: Arc<dyn Ec2Api>,
}

impl std::fmt::Debug for VpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VpcClient").finish_non_exhaustive()
    }
}

/// A VPC as AWS reports it, with the attributes that need their own calls
struct Observed {
    vpc: sdk::Vpc,
    enable_dns_support: Option<bool>,
    enable_dns_host_names: Option<bool>,
}

impl Observed {
    /// The observed state in spec form; immutable fields and tags mirror
    /// `desired`, tags are diffed on their own
    fn as_parameters(&self, desired: &VpcParameters) -> VpcParameters {
        VpcParameters {
            instance_tenancy: self.vpc.instance_tenancy().map(|t| t.as_str().to_string()),
            enable_dns_support: self.enable_dns_support,
            enable_dns_host_names: self.enable_dns_host_names,
            ..desired.clone()
        }
    }
}

fn observation(vpc: &sdk::Vpc) -> VpcObservation {
    VpcObservation {
        vpc_id: vpc.vpc_id().map(str::to_string),
        vpc_state: vpc.state().map(|s| s.as_str().to_string()),
        owner_id: vpc.owner_id().map(str::to_string),
        dhcp_options_id: vpc.dhcp_options_id().map(str::to_string),
        is_default: vpc.is_default(),
        cidr_block_association_set: vpc
            .cidr_block_association_set()
            .iter()
            .map(|a| VpcCidrBlockAssociation {
                association_id: a.association_id().map(str::to_string),
                cidr_block: a.cidr_block().map(str::to_string),
                state: a
                    .cidr_block_state()
                    .and_then(|s| s.state())
                    .map(|s| s.as_str().to_string()),
            })
            .collect(),
        ipv6_cidr_block_association_set: vpc
            .ipv6_cidr_block_association_set()
            .iter()
            .map(|a| VpcIpv6CidrBlockAssociation {
                association_id: a.association_id().map(str::to_string),
                ipv6_cidr_block: a.ipv6_cidr_block().map(str::to_string),
                ipv6_pool: a.ipv6_pool().map(str::to_string),
                network_border_group: a.network_border_group().map(str::to_string),
                state: a
                    .ipv6_cidr_block_state()
                    .and_then(|s| s.state())
                    .map(|s| s.as_str().to_string()),
            })
            .collect(),
    }
}

impl VpcClient {
    pub fn new(api: Arc<dyn Ec2Api>) -> Self {
        Self { api }
    }

    async fn describe(&self, vpc_id: &str) -> Result<Option<Observed>, ReconcilerError> {
        let Some(vpc) = found(KIND, "failed to describe VPC", self.api.describe_vpc(vpc_id).await)?
        else {
            return Ok(None);
        };
        let enable_dns_support = self
            .api
            .describe_vpc_attribute(vpc_id, VpcAttribute::EnableDnsSupport)
            .await
            .map_err(aws_error(KIND, "failed to describe VPC attribute"))?;
        let enable_dns_host_names = self
            .api
            .describe_vpc_attribute(vpc_id, VpcAttribute::EnableDnsHostnames)
            .await
            .map_err(aws_error(KIND, "failed to describe VPC attribute"))?;
        Ok(Some(Observed {
            vpc,
            enable_dns_support,
            enable_dns_host_names,
        }))
    }
}

#[async_trait]
impl ExternalClient<Vpc> for VpcClient {
    async fn observe(&self, mg: &mut Vpc) -> Result<ExternalObservation, ReconcilerError> {
        let vpc_id = required_external_name(mg)?;
        let Some(observed) = self.describe(&vpc_id).await? else {
            return Ok(ExternalObservation::not_found());
        };

        let p = &mut mg.spec.for_provider;
        let mut li = LateInitializer::new();
        li.value(
            &mut p.instance_tenancy,
            observed.vpc.instance_tenancy().map(|t| t.as_str().to_string()),
        );
        li.value(&mut p.enable_dns_support, observed.enable_dns_support);
        li.value(&mut p.enable_dns_host_names, observed.enable_dns_host_names);

        let current = observed.as_parameters(p);
        let up_to_date = create_patch(&*p, &current)?.is_empty()
            && tags_up_to_date(&p.tags, &observed_tags(observed.vpc.tags()), TAG_VALUES);

        mg.status.get_or_insert_with(Default::default).at_provider =
            Some(observation(&observed.vpc));
        match observed.vpc.state() {
            Some(sdk::VpcState::Available) => mg.set_conditions([Condition::available()]),
            Some(sdk::VpcState::Pending) => mg.set_conditions([Condition::creating()]),
            _ => mg.set_conditions([Condition::unavailable(None)]),
        }

        Ok(ExternalObservation::exists(up_to_date).late_initialized(li.changed()))
    }

    async fn create(&self, mg: &mut Vpc) -> Result<ExternalCreation, ReconcilerError> {
        let vpc = self
            .api
            .create_vpc(&mg.spec.for_provider)
            .await
            .map_err(aws_error(KIND, "failed to create VPC"))?;
        let vpc_id = vpc
            .vpc_id()
            .ok_or_else(|| ReconcilerError::Invalid("AWS returned a VPC without an id".into()))?;
        info!("✅ Created VPC {} for {}", vpc_id, mg.name_or_unknown());
        Ok(ExternalCreation::named(vpc_id))
    }

    async fn update(&self, mg: &mut Vpc) -> Result<ExternalUpdate, ReconcilerError> {
        let vpc_id = required_external_name(mg)?;
        let Some(observed) = self.describe(&vpc_id).await? else {
            return Err(ReconcilerError::Invalid(format!("VPC {vpc_id} disappeared")));
        };
        let p = &mg.spec.for_provider;
        let current = observed.as_parameters(p);
        let patch = create_patch(p, &current)?;

        match p.instance_tenancy.as_deref() {
            // dedicated tenancy cannot be requested after creation
            Some(tenancy @ DEFAULT_TENANCY) if patch.changed("instanceTenancy") => {
                self.api
                    .modify_vpc_tenancy(&vpc_id, tenancy)
                    .await
                    .map_err(aws_error(KIND, "failed to modify VPC tenancy"))?;
            }
            Some(tenancy) if patch.changed("instanceTenancy") => {
                warn!("VPC {} cannot be moved to {} tenancy", vpc_id, tenancy);
            }
            _ => {}
        }
        for (field, attribute, value) in [
            ("enableDnsSupport", VpcAttribute::EnableDnsSupport, p.enable_dns_support),
            ("enableDnsHostNames", VpcAttribute::EnableDnsHostnames, p.enable_dns_host_names),
        ] {
            if let (true, Some(value)) = (patch.changed(field), value) {
                self.api
                    .modify_vpc_attribute(&vpc_id, attribute, value)
                    .await
                    .map_err(aws_error(KIND, "failed to modify VPC attribute"))?;
            }
        }
        let tags = observed_tags(observed.vpc.tags());
        sync_tags(self.api.as_ref(), KIND, &vpc_id, &p.tags, &tags).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut Vpc) -> Result<(), ReconcilerError> {
        let vpc_id = required_external_name(mg)?;
        self.api
            .delete_vpc(&vpc_id)
            .await
            .map_err(aws_error(KIND, "failed to delete VPC"))?;
        info!("🗑️  Deleted VPC {}", vpc_id);
        Ok(())
    }
}
