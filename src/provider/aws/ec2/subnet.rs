//! # Subnet
//!
//! External name: the subnet id. Only the two launch attributes and tags can
//! change after creation.

use crate::controller::jsonpatch::create_patch;
use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::ec2::{Subnet, SubnetObservation, SubnetParameters};
use crate::crd::{Condition, Managed};
use crate::provider::aws::ec2::{
    found, observed_tags, required, required_external_name, sync_tags, Ec2Api, SubnetAttribute,
    TAG_VALUES,
};
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::tags::tags_up_to_date;
use async_trait::async_trait;
use aws_sdk_ec2::types as sdk;
use std::sync::Arc;
use tracing::info;

const KIND: ResourceKind = ResourceKind::Subnet;

pub struct SubnetClient {
    api: Arc<dyn Ec2Api>,
}

impl std::fmt::Debug for SubnetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubnetClient").finish_non_exhaustive()
    }
}

fn ipv6_cidr_block(subnet: &sdk::Subnet) -> Option<String> {
    subnet
        .ipv6_cidr_block_association_set()
        .first()
        .and_then(|a| a.ipv6_cidr_block())
        .map(str::to_string)
}

fn current_parameters(subnet: &sdk::Subnet, desired: &SubnetParameters) -> SubnetParameters {
    SubnetParameters {
        map_public_ip_on_launch: subnet.map_public_ip_on_launch(),
        assign_ipv6_address_on_creation: subnet.assign_ipv6_address_on_creation(),
        ..desired.clone()
    }
}

fn observation(subnet: &sdk::Subnet) -> SubnetObservation {
    SubnetObservation {
        subnet_id: subnet.subnet_id().map(str::to_string),
        subnet_state: subnet.state().map(|s| s.as_str().to_string()),
        available_ip_address_count: subnet.available_ip_address_count(),
        default_for_az: subnet.default_for_az(),
        owner_id: subnet.owner_id().map(str::to_string),
        subnet_arn: subnet.subnet_arn().map(str::to_string),
    }
}

impl SubnetClient {
    pub fn new(api: Arc<dyn Ec2Api>) -> Self {
        Self { api }
    }

    async fn describe(&self, subnet_id: &str) -> Result<Option<sdk::Subnet>, ReconcilerError> {
        found(
            KIND,
            "failed to describe subnet",
            self.api.describe_subnet(subnet_id).await,
        )
    }
}

#[async_trait]
impl ExternalClient<Subnet> for SubnetClient {
    async fn observe(&self, mg: &mut Subnet) -> Result<ExternalObservation, ReconcilerError> {
        let subnet_id = required_external_name(mg)?;
        let Some(subnet) = self.describe(&subnet_id).await? else {
            return Ok(ExternalObservation::not_found());
        };

        let p = &mut mg.spec.for_provider;
        let mut li = LateInitializer::new();
        li.value(
            &mut p.availability_zone,
            subnet.availability_zone().map(str::to_string),
        );
        li.value(
            &mut p.availability_zone_id,
            subnet.availability_zone_id().map(str::to_string),
        );
        li.value(&mut p.ipv6_cidr_block, ipv6_cidr_block(&subnet));
        li.value(
            &mut p.assign_ipv6_address_on_creation,
            subnet.assign_ipv6_address_on_creation(),
        );
        li.value(&mut p.map_public_ip_on_launch, subnet.map_public_ip_on_launch());
        li.value(&mut p.vpc_id, subnet.vpc_id().map(str::to_string));

        let up_to_date = create_patch(&*p, &current_parameters(&subnet, p))?.is_empty()
            && tags_up_to_date(&p.tags, &observed_tags(subnet.tags()), TAG_VALUES);

        mg.status.get_or_insert_with(Default::default).at_provider = Some(observation(&subnet));
        match subnet.state() {
            Some(sdk::SubnetState::Available) => mg.set_conditions([Condition::available()]),
            Some(sdk::SubnetState::Pending) => mg.set_conditions([Condition::creating()]),
            _ => mg.set_conditions([Condition::unavailable(None)]),
        }

        Ok(ExternalObservation::exists(up_to_date).late_initialized(li.changed()))
    }

    async fn create(&self, mg: &mut Subnet) -> Result<ExternalCreation, ReconcilerError> {
        let p = &mg.spec.for_provider;
        let vpc_id = required(&p.vpc_id, "vpcId")?;
        let subnet = self
            .api
            .create_subnet(vpc_id, p)
            .await
            .map_err(aws_error(KIND, "failed to create subnet"))?;
        let subnet_id = subnet.subnet_id().ok_or_else(|| {
            ReconcilerError::Invalid("AWS returned a subnet without an id".into())
        })?;
        info!("✅ Created subnet {} in {}", subnet_id, vpc_id);
        Ok(ExternalCreation::named(subnet_id))
    }

    async fn update(&self, mg: &mut Subnet) -> Result<ExternalUpdate, ReconcilerError> {
        let subnet_id = required_external_name(mg)?;
        let Some(subnet) = self.describe(&subnet_id).await? else {
            return Err(ReconcilerError::Invalid(format!(
                "subnet {subnet_id} disappeared"
            )));
        };
        let p = &mg.spec.for_provider;
        let patch = create_patch(p, &current_parameters(&subnet, p))?;

        if let (true, Some(value)) = (patch.changed("mapPublicIPOnLaunch"), p.map_public_ip_on_launch)
        {
            self.api
                .modify_subnet_attribute(&subnet_id, SubnetAttribute::MapPublicIpOnLaunch(value))
                .await
                .map_err(aws_error(KIND, "failed to modify subnet attribute"))?;
        }
        if let (true, Some(value)) = (
            patch.changed("assignIpv6AddressOnCreation"),
            p.assign_ipv6_address_on_creation,
        ) {
            self.api
                .modify_subnet_attribute(
                    &subnet_id,
                    SubnetAttribute::AssignIpv6AddressOnCreation(value),
                )
                .await
                .map_err(aws_error(KIND, "failed to modify subnet attribute"))?;
        }
        let tags = observed_tags(subnet.tags());
        sync_tags(self.api.as_ref(), KIND, &subnet_id, &p.tags, &tags).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut Subnet) -> Result<(), ReconcilerError> {
        let subnet_id = required_external_name(mg)?;
        self.api
            .delete_subnet(&subnet_id)
            .await
            .map_err(aws_error(KIND, "failed to delete subnet"))?;
        info!("🗑️  Deleted subnet {}", subnet_id);
        Ok(())
    }
}
