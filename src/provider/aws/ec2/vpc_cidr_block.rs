//! # VPC CIDR Block
//!
//! External name: the association id, looked up in the VPC's IPv4 and IPv6
//! association sets. An association that is disassociating or disassociated
//! counts as gone. Every field is fixed once associated, so there is nothing
//! to update.

use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::ec2::{VpcCidrBlock, VpcCidrBlockObservation, VpcCidrBlockState};
use crate::crd::{Condition, Managed};
use crate::provider::aws::ec2::{found, required, required_external_name, Ec2Api};
use crate::provider::aws::errors::{is_not_found, ResourceKind};
use async_trait::async_trait;
use aws_sdk_ec2::types as sdk;
use std::sync::Arc;
use tracing::info;

const KIND: ResourceKind = ResourceKind::VpcCidrBlock;

pub struct VpcCidrBlockClient {
    api: Arc<dyn Ec2Api>,
}

impl std::fmt::Debug for VpcCidrBlockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VpcCidrBlockClient").finish_non_exhaustive()
    }
}

fn block_state(state: Option<&sdk::VpcCidrBlockState>) -> Option<VpcCidrBlockState> {
    state.map(|s| VpcCidrBlockState {
        state: s.state().map(|c| c.as_str().to_string()),
        status_message: s.status_message().map(str::to_string),
    })
}

/// The association named `association_id`, from either address family
fn association(vpc: &sdk::Vpc, association_id: &str) -> Option<VpcCidrBlockObservation> {
    if let Some(a) = vpc
        .cidr_block_association_set()
        .iter()
        .find(|a| a.association_id() == Some(association_id))
    {
        return Some(VpcCidrBlockObservation {
            association_id: a.association_id().map(str::to_string),
            cidr_block: a.cidr_block().map(str::to_string),
            cidr_block_state: block_state(a.cidr_block_state()),
            ..Default::default()
        });
    }
    vpc.ipv6_cidr_block_association_set()
        .iter()
        .find(|a| a.association_id() == Some(association_id))
        .map(|a| VpcCidrBlockObservation {
            association_id: a.association_id().map(str::to_string),
            ipv6_cidr_block: a.ipv6_cidr_block().map(str::to_string),
            ipv6_cidr_block_state: block_state(a.ipv6_cidr_block_state()),
            network_border_group: a.network_border_group().map(str::to_string),
            ipv6_pool: a.ipv6_pool().map(str::to_string),
            ..Default::default()
        })
}

/// Association state of whichever family the observation belongs to
fn state_of(observation: &VpcCidrBlockObservation) -> Option<&VpcCidrBlockState> {
    observation
        .cidr_block_state
        .as_ref()
        .or(observation.ipv6_cidr_block_state.as_ref())
}

impl VpcCidrBlockClient {
    pub fn new(api: Arc<dyn Ec2Api>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ExternalClient<VpcCidrBlock> for VpcCidrBlockClient {
    async fn observe(
        &self,
        mg: &mut VpcCidrBlock,
    ) -> Result<ExternalObservation, ReconcilerError> {
        let association_id = required_external_name(mg)?;
        let vpc_id = required(&mg.spec.for_provider.vpc_id, "vpcId")?.to_string();
        let Some(vpc) = found(
            KIND,
            "failed to describe VPC",
            self.api.describe_vpc(&vpc_id).await,
        )?
        else {
            return Ok(ExternalObservation::not_found());
        };
        let Some(observed) = association(&vpc, &association_id) else {
            return Ok(ExternalObservation::not_found());
        };

        let state = state_of(&observed).and_then(|s| s.state.clone());
        let message = state_of(&observed).and_then(|s| s.status_message.clone());
        if matches!(
            state.as_deref(),
            Some("disassociating") | Some("disassociated")
        ) {
            return Ok(ExternalObservation::not_found());
        }

        let p = &mut mg.spec.for_provider;
        let mut li = LateInitializer::new();
        li.value(&mut p.cidr_block, observed.cidr_block.clone());
        li.value(&mut p.ipv6_cidr_block, observed.ipv6_cidr_block.clone());
        li.value(&mut p.ipv6_pool, observed.ipv6_pool.clone());
        li.value(
            &mut p.ipv6_cidr_block_network_border_group,
            observed.network_border_group.clone(),
        );

        mg.status.get_or_insert_with(Default::default).at_provider = Some(observed);
        match state.as_deref() {
            Some("associated") => mg.set_conditions([Condition::available()]),
            Some("associating") => mg.set_conditions([Condition::creating()]),
            _ => mg.set_conditions([Condition::unavailable(message)]),
        }

        Ok(ExternalObservation::exists(true).late_initialized(li.changed()))
    }

    async fn create(&self, mg: &mut VpcCidrBlock) -> Result<ExternalCreation, ReconcilerError> {
        let p = &mg.spec.for_provider;
        let vpc_id = required(&p.vpc_id, "vpcId")?;
        let associated = self
            .api
            .associate_vpc_cidr_block(vpc_id, p)
            .await
            .map_err(aws_error(KIND, "failed to associate CIDR block"))?;
        let association_id = associated.association_id.ok_or_else(|| {
            ReconcilerError::Invalid("AWS returned a CIDR block without an association id".into())
        })?;
        info!("✅ Associated CIDR block {} with {}", association_id, vpc_id);
        Ok(ExternalCreation::named(association_id))
    }

    async fn update(&self, _mg: &mut VpcCidrBlock) -> Result<ExternalUpdate, ReconcilerError> {
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut VpcCidrBlock) -> Result<(), ReconcilerError> {
        let association_id = required_external_name(mg)?;
        match self.api.disassociate_vpc_cidr_block(&association_id).await {
            Err(e) if !is_not_found(KIND, &e) => Err(ReconcilerError::external(
                KIND,
                "failed to disassociate CIDR block",
                e,
            )),
            _ => {
                info!("🗑️  Disassociated CIDR block {}", association_id);
                Ok(())
            }
        }
    }
}
