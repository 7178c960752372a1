//! # NAT Gateway
//!
//! External name: the NAT gateway id. AWS keeps deleted gateways visible for
//! a while, so `deleted` counts as gone and `deleting` is not deleted twice.

use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::ec2::{NatGateway, NatGatewayAddress, NatGatewayObservation};
use crate::crd::{Condition, Managed};
use crate::provider::aws::ec2::{
    found, observed_tags, required, required_external_name, sync_tags, timestamp, Ec2Api,
    TAG_VALUES,
};
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::tags::tags_up_to_date;
use async_trait::async_trait;
use aws_sdk_ec2::types as sdk;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::NatGateway;

pub struct NatGatewayClient {
    api: Arc<dyn Ec2Api>,
}

impl std::fmt::Debug for NatGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatGatewayClient").finish_non_exhaustive()
    }
}

fn observation(gateway: &sdk::NatGateway) -> NatGatewayObservation {
    NatGatewayObservation {
        nat_gateway_id: gateway.nat_gateway_id().map(str::to_string),
        state: gateway.state().map(|s| s.as_str().to_string()),
        failure_code: gateway.failure_code().map(str::to_string),
        failure_message: gateway.failure_message().map(str::to_string),
        vpc_id: gateway.vpc_id().map(str::to_string),
        create_time: timestamp(gateway.create_time()),
        delete_time: timestamp(gateway.delete_time()),
        addresses: gateway
            .nat_gateway_addresses()
            .iter()
            .map(|a| NatGatewayAddress {
                allocation_id: a.allocation_id().map(str::to_string),
                network_interface_id: a.network_interface_id().map(str::to_string),
                private_ip: a.private_ip().map(str::to_string),
                public_ip: a.public_ip().map(str::to_string),
            })
            .collect(),
    }
}

/// Observed state recorded by `observe` earlier in the pass
fn observed_state(mg: &NatGateway) -> Option<&str> {
    mg.status
        .as_ref()
        .and_then(|s| s.at_provider.as_ref())
        .and_then(|a| a.state.as_deref())
}

impl NatGatewayClient {
    pub fn new(api: Arc<dyn Ec2Api>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ExternalClient<NatGateway> for NatGatewayClient {
    async fn observe(&self, mg: &mut NatGateway) -> Result<ExternalObservation, ReconcilerError> {
        let id = required_external_name(mg)?;
        let Some(gateway) = found(
            KIND,
            "failed to describe NAT gateway",
            self.api.describe_nat_gateway(&id).await,
        )?
        else {
            return Ok(ExternalObservation::not_found());
        };
        if gateway.state() == Some(&sdk::NatGatewayState::Deleted) {
            return Ok(ExternalObservation::not_found());
        }

        let p = &mut mg.spec.for_provider;
        let mut li = LateInitializer::new();
        li.value(
            &mut p.connectivity_type,
            gateway.connectivity_type().map(|c| c.as_str().to_string()),
        );
        li.value(
            &mut p.allocation_id,
            gateway
                .nat_gateway_addresses()
                .first()
                .and_then(|a| a.allocation_id())
                .map(str::to_string),
        );
        li.value(&mut p.subnet_id, gateway.subnet_id().map(str::to_string));
        let up_to_date = tags_up_to_date(&p.tags, &observed_tags(gateway.tags()), TAG_VALUES);

        mg.status.get_or_insert_with(Default::default).at_provider = Some(observation(&gateway));
        match gateway.state() {
            Some(sdk::NatGatewayState::Available) => mg.set_conditions([Condition::available()]),
            Some(sdk::NatGatewayState::Pending) => mg.set_conditions([Condition::creating()]),
            Some(sdk::NatGatewayState::Deleting) => mg.set_conditions([Condition::deleting()]),
            Some(sdk::NatGatewayState::Failed) => mg.set_conditions([Condition::unavailable(
                gateway.failure_message().map(str::to_string),
            )]),
            _ => mg.set_conditions([Condition::unavailable(None)]),
        }

        Ok(ExternalObservation::exists(up_to_date).late_initialized(li.changed()))
    }

    async fn create(&self, mg: &mut NatGateway) -> Result<ExternalCreation, ReconcilerError> {
        let p = &mg.spec.for_provider;
        let subnet_id = required(&p.subnet_id, "subnetId")?;
        // the UID makes a retried create return the same gateway
        let client_token = mg.uid().unwrap_or_else(|| mg.name_any());
        let gateway = self
            .api
            .create_nat_gateway(p, &client_token)
            .await
            .map_err(aws_error(KIND, "failed to create NAT gateway"))?;
        let id = gateway.nat_gateway_id().ok_or_else(|| {
            ReconcilerError::Invalid("AWS returned a NAT gateway without an id".into())
        })?;
        info!("✅ Created NAT gateway {} in {}", id, subnet_id);
        Ok(ExternalCreation::named(id))
    }

    async fn update(&self, mg: &mut NatGateway) -> Result<ExternalUpdate, ReconcilerError> {
        let id = required_external_name(mg)?;
        let Some(gateway) = found(
            KIND,
            "failed to describe NAT gateway",
            self.api.describe_nat_gateway(&id).await,
        )?
        else {
            return Err(ReconcilerError::Invalid(format!(
                "NAT gateway {id} disappeared"
            )));
        };
        let tags = observed_tags(gateway.tags());
        sync_tags(
            self.api.as_ref(),
            KIND,
            &id,
            &mg.spec.for_provider.tags,
            &tags,
        )
        .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut NatGateway) -> Result<(), ReconcilerError> {
        let id = required_external_name(mg)?;
        if observed_state(mg) == Some(sdk::NatGatewayState::Deleting.as_str()) {
            debug!("NAT gateway {} is already being deleted", id);
            return Ok(());
        }
        self.api
            .delete_nat_gateway(&id)
            .await
            .map_err(aws_error(KIND, "failed to delete NAT gateway"))?;
        info!("🗑️  Deleting NAT gateway {}", id);
        Ok(())
    }
}
