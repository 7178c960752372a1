//! # Internet Gateway
//!
//! External name: the gateway id. The VPC attachment is managed by `update`,
//! so a freshly created gateway is attached on the following pass.

use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::ec2::{InternetGateway, InternetGatewayAttachment, InternetGatewayObservation};
use crate::crd::{Condition, Managed};
use crate::provider::aws::ec2::{
    found, observed_tags, required_external_name, sync_tags, Ec2Api, TAG_VALUES,
};
use crate::provider::aws::errors::{is_not_found, ResourceKind};
use crate::provider::aws::tags::tags_up_to_date;
use async_trait::async_trait;
use aws_sdk_ec2::types as sdk;
use std::sync::Arc;
use tracing::info;

const KIND: ResourceKind = ResourceKind::InternetGateway;

pub struct InternetGatewayClient {
    api: Arc<dyn Ec2Api>,
}

impl std::fmt::Debug for InternetGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternetGatewayClient")
            .finish_non_exhaustive()
    }
}

/// VPCs the gateway is attached to
fn attached_vpcs(gateway: &sdk::InternetGateway) -> Vec<String> {
    gateway
        .attachments()
        .iter()
        .filter_map(|a| a.vpc_id())
        .map(str::to_string)
        .collect()
}

fn observation(gateway: &sdk::InternetGateway) -> InternetGatewayObservation {
    InternetGatewayObservation {
        internet_gateway_id: gateway.internet_gateway_id().map(str::to_string),
        owner_id: gateway.owner_id().map(str::to_string),
        attachments: gateway
            .attachments()
            .iter()
            .map(|a| InternetGatewayAttachment {
                attachment_status: a.state().map(|s| s.as_str().to_string()),
                vpc_id: a.vpc_id().map(str::to_string),
            })
            .collect(),
    }
}

impl InternetGatewayClient {
    pub fn new(api: Arc<dyn Ec2Api>) -> Self {
        Self { api }
    }

    async fn describe(&self, id: &str) -> Result<Option<sdk::InternetGateway>, ReconcilerError> {
        found(
            KIND,
            "failed to describe internet gateway",
            self.api.describe_internet_gateway(id).await,
        )
    }

    async fn detach(&self, id: &str, vpc_id: &str) -> Result<(), ReconcilerError> {
        match self.api.detach_internet_gateway(id, vpc_id).await {
            Ok(()) => {
                info!("Detached internet gateway {} from {}", id, vpc_id);
                Ok(())
            }
            Err(e) if is_not_found(KIND, &e) => Ok(()),
            Err(e) => Err(ReconcilerError::external(
                KIND,
                "failed to detach internet gateway",
                e,
            )),
        }
    }
}

#[async_trait]
impl ExternalClient<InternetGateway> for InternetGatewayClient {
    async fn observe(
        &self,
        mg: &mut InternetGateway,
    ) -> Result<ExternalObservation, ReconcilerError> {
        let id = required_external_name(mg)?;
        let Some(gateway) = self.describe(&id).await? else {
            return Ok(ExternalObservation::not_found());
        };

        let attached = attached_vpcs(&gateway);
        let p = &mut mg.spec.for_provider;
        let mut li = LateInitializer::new();
        li.value(&mut p.vpc_id, attached.first().cloned());

        let attachment_up_to_date = match &p.vpc_id {
            Some(vpc_id) => attached.len() == 1 && attached[0] == *vpc_id,
            None => attached.is_empty(),
        };
        let up_to_date = attachment_up_to_date
            && tags_up_to_date(&p.tags, &observed_tags(gateway.tags()), TAG_VALUES);

        mg.status.get_or_insert_with(Default::default).at_provider = Some(observation(&gateway));
        mg.set_conditions([Condition::available()]);

        Ok(ExternalObservation::exists(up_to_date).late_initialized(li.changed()))
    }

    async fn create(
        &self,
        mg: &mut InternetGateway,
    ) -> Result<ExternalCreation, ReconcilerError> {
        let gateway = self
            .api
            .create_internet_gateway(&mg.spec.for_provider.tags)
            .await
            .map_err(aws_error(KIND, "failed to create internet gateway"))?;
        let id = gateway.internet_gateway_id().ok_or_else(|| {
            ReconcilerError::Invalid("AWS returned an internet gateway without an id".into())
        })?;
        info!("✅ Created internet gateway {}", id);
        Ok(ExternalCreation::named(id))
    }

    async fn update(&self, mg: &mut InternetGateway) -> Result<ExternalUpdate, ReconcilerError> {
        let id = required_external_name(mg)?;
        let Some(gateway) = self.describe(&id).await? else {
            return Err(ReconcilerError::Invalid(format!(
                "internet gateway {id} disappeared"
            )));
        };
        let p = &mg.spec.for_provider;

        let attached = attached_vpcs(&gateway);
        for vpc_id in attached.iter().filter(|v| p.vpc_id.as_ref() != Some(*v)) {
            self.detach(&id, vpc_id).await?;
        }
        if let Some(vpc_id) = &p.vpc_id {
            if !attached.contains(vpc_id) {
                self.api
                    .attach_internet_gateway(&id, vpc_id)
                    .await
                    .map_err(aws_error(KIND, "failed to attach internet gateway"))?;
                info!("Attached internet gateway {} to {}", id, vpc_id);
            }
        }

        let tags = observed_tags(gateway.tags());
        sync_tags(self.api.as_ref(), KIND, &id, &p.tags, &tags).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut InternetGateway) -> Result<(), ReconcilerError> {
        let id = required_external_name(mg)?;
        // a gateway cannot be deleted while attached
        if let Some(gateway) = self.describe(&id).await? {
            for vpc_id in attached_vpcs(&gateway) {
                self.detach(&id, &vpc_id).await?;
            }
        }
        self.api
            .delete_internet_gateway(&id)
            .await
            .map_err(aws_error(KIND, "failed to delete internet gateway"))?;
        info!("🗑️  Deleted internet gateway {}", id);
        Ok(())
    }
}
