//! # Elastic IP Address
//!
//! External name: the allocation id in the `vpc` domain, the public IP in the
//! `standard` domain. The public IP and allocation id are published as
//! connection details.

use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ConnectionDetails, ExternalClient, ExternalCreation, ExternalObservation,
    ExternalUpdate, ReconcilerError,
};
use crate::crd::ec2::{Address, AddressObservation, AddressParameters};
use crate::crd::{Condition, Managed};
use crate::provider::aws::ec2::{
    found, observed_tags, required_external_name, sync_tags, AddressKey, Ec2Api, TAG_VALUES,
};
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::tags::tags_up_to_date;
use async_trait::async_trait;
use aws_sdk_ec2::types as sdk;
use std::sync::Arc;
use tracing::info;

const KIND: ResourceKind = ResourceKind::Address;

pub const CONNECTION_PUBLIC_IP: &str = "publicIp";
pub const CONNECTION_ALLOCATION_ID: &str = "allocationId";

pub struct AddressClient {
    api: Arc<dyn Ec2Api>,
}

impl std::fmt::Debug for AddressClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressClient").finish_non_exhaustive()
    }
}

/// How the external name identifies the address
fn address_key(params: &AddressParameters, external_name: String) -> AddressKey {
    if params.is_vpc_domain() {
        AddressKey::AllocationId(external_name)
    } else {
        AddressKey::PublicIp(external_name)
    }
}

fn connection_details(public_ip: Option<&str>, allocation_id: Option<&str>) -> ConnectionDetails {
    let mut details = ConnectionDetails::new();
    if let Some(ip) = public_ip {
        details.insert(CONNECTION_PUBLIC_IP.to_string(), ip.as_bytes().to_vec());
    }
    if let Some(id) = allocation_id {
        details.insert(CONNECTION_ALLOCATION_ID.to_string(), id.as_bytes().to_vec());
    }
    details
}

fn observation(address: &sdk::Address) -> AddressObservation {
    AddressObservation {
        allocation_id: address.allocation_id().map(str::to_string),
        public_ip: address.public_ip().map(str::to_string),
        association_id: address.association_id().map(str::to_string),
        private_ip_address: address.private_ip_address().map(str::to_string),
        network_interface_id: address.network_interface_id().map(str::to_string),
        instance_id: address.instance_id().map(str::to_string),
        domain: address.domain().map(|d| d.as_str().to_string()),
    }
}

impl AddressClient {
    pub fn new(api: Arc<dyn Ec2Api>) -> Self {
        Self { api }
    }

    async fn describe(&self, mg: &Address) -> Result<Option<sdk::Address>, ReconcilerError> {
        let key = address_key(&mg.spec.for_provider, required_external_name(mg)?);
        found(
            KIND,
            "failed to describe address",
            self.api.describe_address(&key).await,
        )
    }
}

#[async_trait]
impl ExternalClient<Address> for AddressClient {
    async fn observe(&self, mg: &mut Address) -> Result<ExternalObservation, ReconcilerError> {
        let Some(address) = self.describe(mg).await? else {
            return Ok(ExternalObservation::not_found());
        };

        let p = &mut mg.spec.for_provider;
        let mut li = LateInitializer::new();
        li.value(&mut p.domain, address.domain().map(|d| d.as_str().to_string()));
        li.value(
            &mut p.public_ipv4_pool,
            address.public_ipv4_pool().map(str::to_string),
        );
        li.value(
            &mut p.network_border_group,
            address.network_border_group().map(str::to_string),
        );
        li.value(
            &mut p.customer_owned_ipv4_pool,
            address.customer_owned_ipv4_pool().map(str::to_string),
        );
        // standard-domain addresses cannot carry tags
        let up_to_date = !p.is_vpc_domain()
            || tags_up_to_date(&p.tags, &observed_tags(address.tags()), TAG_VALUES);

        mg.status.get_or_insert_with(Default::default).at_provider = Some(observation(&address));
        mg.set_conditions([Condition::available()]);

        Ok(ExternalObservation::exists(up_to_date)
            .late_initialized(li.changed())
            .with_connection_details(connection_details(
                address.public_ip(),
                address.allocation_id(),
            )))
    }

    async fn create(&self, mg: &mut Address) -> Result<ExternalCreation, ReconcilerError> {
        let p = &mg.spec.for_provider;
        let allocated = self
            .api
            .allocate_address(p)
            .await
            .map_err(aws_error(KIND, "failed to allocate address"))?;
        let external_name = if p.is_vpc_domain() {
            allocated.allocation_id.clone()
        } else {
            allocated.public_ip.clone()
        }
        .ok_or_else(|| ReconcilerError::Invalid("AWS returned no address identifier".into()))?;
        info!("✅ Allocated Elastic IP {}", external_name);
        Ok(ExternalCreation {
            external_name: Some(external_name),
            connection_details: connection_details(
                allocated.public_ip.as_deref(),
                allocated.allocation_id.as_deref(),
            ),
        })
    }

    async fn update(&self, mg: &mut Address) -> Result<ExternalUpdate, ReconcilerError> {
        let Some(address) = self.describe(mg).await? else {
            return Err(ReconcilerError::Invalid("address disappeared".into()));
        };
        if let Some(allocation_id) = address.allocation_id() {
            let tags = observed_tags(address.tags());
            sync_tags(
                self.api.as_ref(),
                KIND,
                allocation_id,
                &mg.spec.for_provider.tags,
                &tags,
            )
            .await?;
        }
        Ok(ExternalUpdate {
            connection_details: connection_details(address.public_ip(), address.allocation_id()),
        })
    }

    async fn delete(&self, mg: &mut Address) -> Result<(), ReconcilerError> {
        let key = address_key(&mg.spec.for_provider, required_external_name(mg)?);
        self.api
            .release_address(&key)
            .await
            .map_err(aws_error(KIND, "failed to release address"))?;
        info!("🗑️  Released Elastic IP {:?}", key);
        Ok(())
    }
}
