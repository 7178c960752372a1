//! # EC2 Networking Handlers
//!
//! One [`ExternalClient`](crate::controller::reconciler::ExternalClient) per
//! EC2 kind, all talking to AWS through [`Ec2Api`].

pub mod address;
pub mod api;
pub mod internet_gateway;
pub mod nat_gateway;
pub mod permissions;
pub mod route_table;
mod sdk;
pub mod security_group;
pub mod subnet;
#[cfg(test)]
pub(crate) mod testing;
pub mod vpc;
pub mod vpc_cidr_block;

pub use api::*;
pub use sdk::SdkEc2;

pub(crate) use super::{found, required, required_external_name, timestamp};

use crate::controller::reconciler::{aws_error, ReconcilerError};
use crate::crd::Tag;
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::tags::{diff_tags, tags_from_pairs, ValueComparison};
use aws_sdk_ec2::types as sdk_types;
use tracing::debug;

/// Spec-shaped tags from an EC2 describe response
pub(crate) fn observed_tags(tags: &[sdk_types::Tag]) -> Vec<Tag> {
    tags_from_pairs(
        tags.iter()
            .map(|t| (t.key().map(str::to_string), t.value().map(str::to_string))),
    )
}

/// EC2 tag values are case sensitive
pub(crate) const TAG_VALUES: ValueComparison = ValueComparison::CaseSensitive;

/// Remove stale tag keys, then write missing or changed tags
pub(crate) async fn sync_tags(
    api: &dyn Ec2Api,
    kind: ResourceKind,
    resource_id: &str,
    desired: &[Tag],
    observed: &[Tag],
) -> Result<(), ReconcilerError> {
    let diff = diff_tags(desired, observed, TAG_VALUES);
    if !diff.remove.is_empty() {
        debug!("Removing {} tag(s) from {}", diff.remove.len(), resource_id);
        api.delete_tags(resource_id, &diff.remove)
            .await
            .map_err(aws_error(kind, "failed to delete tags"))?;
    }
    if !diff.add.is_empty() {
        debug!("Writing {} tag(s) to {}", diff.add.len(), resource_id);
        api.create_tags(resource_id, &diff.add)
            .await
            .map_err(aws_error(kind, "failed to create tags"))?;
    }
    Ok(())
}
