//! # S3 Bucket Policy
//!
//! External name: the bucket name. The policy is compared structurally, so a
//! server copy that only differs in key order or single-element arrays never
//! triggers a put.

use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::s3::BucketPolicy;
use crate::crd::{Condition, Managed};
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::policy::{policies_equal, PolicyDocument};
use crate::provider::aws::s3::S3Api;
use crate::provider::aws::{found, required_external_name};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::BucketPolicy;

pub struct BucketPolicyClient {
    api: Arc<dyn S3Api>,
}

impl std::fmt::Debug for BucketPolicyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketPolicyClient").finish_non_exhaustive()
    }
}

impl BucketPolicyClient {
    pub fn new(api: Arc<dyn S3Api>) -> Self {
        Self { api }
    }

    async fn put(&self, bucket: &str, policy: &str) -> Result<(), ReconcilerError> {
        PolicyDocument::parse(policy)?;
        self.api
            .put_bucket_policy(bucket, policy)
            .await
            .map_err(aws_error(KIND, "failed to put bucket policy"))
    }
}

#[async_trait]
impl ExternalClient<BucketPolicy> for BucketPolicyClient {
    async fn observe(&self, mg: &mut BucketPolicy) -> Result<ExternalObservation, ReconcilerError> {
        let bucket = required_external_name(mg)?;
        let Some(observed) = found(
            KIND,
            "failed to get bucket policy",
            self.api.get_bucket_policy(&bucket).await,
        )?
        else {
            return Ok(ExternalObservation::not_found());
        };

        let up_to_date = policies_equal(&mg.spec.for_provider.policy, &observed)?;
        mg.set_conditions([Condition::available()]);
        Ok(ExternalObservation::exists(up_to_date))
    }

    async fn create(&self, mg: &mut BucketPolicy) -> Result<ExternalCreation, ReconcilerError> {
        let p = &mg.spec.for_provider;
        self.put(&p.bucket_name, &p.policy).await?;
        info!("✅ Attached policy to bucket {}", p.bucket_name);
        Ok(ExternalCreation::named(p.bucket_name.clone()))
    }

    async fn update(&self, mg: &mut BucketPolicy) -> Result<ExternalUpdate, ReconcilerError> {
        let bucket = required_external_name(mg)?;
        self.put(&bucket, &mg.spec.for_provider.policy).await?;
        debug!("Replaced policy of bucket {}", bucket);
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut BucketPolicy) -> Result<(), ReconcilerError> {
        let bucket = required_external_name(mg)?;
        self.api
            .delete_bucket_policy(&bucket)
            .await
            .map_err(aws_error(KIND, "failed to delete bucket policy"))?;
        info!("🗑️  Deleted policy of bucket {}", bucket);
        Ok(())
    }
}
