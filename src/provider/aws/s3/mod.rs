//! # S3 Handlers

pub mod bucket_policy;
mod sdk;
#[cfg(test)]
pub(crate) mod testing;

pub use bucket_policy::BucketPolicyClient;
pub use sdk::SdkS3;

use crate::provider::aws::errors::AwsError;
use async_trait::async_trait;

/// The S3 operations the bucket policy handler needs
#[async_trait]
pub trait S3Api: Send + Sync {
    /// The policy JSON, `None` when the bucket has no policy
    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, AwsError>;

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), AwsError>;

    async fn delete_bucket_policy(&self, bucket: &str) -> Result<(), AwsError>;
}
