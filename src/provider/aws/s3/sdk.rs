//! # S3 SDK Adapter

use crate::provider::aws::errors::AwsError;
use crate::provider::aws::s3::S3Api;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;

#[derive(Debug, Clone)]
pub struct SdkS3 {
    client: Client,
}

impl SdkS3 {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl S3Api for SdkS3 {
    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, AwsError> {
        let output = self.client.get_bucket_policy().bucket(bucket).send().await?;
        Ok(output.policy().map(str::to_string))
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), AwsError> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_bucket_policy(&self, bucket: &str) -> Result<(), AwsError> {
        self.client
            .delete_bucket_policy()
            .bucket(bucket)
            .send()
            .await?;
        Ok(())
    }
}
