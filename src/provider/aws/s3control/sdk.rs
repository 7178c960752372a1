//! # S3 Control SDK Adapter

use crate::crd::s3control::AccessPointParameters;
use crate::provider::aws::errors::AwsError;
use crate::provider::aws::s3control::S3ControlApi;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3control::operation::get_access_point::GetAccessPointOutput;
use aws_sdk_s3control::types::{PublicAccessBlockConfiguration, VpcConfiguration};
use aws_sdk_s3control::Client;

#[derive(Debug, Clone)]
pub struct SdkS3Control {
    client: Client,
    sts: aws_sdk_sts::Client,
}

impl SdkS3Control {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
            sts: aws_sdk_sts::Client::new(config),
        }
    }
}

#[async_trait]
impl S3ControlApi for SdkS3Control {
    async fn caller_account_id(&self) -> Result<String, AwsError> {
        let output = self.sts.get_caller_identity().send().await?;
        output
            .account()
            .map(str::to_string)
            .ok_or_else(|| AwsError::construction("GetCallerIdentity returned no account"))
    }

    async fn get_access_point(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<Option<GetAccessPointOutput>, AwsError> {
        let output = self
            .client
            .get_access_point()
            .account_id(account_id)
            .name(name)
            .send()
            .await?;
        Ok(Some(output))
    }

    async fn create_access_point(
        &self,
        account_id: &str,
        name: &str,
        params: &AccessPointParameters,
    ) -> Result<Option<String>, AwsError> {
        let vpc = params
            .vpc_configuration
            .as_ref()
            .and_then(|v| v.vpc_id.as_ref())
            .map(|id| {
                VpcConfiguration::builder()
                    .vpc_id(id)
                    .build()
                    .map_err(AwsError::construction)
            })
            .transpose()?;
        let block = params.public_access_block_configuration.as_ref().map(|b| {
            PublicAccessBlockConfiguration::builder()
                .set_block_public_acls(b.block_public_acls)
                .set_block_public_policy(b.block_public_policy)
                .set_ignore_public_acls(b.ignore_public_acls)
                .set_restrict_public_buckets(b.restrict_public_buckets)
                .build()
        });
        let output = self
            .client
            .create_access_point()
            .account_id(account_id)
            .name(name)
            .bucket(&params.bucket)
            .set_vpc_configuration(vpc)
            .set_public_access_block_configuration(block)
            .send()
            .await?;
        Ok(output.alias().map(str::to_string))
    }

    async fn delete_access_point(&self, account_id: &str, name: &str) -> Result<(), AwsError> {
        self.client
            .delete_access_point()
            .account_id(account_id)
            .name(name)
            .send()
            .await?;
        Ok(())
    }

    async fn get_access_point_policy(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<Option<String>, AwsError> {
        let output = self
            .client
            .get_access_point_policy()
            .account_id(account_id)
            .name(name)
            .send()
            .await?;
        Ok(output.policy().map(str::to_string))
    }

    async fn put_access_point_policy(
        &self,
        account_id: &str,
        name: &str,
        policy: &str,
    ) -> Result<(), AwsError> {
        self.client
            .put_access_point_policy()
            .account_id(account_id)
            .name(name)
            .policy(policy)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_access_point_policy(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<(), AwsError> {
        self.client
            .delete_access_point_policy()
            .account_id(account_id)
            .name(name)
            .send()
            .await?;
        Ok(())
    }
}
