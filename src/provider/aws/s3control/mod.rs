//! # S3 Control Handlers
//!
//! Access points, with the access point policy reconciled by a nested
//! sub-controller.

pub mod access_point;
pub mod policy;
mod sdk;
#[cfg(test)]
pub(crate) mod testing;

pub use access_point::AccessPointClient;
pub use policy::{PolicyController, PolicyState};
pub use sdk::SdkS3Control;

use crate::crd::s3control::AccessPointParameters;
use crate::provider::aws::errors::AwsError;
use async_trait::async_trait;
use aws_sdk_s3control::operation::get_access_point::GetAccessPointOutput;

/// The S3 Control and STS operations the access point handler needs
#[async_trait]
pub trait S3ControlApi: Send + Sync {
    /// Account of the credentials in use
    async fn caller_account_id(&self) -> Result<String, AwsError>;

    async fn get_access_point(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<Option<GetAccessPointOutput>, AwsError>;

    /// Returns the access point alias
    async fn create_access_point(
        &self,
        account_id: &str,
        name: &str,
        params: &AccessPointParameters,
    ) -> Result<Option<String>, AwsError>;

    async fn delete_access_point(&self, account_id: &str, name: &str) -> Result<(), AwsError>;

    async fn get_access_point_policy(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<Option<String>, AwsError>;

    async fn put_access_point_policy(
        &self,
        account_id: &str,
        name: &str,
        policy: &str,
    ) -> Result<(), AwsError>;

    async fn delete_access_point_policy(&self, account_id: &str, name: &str)
        -> Result<(), AwsError>;
}
