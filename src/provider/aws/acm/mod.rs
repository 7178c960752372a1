//! # ACM Handlers
//!
//! Certificates requested from Amazon or issued by a private CA.

pub mod certificate;
mod sdk;
#[cfg(test)]
pub(crate) mod testing;

pub use certificate::CertificateClient;
pub use sdk::SdkAcm;

use crate::crd::acm::CertificateParameters;
use crate::crd::Tag;
use crate::provider::aws::errors::AwsError;
use async_trait::async_trait;
use aws_sdk_acm::types::CertificateDetail;

/// The ACM operations the certificate handler needs
#[async_trait]
pub trait AcmApi: Send + Sync {
    async fn describe_certificate(&self, arn: &str)
        -> Result<Option<CertificateDetail>, AwsError>;

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, AwsError>;

    /// Returns the new certificate ARN
    async fn request_certificate(
        &self,
        params: &CertificateParameters,
        idempotency_token: &str,
    ) -> Result<String, AwsError>;

    async fn add_tags(&self, arn: &str, tags: &[Tag]) -> Result<(), AwsError>;

    async fn remove_tags(&self, arn: &str, keys: &[String]) -> Result<(), AwsError>;

    async fn update_transparency_logging(
        &self,
        arn: &str,
        preference: &str,
    ) -> Result<(), AwsError>;

    async fn renew_certificate(&self, arn: &str) -> Result<(), AwsError>;

    async fn delete_certificate(&self, arn: &str) -> Result<(), AwsError>;
}
