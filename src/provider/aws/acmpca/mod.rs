//! # ACM Private CA Handlers
//!
//! Certificate authorities and the permissions that let ACM issue and renew
//! certificates from them.

pub mod certificate_authority;
pub mod permission;
mod sdk;
#[cfg(test)]
pub(crate) mod testing;

pub use certificate_authority::CertificateAuthorityClient;
pub use permission::PermissionClient;
pub use sdk::SdkAcmPca;

use crate::crd::acmpca::{CertificateAuthorityParameters, RevocationConfiguration};
use crate::crd::Tag;
use crate::provider::aws::errors::AwsError;
use async_trait::async_trait;
use aws_sdk_acmpca::types::{CertificateAuthority, Permission};

/// Actions granted to a principal by a CA permission
pub const PERMISSION_ACTIONS: [&str; 3] = ["IssueCertificate", "GetCertificate", "ListPermissions"];

/// The ACM PCA operations the CA and permission handlers need
#[async_trait]
pub trait AcmPcaApi: Send + Sync {
    async fn describe_certificate_authority(
        &self,
        arn: &str,
    ) -> Result<Option<CertificateAuthority>, AwsError>;

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, AwsError>;

    /// Returns the new CA ARN
    async fn create_certificate_authority(
        &self,
        params: &CertificateAuthorityParameters,
        idempotency_token: &str,
    ) -> Result<String, AwsError>;

    async fn update_certificate_authority(
        &self,
        arn: &str,
        status: Option<&str>,
        revocation: Option<&RevocationConfiguration>,
    ) -> Result<(), AwsError>;

    async fn tag_certificate_authority(&self, arn: &str, tags: &[Tag]) -> Result<(), AwsError>;

    async fn untag_certificate_authority(&self, arn: &str, keys: &[String])
        -> Result<(), AwsError>;

    async fn delete_certificate_authority(
        &self,
        arn: &str,
        permanent_deletion_time_in_days: Option<i32>,
    ) -> Result<(), AwsError>;

    async fn list_permissions(&self, ca_arn: &str) -> Result<Vec<Permission>, AwsError>;

    async fn create_permission(
        &self,
        ca_arn: &str,
        principal: &str,
        source_account: Option<&str>,
    ) -> Result<(), AwsError>;

    async fn delete_permission(
        &self,
        ca_arn: &str,
        principal: &str,
        source_account: Option<&str>,
    ) -> Result<(), AwsError>;
}
