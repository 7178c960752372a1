//! In-memory [`AcmPcaApi`] for handler tests.

use crate::crd::acmpca::{CertificateAuthorityParameters, RevocationConfiguration};
use crate::crd::Tag;
use crate::provider::aws::acmpca::AcmPcaApi;
use crate::provider::aws::errors::AwsError;
use async_trait::async_trait;
use aws_sdk_acmpca::types::{CertificateAuthority, Permission};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const NEW_ARN: &str = "arn:aws:acm-pca:us-east-1:123456789012:certificate-authority/new";

#[derive(Debug, Default)]
pub struct State {
    pub authorities: BTreeMap<String, CertificateAuthority>,
    pub tags: BTreeMap<String, Vec<Tag>>,
    pub permissions: BTreeMap<String, Vec<Permission>>,
    pub failures: BTreeMap<&'static str, AwsError>,
    pub calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeAcmPca {
    pub state: Mutex<State>,
}

impl FakeAcmPca {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, f: impl FnOnce(&mut State)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
        self
    }

    pub fn fail(&self, operation: &'static str, err: AwsError) {
        self.state.lock().unwrap().failures.insert(operation, err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    fn call(&self, operation: &'static str, detail: String) -> Result<(), AwsError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{operation} {detail}").trim_end().to_string());
        match state.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AcmPcaApi for FakeAcmPca {
    async fn describe_certificate_authority(
        &self,
        arn: &str,
    ) -> Result<Option<CertificateAuthority>, AwsError> {
        self.call("describe_certificate_authority", arn.to_string())?;
        Ok(self.state.lock().unwrap().authorities.get(arn).cloned())
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, AwsError> {
        self.call("list_tags", arn.to_string())?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .tags
            .get(arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_certificate_authority(
        &self,
        params: &CertificateAuthorityParameters,
        idempotency_token: &str,
    ) -> Result<String, AwsError> {
        self.call(
            "create_certificate_authority",
            format!(
                "{} {} {}",
                params.r#type,
                params.certificate_authority_configuration.subject.common_name,
                idempotency_token
            ),
        )?;
        Ok(NEW_ARN.to_string())
    }

    async fn update_certificate_authority(
        &self,
        arn: &str,
        status: Option<&str>,
        revocation: Option<&RevocationConfiguration>,
    ) -> Result<(), AwsError> {
        let crl = revocation
            .and_then(|r| r.crl_configuration.as_ref())
            .map(|c| format!(" crl={}", c.enabled))
            .unwrap_or_default();
        self.call(
            "update_certificate_authority",
            format!("{arn} {}{crl}", status.unwrap_or("-")),
        )
    }

    async fn tag_certificate_authority(&self, arn: &str, tags: &[Tag]) -> Result<(), AwsError> {
        let keys: Vec<&str> = tags.iter().map(|t| t.key.as_str()).collect();
        self.call("tag_certificate_authority", format!("{arn} {}", keys.join(",")))
    }

    async fn untag_certificate_authority(
        &self,
        arn: &str,
        keys: &[String],
    ) -> Result<(), AwsError> {
        self.call("untag_certificate_authority", format!("{arn} {}", keys.join(",")))
    }

    async fn delete_certificate_authority(
        &self,
        arn: &str,
        permanent_deletion_time_in_days: Option<i32>,
    ) -> Result<(), AwsError> {
        let days = permanent_deletion_time_in_days
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        self.call("delete_certificate_authority", format!("{arn} {days}"))
    }

    async fn list_permissions(&self, ca_arn: &str) -> Result<Vec<Permission>, AwsError> {
        self.call("list_permissions", ca_arn.to_string())?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .permissions
            .get(ca_arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_permission(
        &self,
        ca_arn: &str,
        principal: &str,
        source_account: Option<&str>,
    ) -> Result<(), AwsError> {
        self.call(
            "create_permission",
            format!("{ca_arn} {principal} {}", source_account.unwrap_or_default()),
        )
    }

    async fn delete_permission(
        &self,
        ca_arn: &str,
        principal: &str,
        source_account: Option<&str>,
    ) -> Result<(), AwsError> {
        self.call(
            "delete_permission",
            format!("{ca_arn} {principal} {}", source_account.unwrap_or_default()),
        )
    }
}
