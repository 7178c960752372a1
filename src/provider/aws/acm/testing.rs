//! In-memory [`AcmApi`] for handler tests.

use crate::crd::acm::CertificateParameters;
use crate::crd::Tag;
use crate::provider::aws::acm::AcmApi;
use crate::provider::aws::errors::AwsError;
use async_trait::async_trait;
use aws_sdk_acm::types::CertificateDetail;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const NEW_ARN: &str = "arn:aws:acm:us-east-1:123456789012:certificate/new";

#[derive(Debug, Default)]
pub struct State {
    pub certificates: BTreeMap<String, CertificateDetail>,
    pub tags: BTreeMap<String, Vec<Tag>>,
    pub failures: BTreeMap<&'static str, AwsError>,
    pub calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeAcm {
    pub state: Mutex<State>,
}

impl FakeAcm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, f: impl FnOnce(&mut State)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
        self
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
impl AcmApi for FakeAcm {
    async fn describe_certificate(
        &self,
        arn: &str,
    ) -> Result<Option<CertificateDetail>, AwsError> {
        self.call("describe_certificate", arn.to_string())?;
        Ok(self.state.lock().unwrap().certificates.get(arn).cloned())
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

    async fn request_certificate(
        &self,
        params: &CertificateParameters,
        idempotency_token: &str,
    ) -> Result<String, AwsError> {
        let keys: Vec<&str> = params.tags.iter().map(|t| t.key.as_str()).collect();
        self.call(
            "request_certificate",
            format!(
                "{} {} {} {}",
                params.domain_name,
                params.validation_method.as_deref().unwrap_or("-"),
                keys.join(","),
                idempotency_token
            ),
        )?;
        Ok(NEW_ARN.to_string())
    }

    async fn add_tags(&self, arn: &str, tags: &[Tag]) -> Result<(), AwsError> {
        let keys: Vec<&str> = tags.iter().map(|t| t.key.as_str()).collect();
        self.call("add_tags", format!("{arn} {}", keys.join(",")))
    }

    async fn remove_tags(&self, arn: &str, keys: &[String]) -> Result<(), AwsError> {
        self.call("remove_tags", format!("{arn} {}", keys.join(",")))
    }

    async fn update_transparency_logging(
        &self,
        arn: &str,
        preference: &str,
    ) -> Result<(), AwsError> {
        self.call("update_transparency_logging", format!("{arn} {preference}"))
    }

    async fn renew_certificate(&self, arn: &str) -> Result<(), AwsError> {
        self.call("renew_certificate", arn.to_string())
    }

    async fn delete_certificate(&self, arn: &str) -> Result<(), AwsError> {
        self.call("delete_certificate", arn.to_string())
    }
}
