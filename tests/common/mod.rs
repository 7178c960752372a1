//! Fakes shared by the scenario tests

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use aws_sdk_acm::types::{
    CertificateDetail, CertificateOptions, CertificateStatus,
    CertificateTransparencyLoggingPreference, CertificateType,
};
use kube::api::ApiResource;
use provider_aws::controller::reconciler::{
    Connector, Engine, ExternalClient, InMemoryStore, NoopPublisher, ReconcilerError, Timing,
};
use provider_aws::controller::reference::{
    ObjectReader, ReferenceError, ReferencedObject, ResolveReferences,
};
use provider_aws::crd::acm::CertificateParameters;
use provider_aws::crd::{Managed, Tag};
use provider_aws::provider::aws::acm::AcmApi;
use provider_aws::provider::aws::errors::AwsError;
use provider_aws::provider::aws::s3::S3Api;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CERTIFICATE_ARN: &str = "arn:aws:acm:us-east-1:123456789012:certificate/5e7f";

pub fn timing() -> Timing {
    Timing {
        poll_interval: Duration::from_secs(60),
        short_wait: Duration::from_secs(10),
        create_requeue: Duration::from_secs(1),
    }
}

type Build<K> = Arc<dyn Fn() -> Box<dyn ExternalClient<K>> + Send + Sync>;

/// Hands out a fresh client per pass, like the AWS connector does
pub struct FnConnector<K> {
    build: Build<K>,
}

#[async_trait]
impl<K: Managed> Connector<K> for FnConnector<K> {
    async fn connect(&self, _mg: &K) -> Result<Box<dyn ExternalClient<K>>, ReconcilerError> {
        Ok((self.build)())
    }
}

/// A cluster with no referenced objects
pub struct EmptyReader;

#[async_trait]
impl ObjectReader for EmptyReader {
    async fn get(
        &self,
        _resource: &ApiResource,
        _name: &str,
    ) -> Result<Option<ReferencedObject>, ReferenceError> {
        Ok(None)
    }

    async fn list(
        &self,
        _resource: &ApiResource,
        _labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ReferencedObject>, ReferenceError> {
        Ok(Vec::new())
    }
}

pub fn engine<K>(
    kind: &'static str,
    store: Arc<InMemoryStore<K>>,
    build: impl Fn() -> Box<dyn ExternalClient<K>> + Send + Sync + 'static,
) -> Engine<K>
where
    K: Managed + ResolveReferences,
{
    Engine::new(
        kind,
        Arc::new(FnConnector {
            build: Arc::new(build),
        }),
        store,
        Arc::new(EmptyReader),
        Arc::new(NoopPublisher),
        timing(),
    )
}

/// Marks `mg` as deleted
pub fn deleting<K: Managed>(mut mg: K) -> K {
    mg.meta_mut().deletion_timestamp =
        Some(serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z")).unwrap());
    mg
}

/// ACM account holding certificates by ARN
#[derive(Debug, Default)]
pub struct FakeAcm {
    pub certificates: Mutex<BTreeMap<String, CertificateDetail>>,
    pub tags: Mutex<BTreeMap<String, Vec<Tag>>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeAcm {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    /// Validation completes: the certificate is issued with transparency logging on
    pub fn issue(&self, arn: &str) {
        let detail = CertificateDetail::builder()
            .certificate_arn(arn)
            .domain_name("example.com")
            .status(CertificateStatus::Issued)
            .r#type(CertificateType::AmazonIssued)
            .options(
                CertificateOptions::builder()
                    .certificate_transparency_logging_preference(
                        CertificateTransparencyLoggingPreference::Enabled,
                    )
                    .build(),
            )
            .build();
        self.certificates
            .lock()
            .unwrap()
            .insert(arn.to_string(), detail);
    }
}

#[async_trait]
impl AcmApi for FakeAcm {
    async fn describe_certificate(
        &self,
        arn: &str,
    ) -> Result<Option<CertificateDetail>, AwsError> {
        self.record(format!("describe_certificate {arn}"));
        Ok(self.certificates.lock().unwrap().get(arn).cloned())
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, AwsError> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .get(arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn request_certificate(
        &self,
        params: &CertificateParameters,
        _idempotency_token: &str,
    ) -> Result<String, AwsError> {
        let tags: Vec<String> = params
            .tags
            .iter()
            .map(|t| format!("{}={}", t.key, t.value.as_deref().unwrap_or_default()))
            .collect();
        self.record(format!(
            "request_certificate {} {} {}",
            params.domain_name,
            params.validation_method.as_deref().unwrap_or("-"),
            tags.join(",")
        ));
        let detail = CertificateDetail::builder()
            .certificate_arn(CERTIFICATE_ARN)
            .domain_name(&params.domain_name)
            .status(CertificateStatus::PendingValidation)
            .r#type(CertificateType::AmazonIssued)
            .build();
        self.certificates
            .lock()
            .unwrap()
            .insert(CERTIFICATE_ARN.to_string(), detail);
        self.tags
            .lock()
            .unwrap()
            .insert(CERTIFICATE_ARN.to_string(), params.tags.clone());
        Ok(CERTIFICATE_ARN.to_string())
    }

    async fn add_tags(&self, arn: &str, _tags: &[Tag]) -> Result<(), AwsError> {
        self.record(format!("add_tags {arn}"));
        Ok(())
    }

    async fn remove_tags(&self, arn: &str, _keys: &[String]) -> Result<(), AwsError> {
        self.record(format!("remove_tags {arn}"));
        Ok(())
    }

    async fn update_transparency_logging(
        &self,
        arn: &str,
        preference: &str,
    ) -> Result<(), AwsError> {
        self.record(format!("update_transparency_logging {arn} {preference}"));
        Ok(())
    }

    async fn renew_certificate(&self, arn: &str) -> Result<(), AwsError> {
        self.record(format!("renew_certificate {arn}"));
        Ok(())
    }

    async fn delete_certificate(&self, arn: &str) -> Result<(), AwsError> {
        self.record(format!("delete_certificate {arn}"));
        self.certificates.lock().unwrap().remove(arn);
        Ok(())
    }
}

/// S3 account holding bucket policies by bucket name
#[derive(Debug, Default)]
pub struct FakeS3 {
    pub policies: Mutex<BTreeMap<String, String>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeS3 {
    pub fn with_policy(bucket: &str, policy: &str) -> Self {
        let fake = Self::default();
        fake.policies
            .lock()
            .unwrap()
            .insert(bucket.to_string(), policy.to_string());
        fake
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl S3Api for FakeS3 {
    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, AwsError> {
        self.record(format!("get_bucket_policy {bucket}"));
        Ok(self.policies.lock().unwrap().get(bucket).cloned())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), AwsError> {
        self.record(format!("put_bucket_policy {bucket}"));
        self.policies
            .lock()
            .unwrap()
            .insert(bucket.to_string(), policy.to_string());
        Ok(())
    }

    async fn delete_bucket_policy(&self, bucket: &str) -> Result<(), AwsError> {
        self.record(format!("delete_bucket_policy {bucket}"));
        self.policies.lock().unwrap().remove(bucket);
        Ok(())
    }
}
