//! In-memory [`S3Api`] for handler tests.

use crate::provider::aws::errors::AwsError;
use crate::provider::aws::s3::S3Api;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct State {
    pub policies: BTreeMap<String, String>,
    pub failures: BTreeMap<&'static str, AwsError>,
    pub calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeS3 {
    pub state: Mutex<State>,
}

impl FakeS3 {
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

    fn call(&self, operation: &'static str, detail: &str) -> Result<(), AwsError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{operation} {detail}"));
        match state.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl S3Api for FakeS3 {
    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, AwsError> {
        self.call("get_bucket_policy", bucket)?;
        match self.state.lock().unwrap().policies.get(bucket) {
            Some(policy) => Ok(Some(policy.clone())),
            None => Err(AwsError::service(
                "NoSuchBucketPolicy",
                "The bucket policy does not exist",
            )),
        }
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), AwsError> {
        self.call("put_bucket_policy", bucket)?;
        self.state
            .lock()
            .unwrap()
            .policies
            .insert(bucket.to_string(), policy.to_string());
        Ok(())
    }

    async fn delete_bucket_policy(&self, bucket: &str) -> Result<(), AwsError> {
        self.call("delete_bucket_policy", bucket)?;
        self.state.lock().unwrap().policies.remove(bucket);
        Ok(())
    }
}
