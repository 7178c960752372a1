//! In-memory [`S3ControlApi`] for handler tests.

use crate::crd::s3control::AccessPointParameters;
use crate::provider::aws::errors::AwsError;
use crate::provider::aws::s3control::S3ControlApi;
use async_trait::async_trait;
use aws_sdk_s3control::operation::get_access_point::GetAccessPointOutput;
use aws_sdk_s3control::types::NetworkOrigin;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const ACCOUNT: &str = "123456789012";

#[derive(Debug)]
pub struct State {
    pub account: String,
    pub access_points: BTreeMap<String, GetAccessPointOutput>,
    pub policies: BTreeMap<String, String>,
    pub failures: BTreeMap<&'static str, AwsError>,
    pub calls: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            account: ACCOUNT.to_string(),
            access_points: BTreeMap::new(),
            policies: BTreeMap::new(),
            failures: BTreeMap::new(),
            calls: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeS3Control {
    pub state: Mutex<State>,
}

pub fn access_point(name: &str, bucket: &str) -> GetAccessPointOutput {
    GetAccessPointOutput::builder()
        .name(name)
        .bucket(bucket)
        .network_origin(NetworkOrigin::Internet)
        .alias(format!("{name}-abc123-s3alias"))
        .bucket_account_id(ACCOUNT)
        .build()
}

impl FakeS3Control {
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

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
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
impl S3ControlApi for FakeS3Control {
    async fn caller_account_id(&self) -> Result<String, AwsError> {
        self.call("caller_account_id", String::new())?;
        Ok(self.state.lock().unwrap().account.clone())
    }

    async fn get_access_point(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<Option<GetAccessPointOutput>, AwsError> {
        self.call("get_access_point", format!("{account_id} {name}"))?;
        match self.state.lock().unwrap().access_points.get(name) {
            Some(point) => Ok(Some(point.clone())),
            None => Err(AwsError::service(
                "NoSuchAccessPoint",
                "The specified accesspoint does not exist",
            )),
        }
    }

    async fn create_access_point(
        &self,
        account_id: &str,
        name: &str,
        params: &AccessPointParameters,
    ) -> Result<Option<String>, AwsError> {
        self.call(
            "create_access_point",
            format!("{account_id} {name} {}", params.bucket),
        )?;
        if self.state.lock().unwrap().access_points.contains_key(name) {
            return Err(AwsError::service(
                "AccessPointAlreadyOwnedByYou",
                "Your previous request to create the named accesspoint succeeded",
            ));
        }
        let point = access_point(name, &params.bucket);
        let alias = point.alias().map(str::to_string);
        self.state
            .lock()
            .unwrap()
            .access_points
            .insert(name.to_string(), point);
        Ok(alias)
    }

    async fn delete_access_point(&self, account_id: &str, name: &str) -> Result<(), AwsError> {
        self.call("delete_access_point", format!("{account_id} {name}"))?;
        let mut state = self.state.lock().unwrap();
        state.access_points.remove(name);
        state.policies.remove(name);
        Ok(())
    }

    async fn get_access_point_policy(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<Option<String>, AwsError> {
        self.call("get_access_point_policy", format!("{account_id} {name}"))?;
        match self.state.lock().unwrap().policies.get(name) {
            Some(policy) => Ok(Some(policy.clone())),
            None => Err(AwsError::service(
                "NoSuchAccessPointPolicy",
                "The specified accesspoint policy does not exist",
            )),
        }
    }

    async fn put_access_point_policy(
        &self,
        account_id: &str,
        name: &str,
        policy: &str,
    ) -> Result<(), AwsError> {
        self.call("put_access_point_policy", format!("{account_id} {name}"))?;
        self.state
            .lock()
            .unwrap()
            .policies
            .insert(name.to_string(), policy.to_string());
        Ok(())
    }

    async fn delete_access_point_policy(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<(), AwsError> {
        self.call("delete_access_point_policy", format!("{account_id} {name}"))?;
        self.state.lock().unwrap().policies.remove(name);
        Ok(())
    }
}
