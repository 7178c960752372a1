//! # S3 Access Point
//!
//! External name: the access point name, which is the resource name. The
//! access point itself is immutable; only its policy converges, through
//! [`PolicyController`]. `accountId` late-initialises from the caller identity.

use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::s3control::{AccessPoint, AccessPointObservation};
use crate::crd::{Condition, Managed};
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::s3control::{PolicyController, PolicyState, S3ControlApi};
use crate::provider::aws::{found, required_external_name};
use async_trait::async_trait;
use aws_sdk_s3control::operation::get_access_point::GetAccessPointOutput;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

const KIND: ResourceKind = ResourceKind::AccessPoint;

pub struct AccessPointClient {
    api: Arc<dyn S3ControlApi>,
    policy: PolicyController,
}

impl std::fmt::Debug for AccessPointClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPointClient").finish_non_exhaustive()
    }
}

fn observation(point: &GetAccessPointOutput) -> AccessPointObservation {
    AccessPointObservation {
        alias: point.alias().map(str::to_string),
        network_origin: point.network_origin().map(|o| o.as_str().to_string()),
        bucket_account_id: point.bucket_account_id().map(str::to_string),
    }
}

impl AccessPointClient {
    pub fn new(api: Arc<dyn S3ControlApi>) -> Self {
        Self {
            policy: PolicyController::new(Arc::clone(&api)),
            api,
        }
    }

    async fn account_id(&self, mg: &mut AccessPoint) -> Result<(String, bool), ReconcilerError> {
        if let Some(id) = &mg.spec.for_provider.account_id {
            return Ok((id.clone(), false));
        }
        let id = self
            .api
            .caller_account_id()
            .await
            .map_err(aws_error(KIND, "failed to look up caller account"))?;
        let mut li = LateInitializer::new();
        li.value(&mut mg.spec.for_provider.account_id, Some(id.clone()));
        Ok((id, li.changed()))
    }
}

#[async_trait]
impl ExternalClient<AccessPoint> for AccessPointClient {
    async fn observe(&self, mg: &mut AccessPoint) -> Result<ExternalObservation, ReconcilerError> {
        let name = required_external_name(mg)?;
        let (account, late_initialized) = self.account_id(mg).await?;
        let Some(point) = found(
            KIND,
            "failed to get access point",
            self.api.get_access_point(&account, &name).await,
        )?
        else {
            return Ok(ExternalObservation::not_found());
        };

        let policy = self
            .policy
            .observe(&account, &name, mg.spec.for_provider.policy.as_deref())
            .await?;

        mg.status.get_or_insert_with(Default::default).at_provider = Some(observation(&point));
        mg.set_conditions([Condition::available()]);

        Ok(ExternalObservation::exists(policy == PolicyState::Updated)
            .late_initialized(late_initialized))
    }

    async fn create(&self, mg: &mut AccessPoint) -> Result<ExternalCreation, ReconcilerError> {
        let name = mg.name_any();
        let (account, _) = self.account_id(mg).await?;
        let p = &mg.spec.for_provider;
        let alias = self
            .api
            .create_access_point(&account, &name, p)
            .await
            .map_err(aws_error(KIND, "failed to create access point"))?;
        info!(
            "✅ Created access point {} on bucket {} ({})",
            name,
            p.bucket,
            alias.as_deref().unwrap_or("no alias")
        );
        self.policy
            .reconcile(&account, &name, p.policy.as_deref())
            .await?;
        Ok(ExternalCreation::named(name))
    }

    async fn update(&self, mg: &mut AccessPoint) -> Result<ExternalUpdate, ReconcilerError> {
        let name = required_external_name(mg)?;
        let (account, _) = self.account_id(mg).await?;
        self.policy
            .reconcile(&account, &name, mg.spec.for_provider.policy.as_deref())
            .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut AccessPoint) -> Result<(), ReconcilerError> {
        let name = required_external_name(mg)?;
        let (account, _) = self.account_id(mg).await?;
        self.api
            .delete_access_point(&account, &name)
            .await
            .map_err(aws_error(KIND, "failed to delete access point"))?;
        info!("🗑️  Deleted access point {}", name);
        Ok(())
    }

    async fn find_existing(&self, mg: &AccessPoint) -> Result<Option<String>, ReconcilerError> {
        Ok(Some(mg.name_any()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::s3control::{AccessPointParameters, AccessPointSpec};
    use crate::crd::ResourceSpec;
    use crate::controller::reconciler::ErrorCategory;
    use crate::provider::aws::errors::AwsError;
    use crate::provider::aws::s3control::testing::{access_point, FakeS3Control, ACCOUNT};

    const POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"AWS":"arn:aws:iam::123456789012:root"},"Action":"s3:GetObject","Resource":"arn:aws:s3:us-east-1:123456789012:accesspoint/ap/object/*"}]}"#;

    fn point(policy: Option<&str>) -> AccessPoint {
        AccessPoint::new(
            "ap",
            AccessPointSpec {
                for_provider: AccessPointParameters {
                    region: "us-east-1".to_string(),
                    bucket: "b".to_string(),
                    policy: policy.map(str::to_string),
                    ..Default::default()
                },
                resource_spec: ResourceSpec::default(),
            },
        )
    }

    fn existing() -> Arc<FakeS3Control> {
        Arc::new(FakeS3Control::new().with(|s| {
            s.access_points.insert("ap".to_string(), access_point("ap", "b"));
        }))
    }

    fn client(fake: &Arc<FakeS3Control>) -> AccessPointClient {
        AccessPointClient::new(Arc::clone(fake) as Arc<dyn S3ControlApi>)
    }

    #[tokio::test]
    async fn test_account_id_late_initializes_from_caller() {
        let fake = existing();
        let mut mg = point(None);
        mg.set_external_name("ap");
        let observation = client(&fake).observe(&mut mg).await.unwrap();
        assert!(observation.resource_late_initialized);
        assert!(observation.resource_up_to_date);
        assert_eq!(mg.spec.for_provider.account_id.as_deref(), Some(ACCOUNT));
        assert_eq!(
            mg.status
                .as_ref()
                .and_then(|s| s.at_provider.as_ref())
                .and_then(|a| a.network_origin.as_deref()),
            Some("Internet")
        );

        let second = client(&fake).observe(&mut mg).await.unwrap();
        assert!(!second.resource_late_initialized);
        assert_eq!(
            fake.calls()
                .iter()
                .filter(|c| c.starts_with("caller_account_id"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_missing_access_point_is_not_found() {
        let fake = Arc::new(FakeS3Control::new());
        let mut mg = point(None);
        mg.set_external_name("ap");
        assert!(!client(&fake).observe(&mut mg).await.unwrap().resource_exists);
    }

    #[tokio::test]
    async fn test_create_attaches_policy() {
        let fake = Arc::new(FakeS3Control::new());
        let mut mg = point(Some(POLICY));
        let creation = client(&fake).create(&mut mg).await.unwrap();
        assert_eq!(creation.external_name.as_deref(), Some("ap"));
        assert_eq!(mg.spec.for_provider.account_id.as_deref(), Some(ACCOUNT));
        assert_eq!(
            fake.calls(),
            vec![
                "caller_account_id".to_string(),
                format!("create_access_point {ACCOUNT} ap b"),
                format!("get_access_point_policy {ACCOUNT} ap"),
                format!("put_access_point_policy {ACCOUNT} ap"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_policy_attach_recovers_through_existing_point() {
        let fake = Arc::new(FakeS3Control::new());
        fake.fail(
            "put_access_point_policy",
            AwsError::service("InternalError", "try again"),
        );
        let mut mg = point(Some(POLICY));
        assert!(client(&fake).create(&mut mg).await.is_err());

        let err = client(&fake).create(&mut mg).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::AlreadyExists);
        let name = client(&fake).find_existing(&mg).await.unwrap().unwrap();
        assert_eq!(name, "ap");

        fake.clear_failures();
        mg.set_external_name(name);
        assert!(!client(&fake).observe(&mut mg).await.unwrap().resource_up_to_date);
        client(&fake).update(&mut mg).await.unwrap();
        assert!(client(&fake).observe(&mut mg).await.unwrap().resource_up_to_date);
    }

    #[tokio::test]
    async fn test_policy_drift_reconciled_in_update() {
        let fake = existing();
        let mut mg = point(Some(POLICY));
        mg.set_external_name("ap");
        assert!(!client(&fake).observe(&mut mg).await.unwrap().resource_up_to_date);
        client(&fake).update(&mut mg).await.unwrap();
        assert!(client(&fake).observe(&mut mg).await.unwrap().resource_up_to_date);
    }

    #[tokio::test]
    async fn test_removed_policy_is_deleted() {
        let fake = Arc::new(FakeS3Control::new().with(|s| {
            s.access_points.insert("ap".to_string(), access_point("ap", "b"));
            s.policies.insert("ap".to_string(), POLICY.to_string());
        }));
        let mut mg = point(None);
        mg.spec.for_provider.account_id = Some(ACCOUNT.to_string());
        mg.set_external_name("ap");
        assert!(!client(&fake).observe(&mut mg).await.unwrap().resource_up_to_date);
        client(&fake).update(&mut mg).await.unwrap();
        assert!(fake.called(&format!("delete_access_point_policy {ACCOUNT} ap")));
    }

    #[tokio::test]
    async fn test_delete_access_point() {
        let fake = existing();
        let mut mg = point(None);
        mg.spec.for_provider.account_id = Some("210987654321".to_string());
        mg.set_external_name("ap");
        client(&fake).delete(&mut mg).await.unwrap();
        assert_eq!(fake.calls(), vec!["delete_access_point 210987654321 ap"]);
    }
}
