//! # Access Point Policy
//!
//! A sub-controller run from the access point's observe and update. It has no
//! resource of its own: the desired policy is the access point's `policy`
//! field, and an unset field means the policy should not exist.

use crate::controller::reconciler::{aws_error, ReconcilerError};
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::found;
use crate::provider::aws::policy::{policies_equal, PolicyDocument};
use crate::provider::aws::s3control::S3ControlApi;
use std::sync::Arc;
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::AccessPointPolicy;

/// Result of comparing the desired policy with the attached one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    Updated,
    NeedsUpdate,
    NeedsDeletion,
}

/// Pure comparison of desired and observed policy documents
pub fn policy_state(
    desired: Option<&str>,
    observed: Option<&str>,
) -> Result<PolicyState, ReconcilerError> {
    Ok(match (desired, observed) {
        (None, None) => PolicyState::Updated,
        (None, Some(_)) => PolicyState::NeedsDeletion,
        (Some(_), None) => PolicyState::NeedsUpdate,
        (Some(want), Some(have)) if policies_equal(want, have)? => PolicyState::Updated,
        (Some(_), Some(_)) => PolicyState::NeedsUpdate,
    })
}

pub struct PolicyController {
    api: Arc<dyn S3ControlApi>,
}

impl std::fmt::Debug for PolicyController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyController").finish_non_exhaustive()
    }
}

impl PolicyController {
    pub fn new(api: Arc<dyn S3ControlApi>) -> Self {
        Self { api }
    }

    pub async fn observe(
        &self,
        account_id: &str,
        name: &str,
        desired: Option<&str>,
    ) -> Result<PolicyState, ReconcilerError> {
        let observed = found(
            KIND,
            "failed to get access point policy",
            self.api.get_access_point_policy(account_id, name).await,
        )?;
        policy_state(desired, observed.as_deref())
    }

    /// Converge the attached policy and return the state it was found in
    pub async fn reconcile(
        &self,
        account_id: &str,
        name: &str,
        desired: Option<&str>,
    ) -> Result<PolicyState, ReconcilerError> {
        let state = self.observe(account_id, name, desired).await?;
        match (state, desired) {
            (PolicyState::NeedsUpdate, Some(policy)) => {
                PolicyDocument::parse(policy)?;
                self.api
                    .put_access_point_policy(account_id, name, policy)
                    .await
                    .map_err(aws_error(KIND, "failed to put access point policy"))?;
                info!("✅ Attached policy to access point {}", name);
            }
            (PolicyState::NeedsDeletion, _) => {
                match self.api.delete_access_point_policy(account_id, name).await {
                    Ok(()) => info!("🗑️  Deleted policy of access point {}", name),
                    Err(e) => {
                        let err = ReconcilerError::external(
                            KIND,
                            "failed to delete access point policy",
                            e,
                        );
                        if !err.is_not_found() {
                            return Err(err);
                        }
                    }
                }
            }
            _ => debug!("Policy of access point {} is up to date", name),
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::aws::s3control::testing::{FakeS3Control, ACCOUNT};

    const POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"AWS":"arn:aws:iam::123456789012:root"},"Action":["s3:GetObject"],"Resource":"arn:aws:s3:us-east-1:123456789012:accesspoint/ap/object/*"}]}"#;

    #[test]
    fn test_policy_state() {
        assert_eq!(policy_state(None, None).unwrap(), PolicyState::Updated);
        assert_eq!(
            policy_state(None, Some(POLICY)).unwrap(),
            PolicyState::NeedsDeletion
        );
        assert_eq!(
            policy_state(Some(POLICY), None).unwrap(),
            PolicyState::NeedsUpdate
        );
        assert_eq!(
            policy_state(Some(POLICY), Some(POLICY)).unwrap(),
            PolicyState::Updated
        );
        let other = POLICY.replace("s3:GetObject", "s3:PutObject");
        assert_eq!(
            policy_state(Some(POLICY), Some(&other)).unwrap(),
            PolicyState::NeedsUpdate
        );
        assert!(policy_state(Some("{"), Some(POLICY)).is_err());
    }

    #[tokio::test]
    async fn test_reconcile_puts_missing_policy() {
        let fake = Arc::new(FakeS3Control::new());
        let controller = PolicyController::new(Arc::clone(&fake) as Arc<dyn S3ControlApi>);
        let state = controller.reconcile(ACCOUNT, "ap", Some(POLICY)).await.unwrap();
        assert_eq!(state, PolicyState::NeedsUpdate);
        assert!(fake.called(&format!("put_access_point_policy {ACCOUNT} ap")));

        let again = controller.reconcile(ACCOUNT, "ap", Some(POLICY)).await.unwrap();
        assert_eq!(again, PolicyState::Updated);
    }

    #[tokio::test]
    async fn test_reconcile_deletes_unwanted_policy() {
        let fake = Arc::new(FakeS3Control::new().with(|s| {
            s.policies.insert("ap".to_string(), POLICY.to_string());
        }));
        let controller = PolicyController::new(Arc::clone(&fake) as Arc<dyn S3ControlApi>);
        let state = controller.reconcile(ACCOUNT, "ap", None).await.unwrap();
        assert_eq!(state, PolicyState::NeedsDeletion);
        assert!(fake.state.lock().unwrap().policies.is_empty());
    }
}
