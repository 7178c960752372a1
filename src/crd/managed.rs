//! # Managed Resource Abstraction
//!
//! Every managed kind implements [`Managed`], which gives the reconciliation
//! engine uniform access to conditions, policies, the external-name annotation
//! and the finalizer without knowing the concrete kind.

use crate::constants::{ANNOTATION_EXTERNAL_NAME, DEFAULT_PROVIDER_CONFIG_NAME, FINALIZER};
use crate::crd::common::{DeletionPolicy, ManagementAction, ResourceSpec, SecretReference};
use crate::crd::status::{get_condition, set_condition, Condition, ConditionType};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A cluster-scoped managed resource
pub trait Managed:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Fields shared by every managed spec
    fn resource_spec(&self) -> &ResourceSpec;

    /// Latest conditions, one per type
    fn conditions(&self) -> &[Condition];

    /// Mutable conditions; creates an empty status when missing
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    /// AWS region of the external resource
    fn region(&self) -> &str;

    /// Resource name, or "unknown" for objects that were never persisted
    fn name_or_unknown(&self) -> &str {
        self.meta().name.as_deref().unwrap_or("unknown")
    }

    fn set_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        for condition in conditions {
            set_condition(self.conditions_mut(), condition);
        }
    }

    fn condition(&self, r#type: ConditionType) -> Option<&Condition> {
        get_condition(self.conditions(), r#type)
    }

    /// Ready=True
    fn is_ready(&self) -> bool {
        self.condition(ConditionType::Ready)
            .is_some_and(Condition::is_true)
    }

    /// AWS identifier of the external resource; `None` until created
    fn external_name(&self) -> Option<&str> {
        self.meta()
            .annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_EXTERNAL_NAME))
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    fn set_external_name(&mut self, name: impl Into<String>) {
        self.meta_mut()
            .annotations
            .get_or_insert_with(Default::default)
            .insert(ANNOTATION_EXTERNAL_NAME.to_string(), name.into());
    }

    fn clear_external_name(&mut self) {
        if let Some(annotations) = self.meta_mut().annotations.as_mut() {
            annotations.remove(ANNOTATION_EXTERNAL_NAME);
        }
    }

    /// Deletion has been requested
    fn is_deleting(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    fn has_finalizer(&self) -> bool {
        self.meta()
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|name| name == FINALIZER))
    }

    /// Returns true when the finalizer was added
    fn add_finalizer(&mut self) -> bool {
        if self.has_finalizer() {
            return false;
        }
        self.meta_mut()
            .finalizers
            .get_or_insert_with(Vec::new)
            .push(FINALIZER.to_string());
        true
    }

    /// Returns true when the finalizer was removed
    fn remove_finalizer(&mut self) -> bool {
        let Some(finalizers) = self.meta_mut().finalizers.as_mut() else {
            return false;
        };
        let before = finalizers.len();
        finalizers.retain(|name| name != FINALIZER);
        before != finalizers.len()
    }

    fn deletion_policy(&self) -> DeletionPolicy {
        self.resource_spec().deletion_policy
    }

    fn management_policies(&self) -> &[ManagementAction] {
        &self.resource_spec().management_policies
    }

    fn provider_config_name(&self) -> &str {
        self.resource_spec()
            .provider_config_ref
            .as_ref()
            .map_or(DEFAULT_PROVIDER_CONFIG_NAME, |r| r.name.as_str())
    }

    fn connection_secret_ref(&self) -> Option<&SecretReference> {
        self.resource_spec().write_connection_secret_to_ref.as_ref()
    }
}

/// Implements [`Managed`] for kinds whose spec is `{forProvider, ..ResourceSpec}`
/// and whose status carries a `conditions` list
macro_rules! impl_managed {
    ($($kind:ty),+ $(,)?) => {$(
        impl $crate::crd::managed::Managed for $kind {
            fn resource_spec(&self) -> &$crate::crd::common::ResourceSpec {
                &self.spec.resource_spec
            }

            fn conditions(&self) -> &[$crate::crd::status::Condition] {
                self.status
                    .as_ref()
                    .map(|s| s.conditions.as_slice())
                    .unwrap_or_default()
            }

            fn conditions_mut(&mut self) -> &mut Vec<$crate::crd::status::Condition> {
                &mut self.status.get_or_insert_with(Default::default).conditions
            }

            fn region(&self) -> &str {
                &self.spec.for_provider.region
            }
        }
    )+};
}

pub(crate) use impl_managed;
