//! # Common Managed-Resource Types
//!
//! Building blocks shared by every managed kind: the resource spec envelope,
//! cross-resource references and selectors, deletion and management
//! policies, and tags.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to another object by name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Name of the referenced object
    pub name: String,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Selects a referenced managed resource by labels
///
/// Exactly one candidate must match after filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// Labels the referenced object must carry
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    /// Only match objects controlled by the same controller as the referencing object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_controller_ref: Option<bool>,
}

/// Namespaced reference to a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Secret name
    pub name: String,
    /// Secret namespace
    pub namespace: String,
}

/// Reference to a key within a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Secret name
    pub name: String,
    /// Secret namespace
    pub namespace: String,
    /// Key within the Secret data
    pub key: String,
}

/// What happens to the external resource when the managed resource is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum DeletionPolicy {
    /// Delete the external resource
    #[default]
    Delete,
    /// Leave the external resource in place and only release the managed resource
    Orphan,
}

/// Action the engine is allowed to take on the external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ManagementAction {
    /// Every action
    #[serde(rename = "*")]
    All,
    Observe,
    Create,
    Update,
    Delete,
    LateInitialize,
}

/// Fields common to the spec of every managed resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// ProviderConfig holding the AWS credentials for this resource
    /// Defaults to the ProviderConfig named "default"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<Reference>,
    /// Secret the connection details of this resource are written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
    /// Delete or orphan the external resource when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
    /// Restricts what the controller may do; empty means everything
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub management_policies: Vec<ManagementAction>,
}

/// Key/value tag attached to an AWS resource
///
/// A missing value and an empty value are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_spec_defaults() {
        let spec: ResourceSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.deletion_policy, DeletionPolicy::Delete);
        assert!(spec.management_policies.is_empty());
        assert!(spec.provider_config_ref.is_none());
    }

    #[test]
    fn test_management_action_wildcard() {
        let actions: Vec<ManagementAction> =
            serde_json::from_str(r#"["*", "Observe", "LateInitialize"]"#).unwrap();
        assert_eq!(
            actions,
            vec![
                ManagementAction::All,
                ManagementAction::Observe,
                ManagementAction::LateInitialize
            ]
        );
    }

    #[test]
    fn test_tag_without_value() {
        let tag: Tag = serde_json::from_str(r#"{"key": "Env"}"#).unwrap();
        assert_eq!(tag.value, None);
        assert_ne!(tag, Tag::new("Env", ""));
    }
}
