//! # JSON Patch Differ
//!
//! Sparse structural diff of two values of the same schema. The patch holds
//! the desired value of every field that differs from the current value:
//!
//! - objects recurse
//! - arrays and scalars are compared atomically
//! - fields the desired side leaves unset (`null` or absent) are not governed
//!   and never appear in the patch
//!
//! An empty patch means "up to date".

use serde::Serialize;
use serde_json::{Map, Value};

/// Fields whose desired value differs from the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the top-level field `name` (camelCase, as serialized) changed
    pub fn changed(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Desired value of a changed field, addressed by JSON pointer (`/a/b`)
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        let mut parts = pointer.trim_start_matches('/').splitn(2, '/');
        let head = parts.next()?;
        let value = self.0.get(head)?;
        match parts.next() {
            Some(rest) => value.pointer(&format!("/{rest}")),
            None => Some(value),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Diff two JSON objects; non-object inputs produce a single `""` entry when unequal
pub fn diff_values(desired: &Value, current: &Value) -> Patch {
    match (desired, current) {
        (Value::Object(desired), Value::Object(current)) => Patch(diff_objects(desired, current)),
        (desired, current) if desired.is_null() || desired == current => Patch::default(),
        (desired, _) => Patch(Map::from_iter([(String::new(), desired.clone())])),
    }
}

fn diff_objects(desired: &Map<String, Value>, current: &Map<String, Value>) -> Map<String, Value> {
    let mut patch = Map::new();
    for (key, want) in desired {
        if want.is_null() {
            continue;
        }
        match (want, current.get(key)) {
            (Value::Object(want_fields), Some(Value::Object(have_fields))) => {
                let nested = diff_objects(want_fields, have_fields);
                if !nested.is_empty() {
                    patch.insert(key.clone(), Value::Object(nested));
                }
            }
            (want, Some(have)) if want == have => {}
            (want, _) => {
                patch.insert(key.clone(), want.clone());
            }
        }
    }
    patch
}

/// Diff two serializable values of the same type
pub fn create_patch<T: Serialize>(desired: &T, current: &T) -> Result<Patch, serde_json::Error> {
    Ok(diff_values(
        &serde_json::to_value(desired)?,
        &serde_json::to_value(current)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_values_give_empty_patch() {
        let value = json!({"cidrBlock": "10.0.0.0/16", "tags": [{"key": "a"}]});
        assert!(diff_values(&value, &value).is_empty());
    }

    #[test]
    fn test_nested_objects_recurse() {
        let desired = json!({"config": {"keyAlgorithm": "RSA_2048", "subject": {"cn": "a"}}});
        let current = json!({"config": {"keyAlgorithm": "RSA_2048", "subject": {"cn": "b"}}});
        let patch = diff_values(&desired, &current);
        assert_eq!(patch.into_value(), json!({"config": {"subject": {"cn": "a"}}}));
    }

    #[test]
    fn test_arrays_are_atomic() {
        let desired = json!({"ingress": [1, 2]});
        let current = json!({"ingress": [2, 1]});
        let patch = diff_values(&desired, &current);
        assert!(patch.changed("ingress"));
        assert_eq!(patch.get("/ingress"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_unset_desired_and_current_only_fields_ignored() {
        let desired = json!({"enableDnsSupport": null, "cidrBlock": "10.0.0.0/16"});
        let current = json!({"enableDnsSupport": true, "cidrBlock": "10.0.0.0/16", "ownerId": "1"});
        assert!(diff_values(&desired, &current).is_empty());
    }

    #[test]
    fn test_missing_current_field_is_a_change() {
        let patch = diff_values(&json!({"tenancy": "default"}), &json!({}));
        assert!(patch.changed("tenancy"));
        assert_eq!(patch.get("tenancy"), Some(&json!("default")));
    }

    #[test]
    fn test_create_patch_from_structs() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Attributes {
            enable_dns_support: Option<bool>,
            enable_dns_host_names: Option<bool>,
        }
        let desired = Attributes {
            enable_dns_support: Some(true),
            enable_dns_host_names: Some(true),
        };
        let current = Attributes {
            enable_dns_support: Some(true),
            enable_dns_host_names: Some(false),
        };
        let patch = create_patch(&desired, &current).unwrap();
        assert!(!patch.changed("enableDnsSupport"));
        assert!(patch.changed("enableDnsHostNames"));
    }
}
