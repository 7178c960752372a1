//! # IAM Policy Documents
//!
//! Typed model of IAM-style policy JSON (bucket policies, access point
//! policies) with structural equality.
//!
//! AWS reformats policies it stores: keys are reordered, single-element arrays
//! become scalars, account ids in principals become root ARNs. Two documents
//! compare equal when they grant the same thing regardless of those rewrites
//! and of the ordering of statements, actions, resources, principals and
//! condition values.
//!
//! Emission is deterministic: statement keys in a fixed order, principal keys
//! in the order `AWS`, `Service`, `Federated`, `CanonicalUser`, and
//! single-element lists collapsed to scalars the way AWS returns them.

use crate::constants::DEFAULT_POLICY_VERSION;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("malformed policy document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("policy document has no statements")]
    Empty,
}

static ACCOUNT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{12}$").expect("account id pattern is valid"));

/// An IAM policy document
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub statement: Vec<Statement>,
}

fn default_version() -> String {
    DEFAULT_POLICY_VERSION.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Condition operator -> condition key -> values
pub type ConditionBlock = BTreeMap<String, BTreeMap<String, ConditionValues>>;

/// Condition values, normalized to strings (`true` and `"true"` are the same value)
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConditionValues(pub Vec<String>);

impl<'de> Deserialize<'de> for ConditionValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        fn scalar<E: de::Error>(value: Value) -> Result<String, E> {
            match value {
                Value::String(s) => Ok(s),
                Value::Bool(b) => Ok(b.to_string()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(E::custom(format!("unsupported condition value: {other}"))),
            }
        }

        match Value::deserialize(deserializer)? {
            Value::Array(values) => Ok(ConditionValues(
                values.into_iter().map(scalar).collect::<Result<_, _>>()?,
            )),
            value => Ok(ConditionValues(vec![scalar(value)?])),
        }
    }
}

impl Serialize for ConditionValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        collapse(&self.0, serializer)
    }
}

/// One policy statement
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_principal: Option<Principal>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "collapse",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub action: Vec<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "collapse",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub not_action: Vec<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "collapse",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub resource: Vec<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "collapse",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub not_resource: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionBlock>,
}

/// Who a statement applies to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Principal {
    /// `"Principal": "*"`
    Wildcard,
    Structured(PrincipalMap),
}

/// `{"AWS": [...], "Service": [...], "Federated": [...], "CanonicalUser": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrincipalMap {
    #[serde(rename = "AWS", default, deserialize_with = "one_or_many")]
    pub aws: Vec<String>,
    #[serde(rename = "Service", default, deserialize_with = "one_or_many")]
    pub service: Vec<String>,
    #[serde(rename = "Federated", default, deserialize_with = "one_or_many")]
    pub federated: Vec<String>,
    #[serde(rename = "CanonicalUser", default, deserialize_with = "one_or_many")]
    pub canonical_user: Vec<String>,
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) if s == "*" => Ok(Principal::Wildcard),
            Value::String(s) => Err(de::Error::custom(format!(
                "unsupported principal shorthand: {s}"
            ))),
            value @ Value::Object(_) => serde_json::from_value(value)
                .map(Principal::Structured)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!("unsupported principal: {other}"))),
        }
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map = match self {
            Principal::Wildcard => return serializer.serialize_str("*"),
            Principal::Structured(map) => map,
        };
        let entries = [
            ("AWS", &map.aws),
            ("Service", &map.service),
            ("Federated", &map.federated),
            ("CanonicalUser", &map.canonical_user),
        ];
        let mut out = serializer.serialize_map(None)?;
        for (key, values) in entries.iter().filter(|(_, v)| !v.is_empty()) {
            out.serialize_entry(key, &Collapsed(values))?;
        }
        out.end()
    }
}

struct Collapsed<'a>(&'a [String]);

impl Serialize for Collapsed<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        collapse(self.0, serializer)
    }
}

/// Accepts either a single value or a list
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Emits a single-element list as a scalar
#[allow(
    clippy::ptr_arg,
    reason = "serde serialize_with passes &Vec<String> for Vec fields"
)]
fn collapse<S: Serializer>(values: &Vec<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match values.as_slice() {
        [single] => serializer.serialize_str(single),
        many => many.serialize(serializer),
    }
}

fn sorted(values: &[String]) -> Vec<String> {
    let mut values = values.to_vec();
    values.sort();
    values.dedup();
    values
}

fn normalize_aws_principal(principal: &str) -> String {
    if ACCOUNT_ID.is_match(principal) {
        format!("arn:aws:iam::{principal}:root")
    } else {
        principal.to_string()
    }
}

impl Principal {
    fn canonical(&self) -> Principal {
        match self {
            Principal::Wildcard => Principal::Wildcard,
            Principal::Structured(map) => Principal::Structured(PrincipalMap {
                aws: sorted(
                    &map.aws
                        .iter()
                        .map(|p| normalize_aws_principal(p))
                        .collect::<Vec<_>>(),
                ),
                service: sorted(&map.service),
                federated: sorted(&map.federated),
                canonical_user: sorted(&map.canonical_user),
            }),
        }
    }
}

impl Statement {
    fn canonical(&self) -> Statement {
        Statement {
            sid: self.sid.clone().filter(|sid| !sid.is_empty()),
            effect: self.effect,
            principal: self.principal.as_ref().map(Principal::canonical),
            not_principal: self.not_principal.as_ref().map(Principal::canonical),
            action: sorted(&self.action),
            not_action: sorted(&self.not_action),
            resource: sorted(&self.resource),
            not_resource: sorted(&self.not_resource),
            condition: self
                .condition
                .as_ref()
                .map(|block| {
                    block
                        .iter()
                        .map(|(operator, entries)| {
                            let entries = entries
                                .iter()
                                .map(|(key, values)| {
                                    (key.clone(), ConditionValues(sorted(&values.0)))
                                })
                                .collect();
                            (operator.clone(), entries)
                        })
                        .collect::<ConditionBlock>()
                })
                .filter(|block| !block.is_empty()),
        }
    }
}

impl PolicyDocument {
    pub fn parse(json: &str) -> Result<Self, PolicyError> {
        let document: PolicyDocument = serde_json::from_str(json)?;
        if document.statement.is_empty() {
            return Err(PolicyError::Empty);
        }
        Ok(document)
    }

    /// Canonical form: every unordered collection sorted and de-duplicated
    pub fn canonical(&self) -> PolicyDocument {
        let mut statement: Vec<Statement> = self.statement.iter().map(Statement::canonical).collect();
        statement.sort();
        statement.dedup();
        PolicyDocument {
            version: self.version.clone(),
            id: self.id.clone().filter(|id| !id.is_empty()),
            statement,
        }
    }

    /// Deterministic JSON of the canonical form
    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string(&self.canonical())?)
    }

    /// Same policy modulo ordering within unordered collections
    pub fn structurally_equal(&self, other: &PolicyDocument) -> bool {
        let (a, b) = (self.canonical(), other.canonical());
        a.version == b.version && a.id == b.id && a.statement == b.statement
    }
}

impl PartialEq for PolicyDocument {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_equal(other)
    }
}

impl Eq for PolicyDocument {}

/// Compare two policy JSON strings structurally
pub fn policies_equal(a: &str, b: &str) -> Result<bool, PolicyError> {
    Ok(PolicyDocument::parse(a)?.structurally_equal(&PolicyDocument::parse(b)?))
}
