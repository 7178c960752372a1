//! # Reference Resolution
//!
//! Binds symbolic references (`<field>Ref`) and selectors (`<field>Selector`)
//! to concrete AWS identifiers before a resource is observed.
//!
//! Resolution is idempotent: once a field holds a value it is returned as-is
//! and nothing is read from the cluster. Only direct referents are read; a
//! dependant is re-queued until its referent reports `Ready=True`.

use crate::crd::common::{Reference, Selector};
use async_trait::async_trait;
use futures::future::try_join_all;
use kube::api::{Api, ApiResource, DynamicObject, ListParams};
use kube::core::ObjectMeta;
use kube::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Reference resolution errors
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("referenced {kind} {name} is not ready")]
    NotReady { kind: String, name: String },

    #[error("referenced {kind} {name} not found")]
    NotFound { kind: String, name: String },

    #[error("selector matched {count} {kind} objects, expected exactly one")]
    AmbiguousSelector { kind: String, count: usize },

    #[error("no {kind} matches the selector")]
    NoMatchingReference { kind: String },

    #[error("failed to read referenced {kind}: {message}")]
    Reader { kind: String, message: String },
}

/// View of a referenced managed resource
#[derive(Debug, Clone, Default)]
pub struct ReferencedObject {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub external_name: Option<String>,
    pub ready: bool,
    /// UID of the owner reference marked as controller
    pub controller_uid: Option<String>,
    /// Raw `status.atProvider`
    pub at_provider: Value,
}

impl ReferencedObject {
    pub fn from_dynamic(object: &DynamicObject) -> Self {
        let status = object.data.get("status");
        let ready = status
            .and_then(|s| s.get("conditions"))
            .and_then(Value::as_array)
            .is_some_and(|conditions| {
                conditions.iter().any(|c| {
                    c.get("type").and_then(Value::as_str) == Some("Ready")
                        && c.get("status").and_then(Value::as_str) == Some("True")
                })
            });

        Self {
            name: object.metadata.name.clone().unwrap_or_default(),
            labels: object.metadata.labels.clone().unwrap_or_default(),
            external_name: object
                .metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(crate::constants::ANNOTATION_EXTERNAL_NAME))
                .filter(|name| !name.is_empty())
                .cloned(),
            ready,
            controller_uid: controller_uid(&object.metadata),
            at_provider: status
                .and_then(|s| s.get("atProvider"))
                .cloned()
                .unwrap_or(Value::Null),
        }
    }
}

fn controller_uid(meta: &ObjectMeta) -> Option<String> {
    meta.owner_references
        .as_ref()?
        .iter()
        .find(|o| o.controller == Some(true))
        .map(|o| o.uid.clone())
}

/// Chooses which attribute of a referent becomes the bound value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// The referent's external-name annotation
    ExternalName,
    /// A string field of the referent's `status.atProvider`
    AtProvider(&'static str),
}

impl Extractor {
    pub fn extract(&self, object: &ReferencedObject) -> Option<String> {
        let value = match self {
            Extractor::ExternalName => object.external_name.clone(),
            Extractor::AtProvider(field) => object
                .at_provider
                .get(*field)
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Read access to referenced managed resources
#[async_trait]
pub trait ObjectReader: Send + Sync {
    async fn get(
        &self,
        resource: &ApiResource,
        name: &str,
    ) -> Result<Option<ReferencedObject>, ReferenceError>;

    async fn list(
        &self,
        resource: &ApiResource,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ReferencedObject>, ReferenceError>;
}

/// Reads referents from the Kubernetes API
#[derive(Clone)]
pub struct KubeObjectReader {
    client: Client,
}

impl std::fmt::Debug for KubeObjectReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeObjectReader").finish_non_exhaustive()
    }
}

impl KubeObjectReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ApiResource) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), resource)
    }
}

#[async_trait]
impl ObjectReader for KubeObjectReader {
    async fn get(
        &self,
        resource: &ApiResource,
        name: &str,
    ) -> Result<Option<ReferencedObject>, ReferenceError> {
        let object = self
            .api(resource)
            .get_opt(name)
            .await
            .map_err(|e| ReferenceError::Reader {
                kind: resource.kind.clone(),
                message: e.to_string(),
            })?;
        Ok(object.as_ref().map(ReferencedObject::from_dynamic))
    }

    async fn list(
        &self,
        resource: &ApiResource,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ReferencedObject>, ReferenceError> {
        let selector = labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let list = self
            .api(resource)
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|e| ReferenceError::Reader {
                kind: resource.kind.clone(),
                message: e.to_string(),
            })?;
        Ok(list.items.iter().map(ReferencedObject::from_dynamic).collect())
    }
}

/// Single-value resolution input
#[derive(Debug)]
pub struct ResolutionRequest<'r> {
    pub current: Option<&'r str>,
    pub reference: Option<&'r Reference>,
    pub selector: Option<&'r Selector>,
    pub to: ApiResource,
    pub extract: Extractor,
}

/// Single-value resolution output, stored back into the spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResponse {
    pub resolved_value: Option<String>,
    pub resolved_reference: Option<Reference>,
}

/// Multi-value resolution input
#[derive(Debug)]
pub struct MultiResolutionRequest<'r> {
    pub current: &'r [String],
    pub references: &'r [Reference],
    pub selector: Option<&'r Selector>,
    pub to: ApiResource,
    pub extract: Extractor,
}

/// Multi-value resolution output, in reference order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiResolutionResponse {
    pub resolved_values: Vec<String>,
    pub resolved_references: Vec<Reference>,
}

/// Resolves references on behalf of one managed resource
pub struct Resolver<'a> {
    reader: &'a dyn ObjectReader,
    controller_uid: Option<String>,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("controller_uid", &self.controller_uid)
            .finish_non_exhaustive()
    }
}

impl<'a> Resolver<'a> {
    /// `from` is the metadata of the referencing resource
    pub fn new(reader: &'a dyn ObjectReader, from: &ObjectMeta) -> Self {
        Self {
            reader,
            controller_uid: controller_uid(from),
        }
    }

    pub async fn resolve(
        &self,
        request: ResolutionRequest<'_>,
    ) -> Result<ResolutionResponse, ReferenceError> {
        if let Some(current) = request.current.filter(|c| !c.is_empty()) {
            return Ok(ResolutionResponse {
                resolved_value: Some(current.to_string()),
                resolved_reference: request.reference.cloned(),
            });
        }

        if let Some(reference) = request.reference {
            let value = self
                .resolve_reference(reference, &request.to, request.extract)
                .await?;
            return Ok(ResolutionResponse {
                resolved_value: Some(value),
                resolved_reference: Some(reference.clone()),
            });
        }

        if let Some(selector) = request.selector {
            let mut candidates = self.select(selector, &request.to).await?;
            let chosen = match candidates.len() {
                0 => {
                    return Err(ReferenceError::NoMatchingReference {
                        kind: request.to.kind.clone(),
                    })
                }
                1 => candidates.remove(0),
                count => {
                    return Err(ReferenceError::AmbiguousSelector {
                        kind: request.to.kind.clone(),
                        count,
                    })
                }
            };
            let value = bound_value(&chosen, &request.to, request.extract)?;
            debug!(
                "Selector bound {} {} to {}",
                request.to.kind, chosen.name, value
            );
            return Ok(ResolutionResponse {
                resolved_value: Some(value),
                resolved_reference: Some(Reference::new(chosen.name)),
            });
        }

        Ok(ResolutionResponse {
            resolved_value: None,
            resolved_reference: None,
        })
    }

    /// Resolve a list of references concurrently, preserving their order
    pub async fn resolve_multiple(
        &self,
        request: MultiResolutionRequest<'_>,
    ) -> Result<MultiResolutionResponse, ReferenceError> {
        if !request.current.is_empty() {
            return Ok(MultiResolutionResponse {
                resolved_values: request.current.to_vec(),
                resolved_references: request.references.to_vec(),
            });
        }

        if !request.references.is_empty() {
            let values = try_join_all(
                request
                    .references
                    .iter()
                    .map(|r| self.resolve_reference(r, &request.to, request.extract)),
            )
            .await?;
            return Ok(MultiResolutionResponse {
                resolved_values: values,
                resolved_references: request.references.to_vec(),
            });
        }

        if let Some(selector) = request.selector {
            let mut candidates = self.select(selector, &request.to).await?;
            if candidates.is_empty() {
                return Err(ReferenceError::NoMatchingReference {
                    kind: request.to.kind.clone(),
                });
            }
            candidates.sort_by(|a, b| a.name.cmp(&b.name));
            let mut response = MultiResolutionResponse {
                resolved_values: Vec::with_capacity(candidates.len()),
                resolved_references: Vec::with_capacity(candidates.len()),
            };
            for candidate in candidates {
                response
                    .resolved_values
                    .push(bound_value(&candidate, &request.to, request.extract)?);
                response
                    .resolved_references
                    .push(Reference::new(candidate.name));
            }
            return Ok(response);
        }

        Ok(MultiResolutionResponse {
            resolved_values: Vec::new(),
            resolved_references: Vec::new(),
        })
    }

    /// Resolve a `(value, ref)` pair of spec fields in place
    pub async fn resolve_field(
        &self,
        value: &mut Option<String>,
        reference: &mut Option<Reference>,
        selector: Option<&Selector>,
        to: ApiResource,
        extract: Extractor,
    ) -> Result<(), ReferenceError> {
        let response = self
            .resolve(ResolutionRequest {
                current: value.as_deref(),
                reference: reference.as_ref(),
                selector,
                to,
                extract,
            })
            .await?;
        *value = response.resolved_value;
        *reference = response.resolved_reference;
        Ok(())
    }

    async fn resolve_reference(
        &self,
        reference: &Reference,
        to: &ApiResource,
        extract: Extractor,
    ) -> Result<String, ReferenceError> {
        let object = self.reader.get(to, &reference.name).await?.ok_or_else(|| {
            ReferenceError::NotFound {
                kind: to.kind.clone(),
                name: reference.name.clone(),
            }
        })?;
        bound_value(&object, to, extract)
    }

    async fn select(
        &self,
        selector: &Selector,
        to: &ApiResource,
    ) -> Result<Vec<ReferencedObject>, ReferenceError> {
        let candidates = self.reader.list(to, &selector.match_labels).await?;
        if selector.match_controller_ref != Some(true) {
            return Ok(candidates);
        }
        Ok(candidates
            .into_iter()
            .filter(|c| c.controller_uid.is_some() && c.controller_uid == self.controller_uid)
            .collect())
    }
}

fn bound_value(
    object: &ReferencedObject,
    to: &ApiResource,
    extract: Extractor,
) -> Result<String, ReferenceError> {
    if !object.ready {
        return Err(ReferenceError::NotReady {
            kind: to.kind.clone(),
            name: object.name.clone(),
        });
    }
    extract.extract(object).ok_or_else(|| ReferenceError::NotReady {
        kind: to.kind.clone(),
        name: object.name.clone(),
    })
}

/// Binds the reference fields of a managed resource
#[async_trait]
pub trait ResolveReferences {
    async fn resolve_references(&mut self, resolver: &Resolver<'_>) -> Result<(), ReferenceError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory reader keyed by (kind, name); counts every read
    #[derive(Debug, Default)]
    pub struct FakeReader {
        pub objects: Mutex<Vec<(String, ReferencedObject)>>,
        pub reads: AtomicUsize,
    }

    impl FakeReader {
        pub fn with(objects: Vec<(&str, ReferencedObject)>) -> Self {
            Self {
                objects: Mutex::new(
                    objects
                        .into_iter()
                        .map(|(kind, o)| (kind.to_string(), o))
                        .collect(),
                ),
                reads: AtomicUsize::new(0),
            }
        }

        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    /// Ready object with an external name
    pub fn ready_object(name: &str, external_name: &str) -> ReferencedObject {
        ReferencedObject {
            name: name.to_string(),
            external_name: Some(external_name.to_string()),
            ready: true,
            ..Default::default()
        }
    }

    #[async_trait]
    impl ObjectReader for FakeReader {
        async fn get(
            &self,
            resource: &ApiResource,
            name: &str,
        ) -> Result<Option<ReferencedObject>, ReferenceError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let objects = self.objects.lock().unwrap();
            Ok(objects
                .iter()
                .find(|(kind, o)| kind == &resource.kind && o.name == name)
                .map(|(_, o)| o.clone()))
        }

        async fn list(
            &self,
            resource: &ApiResource,
            labels: &BTreeMap<String, String>,
        ) -> Result<Vec<ReferencedObject>, ReferenceError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let objects = self.objects.lock().unwrap();
            Ok(objects
                .iter()
                .filter(|(kind, o)| {
                    kind == &resource.kind
                        && labels.iter().all(|(k, v)| o.labels.get(k) == Some(v))
                })
                .map(|(_, o)| o.clone())
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ready_object, FakeReader};
    use super::*;
    use crate::crd::ec2::Vpc;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn vpc_resource() -> ApiResource {
        ApiResource::erase::<Vpc>(&())
    }

    fn labelled(name: &str, external_name: &str, app: &str) -> ReferencedObject {
        let mut object = ready_object(name, external_name);
        object.labels.insert("app".to_string(), app.to_string());
        object
    }

    fn selector(app: &str) -> Selector {
        Selector {
            match_labels: BTreeMap::from([("app".to_string(), app.to_string())]),
            match_controller_ref: None,
        }
    }

    #[tokio::test]
    async fn test_current_value_skips_reads() {
        let reader = FakeReader::default();
        let resolver = Resolver::new(&reader, &ObjectMeta::default());
        let reference = Reference::new("my-vpc");
        let response = resolver
            .resolve(ResolutionRequest {
                current: Some("vpc-123"),
                reference: Some(&reference),
                selector: None,
                to: vpc_resource(),
                extract: Extractor::ExternalName,
            })
            .await
            .unwrap();
        assert_eq!(response.resolved_value.as_deref(), Some("vpc-123"));
        assert_eq!(response.resolved_reference, Some(reference));
        assert_eq!(reader.reads(), 0);
    }

    #[tokio::test]
    async fn test_reference_resolves_external_name() {
        let reader = FakeReader::with(vec![("VPC", ready_object("my-vpc", "vpc-abc"))]);
        let resolver = Resolver::new(&reader, &ObjectMeta::default());
        let mut value = None;
        let mut reference = Some(Reference::new("my-vpc"));
        resolver
            .resolve_field(
                &mut value,
                &mut reference,
                None,
                vpc_resource(),
                Extractor::ExternalName,
            )
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("vpc-abc"));

        resolver
            .resolve_field(
                &mut value,
                &mut reference,
                None,
                vpc_resource(),
                Extractor::ExternalName,
            )
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("vpc-abc"));
        assert_eq!(reader.reads(), 1);
    }

    #[tokio::test]
    async fn test_reference_not_ready() {
        let mut object = ready_object("my-vpc", "vpc-abc");
        object.ready = false;
        let reader = FakeReader::with(vec![("VPC", object)]);
        let resolver = Resolver::new(&reader, &ObjectMeta::default());
        let reference = Reference::new("my-vpc");
        let err = resolver
            .resolve(ResolutionRequest {
                current: None,
                reference: Some(&reference),
                selector: None,
                to: vpc_resource(),
                extract: Extractor::ExternalName,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReferenceError::NotReady { .. }));
    }

    #[tokio::test]
    async fn test_reference_missing() {
        let reader = FakeReader::default();
        let resolver = Resolver::new(&reader, &ObjectMeta::default());
        let reference = Reference::new("absent");
        let err = resolver
            .resolve(ResolutionRequest {
                current: None,
                reference: Some(&reference),
                selector: None,
                to: vpc_resource(),
                extract: Extractor::ExternalName,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReferenceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_selector_ambiguous_and_no_match() {
        let reader = FakeReader::with(vec![
            ("VPC", labelled("a", "vpc-a", "web")),
            ("VPC", labelled("b", "vpc-b", "web")),
        ]);
        let resolver = Resolver::new(&reader, &ObjectMeta::default());

        let web = selector("web");
        let err = resolver
            .resolve(ResolutionRequest {
                current: None,
                reference: None,
                selector: Some(&web),
                to: vpc_resource(),
                extract: Extractor::ExternalName,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReferenceError::AmbiguousSelector { count: 2, .. }
        ));

        let db = selector("db");
        let err = resolver
            .resolve(ResolutionRequest {
                current: None,
                reference: None,
                selector: Some(&db),
                to: vpc_resource(),
                extract: Extractor::ExternalName,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReferenceError::NoMatchingReference { .. }));
    }

    #[tokio::test]
    async fn test_selector_match_controller_ref() {
        let mut owned = labelled("owned", "vpc-owned", "web");
        owned.controller_uid = Some("uid-1".to_string());
        let other = labelled("other", "vpc-other", "web");
        let reader = FakeReader::with(vec![("VPC", owned), ("VPC", other)]);

        let meta = ObjectMeta {
            owner_references: Some(vec![OwnerReference {
                api_version: "v1".to_string(),
                kind: "Composite".to_string(),
                name: "parent".to_string(),
                uid: "uid-1".to_string(),
                controller: Some(true),
                block_owner_deletion: None,
            }]),
            ..Default::default()
        };
        let resolver = Resolver::new(&reader, &meta);
        let web = Selector {
            match_controller_ref: Some(true),
            ..selector("web")
        };
        let response = resolver
            .resolve(ResolutionRequest {
                current: None,
                reference: None,
                selector: Some(&web),
                to: vpc_resource(),
                extract: Extractor::ExternalName,
            })
            .await
            .unwrap();
        assert_eq!(response.resolved_value.as_deref(), Some("vpc-owned"));
        assert_eq!(response.resolved_reference, Some(Reference::new("owned")));
    }

    #[tokio::test]
    async fn test_at_provider_extractor() {
        let mut object = ready_object("eip", "203.0.113.10");
        object.at_provider = serde_json::json!({"allocationId": "eipalloc-1"});
        let reader = FakeReader::with(vec![("VPC", object)]);
        let resolver = Resolver::new(&reader, &ObjectMeta::default());
        let reference = Reference::new("eip");
        let response = resolver
            .resolve(ResolutionRequest {
                current: None,
                reference: Some(&reference),
                selector: None,
                to: vpc_resource(),
                extract: Extractor::AtProvider("allocationId"),
            })
            .await
            .unwrap();
        assert_eq!(response.resolved_value.as_deref(), Some("eipalloc-1"));
    }

    #[tokio::test]
    async fn test_resolve_multiple_preserves_order() {
        let reader = FakeReader::with(vec![
            ("VPC", ready_object("first", "vpc-1")),
            ("VPC", ready_object("second", "vpc-2")),
            ("VPC", ready_object("third", "vpc-3")),
        ]);
        let resolver = Resolver::new(&reader, &ObjectMeta::default());
        let references = vec![
            Reference::new("third"),
            Reference::new("first"),
            Reference::new("second"),
        ];
        let response = resolver
            .resolve_multiple(MultiResolutionRequest {
                current: &[],
                references: &references,
                selector: None,
                to: vpc_resource(),
                extract: Extractor::ExternalName,
            })
            .await
            .unwrap();
        assert_eq!(response.resolved_values, vec!["vpc-3", "vpc-1", "vpc-2"]);
        assert_eq!(response.resolved_references, references);
    }

    #[tokio::test]
    async fn test_resolve_multiple_fails_when_any_fails() {
        let reader = FakeReader::with(vec![("VPC", ready_object("first", "vpc-1"))]);
        let resolver = Resolver::new(&reader, &ObjectMeta::default());
        let references = vec![Reference::new("first"), Reference::new("missing")];
        let result = resolver
            .resolve_multiple(MultiResolutionRequest {
                current: &[],
                references: &references,
                selector: None,
                to: vpc_resource(),
                extract: Extractor::ExternalName,
            })
            .await;
        assert!(matches!(result, Err(ReferenceError::NotFound { .. })));
    }
}
