//! # Managed Resource Store
//!
//! Writes the engine makes to managed resources: metadata and spec through a
//! full replace (optimistic concurrency on `resourceVersion`), status through
//! a merge patch on the status subresource.

use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::ReconcilerError;
use crate::crd::Managed;
use async_trait::async_trait;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait ManagedStore<K: Managed>: Send + Sync {
    /// Persist metadata and spec; refreshes `mg`'s resourceVersion
    async fn update(&self, mg: &mut K) -> Result<(), ReconcilerError>;

    /// Persist status; a resource deleted in the meantime is not an error
    async fn update_status(&self, mg: &K) -> Result<(), ReconcilerError>;
}

/// Store backed by the Kubernetes API
pub struct KubeStore<K> {
    api: Api<K>,
}

impl<K> std::fmt::Debug for KubeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl<K: Managed> KubeStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl<K: Managed> ManagedStore<K> for KubeStore<K> {
    async fn update(&self, mg: &mut K) -> Result<(), ReconcilerError> {
        let name = mg.name_or_unknown().to_string();
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        let updated = self.api.replace(&name, &params, mg).await?;
        mg.meta_mut().resource_version = updated.meta().resource_version.clone();
        debug!("Updated {} metadata and spec", name);
        Ok(())
    }

    async fn update_status(&self, mg: &K) -> Result<(), ReconcilerError> {
        let name = mg.name_or_unknown();
        let status = serde_json::to_value(mg)?
            .get("status")
            .cloned()
            .unwrap_or_default();
        let patch = serde_json::json!({ "status": status });

        match self
            .api
            .patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                debug!("{} is gone, skipping status update", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Store that keeps resources in memory; used by tests and dry runs
#[derive(Debug)]
pub struct InMemoryStore<K> {
    objects: Mutex<BTreeMap<String, K>>,
    updates: Mutex<u32>,
    status_updates: Mutex<u32>,
}

impl<K> Default for InMemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            updates: Mutex::new(0),
            status_updates: Mutex::new(0),
        }
    }
}

impl<K: Managed> InMemoryStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last persisted copy of `name`
    pub fn get(&self, name: &str) -> Option<K> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(name).cloned())
    }

    /// Number of metadata/spec writes
    pub fn updates(&self) -> u32 {
        self.updates.lock().map(|n| *n).unwrap_or_default()
    }

    /// Number of status writes
    pub fn status_updates(&self) -> u32 {
        self.status_updates.lock().map(|n| *n).unwrap_or_default()
    }

    fn store(&self, mg: &K) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(mg.name_or_unknown().to_string(), mg.clone());
        }
    }
}

#[async_trait]
impl<K: Managed> ManagedStore<K> for InMemoryStore<K> {
    async fn update(&self, mg: &mut K) -> Result<(), ReconcilerError> {
        let version = {
            let mut updates = self
                .updates
                .lock()
                .map_err(|e| ReconcilerError::Invalid(format!("store lock poisoned: {e}")))?;
            *updates += 1;
            *updates
        };
        mg.meta_mut().resource_version = Some(version.to_string());
        self.store(mg);
        Ok(())
    }

    async fn update_status(&self, mg: &K) -> Result<(), ReconcilerError> {
        if let Ok(mut updates) = self.status_updates.lock() {
            *updates += 1;
        }
        self.store(mg);
        Ok(())
    }
}
