//! # Reconciliation Engine
//!
//! One pass over one managed resource:
//!
//! 1. Deleting with no external name, an `Orphan` policy or no delete
//!    permission: release the finalizer and stop. No AWS call is made.
//! 2. Add the finalizer, connect, resolve references (not while deleting).
//! 3. No external name: `create`, store the external name at once, requeue fast.
//!    A create that collides with an existing resource adopts its name through
//!    `find_existing`.
//! 4. `observe`. While deleting: release the finalizer once the resource is
//!    gone, otherwise `delete` and requeue. Not found: clear the external name.
//! 5. Persist late-initialized spec fields before reporting drift.
//! 6. Up to date: `Synced=True`. Drifted: `update`.
//!
//! Transient errors are returned to the runtime for backoff. Every other error
//! is recorded as a `Synced=False` condition and retried after a short wait.

use crate::controller::reconciler::{
    ConnectionDetails, ConnectionPublisher, Connector, ErrorCategory, ExternalClient,
    ExternalObservation, ManagedStore, ManagementPolicies, ReconcileOutcome, ReconcilerError,
    Timing,
};
use crate::controller::reference::{ObjectReader, ResolveReferences, Resolver};
use crate::crd::{Condition, DeletionPolicy, Managed};
use crate::observability::metrics;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Reconciles managed resources of kind `K`
pub struct Engine<K: Managed> {
    kind: &'static str,
    connector: Arc<dyn Connector<K>>,
    store: Arc<dyn ManagedStore<K>>,
    reader: Arc<dyn ObjectReader>,
    publisher: Arc<dyn ConnectionPublisher>,
    timing: Timing,
}

impl<K: Managed> std::fmt::Debug for Engine<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("kind", &self.kind)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

fn spec_of<K: Managed>(mg: &K) -> Result<Value, ReconcilerError> {
    Ok(serde_json::to_value(mg)?
        .get("spec")
        .cloned()
        .unwrap_or_default())
}

/// Put `before`'s spec back on `mg`, keeping everything else
fn restore_spec<K: Managed>(mg: &mut K, before: &K) -> Result<(), ReconcilerError> {
    let mut value = serde_json::to_value(&*mg)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("spec".to_string(), spec_of(before)?);
    }
    *mg = serde_json::from_value(value)?;
    Ok(())
}

impl<K> Engine<K>
where
    K: Managed + ResolveReferences,
{
    pub fn new(
        kind: &'static str,
        connector: Arc<dyn Connector<K>>,
        store: Arc<dyn ManagedStore<K>>,
        reader: Arc<dyn ObjectReader>,
        publisher: Arc<dyn ConnectionPublisher>,
        timing: Timing,
    ) -> Self {
        Self {
            kind,
            connector,
            store,
            reader,
            publisher,
            timing,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Run one reconciliation pass
    pub async fn reconcile(&self, mg: K) -> Result<ReconcileOutcome, ReconcilerError> {
        let start = Instant::now();
        metrics::increment_reconciliations(self.kind);
        let span = info_span!(
            "managed.reconcile",
            resource.kind = self.kind,
            resource.name = %mg.name_or_unknown()
        );

        let result = self.run(mg).instrument(span).await;

        metrics::observe_reconciliation_duration(self.kind, start.elapsed().as_secs_f64());
        if let Ok(outcome) = &result {
            if let Some(reason) = outcome.reason() {
                metrics::increment_requeues_total(reason);
            }
        }
        result
    }

    async fn run(&self, mut mg: K) -> Result<ReconcileOutcome, ReconcilerError> {
        let policies = ManagementPolicies::new(mg.management_policies());

        if mg.is_deleting()
            && (mg.external_name().is_none()
                || mg.deletion_policy() == DeletionPolicy::Orphan
                || !policies.should_delete())
        {
            info!(
                "🗑️  Releasing {} {} without deleting the external resource",
                self.kind,
                mg.name_or_unknown()
            );
            if mg.remove_finalizer() {
                self.store.update(&mut mg).await?;
            }
            return Ok(ReconcileOutcome::AwaitChange);
        }

        if !policies.should_observe() {
            return self.not_allowed(&mut mg, "observe").await;
        }

        if !mg.is_deleting() && mg.add_finalizer() {
            self.store.update(&mut mg).await?;
        }

        let client = match self.connector.connect(&mg).await {
            Ok(client) => client,
            Err(err) => return self.fail(&mut mg, err).await,
        };

        if !mg.is_deleting() {
            if let Err(err) = self.resolve_references(&mut mg).await {
                return self.fail(&mut mg, err).await;
            }
        }

        if mg.external_name().is_none() {
            return self.create(&mut mg, client.as_ref(), &policies).await;
        }

        let before_observe = mg.clone();
        metrics::increment_external_calls(self.kind, "observe");
        let observation = match client.observe(&mut mg).await {
            Ok(observation) => observation,
            Err(err) if err.is_not_found() => ExternalObservation::not_found(),
            Err(err) => return self.fail(&mut mg, err).await,
        };

        if mg.is_deleting() {
            return self.delete(&mut mg, client.as_ref(), &observation).await;
        }

        if !observation.resource_exists {
            if !policies.should_create() {
                mg.set_conditions([Condition::unavailable(Some(
                    "external resource does not exist".to_string(),
                ))]);
                return self.not_allowed(&mut mg, "create").await;
            }
            info!(
                "External resource {} of {} no longer exists, clearing external name",
                mg.external_name().unwrap_or_default(),
                mg.name_or_unknown()
            );
            mg.clear_external_name();
            self.store.update(&mut mg).await?;
            return Ok(ReconcileOutcome::requeue(
                self.timing.create_requeue,
                "external-not-found",
            ));
        }

        if observation.resource_late_initialized {
            if policies.should_late_initialize() {
                debug!("Persisting late-initialized fields of {}", mg.name_or_unknown());
                self.store.update(&mut mg).await?;
            } else {
                restore_spec(&mut mg, &before_observe)?;
            }
        }

        if let Err(err) = self.publish(&mg, &observation.connection_details).await {
            return self.fail(&mut mg, err).await;
        }

        if observation.resource_up_to_date {
            mg.set_conditions([Condition::reconcile_success()]);
            self.store.update_status(&mg).await?;
            debug!("{} {} is up to date", self.kind, mg.name_or_unknown());
            return Ok(ReconcileOutcome::requeue(self.timing.poll_interval, "poll"));
        }

        if !policies.should_update() {
            return self.not_allowed(&mut mg, "update").await;
        }

        let spec_before = spec_of(&mg)?;
        metrics::increment_external_calls(self.kind, "update");
        match client.update(&mut mg).await {
            Ok(update) => {
                if spec_of(&mg)? != spec_before {
                    self.store.update(&mut mg).await?;
                }
                if let Err(err) = self.publish(&mg, &update.connection_details).await {
                    return self.fail(&mut mg, err).await;
                }
                mg.set_conditions([Condition::reconcile_success()]);
                self.store.update_status(&mg).await?;
                info!("🔄 Updated {} {}", self.kind, mg.name_or_unknown());
                Ok(ReconcileOutcome::requeue(self.timing.short_wait, "update"))
            }
            Err(err) => self.fail(&mut mg, err).await,
        }
    }

    async fn resolve_references(&self, mg: &mut K) -> Result<(), ReconcilerError> {
        let resolver = Resolver::new(self.reader.as_ref(), mg.meta());
        let before = spec_of(mg)?;
        mg.resolve_references(&resolver).await?;
        if spec_of(mg)? != before {
            debug!("Persisting resolved references of {}", mg.name_or_unknown());
            self.store.update(mg).await?;
        }
        Ok(())
    }

    async fn create(
        &self,
        mg: &mut K,
        client: &dyn ExternalClient<K>,
        policies: &ManagementPolicies,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        if !policies.should_create() {
            return self.not_allowed(mg, "create").await;
        }

        mg.set_conditions([Condition::creating()]);
        metrics::increment_external_calls(self.kind, "create");
        match client.create(mg).await {
            Ok(creation) => {
                match creation.external_name {
                    Some(name) => mg.set_external_name(name),
                    None => warn!(
                        "Create of {} {} returned no external name",
                        self.kind,
                        mg.name_or_unknown()
                    ),
                }
                if let Err(err) = self.store.update(mg).await {
                    error!(
                        "External resource {} created but its external name could not be stored: {}",
                        mg.external_name().unwrap_or_default(),
                        err
                    );
                    return Err(err);
                }
                if let Err(err) = self.publish(mg, &creation.connection_details).await {
                    return self.fail(mg, err).await;
                }
                mg.set_conditions([Condition::reconcile_success()]);
                self.store.update_status(mg).await?;
                info!(
                    "✨ Created {} {} as {}",
                    self.kind,
                    mg.name_or_unknown(),
                    mg.external_name().unwrap_or_default()
                );
                Ok(ReconcileOutcome::requeue(self.timing.create_requeue, "create"))
            }
            Err(err) if err.category() == ErrorCategory::AlreadyExists => {
                let existing = match client.find_existing(mg).await {
                    Ok(existing) => existing,
                    Err(err) => return self.fail(mg, err).await,
                };
                match existing {
                    Some(name) => {
                        info!(
                            "{} {} already exists as {}, observing on next pass",
                            self.kind,
                            mg.name_or_unknown(),
                            name
                        );
                        mg.set_external_name(name);
                        self.store.update(mg).await?;
                    }
                    None => warn!(
                        "{} {} already exists but could not be identified: {}",
                        self.kind,
                        mg.name_or_unknown(),
                        err
                    ),
                }
                mg.set_conditions([Condition::reconcile_success()]);
                self.store.update_status(mg).await?;
                Ok(ReconcileOutcome::requeue(self.timing.create_requeue, "create"))
            }
            Err(err) => self.fail(mg, err).await,
        }
    }

    async fn delete(
        &self,
        mg: &mut K,
        client: &dyn ExternalClient<K>,
        observation: &ExternalObservation,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        if !observation.resource_exists {
            info!(
                "🗑️  External resource of {} {} is gone, releasing finalizer",
                self.kind,
                mg.name_or_unknown()
            );
            if mg.remove_finalizer() {
                self.store.update(mg).await?;
            }
            return Ok(ReconcileOutcome::AwaitChange);
        }

        mg.set_conditions([Condition::deleting()]);
        metrics::increment_external_calls(self.kind, "delete");
        match client.delete(mg).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return self.fail(mg, err).await,
        }
        mg.set_conditions([Condition::reconcile_success()]);
        self.store.update_status(mg).await?;
        Ok(ReconcileOutcome::requeue(self.timing.short_wait, "deleting"))
    }

    async fn publish(&self, mg: &K, details: &ConnectionDetails) -> Result<(), ReconcilerError> {
        let Some(secret) = mg.connection_secret_ref() else {
            return Ok(());
        };
        if details.is_empty() {
            return Ok(());
        }
        self.publisher
            .publish(secret, mg.controller_owner_ref(&()), details)
            .await
    }

    async fn not_allowed(
        &self,
        mg: &mut K,
        action: &str,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        warn!(
            "Management policies of {} do not allow {}",
            mg.name_or_unknown(),
            action
        );
        mg.set_conditions([Condition::action_not_allowed(format!(
            "management policies do not allow {action}"
        ))]);
        self.store.update_status(mg).await?;
        Ok(ReconcileOutcome::requeue(
            self.timing.short_wait,
            "action-not-allowed",
        ))
    }

    async fn fail(
        &self,
        mg: &mut K,
        err: ReconcilerError,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let category = err.category();
        metrics::increment_reconciliation_errors(self.kind, category.as_str());

        let condition = match category {
            ErrorCategory::ReferenceNotReady => Condition::reference_not_ready(err.to_string()),
            _ => Condition::reconcile_error(err.to_string()),
        };
        mg.set_conditions([condition]);
        if let Err(status_err) = self.store.update_status(mg).await {
            warn!("Failed to record error condition: {}", status_err);
        }

        match category {
            ErrorCategory::Transient => {
                warn!("Transient failure reconciling {}: {}", mg.name_or_unknown(), err);
                Err(err)
            }
            ErrorCategory::ReferenceNotReady => {
                info!("⏳ {}: {}", mg.name_or_unknown(), err);
                Ok(ReconcileOutcome::requeue(self.timing.short_wait, "reference-not-ready"))
            }
            _ => {
                error!("❌ Reconcile of {} failed: {}", mg.name_or_unknown(), err);
                Ok(ReconcileOutcome::requeue(self.timing.short_wait, "error"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::testing::{deleting, engine, FakeClient, FakeConnector};
    use crate::controller::reconciler::InMemoryStore;
    use crate::controller::reference::testing::FakeReader;
    use crate::crd::ec2::{Subnet, SubnetParameters, SubnetSpec, Vpc, VpcParameters, VpcSpec};
    use crate::crd::{ConditionReason, ConditionStatus, ConditionType, ManagementAction, Reference};
    use crate::provider::aws::errors::{AwsError, ResourceKind};
    use std::time::Duration;

    fn vpc() -> Vpc {
        let mut vpc = Vpc::new(
            "main",
            VpcSpec {
                for_provider: VpcParameters {
                    region: "us-east-1".to_string(),
                    cidr_block: "10.0.0.0/16".to_string(),
                    ..Default::default()
                },
                resource_spec: Default::default(),
            },
        );
        vpc.metadata.uid = Some("uid-1".to_string());
        vpc
    }

    fn synced(mg: &impl Managed) -> (ConditionStatus, ConditionReason) {
        let condition = mg.condition(ConditionType::Synced).cloned().unwrap();
        (condition.status, condition.reason)
    }

    #[tokio::test]
    async fn test_create_stores_external_name() {
        let client = FakeClient::<Vpc>::new().creates("vpc-123");
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);

        let outcome = engine.reconcile(vpc()).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::requeue(Duration::from_secs(1), "create")
        );

        let stored = store.get("main").unwrap();
        assert_eq!(stored.external_name(), Some("vpc-123"));
        assert!(stored.has_finalizer());
        assert_eq!(client.calls(), vec!["create"]);
        let ready = stored.condition(ConditionType::Ready).unwrap();
        assert_eq!(ready.reason, ConditionReason::Creating);
    }

    #[tokio::test]
    async fn test_already_exists_adopts_existing_and_observes_next() {
        let client = FakeClient::<Vpc>::new()
            .fails_create(
                ResourceKind::SecurityGroup,
                AwsError::service("InvalidGroup.Duplicate", "group already exists"),
            )
            .finds_existing("sg-123")
            .observes(ExternalObservation::exists(true));
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);

        let outcome = engine.reconcile(vpc()).await.unwrap();
        assert_eq!(outcome.reason(), Some("create"));
        assert_eq!(store.get("main").unwrap().external_name(), Some("sg-123"));

        let outcome = engine.reconcile(store.get("main").unwrap()).await.unwrap();
        assert_eq!(outcome.reason(), Some("poll"));
        assert_eq!(client.calls(), vec!["create", "find_existing", "observe"]);
    }

    #[tokio::test]
    async fn test_already_exists_without_identity_creates_again() {
        let client = FakeClient::<Vpc>::new().fails_create(
            ResourceKind::SecurityGroup,
            AwsError::service("InvalidGroup.Duplicate", "group already exists"),
        );
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);

        let outcome = engine.reconcile(vpc()).await.unwrap();
        assert_eq!(outcome.reason(), Some("create"));
        let stored = store.get("main").unwrap();
        assert_eq!(stored.external_name(), None);
        assert_eq!(
            synced(&stored),
            (ConditionStatus::True, ConditionReason::ReconcileSuccess)
        );
        assert_eq!(client.calls(), vec!["create", "find_existing"]);
    }

    #[tokio::test]
    async fn test_up_to_date_is_synced() {
        let client = FakeClient::<Vpc>::new().observes(ExternalObservation::exists(true));
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = vpc();
        vpc.set_external_name("vpc-123");

        let outcome = engine.reconcile(vpc).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::requeue(Duration::from_secs(60), "poll"));
        assert_eq!(client.calls(), vec!["observe"]);
        let stored = store.get("main").unwrap();
        assert_eq!(
            synced(&stored),
            (ConditionStatus::True, ConditionReason::ReconcileSuccess)
        );
    }

    #[tokio::test]
    async fn test_drift_calls_update() {
        let client = FakeClient::<Vpc>::new().observes(ExternalObservation::exists(false));
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = vpc();
        vpc.set_external_name("vpc-123");

        let outcome = engine.reconcile(vpc).await.unwrap();
        assert_eq!(outcome.reason(), Some("update"));
        assert_eq!(client.calls(), vec!["observe", "update"]);
    }

    #[tokio::test]
    async fn test_orphan_deletion_releases_finalizer_without_calls() {
        let client = FakeClient::<Vpc>::new().observes(ExternalObservation::exists(true));
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = deleting(vpc());
        vpc.set_external_name("vpc-123");
        vpc.add_finalizer();
        vpc.spec.resource_spec.deletion_policy = DeletionPolicy::Orphan;

        let outcome = engine.reconcile(vpc).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::AwaitChange);
        assert!(client.calls().is_empty());
        assert_eq!(client.connects(), 0);
        assert!(!store.get("main").unwrap().has_finalizer());
    }

    #[tokio::test]
    async fn test_deletion_waits_for_observe_not_found() {
        let client = FakeClient::<Vpc>::new().observes(ExternalObservation::exists(true));
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = deleting(vpc());
        vpc.set_external_name("vpc-123");
        vpc.add_finalizer();

        let outcome = engine.reconcile(vpc.clone()).await.unwrap();
        assert_eq!(outcome.reason(), Some("deleting"));
        assert_eq!(client.calls(), vec!["observe", "delete"]);
        let stored = store.get("main").unwrap();
        assert_eq!(
            stored.condition(ConditionType::Ready).unwrap().reason,
            ConditionReason::Deleting
        );
        assert!(stored.has_finalizer());

        client.set_observation(ExternalObservation::not_found());
        let outcome = engine.reconcile(vpc).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::AwaitChange);
        assert!(!store.get("main").unwrap().has_finalizer());
        assert_eq!(client.calls(), vec!["observe", "delete", "observe"]);
    }

    #[tokio::test]
    async fn test_delete_not_found_is_success() {
        let client = FakeClient::<Vpc>::new()
            .observes(ExternalObservation::exists(true))
            .fails_delete(AwsError::service("InvalidVpcID.NotFound", "gone"));
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = deleting(vpc());
        vpc.set_external_name("vpc-123");

        let outcome = engine.reconcile(vpc).await.unwrap();
        assert_eq!(outcome.reason(), Some("deleting"));
    }

    #[tokio::test]
    async fn test_not_found_clears_external_name() {
        let client = FakeClient::<Vpc>::new().observes(ExternalObservation::not_found());
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = vpc();
        vpc.set_external_name("vpc-gone");

        let outcome = engine.reconcile(vpc).await.unwrap();
        assert_eq!(outcome.reason(), Some("external-not-found"));
        assert_eq!(store.get("main").unwrap().external_name(), None);
        assert_eq!(client.calls(), vec!["observe"]);
    }

    #[tokio::test]
    async fn test_late_init_persisted_before_status() {
        let client = FakeClient::<Vpc>::new()
            .observes(ExternalObservation::exists(true).late_initialized(true))
            .late_initializes_tenancy("default");
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = vpc();
        vpc.set_external_name("vpc-123");
        vpc.add_finalizer();

        engine.reconcile(vpc).await.unwrap();
        assert_eq!(store.updates(), 1);
        let stored = store.get("main").unwrap();
        assert_eq!(
            stored.spec.for_provider.instance_tenancy.as_deref(),
            Some("default")
        );
    }

    #[tokio::test]
    async fn test_late_init_suppressed_by_policy() {
        let client = FakeClient::<Vpc>::new()
            .observes(ExternalObservation::exists(true).late_initialized(true))
            .late_initializes_tenancy("default");
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = vpc();
        vpc.set_external_name("vpc-123");
        vpc.add_finalizer();
        vpc.spec.resource_spec.management_policies = vec![
            ManagementAction::Observe,
            ManagementAction::Create,
            ManagementAction::Update,
            ManagementAction::Delete,
        ];

        engine.reconcile(vpc).await.unwrap();
        assert_eq!(store.updates(), 0);
        let stored = store.get("main").unwrap();
        assert_eq!(stored.spec.for_provider.instance_tenancy, None);
    }

    #[tokio::test]
    async fn test_transient_error_returned() {
        let client = FakeClient::<Vpc>::new().fails_observe(AwsError::service("RequestLimitExceeded", "slow down"));
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = vpc();
        vpc.set_external_name("vpc-123");

        let err = engine.reconcile(vpc).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fatal_error_sets_condition() {
        let client = FakeClient::<Vpc>::new().fails_observe(AwsError::service("UnauthorizedOperation", "denied"));
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = vpc();
        vpc.set_external_name("vpc-123");

        let outcome = engine.reconcile(vpc).await.unwrap();
        assert_eq!(outcome.reason(), Some("error"));
        let stored = store.get("main").unwrap();
        let condition = stored.condition(ConditionType::Synced).unwrap();
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason, ConditionReason::ReconcileError);
        assert!(condition
            .message
            .as_deref()
            .unwrap()
            .contains("UnauthorizedOperation: denied"));
    }

    #[tokio::test]
    async fn test_observe_only_never_creates() {
        let client = FakeClient::<Vpc>::new().creates("vpc-123");
        let store = Arc::new(InMemoryStore::<Vpc>::new());
        let engine = engine(&client, &store);
        let mut vpc = vpc();
        vpc.spec.resource_spec.management_policies = vec![ManagementAction::Observe];

        let outcome = engine.reconcile(vpc).await.unwrap();
        assert_eq!(outcome.reason(), Some("action-not-allowed"));
        assert!(client.calls().is_empty());
        let stored = store.get("main").unwrap();
        assert_eq!(
            synced(&stored),
            (ConditionStatus::False, ConditionReason::ActionNotAllowed)
        );
    }

    #[tokio::test]
    async fn test_reference_not_ready_blocks_observe() {
        let client = FakeClient::<Subnet>::new().observes(ExternalObservation::exists(true));
        let connector = Arc::new(FakeConnector::new(&client));
        let store = Arc::new(InMemoryStore::<Subnet>::new());
        let engine = Engine::new(
            "Subnet",
            connector,
            Arc::clone(&store) as Arc<dyn ManagedStore<Subnet>>,
            Arc::new(FakeReader::with(vec![])),
            Arc::new(crate::controller::reconciler::NoopPublisher),
            crate::controller::reconciler::testing::timing(),
        );
        let subnet = Subnet::new(
            "public-a",
            SubnetSpec {
                for_provider: SubnetParameters {
                    region: "us-east-1".to_string(),
                    cidr_block: "10.0.1.0/24".to_string(),
                    vpc_id_ref: Some(Reference::new("main")),
                    ..Default::default()
                },
                resource_spec: Default::default(),
            },
        );

        let outcome = engine.reconcile(subnet).await.unwrap();
        assert_eq!(outcome.reason(), Some("reference-not-ready"));
        assert!(client.calls().is_empty());
        let stored = store.get("public-a").unwrap();
        assert_eq!(
            synced(&stored),
            (ConditionStatus::False, ConditionReason::ReferenceNotReady)
        );
    }
}
