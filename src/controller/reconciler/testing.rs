//! Fakes shared by engine and handler tests

use crate::controller::reconciler::{
    Connector, Engine, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    InMemoryStore, ManagedStore, NoopPublisher, ReconcilerError, Timing,
};
use crate::controller::reference::testing::FakeReader;
use crate::controller::reference::ResolveReferences;
use crate::crd::ec2::Vpc;
use crate::crd::Managed;
use crate::provider::aws::errors::{AwsError, ResourceKind};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn timing() -> Timing {
    Timing {
        poll_interval: Duration::from_secs(60),
        short_wait: Duration::from_secs(10),
        create_requeue: Duration::from_secs(1),
    }
}

/// Marks `mg` as deleted
pub fn deleting<K: Managed>(mut mg: K) -> K {
    mg.meta_mut().deletion_timestamp =
        Some(serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z")).unwrap());
    mg
}

#[derive(Debug, Default)]
struct FakeState {
    observation: ExternalObservation,
    observe_error: Option<AwsError>,
    delete_error: Option<AwsError>,
    create_error: Option<(ResourceKind, AwsError)>,
    created_name: Option<String>,
    existing_name: Option<String>,
    calls: Vec<&'static str>,
    connects: usize,
}

type Hook<K> = Arc<dyn Fn(&mut K) + Send + Sync>;

/// Scriptable external client that records the calls it receives
pub struct FakeClient<K> {
    state: Arc<Mutex<FakeState>>,
    on_observe: Option<Hook<K>>,
}

impl<K> Clone for FakeClient<K> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            on_observe: self.on_observe.clone(),
        }
    }
}

impl<K: Managed> FakeClient<K> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            on_observe: None,
        }
    }

    pub fn observes(self, observation: ExternalObservation) -> Self {
        self.set_observation(observation);
        self
    }

    pub fn set_observation(&self, observation: ExternalObservation) {
        self.state.lock().unwrap().observation = observation;
    }

    pub fn creates(self, name: &str) -> Self {
        self.state.lock().unwrap().created_name = Some(name.to_string());
        self
    }

    pub fn fails_observe(self, err: AwsError) -> Self {
        self.state.lock().unwrap().observe_error = Some(err);
        self
    }

    /// `create` fails with `err`, classified as an error of `kind`
    pub fn fails_create(self, kind: ResourceKind, err: AwsError) -> Self {
        self.state.lock().unwrap().create_error = Some((kind, err));
        self
    }

    /// `find_existing` identifies the resource as `name`
    pub fn finds_existing(self, name: &str) -> Self {
        self.state.lock().unwrap().existing_name = Some(name.to_string());
        self
    }

    pub fn fails_delete(self, err: AwsError) -> Self {
        self.state.lock().unwrap().delete_error = Some(err);
        self
    }

    pub fn on_observe(mut self, hook: impl Fn(&mut K) + Send + Sync + 'static) -> Self {
        self.on_observe = Some(Arc::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    fn record(&self, call: &'static str) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl FakeClient<Vpc> {
    pub fn late_initializes_tenancy(self, tenancy: &'static str) -> Self {
        self.on_observe(move |vpc: &mut Vpc| {
            vpc.spec
                .for_provider
                .instance_tenancy
                .get_or_insert_with(|| tenancy.to_string());
        })
    }
}

#[async_trait]
impl<K: Managed> ExternalClient<K> for FakeClient<K> {
    async fn observe(&self, mg: &mut K) -> Result<ExternalObservation, ReconcilerError> {
        self.record("observe");
        if let Some(hook) = &self.on_observe {
            hook(mg);
        }
        let state = self.state.lock().unwrap();
        match &state.observe_error {
            Some(err) => Err(ReconcilerError::external(
                ResourceKind::Vpc,
                "failed to describe VPC",
                err.clone(),
            )),
            None => Ok(state.observation.clone()),
        }
    }

    async fn create(&self, _mg: &mut K) -> Result<ExternalCreation, ReconcilerError> {
        self.record("create");
        let state = self.state.lock().unwrap();
        if let Some((kind, err)) = &state.create_error {
            return Err(ReconcilerError::external(
                *kind,
                "failed to create resource",
                err.clone(),
            ));
        }
        Ok(ExternalCreation {
            external_name: state.created_name.clone(),
            ..Default::default()
        })
    }

    async fn update(&self, _mg: &mut K) -> Result<ExternalUpdate, ReconcilerError> {
        self.record("update");
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, _mg: &mut K) -> Result<(), ReconcilerError> {
        self.record("delete");
        let state = self.state.lock().unwrap();
        match &state.delete_error {
            Some(err) => Err(ReconcilerError::external(
                ResourceKind::Vpc,
                "failed to delete VPC",
                err.clone(),
            )),
            None => Ok(()),
        }
    }

    async fn find_existing(&self, _mg: &K) -> Result<Option<String>, ReconcilerError> {
        self.record("find_existing");
        Ok(self.state.lock().unwrap().existing_name.clone())
    }
}

pub struct FakeConnector<K> {
    client: FakeClient<K>,
}

impl<K: Managed> FakeConnector<K> {
    pub fn new(client: &FakeClient<K>) -> Self {
        Self {
            client: client.clone(),
        }
    }
}

#[async_trait]
impl<K: Managed> Connector<K> for FakeConnector<K> {
    async fn connect(&self, _mg: &K) -> Result<Box<dyn ExternalClient<K>>, ReconcilerError> {
        self.client.state.lock().unwrap().connects += 1;
        Ok(Box::new(self.client.clone()))
    }
}

/// Engine over a fake client, an in-memory store and an empty reader
pub fn engine<K>(client: &FakeClient<K>, store: &Arc<InMemoryStore<K>>) -> Engine<K>
where
    K: Managed + ResolveReferences,
{
    Engine::new(
        "Test",
        Arc::new(FakeConnector::new(client)),
        Arc::clone(store) as Arc<dyn ManagedStore<K>>,
        Arc::new(FakeReader::with(vec![])),
        Arc::new(NoopPublisher),
        timing(),
    )
}
