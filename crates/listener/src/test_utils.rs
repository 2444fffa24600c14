//! In-memory port implementations and request helpers for router tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use http_body_util::BodyExt;
use trigger::ports::{RunSubmitter, SourceCreator, WebhookStore};
use trigger::webhooks::GitHubSource;
use trigger::{
    ClusterError, EventDispatcher, EventType, EventValidator, ListenerName, Namespace, Param,
    ResourceIdentity, RunCoordinator, RunName, RunRequest, RunTemplate, StoreError, TemplateRef,
    TriggerConfig, Webhook, WebhookDefaults, WebhookRegistry, CHECK_SUITE_EVENT_TYPE,
};

use crate::{EventState, WebhookState};

#[derive(Default)]
pub struct StubSubmitter {
    pub requests: Mutex<Vec<RunRequest>>,
    pub failure: Option<ClusterError>,
}

#[async_trait]
impl RunSubmitter for StubSubmitter {
    async fn submit(&self, request: &RunRequest) -> Result<ResourceIdentity, ClusterError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(ResourceIdentity {
            name: request.name.to_string(),
            namespace: request.namespace.to_string(),
            uid: None,
        })
    }
}

pub fn event_state(submitter: Arc<StubSubmitter>) -> EventState {
    let config = TriggerConfig::new(
        EventType::new(CHECK_SUITE_EVENT_TYPE).unwrap(),
        RunName::new("listener-8082").unwrap(),
        Namespace::new("ci").unwrap(),
        TemplateRef {
            namespace: Namespace::new("ci").unwrap(),
            listener: ListenerName::new("listener").unwrap(),
        },
    )
    .with_inject_revision(true);
    let template = RunTemplate::new(vec![Param::new("revision", "")], Default::default());
    let coordinator = Arc::new(RunCoordinator::new(&config, template, submitter));
    EventState {
        dispatcher: Arc::new(EventDispatcher::new(
            EventValidator::from_config(&config),
            coordinator,
        )),
    }
}

#[derive(Default)]
pub struct StubStore {
    pub records: Mutex<BTreeMap<String, BTreeMap<String, Webhook>>>,
    pub broken: bool,
}

#[async_trait]
impl WebhookStore for StubStore {
    async fn read(&self, namespace: &Namespace) -> Result<BTreeMap<String, Webhook>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(namespace.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn write(
        &self,
        namespace: &Namespace,
        webhooks: &BTreeMap<String, Webhook>,
    ) -> Result<(), StoreError> {
        if self.broken {
            return Err(StoreError::Cluster(ClusterError::Transport {
                message: "connection reset".into(),
            }));
        }
        self.records
            .lock()
            .unwrap()
            .insert(namespace.to_string(), webhooks.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct StubSources {
    pub reject: bool,
}

#[async_trait]
impl SourceCreator for StubSources {
    async fn create_source(
        &self,
        _namespace: &Namespace,
        _source: &GitHubSource,
    ) -> Result<(), ClusterError> {
        if self.reject {
            return Err(ClusterError::Api {
                status: 409,
                message: "githubsources \"hook\" already exists".into(),
                retry_after: None,
            });
        }
        Ok(())
    }
}

pub fn webhook_state(store: StubStore, sources: StubSources) -> WebhookState {
    let defaults = WebhookDefaults {
        namespace: "tekton-pipelines".into(),
        docker_registry: "registry.example.com/me".into(),
    };
    WebhookState {
        registry: Arc::new(WebhookRegistry::new(
            defaults,
            Arc::new(store),
            Arc::new(sources),
        )),
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
