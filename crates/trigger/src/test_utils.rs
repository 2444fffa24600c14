//! In-memory port implementations shared by unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{RunSubmitter, SourceCreator, WebhookStore};
use crate::webhooks::{GitHubSource, Webhook};
use crate::{ClusterError, Namespace, ResourceIdentity, RunRequest, StoreError};

/// Records every submitted request and tracks how many overlap in time.
#[derive(Default)]
pub struct RecordingSubmitter {
    requests: Mutex<Vec<RunRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    fail_with: Option<ClusterError>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds each submission open for `delay` to expose overlapping calls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails every submission with `error`.
    pub fn failing(error: ClusterError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunSubmitter for RecordingSubmitter {
    async fn submit(&self, request: &RunRequest) -> Result<ResourceIdentity, ClusterError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(ResourceIdentity {
                name: request.name.to_string(),
                namespace: request.namespace.to_string(),
                uid: Some(format!("uid-{n}")),
            }),
        }
    }
}

/// Webhook store backed by a map of namespace to records.
#[derive(Default)]
pub struct MemoryWebhookStore {
    namespaces: Mutex<BTreeMap<Namespace, BTreeMap<String, Webhook>>>,
    fail_writes: bool,
}

impl MemoryWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self, namespace: &Namespace) -> BTreeMap<String, Webhook> {
        self.namespaces
            .lock()
            .unwrap()
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl WebhookStore for MemoryWebhookStore {
    async fn read(&self, namespace: &Namespace) -> Result<BTreeMap<String, Webhook>, StoreError> {
        Ok(self.snapshot(namespace))
    }

    async fn write(
        &self,
        namespace: &Namespace,
        webhooks: &BTreeMap<String, Webhook>,
    ) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Cluster(ClusterError::Api {
                status: 500,
                message: "etcdserver: request timed out".into(),
                retry_after: None,
            }));
        }
        self.namespaces
            .lock()
            .unwrap()
            .insert(namespace.clone(), webhooks.clone());
        Ok(())
    }
}

/// Records created sources, optionally rejecting them.
#[derive(Default)]
pub struct RecordingSourceCreator {
    created: Mutex<Vec<(Namespace, GitHubSource)>>,
    reject: bool,
}

impl RecordingSourceCreator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<(Namespace, GitHubSource)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceCreator for RecordingSourceCreator {
    async fn create_source(
        &self,
        namespace: &Namespace,
        source: &GitHubSource,
    ) -> Result<(), ClusterError> {
        if self.reject {
            return Err(ClusterError::Api {
                status: 409,
                message: format!("githubsources \"{}\" already exists", source.metadata.name),
                retry_after: None,
            });
        }
        self.created
            .lock()
            .unwrap()
            .push((namespace.clone(), source.clone()));
        Ok(())
    }
}
