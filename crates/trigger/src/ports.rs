//! Port traits implemented by infrastructure adapters.
//!
//! The trigger core depends only on these traits; the `cluster` crate supplies
//! the Kubernetes-backed implementations and tests supply in-memory ones.
//! All traits are object-safe so the composition root can hold them as
//! `Arc<dyn ...>`.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::webhooks::{GitHubSource, Webhook};
use crate::{
    ClusterError, Namespace, ResourceIdentity, RunRequest, RunTemplate, StoreError, TemplateError,
    TemplateRef,
};

/// Persists a fully formed pipeline run.
///
/// Must be safe to call concurrently from different coordinators; a single
/// coordinator serialises its own calls.
#[async_trait]
pub trait RunSubmitter: Send + Sync {
    /// Creates the run and returns the identity of the stored object.
    async fn submit(&self, request: &RunRequest) -> Result<ResourceIdentity, ClusterError>;
}

/// Loads the run template. Called once at startup.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Reads the template held by the referenced listener object.
    async fn load_template(&self, reference: &TemplateRef) -> Result<RunTemplate, TemplateError>;
}

/// Key-value persistence of registered webhooks, keyed by webhook name.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// Returns all webhooks recorded in `namespace`; empty if none exist yet.
    async fn read(&self, namespace: &Namespace) -> Result<BTreeMap<String, Webhook>, StoreError>;

    /// Replaces the recorded webhooks in `namespace`.
    async fn write(
        &self,
        namespace: &Namespace,
        webhooks: &BTreeMap<String, Webhook>,
    ) -> Result<(), StoreError>;
}

/// Creates the event source that forwards repository events to the sink.
#[async_trait]
pub trait SourceCreator: Send + Sync {
    /// Creates `source` in `namespace`.
    async fn create_source(
        &self,
        namespace: &Namespace,
        source: &GitHubSource,
    ) -> Result<(), ClusterError>;
}
