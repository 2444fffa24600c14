//! Webhook registration rules.
//!
//! Registering a repository webhook does two things: it creates a GitHub event
//! source in the install namespace that forwards `push` and `pull_request`
//! events to the extension sink, and it records the webhook's metadata in the
//! [`WebhookStore`] so later lookups (by name or repository URL) can find the
//! pipeline, registry and secrets to use.
//!
//! The record map is updated read-modify-write; concurrent registrations on
//! one [`WebhookRegistry`] are serialised so none of them is lost.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ports::{SourceCreator, WebhookStore};
use crate::{ClusterError, Namespace, StoreError};

/// Longest release name accepted (a DNS label).
pub const MAX_RELEASE_NAME_LEN: usize = 63;

/// Repository events every created source subscribes to.
pub const SOURCE_EVENT_TYPES: &[&str] = &["push", "pull_request"];

/// Service that receives the forwarded repository events.
pub const SINK_SERVICE_NAME: &str = "webhooks-extension-sink";

const SOURCE_API_VERSION: &str = "sources.eventing.knative.dev/v1alpha1";
const SINK_API_VERSION: &str = "serving.knative.dev/v1alpha1";
const ACCESS_TOKEN_KEY: &str = "accessToken";
const SECRET_TOKEN_KEY: &str = "secretToken";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A registered repository webhook, as submitted and as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub name: String,

    /// Namespace pipeline runs for this repository execute in.
    #[serde(default)]
    pub namespace: String,

    #[serde(rename = "serviceaccount", default, skip_serializing_if = "String::is_empty")]
    pub service_account: String,

    #[serde(rename = "gitrepositoryurl")]
    pub git_repository_url: String,

    /// Name of the secret holding the access and secret tokens.
    #[serde(rename = "accesstoken")]
    pub access_token_ref: String,

    #[serde(default)]
    pub pipeline: String,

    #[serde(rename = "dockerregistry", default, skip_serializing_if = "String::is_empty")]
    pub docker_registry: String,

    #[serde(rename = "helmsecret", default, skip_serializing_if = "String::is_empty")]
    pub helm_secret: String,

    #[serde(
        rename = "repositorysecretname",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub repository_secret_name: String,

    #[serde(rename = "releasename", default, skip_serializing_if = "String::is_empty")]
    pub release_name: String,
}

/// Install-wide defaults applied to new webhooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookDefaults {
    /// Install namespace; sources and records live here.
    #[serde(default)]
    pub namespace: String,

    /// Registry used when a webhook does not name one.
    #[serde(rename = "dockerregistry", default)]
    pub docker_registry: String,
}

// ---------------------------------------------------------------------------
// Event source object
// ---------------------------------------------------------------------------

/// A GitHub event source object as submitted to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSource {
    pub api_version: String,
    pub kind: String,
    pub metadata: SourceMetadata,
    pub spec: GitHubSourceSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSourceSpec {
    pub owner_and_repository: String,
    pub event_types: Vec<String>,
    pub access_token: SecretValueFromSource,
    pub secret_token: SecretValueFromSource,
    pub sink: ObjectReference,

    /// Set only for GitHub Enterprise hosts.
    #[serde(rename = "githubAPIURL", default, skip_serializing_if = "Option::is_none")]
    pub github_api_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretValueFromSource {
    pub secret_key_ref: SecretKeySelector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl GitHubSource {
    /// Builds the event source for `webhook`.
    pub fn for_webhook(webhook: &Webhook, repo: &RepositoryCoordinates) -> Self {
        let secret = |key: &str| SecretValueFromSource {
            secret_key_ref: SecretKeySelector {
                name: webhook.access_token_ref.clone(),
                key: key.to_string(),
            },
        };

        Self {
            api_version: SOURCE_API_VERSION.to_string(),
            kind: "GitHubSource".to_string(),
            metadata: SourceMetadata {
                name: webhook.name.clone(),
            },
            spec: GitHubSourceSpec {
                owner_and_repository: repo.owner_and_repository.clone(),
                event_types: SOURCE_EVENT_TYPES.iter().map(|s| s.to_string()).collect(),
                access_token: secret(ACCESS_TOKEN_KEY),
                secret_token: secret(SECRET_TOKEN_KEY),
                sink: ObjectReference {
                    api_version: SINK_API_VERSION.to_string(),
                    kind: "Service".to_string(),
                    name: SINK_SERVICE_NAME.to_string(),
                },
                github_api_url: repo.enterprise_api_url.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Repository URL parsing
// ---------------------------------------------------------------------------

/// What a repository URL resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCoordinates {
    /// `owner/repo`, without a trailing `.git`.
    pub owner_and_repository: String,
    /// API base URL for GitHub Enterprise hosts; `None` for github.com.
    pub enterprise_api_url: Option<String>,
}

/// Resolves a repository URL such as `https://github.com/owner/repo.git`.
///
/// The API URL is the URL with its `owner/repo` suffix replaced by
/// `api/v3/`. A host with two dots is treated as GitHub Enterprise; one dot
/// means public GitHub.
pub fn parse_repository_url(url: &str) -> Result<RepositoryCoordinates, WebhookError> {
    let pieces: Vec<&str> = url.split('/').collect();
    if pieces.len() < 4 {
        return Err(WebhookError::RepositoryUrlFormat {
            url: url.to_string(),
        });
    }

    let owner = pieces[pieces.len() - 2];
    let repo = pieces[pieces.len() - 1];

    let suffix = format!("{owner}/{repo}");
    let base = url.strip_suffix(suffix.as_str()).unwrap_or(url);
    let api_url = format!("{base}api/v3/");

    let owner_and_repository = format!("{owner}/{}", repo.strip_suffix(".git").unwrap_or(repo));

    let enterprise_api_url = match api_url.matches('.').count() {
        1 => None,
        2 => Some(api_url),
        _ => return Err(WebhookError::ApiUrlFormat { api_url }),
    };

    Ok(RepositoryCoordinates {
        owner_and_repository,
        enterprise_api_url,
    })
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures registering or looking up webhooks.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("requested release name ({name}) must be less than 64 characters")]
    ReleaseNameTooLong { name: String },

    #[error("namespace is required, but none was given")]
    NamespaceRequired,

    #[error("GitRepositoryURL format error ({url})")]
    RepositoryUrlFormat { url: String },

    #[error("parsing git api url '{api_url}'")]
    ApiUrlFormat { api_url: String },

    #[error("error creating GitHub source: {0}")]
    SourceCreation(#[source] ClusterError),

    #[error("error accessing GitHub webhooks: {0}")]
    Store(#[from] StoreError),

    #[error("could not find webhook with GitRepositoryURL: {url}")]
    NotFound { url: String },
}

impl WebhookError {
    /// Returns `true` if the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registers and looks up repository webhooks.
pub struct WebhookRegistry {
    defaults: WebhookDefaults,
    store: Arc<dyn WebhookStore>,
    sources: Arc<dyn SourceCreator>,
    write_lock: Mutex<()>,
}

impl WebhookRegistry {
    pub fn new(
        defaults: WebhookDefaults,
        store: Arc<dyn WebhookStore>,
        sources: Arc<dyn SourceCreator>,
    ) -> Self {
        Self {
            defaults,
            store,
            sources,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the install-wide defaults.
    pub fn defaults(&self) -> &WebhookDefaults {
        &self.defaults
    }

    /// Returns the namespace sources and records are kept in.
    pub fn install_namespace(&self) -> Namespace {
        Namespace::new(self.defaults.namespace.clone()).unwrap_or_else(Namespace::default_namespace)
    }

    /// Validates `webhook`, creates its event source, and records it.
    ///
    /// Returns the stored record (with defaults applied).
    pub async fn register(&self, mut webhook: Webhook) -> Result<Webhook, WebhookError> {
        if webhook.release_name.len() > MAX_RELEASE_NAME_LEN {
            return Err(WebhookError::ReleaseNameTooLong {
                name: webhook.release_name,
            });
        }

        if webhook.docker_registry.is_empty() && !self.defaults.docker_registry.is_empty() {
            webhook.docker_registry = self.defaults.docker_registry.clone();
        }
        debug!(docker_registry = %webhook.docker_registry, "Docker registry location");

        if webhook.namespace.is_empty() {
            return Err(WebhookError::NamespaceRequired);
        }

        let repo = parse_repository_url(&webhook.git_repository_url)?;
        debug!(
            owner_and_repository = %repo.owner_and_repository,
            api_url = ?repo.enterprise_api_url,
            "Creating GitHub source"
        );

        let install_ns = self.install_namespace();
        let source = GitHubSource::for_webhook(&webhook, &repo);
        self.sources
            .create_source(&install_ns, &source)
            .await
            .map_err(|e| {
                warn!(webhook = %webhook.name, error = %e, "Error creating GitHub source");
                WebhookError::SourceCreation(e)
            })?;

        let _guard = self.write_lock.lock().await;
        let mut webhooks = self.store.read(&install_ns).await?;
        webhooks.insert(webhook.name.clone(), webhook.clone());
        self.store.write(&install_ns, &webhooks).await?;

        info!(webhook = %webhook.name, namespace = %install_ns, "Created webhook");
        Ok(webhook)
    }

    /// Returns every recorded webhook.
    pub async fn list(&self) -> Result<Vec<Webhook>, WebhookError> {
        let install_ns = self.install_namespace();
        debug!(namespace = %install_ns, "Get all webhooks");
        Ok(self.store.read(&install_ns).await?.into_values().collect())
    }

    /// Finds the webhook registered for `url` in `namespace`.
    pub async fn find_by_repository_url(
        &self,
        url: &str,
        namespace: &Namespace,
    ) -> Result<Webhook, WebhookError> {
        self.store
            .read(namespace)
            .await?
            .into_values()
            .find(|w| w.git_repository_url == url)
            .ok_or_else(|| WebhookError::NotFound {
                url: url.to_string(),
            })
    }
}

impl std::fmt::Debug for WebhookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookRegistry")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "webhooks_tests.rs"]
mod tests;
