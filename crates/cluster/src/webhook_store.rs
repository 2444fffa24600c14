//! Webhook records kept in a ConfigMap.
//!
//! All webhooks of a namespace live in one ConfigMap under a single
//! `binaryData` key holding the base64 of a JSON object keyed by webhook name.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use trigger::ports::WebhookStore;
use trigger::webhooks::Webhook;
use trigger::{ClusterError, Namespace, StoreError};

use crate::client::{KubeClient, ObjectMeta};

pub const CONFIG_MAP_NAME: &str = "githubwebhook";
pub const CONFIG_MAP_KEY: &str = "GitHubSource";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigMap {
    #[serde(default)]
    api_version: String,

    #[serde(default)]
    kind: String,

    #[serde(default)]
    metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    binary_data: BTreeMap<String, String>,

    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

fn config_maps_path(namespace: &Namespace) -> String {
    format!("/api/v1/namespaces/{namespace}/configmaps")
}

fn config_map_path(namespace: &Namespace) -> String {
    format!("{}/{CONFIG_MAP_NAME}", config_maps_path(namespace))
}

/// [`WebhookStore`] backed by the `githubwebhook` ConfigMap.
#[derive(Debug, Clone)]
pub struct ConfigMapWebhookStore {
    client: KubeClient,
}

impl ConfigMapWebhookStore {
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }

    async fn fetch(&self, namespace: &Namespace) -> Result<Option<ConfigMap>, ClusterError> {
        match self.client.get(&config_map_path(namespace)).await {
            Ok(cm) => Ok(Some(cm)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn decode_records(cm: &ConfigMap) -> Result<BTreeMap<String, Webhook>, StoreError> {
    let Some(encoded) = cm.binary_data.get(CONFIG_MAP_KEY) else {
        return Ok(BTreeMap::new());
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ClusterError::Decode {
            message: format!("{CONFIG_MAP_NAME}/{CONFIG_MAP_KEY} is not base64: {e}"),
        })?;
    if bytes.is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl WebhookStore for ConfigMapWebhookStore {
    #[instrument(skip(self))]
    async fn read(&self, namespace: &Namespace) -> Result<BTreeMap<String, Webhook>, StoreError> {
        match self.fetch(namespace).await? {
            Some(cm) => decode_records(&cm),
            None => Ok(BTreeMap::new()),
        }
    }

    #[instrument(skip(self, webhooks), fields(count = webhooks.len()))]
    async fn write(
        &self,
        namespace: &Namespace,
        webhooks: &BTreeMap<String, Webhook>,
    ) -> Result<(), StoreError> {
        let encoded = STANDARD.encode(serde_json::to_vec(webhooks)?);

        match self.fetch(namespace).await? {
            Some(mut cm) => {
                cm.binary_data.insert(CONFIG_MAP_KEY.to_string(), encoded);
                let _: serde::de::IgnoredAny =
                    self.client.put(&config_map_path(namespace), &cm).await?;
                debug!("Updated webhook ConfigMap");
            }
            None => {
                let cm = ConfigMap {
                    api_version: "v1".into(),
                    kind: "ConfigMap".into(),
                    metadata: ObjectMeta {
                        name: CONFIG_MAP_NAME.into(),
                        namespace: Some(namespace.to_string()),
                        ..ObjectMeta::default()
                    },
                    binary_data: BTreeMap::from([(CONFIG_MAP_KEY.to_string(), encoded)]),
                    other: serde_json::Map::new(),
                };
                let _: serde::de::IgnoredAny =
                    self.client.post(&config_maps_path(namespace), &cm).await?;
                debug!("Created webhook ConfigMap");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::KubeConfig;

    const CM_PATH: &str = "/api/v1/namespaces/tekton-pipelines/configmaps/githubwebhook";

    fn ns() -> Namespace {
        Namespace::new("tekton-pipelines").unwrap()
    }

    fn store(server: &MockServer) -> ConfigMapWebhookStore {
        ConfigMapWebhookStore::new(KubeClient::new(KubeConfig::new(server.uri())).unwrap())
    }

    fn records() -> BTreeMap<String, Webhook> {
        BTreeMap::from([(
            "hook".to_string(),
            Webhook {
                name: "hook".into(),
                namespace: "green".into(),
                git_repository_url: "https://github.com/a/b".into(),
                ..Webhook::default()
            },
        )])
    }

    fn encoded(records: &BTreeMap<String, Webhook>) -> String {
        STANDARD.encode(serde_json::to_vec(records).unwrap())
    }

    #[tokio::test]
    async fn missing_config_map_reads_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CM_PATH))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "not found" })),
            )
            .mount(&server)
            .await;

        assert!(store(&server).read(&ns()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_base64_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": { "name": "githubwebhook", "resourceVersion": "7" },
                "binaryData": { "GitHubSource": encoded(&records()) }
            })))
            .mount(&server)
            .await;

        assert_eq!(store(&server).read(&ns()).await.unwrap(), records());
    }

    #[tokio::test]
    async fn corrupt_record_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": { "name": "githubwebhook" },
                "binaryData": { "GitHubSource": STANDARD.encode(b"not json") }
            })))
            .mount(&server)
            .await;

        assert!(matches!(
            store(&server).read(&ns()).await,
            Err(StoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn first_write_creates_config_map() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CM_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/tekton-pipelines/configmaps"))
            .and(body_partial_json(json!({
                "kind": "ConfigMap",
                "metadata": { "name": "githubwebhook", "namespace": "tekton-pipelines" },
                "binaryData": { "GitHubSource": encoded(&records()) }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).write(&ns(), &records()).await.unwrap();
    }

    #[tokio::test]
    async fn later_write_updates_and_keeps_other_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": { "name": "githubwebhook", "resourceVersion": "7" },
                "data": { "note": "kept" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(CM_PATH))
            .and(body_partial_json(json!({
                "metadata": { "resourceVersion": "7" },
                "data": { "note": "kept" },
                "binaryData": { "GitHubSource": encoded(&records()) }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).write(&ns(), &records()).await.unwrap();
    }

    #[tokio::test]
    async fn failed_update_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": { "name": "githubwebhook" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({ "message": "forbidden" })),
            )
            .mount(&server)
            .await;

        assert!(matches!(
            store(&server).write(&ns(), &records()).await,
            Err(StoreError::Cluster(ClusterError::Api { status: 403, .. }))
        ));
    }
}
