//! Reads the run template from a `TektonListener` object.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};
use trigger::ports::TemplateSource;
use trigger::{RunTemplate, TemplateError, TemplateRef};

use crate::client::KubeClient;

pub const LISTENER_API_VERSION: &str = "tektonexperimental.dev/v1alpha1";

pub(crate) fn listener_path(reference: &TemplateRef) -> String {
    format!(
        "/apis/{LISTENER_API_VERSION}/namespaces/{}/tektonlisteners/{}",
        reference.namespace, reference.listener
    )
}

#[derive(Debug, Deserialize)]
struct ListenerObject {
    #[serde(default)]
    spec: ListenerSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListenerSpec {
    #[serde(default)]
    pipeline_run_spec: Option<serde_json::Value>,
}

/// Loads templates from listener custom resources.
#[derive(Debug, Clone)]
pub struct ListenerTemplateSource {
    client: KubeClient,
}

impl ListenerTemplateSource {
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TemplateSource for ListenerTemplateSource {
    #[instrument(skip_all, fields(listener = %reference))]
    async fn load_template(&self, reference: &TemplateRef) -> Result<RunTemplate, TemplateError> {
        let listener: ListenerObject = self
            .client
            .get(&listener_path(reference))
            .await
            .map_err(|source| TemplateError::Cluster {
                reference: reference.clone(),
                source,
            })?;

        let spec = match listener.spec.pipeline_run_spec {
            Some(spec) if !spec.is_null() => spec,
            _ => {
                return Err(TemplateError::MissingSpec {
                    reference: reference.clone(),
                })
            }
        };

        let template: RunTemplate =
            serde_json::from_value(spec).map_err(|source| TemplateError::Malformed {
                reference: reference.clone(),
                source,
            })?;

        info!(params = template.params().len(), "Loaded run template");
        Ok(template)
    }
}
