//! `PipelineRun` creation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use trigger::ports::RunSubmitter;
use trigger::{ClusterError, ResourceIdentity, RunRequest, RunTemplate};

use crate::client::{KubeClient, ObjectMeta};

pub const PIPELINE_API_VERSION: &str = "tekton.dev/v1alpha1";
pub const PIPELINE_RUN_KIND: &str = "PipelineRun";

pub(crate) fn pipeline_runs_path(namespace: &str) -> String {
    format!("/apis/{PIPELINE_API_VERSION}/namespaces/{namespace}/pipelineruns")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PipelineRunObject<'a> {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    spec: &'a RunTemplate,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    metadata: ObjectMeta,
}

/// Submits runs to the Tekton pipelines API.
#[derive(Debug, Clone)]
pub struct PipelineRunSubmitter {
    client: KubeClient,
}

impl PipelineRunSubmitter {
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RunSubmitter for PipelineRunSubmitter {
    #[instrument(skip_all, fields(run = %request.name, namespace = %request.namespace))]
    async fn submit(&self, request: &RunRequest) -> Result<ResourceIdentity, ClusterError> {
        let object = PipelineRunObject {
            api_version: PIPELINE_API_VERSION,
            kind: PIPELINE_RUN_KIND,
            metadata: ObjectMeta {
                name: request.name.to_string(),
                namespace: Some(request.namespace.to_string()),
                ..ObjectMeta::default()
            },
            spec: &request.spec,
        };

        let created: CreatedObject = self
            .client
            .post(&pipeline_runs_path(request.namespace.as_str()), &object)
            .await?;
        debug!(uid = ?created.metadata.uid, "PipelineRun stored");

        Ok(ResourceIdentity {
            name: created.metadata.name,
            namespace: created
                .metadata
                .namespace
                .unwrap_or_else(|| request.namespace.to_string()),
            uid: created.metadata.uid,
        })
    }
}
