//! Knative `GitHubSource` creation.

use async_trait::async_trait;
use serde::de::IgnoredAny;
use tracing::{info, instrument};
use trigger::ports::SourceCreator;
use trigger::webhooks::GitHubSource;
use trigger::{ClusterError, Namespace};

use crate::client::KubeClient;

pub const SOURCES_API_VERSION: &str = "sources.eventing.knative.dev/v1alpha1";

fn github_sources_path(namespace: &Namespace) -> String {
    format!("/apis/{SOURCES_API_VERSION}/namespaces/{namespace}/githubsources")
}

#[derive(Debug, Clone)]
pub struct GitHubSourceCreator {
    client: KubeClient,
}

impl GitHubSourceCreator {
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceCreator for GitHubSourceCreator {
    #[instrument(skip_all, fields(namespace = %namespace, source = %source.metadata.name))]
    async fn create_source(
        &self,
        namespace: &Namespace,
        source: &GitHubSource,
    ) -> Result<(), ClusterError> {
        let _: IgnoredAny = self
            .client
            .post(&github_sources_path(namespace), source)
            .await?;
        info!(repository = %source.spec.owner_and_repository, "Created GitHubSource");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use trigger::webhooks::{parse_repository_url, Webhook};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::KubeConfig;

    fn client(server: &MockServer) -> KubeClient {
        KubeClient::new(KubeConfig::new(server.uri())).unwrap()
    }

    fn source() -> GitHubSource {
        let webhook = Webhook {
            name: "hook".into(),
            namespace: "green".into(),
            git_repository_url: "https://github.com/owner/repo".into(),
            access_token_ref: "github-secret".into(),
            ..Webhook::default()
        };
        let repo = parse_repository_url(&webhook.git_repository_url).unwrap();
        GitHubSource::for_webhook(&webhook, &repo)
    }

    #[tokio::test]
    async fn posts_source_to_install_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!(
                "/apis/{SOURCES_API_VERSION}/namespaces/tekton-pipelines/githubsources"
            )))
            .and(body_partial_json(json!({
                "kind": "GitHubSource",
                "metadata": { "name": "hook" },
                "spec": { "ownerAndRepository": "owner/repo" }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "metadata": { "name": "hook" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let creator = GitHubSourceCreator::new(client(&server));
        creator
            .create_source(&Namespace::new("tekton-pipelines").unwrap(), &source())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejection_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "message": "invalid" })))
            .mount(&server)
            .await;

        let creator = GitHubSourceCreator::new(client(&server));
        let err = creator
            .create_source(&Namespace::new("tekton-pipelines").unwrap(), &source())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid"));
        assert!(!err.retry_policy().is_retryable());
    }
}
