//! Kubernetes infrastructure adapter.
//!
//! Implements the port traits defined in the [`trigger`] crate
//! (`RunSubmitter`, `TemplateSource`, `WebhookStore`, `SourceCreator`) over the
//! API server's REST interface using a shared [`KubeClient`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Resource
//! paths, authentication and status-code mapping live here; the [`trigger`]
//! crate only ever sees [`trigger::ClusterError`].
//!
//! | Type | Port | Resource |
//! |------|------|----------|
//! | [`PipelineRunSubmitter`] | `RunSubmitter` | `tekton.dev/v1alpha1` `pipelineruns` |
//! | [`ListenerTemplateSource`] | `TemplateSource` | `tektonexperimental.dev/v1alpha1` `tektonlisteners` |
//! | [`ConfigMapWebhookStore`] | `WebhookStore` | `v1` `configmaps/githubwebhook` |
//! | [`GitHubSourceCreator`] | `SourceCreator` | `sources.eventing.knative.dev/v1alpha1` `githubsources` |

pub mod client;
pub mod listeners;
pub mod pipeline_runs;
pub mod sources;
pub mod webhook_store;

pub use client::{ConfigError, KubeClient, KubeConfig, ObjectMeta};
pub use listeners::ListenerTemplateSource;
pub use pipeline_runs::PipelineRunSubmitter;
pub use sources::GitHubSourceCreator;
pub use webhook_store::ConfigMapWebhookStore;
