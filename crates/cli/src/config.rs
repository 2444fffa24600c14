//! Command-line and environment configuration.
//!
//! Every setting can be given as a flag or through the environment variable
//! named next to it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cluster::{KubeClient, KubeConfig};
use listener::ServerLimits;
use trigger::{
    EventType, ListenerName, Namespace, RunName, TemplateRef, TriggerConfig, WebhookDefaults,
    CHECK_SUITE_EVENT_TYPE,
};

/// The only receiver kind supported.
pub const CLOUD_EVENT_RECEIVER: &str = "cloudevent";

#[derive(Parser, Debug)]
#[command(
    name = "tekton-trigger",
    version,
    about = "Creates Tekton pipeline runs from CI notifications"
)]
pub struct Cli {
    #[command(flatten)]
    pub cluster: ClusterArgs,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json, global = true)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; spans are exported when set.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", global = true)]
    pub otlp_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive CloudEvents and create pipeline runs.
    Listen(ListenArgs),
    /// Serve the webhook registration API.
    Webhooks(WebhookArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

#[derive(Args, Debug, Clone)]
pub struct ClusterArgs {
    /// API server URL; the in-cluster address is used when unset.
    #[arg(long, env = "MASTER_URL", global = true)]
    pub master_url: Option<String>,

    /// Bearer token file.
    #[arg(long, env = "KUBE_TOKEN_FILE", global = true)]
    pub kube_token_file: Option<PathBuf>,

    /// CA bundle for the API server.
    #[arg(long, env = "KUBE_CA_FILE", global = true)]
    pub kube_ca_file: Option<PathBuf>,

    /// Kubeconfig file. Not supported; rejected when set.
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<PathBuf>,
}

impl ClusterArgs {
    pub fn client(&self, timeout: Duration) -> Result<KubeClient> {
        if let Some(path) = &self.kubeconfig {
            bail!(
                "KUBECONFIG ({}) is not supported; set MASTER_URL with KUBE_TOKEN_FILE and \
                 KUBE_CA_FILE, or run in-cluster",
                path.display()
            );
        }
        let config = KubeConfig::resolve(
            self.master_url.as_deref(),
            self.kube_token_file.as_deref(),
            self.kube_ca_file.as_deref(),
        )
        .context("failed to resolve cluster connection")?
        .with_timeout(timeout);
        KubeClient::new(config).context("failed to build cluster client")
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8082, global = true)]
    pub port: u16,

    /// Seconds before an in-flight request is abandoned.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub request_timeout_secs: u64,

    /// Requests handled at once; more wait.
    #[arg(long, env = "MAX_CONCURRENT_REQUESTS", default_value_t = 64, global = true)]
    pub max_concurrent_requests: usize,
}

impl ServerArgs {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn limits(&self) -> ServerLimits {
        ServerLimits {
            request_timeout: self.request_timeout(),
            max_concurrent_requests: self.max_concurrent_requests,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Receiver kind.
    #[arg(long, env = "EVENT", default_value = CLOUD_EVENT_RECEIVER)]
    pub event: String,

    /// Event type to accept.
    #[arg(long, env = "EVENT_TYPE", default_value = CHECK_SUITE_EVENT_TYPE)]
    pub event_type: String,

    /// Namespace of the listener object and of created runs.
    #[arg(long, env = "NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Service account the listener runs as.
    #[arg(long, env = "SERVICEACCOUNT")]
    pub service_account: Option<String>,

    /// Name of the listener object holding the run template.
    #[arg(long, env = "LISTENER_RESOURCE", default_value = "")]
    pub listener_resource: String,

    /// Substitute the check suite's head SHA into the `revision` parameter.
    #[arg(long, env = "SETBUILDSHA")]
    pub set_build_sha: bool,
}

impl ListenArgs {
    /// Validates the arguments and builds the trigger configuration.
    ///
    /// Runs are named `<listener>-<port>`.
    pub fn trigger_config(&self, port: u16) -> Result<TriggerConfig> {
        if self.event != CLOUD_EVENT_RECEIVER {
            bail!("invalid event type: {:?}", self.event);
        }
        let Some(namespace) = Namespace::new(self.namespace.trim()) else {
            bail!("NAMESPACE env var can not be empty");
        };
        let Some(listener) = ListenerName::new(self.listener_resource.trim()) else {
            bail!("LISTENER_RESOURCE env var can not be empty");
        };
        let event_type = EventType::new(self.event_type.trim())
            .with_context(|| format!("invalid EVENT_TYPE {:?}", self.event_type))?;
        let run_name = RunName::new(format!("{listener}-{port}"))
            .context("run name can not be empty")?;

        Ok(TriggerConfig::new(
            event_type,
            run_name,
            namespace.clone(),
            TemplateRef {
                namespace,
                listener,
            },
        )
        .with_inject_revision(self.set_build_sha))
    }
}

#[derive(Args, Debug, Clone)]
pub struct WebhookArgs {
    /// Namespace sources and webhook records are kept in.
    #[arg(long, env = "INSTALLED_NAMESPACE", default_value = "")]
    pub install_namespace: String,

    /// Registry used when a webhook names none.
    #[arg(long, env = "DOCKER_REGISTRY_LOCATION", default_value = "")]
    pub docker_registry: String,
}

impl WebhookArgs {
    pub fn defaults(&self) -> WebhookDefaults {
        WebhookDefaults {
            namespace: self.install_namespace.trim().to_string(),
            docker_registry: self.docker_registry.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listen_args(extra: &[&str]) -> (ListenArgs, u16) {
        let mut argv = vec!["tekton-trigger", "listen"];
        argv.extend_from_slice(extra);
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Listen(args) => (args, cli.server.port),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn builds_trigger_config() {
        let (args, port) = listen_args(&[
            "--namespace",
            "ci",
            "--listener-resource",
            "checksuite",
            "--set-build-sha",
        ]);

        let config = args.trigger_config(port).unwrap();
        assert_eq!(config.run_name.as_str(), "checksuite-8082");
        assert_eq!(config.namespace.as_str(), "ci");
        assert_eq!(config.expected_event_type.as_str(), "com.github.checksuite");
        assert_eq!(config.spec_version.as_str(), "0.2");
        assert!(config.inject_revision);
        assert_eq!(config.template.to_string(), "ci/checksuite");
    }

    #[test]
    fn port_flag_follows_subcommand() {
        let (args, port) = listen_args(&[
            "--namespace",
            "ci",
            "--listener-resource",
            "l",
            "--port",
            "9000",
        ]);
        assert_eq!(args.trigger_config(port).unwrap().run_name.as_str(), "l-9000");
        assert!(!args.trigger_config(port).unwrap().inject_revision);
    }

    #[test]
    fn empty_namespace_is_rejected() {
        let (args, port) = listen_args(&["--listener-resource", "l"]);
        let err = args.trigger_config(port).unwrap_err();
        assert!(err.to_string().contains("NAMESPACE"));
    }

    #[test]
    fn unsupported_receiver_is_rejected() {
        let (args, port) = listen_args(&[
            "--namespace",
            "ci",
            "--listener-resource",
            "l",
            "--event",
            "webhook",
        ]);
        assert!(args.trigger_config(port).is_err());
    }

    #[test]
    fn webhook_defaults_from_args() {
        let cli = Cli::try_parse_from([
            "tekton-trigger",
            "webhooks",
            "--install-namespace",
            "tekton-pipelines",
            "--docker-registry",
            "quay.io/me",
        ])
        .unwrap();
        let Command::Webhooks(args) = cli.command else {
            panic!("expected webhooks");
        };
        assert_eq!(
            args.defaults(),
            WebhookDefaults {
                namespace: "tekton-pipelines".into(),
                docker_registry: "quay.io/me".into(),
            }
        );
    }

    #[test]
    fn kubeconfig_is_rejected_by_name() {
        let cli = Cli::try_parse_from([
            "tekton-trigger",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--master-url",
            "https://api.example.com:6443",
            "webhooks",
        ])
        .unwrap();

        let err = cli.cluster.client(Duration::from_secs(5)).unwrap_err();
        assert!(err.to_string().contains("KUBECONFIG"));
        assert!(err.to_string().contains("/tmp/kubeconfig"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
