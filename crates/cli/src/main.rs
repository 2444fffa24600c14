//! `tekton-trigger` entry point.
//!
//! Composition root: parses configuration, installs tracing, builds the
//! cluster adapters and serves one of two HTTP surfaces.
//!
//! - `listen` loads the run template once, then receives CloudEvents on
//!   `/events` and creates a pipeline run for every successful check suite.
//! - `webhooks` serves the webhook registration API under `/webhooks/`.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cluster::{
    ConfigMapWebhookStore, GitHubSourceCreator, KubeClient, ListenerTemplateSource,
    PipelineRunSubmitter,
};
use listener::{
    build_event_router, build_webhook_router, serve, shutdown_signal, with_limits, EventState,
    Router, WebhookState,
};
use tokio::net::TcpListener;
use tracing::{error, info};
use trigger::ports::TemplateSource;
use trigger::{EventDispatcher, EventValidator, RunCoordinator, WebhookRegistry};

use crate::config::{Cli, ClusterArgs, Command, ListenArgs, ServerArgs, WebhookArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init(cli.log_format, cli.otlp_endpoint.as_deref())?;

    let Cli {
        cluster,
        server,
        command,
        ..
    } = cli;

    let result = match command {
        Command::Listen(args) => listen(args, &cluster, &server).await,
        Command::Webhooks(args) => webhooks(args, &cluster, &server).await,
    };
    if let Err(e) = &result {
        error!(error = ?e, "Exiting");
    }
    result
}

async fn listen(args: ListenArgs, cluster: &ClusterArgs, server: &ServerArgs) -> Result<()> {
    let config = args.trigger_config(server.port)?;
    let client = cluster.client(server.request_timeout())?;

    let template = ListenerTemplateSource::new(client.clone())
        .load_template(&config.template)
        .await
        .with_context(|| format!("failed to get tekton listener spec {}", config.template))?;

    info!(
        run_name = %config.run_name,
        namespace = %config.namespace,
        event_type = %config.expected_event_type,
        inject_revision = config.inject_revision,
        service_account = args.service_account.as_deref().unwrap_or_default(),
        "Starting event listener"
    );

    let submitter = Arc::new(PipelineRunSubmitter::new(client));
    let coordinator = Arc::new(RunCoordinator::new(&config, template, submitter));
    let dispatcher = EventDispatcher::new(EventValidator::from_config(&config), coordinator);
    let router = with_limits(
        build_event_router(EventState {
            dispatcher: Arc::new(dispatcher),
        }),
        server.limits(),
    );

    run_server(router, server.port).await
}

async fn webhooks(args: WebhookArgs, cluster: &ClusterArgs, server: &ServerArgs) -> Result<()> {
    let client: KubeClient = cluster.client(server.request_timeout())?;
    let registry = WebhookRegistry::new(
        args.defaults(),
        Arc::new(ConfigMapWebhookStore::new(client.clone())),
        Arc::new(GitHubSourceCreator::new(client)),
    );
    info!(
        install_namespace = %registry.install_namespace(),
        "Starting webhook registration API"
    );

    let router = with_limits(
        build_webhook_router(WebhookState {
            registry: Arc::new(registry),
        }),
        server.limits(),
    );

    run_server(router, server.port).await
}

async fn run_server(router: Router, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    serve(listener, router, shutdown_signal())
        .await
        .context("server failed")
}
