//! Single-flight run-trigger coordinator.
//!
//! [`RunCoordinator`] turns a successful check suite into exactly one
//! pipeline-run creation call. The run name is fixed per coordinator, so
//! submissions are serialised behind an async mutex and at most one is in
//! flight at a time.
//!
//! The template is shared read-only behind an [`Arc`]; each submission works
//! on its own deep copy. The lock guards only the copy-and-submit path.
//!
//! No retries and no timeout here; the transport boundary imposes request
//! timeouts.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::CHECK_SUITE_EVENT_TYPE;
use crate::ports::RunSubmitter;
use crate::{
    CheckSuitePayload, Namespace, ResourceIdentity, Revision, RunName, RunRequest, RunTemplate,
    TriggerConfig, TriggerError,
};

/// What happened to one check suite event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckSuiteOutcome {
    /// A pipeline run was created.
    Created(ResourceIdentity),
    /// The suite did not conclude successfully; nothing was submitted.
    Skipped,
}

/// Serialises run creation for one listener.
pub struct RunCoordinator {
    template: Arc<RunTemplate>,
    run_name: RunName,
    namespace: Namespace,
    inject_revision: bool,
    submitter: Arc<dyn RunSubmitter>,
    submit_lock: Mutex<()>,
}

impl RunCoordinator {
    /// Creates a coordinator around a loaded template.
    pub fn new(
        config: &TriggerConfig,
        template: RunTemplate,
        submitter: Arc<dyn RunSubmitter>,
    ) -> Self {
        Self {
            template: Arc::new(template),
            run_name: config.run_name.clone(),
            namespace: config.namespace.clone(),
            inject_revision: config.inject_revision,
            submitter,
            submit_lock: Mutex::new(()),
        }
    }

    /// Returns the shared, immutable template.
    pub fn template(&self) -> &Arc<RunTemplate> {
        &self.template
    }

    /// Returns the fixed run name.
    pub fn run_name(&self) -> &RunName {
        &self.run_name
    }

    /// Returns the fixed target namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Handles a decoded check suite.
    ///
    /// Unsuccessful (or still running) suites are skipped without error.
    pub async fn handle_check_suite(
        &self,
        payload: &CheckSuitePayload,
    ) -> Result<CheckSuiteOutcome, TriggerError> {
        if !payload.is_success() {
            info!(
                conclusion = ?payload.check_suite.conclusion,
                head_sha = %payload.check_suite.head_sha,
                "Check suite not successful, no run triggered"
            );
            return Ok(CheckSuiteOutcome::Skipped);
        }

        let Some(revision) = payload.head_revision() else {
            return Err(TriggerError::MissingRevision {
                event_type: CHECK_SUITE_EVENT_TYPE.to_string(),
            });
        };

        let created = self.create_run(&revision).await?;
        info!(run = %created, revision = %revision, "Created pipeline run");
        Ok(CheckSuiteOutcome::Created(created))
    }

    /// Copies the template, optionally injects `revision`, and submits it.
    ///
    /// Holds the submission lock for the whole call; it is released on every
    /// return path when the guard drops.
    pub async fn create_run(&self, revision: &Revision) -> Result<ResourceIdentity, TriggerError> {
        let _guard = self.submit_lock.lock().await;

        let mut request = RunRequest::from_template(
            &self.template,
            self.run_name.clone(),
            self.namespace.clone(),
        );

        if self.inject_revision && request.set_revision(revision) == 0 {
            info!(run = %request.name, "No revision param to update");
        }

        info!(
            run = %request.name,
            namespace = %request.namespace,
            revision = %revision,
            "Creating pipeline run"
        );

        self.submitter
            .submit(&request)
            .await
            .map_err(|source| {
                warn!(
                    run = %request.name,
                    namespace = %request.namespace,
                    error = %source,
                    retryable = source.retry_policy().is_retryable(),
                    "Pipeline run submission failed"
                );
                TriggerError::Submission {
                    run_name: request.name.clone(),
                    namespace: request.namespace.clone(),
                    source,
                }
            })
    }
}

impl std::fmt::Debug for RunCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("run_name", &self.run_name)
            .field("namespace", &self.namespace)
            .field("inject_revision", &self.inject_revision)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
