//! Event dispatch: validate, decode, route to the handler for the category.
//!
//! This is the single entry point the transport calls once per inbound
//! event. Routing is a closed match over [`DecodedEvent`]; a new category
//! needs a new arm here.

use std::sync::Arc;

use tracing::{info, instrument, warn, Span};

use crate::coordinator::{CheckSuiteOutcome, RunCoordinator};
use crate::decoder::{decode, DecodedEvent};
use crate::{EventEnvelope, EventValidator, ResourceIdentity, TriggerError};

/// Result of handling one event that was not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A pipeline run was created.
    Created(ResourceIdentity),
    /// The event was understood but did not qualify (e.g. a failed suite).
    Skipped,
    /// The event type has no handler; nothing was done.
    Ignored,
}

/// Routes validated events to their handlers.
#[derive(Debug)]
pub struct EventDispatcher {
    validator: EventValidator,
    coordinator: Arc<RunCoordinator>,
}

impl EventDispatcher {
    pub fn new(validator: EventValidator, coordinator: Arc<RunCoordinator>) -> Self {
        Self {
            validator,
            coordinator,
        }
    }

    /// Handles one inbound event.
    ///
    /// Rejections and failures are logged here, once, with the handling stage.
    #[instrument(skip_all, fields(event_id, event_type))]
    pub async fn handle(&self, envelope: &EventEnvelope) -> Result<DispatchOutcome, TriggerError> {
        if let Some(ctx) = &envelope.context {
            Span::current()
                .record("event_id", ctx.id.as_str())
                .record("event_type", ctx.event_type.as_str());
        }

        let result = self.dispatch(envelope).await;
        match &result {
            Ok(outcome) => info!(?outcome, "Event handled"),
            Err(e) => warn!(
                stage = e.stage(),
                retryable = e.retry_policy().is_retryable(),
                error = %e,
                "Event rejected"
            ),
        }
        result
    }

    async fn dispatch(&self, envelope: &EventEnvelope) -> Result<DispatchOutcome, TriggerError> {
        let context = self.validator.validate(envelope)?;
        info!("Handling event");

        let Some(event) = decode(context, envelope)? else {
            return Ok(DispatchOutcome::Ignored);
        };

        match event {
            DecodedEvent::CheckSuite(payload) => {
                match self.coordinator.handle_check_suite(&payload).await? {
                    CheckSuiteOutcome::Created(identity) => Ok(DispatchOutcome::Created(identity)),
                    CheckSuiteOutcome::Skipped => Ok(DispatchOutcome::Skipped),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_utils::RecordingSubmitter;
    use crate::{
        ClusterError, EventContext, EventId, EventType, ListenerName, Namespace, Param, RunName,
        RunTemplate, TemplateRef, TriggerConfig,
    };

    fn config(expected: &str) -> TriggerConfig {
        TriggerConfig::new(
            EventType::new(expected).unwrap(),
            RunName::new("listener-8082").unwrap(),
            Namespace::new("ci").unwrap(),
            TemplateRef {
                namespace: Namespace::new("ci").unwrap(),
                listener: ListenerName::new("listener").unwrap(),
            },
        )
        .with_inject_revision(true)
    }

    fn dispatcher(expected: &str, submitter: Arc<RecordingSubmitter>) -> EventDispatcher {
        let config = config(expected);
        let template = RunTemplate::new(vec![Param::new("revision", "HEAD")], Default::default());
        let coordinator = Arc::new(RunCoordinator::new(&config, template, submitter));
        EventDispatcher::new(EventValidator::from_config(&config), coordinator)
    }

    fn envelope(version: &str, event_type: &str, body: serde_json::Value) -> EventEnvelope {
        EventEnvelope::new(
            Some(EventContext {
                spec_version: version.into(),
                event_type: event_type.into(),
                id: EventId::generate(),
                source: None,
                time: None,
                data_content_type: None,
            }),
            Some(body.to_string().into_bytes()),
        )
    }

    fn suite(conclusion: &str) -> serde_json::Value {
        json!({ "check_suite": { "head_sha": "abc123", "conclusion": conclusion } })
    }

    #[tokio::test]
    async fn successful_suite_creates_run() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let d = dispatcher("com.github.checksuite", submitter.clone());

        let outcome = d
            .handle(&envelope("0.2", "com.github.checksuite", suite("success")))
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Created(ref id) if id.name == "listener-8082"));
        assert_eq!(submitter.requests()[0].param("revision"), Some("abc123"));
    }

    #[tokio::test]
    async fn wrong_version_never_reaches_coordinator() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let d = dispatcher("com.github.checksuite", submitter.clone());

        let err = d
            .handle(&envelope("1.0", "com.github.checksuite", suite("success")))
            .await
            .unwrap_err();

        assert!(matches!(err, TriggerError::UnsupportedVersion { .. }));
        assert!(submitter.requests().is_empty());
    }

    #[tokio::test]
    async fn wrong_type_never_reaches_coordinator() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let d = dispatcher("com.github.checksuite", submitter.clone());

        let err = d
            .handle(&envelope("0.2", "com.github.push", suite("success")))
            .await
            .unwrap_err();

        assert!(matches!(err, TriggerError::EventTypeMismatch { .. }));
        assert!(submitter.requests().is_empty());
    }

    #[tokio::test]
    async fn failed_suite_is_skipped() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let d = dispatcher("com.github.checksuite", submitter.clone());

        let outcome = d
            .handle(&envelope("0.2", "com.github.checksuite", suite("failure")))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert!(submitter.requests().is_empty());
    }

    #[tokio::test]
    async fn failed_suite_without_revision_is_skipped() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let d = dispatcher("com.github.checksuite", submitter.clone());

        for body in [
            json!({ "check_suite": { "head_sha": "", "conclusion": "failure" } }),
            json!({ "check_suite": { "conclusion": "failure" } }),
        ] {
            let outcome = d
                .handle(&envelope("0.2", "com.github.checksuite", body))
                .await
                .unwrap();
            assert_eq!(outcome, DispatchOutcome::Skipped);
        }
        assert!(submitter.requests().is_empty());
    }

    #[tokio::test]
    async fn configured_type_without_handler_is_ignored() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let d = dispatcher("com.github.push", submitter.clone());

        let outcome = d
            .handle(&envelope("0.2", "com.github.push", json!({ "ref": "refs/heads/main" })))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(submitter.requests().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let d = dispatcher("com.github.checksuite", submitter.clone());

        let err = d
            .handle(&envelope("0.2", "com.github.checksuite", json!([1, 2, 3])))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), "decode");
        assert!(submitter.requests().is_empty());
    }

    #[tokio::test]
    async fn submission_failure_surfaces() {
        let submitter = Arc::new(RecordingSubmitter::failing(ClusterError::Api {
            status: 500,
            message: "internal error".into(),
            retry_after: None,
        }));
        let d = dispatcher("com.github.checksuite", submitter);

        let err = d
            .handle(&envelope("0.2", "com.github.checksuite", suite("success")))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), "submit");
        assert!(err.retry_policy().is_retryable());
    }
}
