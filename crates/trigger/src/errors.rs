//! Error and retry-policy types for the trigger domain.
//!
//! [`TriggerError`] is the taxonomy reported for one inbound event: three
//! validation-stage rejections, a decode failure, and a submission failure.
//! Events the trigger deliberately does not act on (unknown categories,
//! unsuccessful check suites) are *not* errors and never appear here.
//!
//! [`ClusterError`] is what infrastructure adapters return when the cluster
//! API rejects or fails a call. It is preserved as the source of
//! [`TriggerError::Submission`] so that callers can inspect its
//! [`RetryPolicy`] and decide for themselves whether to redeliver.
//!
//! Webhook registration errors live in [`crate::webhooks`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EventType, Namespace, RunName, SpecVersion, TemplateRef};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// The trigger itself never retries; this classification is reported upward
/// so the transport boundary (or the event sender) can choose a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// Retrying the same input will fail the same way.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Cluster failures
// ---------------------------------------------------------------------------

/// A failed call against the cluster API.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClusterError {
    /// The API server answered with a non-success status.
    #[error("cluster API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Server-provided message (the `Status.message` field when present).
        message: String,
        /// Parsed `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },

    /// The request never produced a response (connect, TLS, timeout).
    #[error("cluster API unreachable: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The response body could not be interpreted.
    #[error("unexpected cluster API response: {message}")]
    Decode {
        /// Description of what was wrong with the body.
        message: String,
    },
}

impl ClusterError {
    /// Classifies this failure for retry decisions.
    ///
    /// Throttling (429) and server-side failures (5xx) are retryable; other
    /// client errors are not. Transport failures are retryable.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Api {
                status,
                retry_after,
                ..
            } if *status == 429 || *status >= 500 => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Api { .. } => RetryPolicy::NonRetryable,
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::Decode { .. } => RetryPolicy::NonRetryable,
        }
    }

    /// Returns `true` if the API server reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Returns `true` if the API server reported a name conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status: 409, .. })
    }
}

/// Failure loading the run template at startup.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The listener object exists but carries no pipeline-run spec.
    #[error("listener {reference} has no pipelineRunSpec")]
    MissingSpec {
        /// The listener that was read.
        reference: TemplateRef,
    },

    /// The pipeline-run spec could not be decoded into a template.
    #[error("listener {reference} has a malformed pipelineRunSpec: {source}")]
    Malformed {
        /// The listener that was read.
        reference: TemplateRef,
        /// Underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },

    /// The cluster call failed.
    #[error("failed to get listener {reference}: {source}")]
    Cluster {
        /// The listener that was requested.
        reference: TemplateRef,
        /// Underlying cluster failure.
        #[source]
        source: ClusterError,
    },
}

/// Failure reading or writing persisted webhook records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cluster call failed.
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// The stored record could not be decoded or encoded.
    #[error("webhook record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Per-event errors
// ---------------------------------------------------------------------------

/// Errors that reject or fail the handling of one inbound event.
///
/// Every variant carries enough context to diagnose the failure without
/// inspecting the payload.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The envelope carried no event context (no version, type or id).
    #[error("invalid event envelope: {reason}")]
    InvalidEnvelope {
        /// What was missing or malformed.
        reason: String,
    },

    /// The envelope's protocol version is not the one this trigger speaks.
    #[error("unsupported event spec version '{found}', only '{supported}' is supported")]
    UnsupportedVersion {
        /// Version the sender declared.
        found: String,
        /// The single supported version.
        supported: SpecVersion,
    },

    /// The declared event type is not the configured one.
    #[error("mismatched event type '{found}', expected '{expected}'")]
    EventTypeMismatch {
        /// Type the sender declared.
        found: String,
        /// Configured expected type.
        expected: EventType,
    },

    /// The body of a recognised event category could not be decoded.
    #[error("failed to decode '{event_type}' payload: {source}")]
    Decode {
        /// Event type whose payload was malformed.
        event_type: String,
        /// Underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },

    /// A successful check suite named no commit to build.
    #[error("successful '{event_type}' event carries no head revision")]
    MissingRevision {
        /// Event type of the payload.
        event_type: String,
    },

    /// The cluster rejected or failed the run creation.
    #[error("failed to create pipeline run '{run_name}' in namespace '{namespace}': {source}")]
    Submission {
        /// Name the run was proposed under.
        run_name: RunName,
        /// Target namespace.
        namespace: Namespace,
        /// Underlying cluster failure.
        #[source]
        source: ClusterError,
    },
}

impl TriggerError {
    /// Returns the handling stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidEnvelope { .. }
            | Self::UnsupportedVersion { .. }
            | Self::EventTypeMismatch { .. } => "validate",
            Self::Decode { .. } | Self::MissingRevision { .. } => "decode",
            Self::Submission { .. } => "submit",
        }
    }

    /// Classifies this error for retry decisions.
    ///
    /// Only submission failures can be retryable, and only when their
    /// underlying cluster failure is.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Submission { source, .. } => source.retry_policy(),
            _ => RetryPolicy::NonRetryable,
        }
    }
}
