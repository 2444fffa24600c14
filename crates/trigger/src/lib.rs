//! Tekton trigger domain.
//!
//! Turns inbound CI notifications into pipeline runs. An event arrives as an
//! [`EventEnvelope`], is checked by the [`EventValidator`], decoded into a
//! typed payload by [`decoder::decode`], and routed by the
//! [`EventDispatcher`] to the [`RunCoordinator`], which copies the run
//! template, substitutes the commit revision, and submits the run through a
//! [`ports::RunSubmitter`], one submission at a time.
//!
//! The crate also holds the rules for registering repository webhooks
//! ([`webhooks::WebhookRegistry`]).
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no network I/O
//! dependencies. It defines *what* is needed; the `cluster` crate defines
//! *how* to reach the Kubernetes API, and the `listener` crate owns HTTP.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RunName`, `Namespace`, `EventType`, ...) |
//! | [`types`] | Run template, run request, check suite payload |
//! | [`errors`] | Per-event error taxonomy, cluster errors, retry policy |
//! | [`config`] | Startup configuration value |
//! | [`envelope`] | CloudEvents envelope (binary and structured modes) |
//! | [`validator`] | Version and type checks |
//! | [`decoder`] | Category lookup and payload decoding |
//! | [`coordinator`] | Single-flight run creation |
//! | [`dispatch`] | Per-event entry point |
//! | [`ports`] | Traits implemented by infrastructure adapters |
//! | [`webhooks`] | Webhook registration rules |

pub mod config;
pub mod coordinator;
pub mod decoder;
pub mod dispatch;
pub mod envelope;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod types;
pub mod validator;
pub mod webhooks;

#[cfg(test)]
mod test_utils;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{TriggerConfig, CHECK_SUITE_EVENT_TYPE, SUPPORTED_SPEC_VERSION};
pub use coordinator::{CheckSuiteOutcome, RunCoordinator};
pub use decoder::{DecodedEvent, EventCategory};
pub use dispatch::{DispatchOutcome, EventDispatcher};
pub use envelope::{EventContext, EventEnvelope, STRUCTURED_CONTENT_TYPE};
pub use errors::{ClusterError, RetryPolicy, StoreError, TemplateError, TriggerError};
pub use identifiers::{EventId, EventType, ListenerName, Namespace, Revision, RunName, SpecVersion};
pub use types::{
    CheckSuite, CheckSuiteConclusion, CheckSuitePayload, Param, PayloadRepository,
    ResourceIdentity, RunRequest, RunTemplate, TemplateRef, REVISION_PARAM,
};
pub use validator::EventValidator;
pub use webhooks::{GitHubSource, Webhook, WebhookDefaults, WebhookError, WebhookRegistry};
