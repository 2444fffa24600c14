//! Startup configuration consumed by the trigger core.
//!
//! A [`TriggerConfig`] is built once by the composition root and passed by
//! value to constructors. Nothing in this crate reads the environment.

use serde::{Deserialize, Serialize};

use crate::{EventType, Namespace, RunName, SpecVersion, TemplateRef};

/// The only CloudEvents spec version accepted.
pub const SUPPORTED_SPEC_VERSION: &str = "0.2";

/// Event type emitted for GitHub check suite notifications.
pub const CHECK_SUITE_EVENT_TYPE: &str = "com.github.checksuite";

/// Configuration for the event validator and the run-trigger coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Event type the listener accepts; anything else is rejected.
    pub expected_event_type: EventType,

    /// Protocol version the listener accepts.
    pub spec_version: SpecVersion,

    /// When set, the check suite's head SHA replaces the template's
    /// `revision` parameter.
    pub inject_revision: bool,

    /// Name every created run is proposed under.
    pub run_name: RunName,

    /// Namespace runs are created in.
    pub namespace: Namespace,

    /// Where the run template is loaded from.
    pub template: TemplateRef,
}

impl TriggerConfig {
    /// Creates a configuration with the supported spec version.
    pub fn new(
        expected_event_type: EventType,
        run_name: RunName,
        namespace: Namespace,
        template: TemplateRef,
    ) -> Self {
        Self {
            expected_event_type,
            spec_version: SpecVersion::supported(),
            inject_revision: false,
            run_name,
            namespace,
            template,
        }
    }

    /// Enables or disables revision injection.
    pub fn with_inject_revision(mut self, inject: bool) -> Self {
        self.inject_revision = inject;
        self
    }
}
