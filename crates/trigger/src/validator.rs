//! Envelope validation.
//!
//! Rejects events that are not for this listener before any payload is
//! touched. Checks run in a fixed order: context present, spec version, event
//! type. The first failing check wins.

use tracing::debug;

use crate::{EventContext, EventEnvelope, EventType, SpecVersion, TriggerConfig, TriggerError};

/// Checks protocol version and event type against configuration.
#[derive(Debug, Clone)]
pub struct EventValidator {
    spec_version: SpecVersion,
    expected_type: EventType,
}

impl EventValidator {
    /// Creates a validator accepting exactly `spec_version` and `expected_type`.
    pub fn new(spec_version: SpecVersion, expected_type: EventType) -> Self {
        Self {
            spec_version,
            expected_type,
        }
    }

    /// Creates a validator from the trigger configuration.
    pub fn from_config(config: &TriggerConfig) -> Self {
        Self::new(
            config.spec_version.clone(),
            config.expected_event_type.clone(),
        )
    }

    /// Validates `envelope`, returning its context on success.
    pub fn validate<'a>(
        &self,
        envelope: &'a EventEnvelope,
    ) -> Result<&'a EventContext, TriggerError> {
        let context = envelope
            .context
            .as_ref()
            .ok_or_else(|| TriggerError::InvalidEnvelope {
                reason: "empty event context".to_string(),
            })?;

        if context.spec_version != self.spec_version.as_str() {
            return Err(TriggerError::UnsupportedVersion {
                found: context.spec_version.clone(),
                supported: self.spec_version.clone(),
            });
        }

        if context.event_type != self.expected_type.as_str() {
            return Err(TriggerError::EventTypeMismatch {
                found: context.event_type.clone(),
                expected: self.expected_type.clone(),
            });
        }

        debug!(event_id = %context.id, event_type = %context.event_type, "Event envelope valid");
        Ok(context)
    }
}
