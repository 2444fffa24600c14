//! Payload decoding, polymorphic over event category.
//!
//! Each recognised category maps to one [`DecodedEvent`] variant. Event types
//! with no category are not an error: [`decode`] returns `Ok(None)` so the
//! listener stays forward-compatible with events it does not act on yet.
//! Adding a category means adding an [`EventCategory`] variant, its
//! [`DecodedEvent`] variant, and a handler arm in [`crate::dispatch`].

use crate::config::CHECK_SUITE_EVENT_TYPE;
use crate::{CheckSuitePayload, EventContext, EventEnvelope, TriggerError};

/// Event categories the listener knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// A CI check suite finished.
    CheckSuite,
}

impl EventCategory {
    /// Every known category.
    pub const ALL: &'static [EventCategory] = &[EventCategory::CheckSuite];

    /// The CloudEvents `type` this category is delivered under.
    pub fn event_type(self) -> &'static str {
        match self {
            Self::CheckSuite => CHECK_SUITE_EVENT_TYPE,
        }
    }

    /// Looks up the category for an event type; `None` if unknown.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.event_type() == event_type)
    }
}

/// A typed payload for one known category.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    CheckSuite(CheckSuitePayload),
}

impl DecodedEvent {
    /// Returns the category of this payload.
    pub fn category(&self) -> EventCategory {
        match self {
            Self::CheckSuite(_) => EventCategory::CheckSuite,
        }
    }
}

/// Decodes the body of a validated envelope.
///
/// # Returns
///
/// * `Ok(Some(event))` - known category, payload decoded
/// * `Ok(None)` - unknown category (ignored, not an error)
/// * `Err(TriggerError::Decode)` - known category, malformed payload
pub fn decode(
    context: &EventContext,
    envelope: &EventEnvelope,
) -> Result<Option<DecodedEvent>, TriggerError> {
    let Some(category) = EventCategory::from_event_type(&context.event_type) else {
        return Ok(None);
    };

    let decode_error = |source| TriggerError::Decode {
        event_type: context.event_type.clone(),
        source,
    };

    match category {
        EventCategory::CheckSuite => {
            let payload: CheckSuitePayload = envelope.data_as().map_err(decode_error)?;
            Ok(Some(DecodedEvent::CheckSuite(payload)))
        }
    }
}
