//! Inbound event envelope.
//!
//! An [`EventEnvelope`] is the protocol-level wrapper around one inbound
//! notification: CloudEvents context attributes plus an opaque body. It is
//! created per request by the transport, handed to the validator, and dropped
//! once the event has been handled.
//!
//! Two CloudEvents HTTP content modes are understood:
//!
//! - **binary**: attributes travel as `ce-*` headers and the HTTP body is the
//!   event data ([`EventEnvelope::from_binary`]);
//! - **structured**: the whole event, attributes and data, is one JSON
//!   document sent as `application/cloudevents+json`
//!   ([`EventEnvelope::from_structured`]).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{EventId, TriggerError};

/// Content type announcing a structured-mode CloudEvent.
pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

const HEADER_PREFIX: &str = "ce-";

/// CloudEvents context attributes of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    /// Declared protocol version (`specversion`), not yet validated.
    pub spec_version: String,
    /// Declared event type (`type`), not yet validated.
    pub event_type: String,
    /// Event id; generated on receipt when the sender omitted it.
    pub id: EventId,
    /// Event source URI reference, if supplied.
    pub source: Option<String>,
    /// Event timestamp, if supplied and parseable.
    pub time: Option<DateTime<Utc>>,
    /// Media type of the data, if supplied.
    pub data_content_type: Option<String>,
}

/// One inbound event: optional context plus opaque body.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    /// `None` when the request carried no CloudEvents attributes at all.
    pub context: Option<EventContext>,
    data: Option<Vec<u8>>,
}

impl EventEnvelope {
    /// Builds an envelope from its parts.
    pub fn new(context: Option<EventContext>, data: Option<Vec<u8>>) -> Self {
        Self { context, data }
    }

    /// Builds an envelope from a binary-mode request.
    ///
    /// `headers` are `(name, value)` pairs; names are matched
    /// case-insensitively. Without a `ce-specversion` header the envelope has
    /// no context. An empty body means no data.
    pub fn from_binary<'a, I>(headers: I, body: &[u8]) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut spec_version = None;
        let mut event_type = None;
        let mut id = None;
        let mut source = None;
        let mut time = None;
        let mut data_content_type = None;

        for (name, value) in headers {
            let name = name.to_ascii_lowercase();
            if name == "content-type" {
                data_content_type = Some(value.to_string());
                continue;
            }
            let Some(attr) = name.strip_prefix(HEADER_PREFIX) else {
                continue;
            };
            match attr {
                "specversion" => spec_version = Some(value.to_string()),
                "type" => event_type = Some(value.to_string()),
                "id" => id = EventId::new(value),
                "source" => source = Some(value.to_string()),
                "time" => time = parse_time(value),
                _ => {}
            }
        }

        let context = spec_version.map(|spec_version| EventContext {
            spec_version,
            event_type: event_type.unwrap_or_default(),
            id: id.unwrap_or_else(EventId::generate),
            source,
            time,
            data_content_type,
        });

        let data = (!body.is_empty()).then(|| body.to_vec());
        Self { context, data }
    }

    /// Builds an envelope from a structured-mode JSON document.
    ///
    /// Fails with [`TriggerError::InvalidEnvelope`] if the body is not a JSON
    /// object. A document without `specversion` yields an envelope with no
    /// context.
    pub fn from_structured(body: &[u8]) -> Result<Self, TriggerError> {
        let raw: StructuredEvent =
            serde_json::from_slice(body).map_err(|e| TriggerError::InvalidEnvelope {
                reason: format!("structured event is not a valid JSON object: {e}"),
            })?;

        let context = raw.specversion.map(|spec_version| EventContext {
            spec_version,
            event_type: raw.event_type.unwrap_or_default(),
            id: raw
                .id
                .and_then(EventId::new)
                .unwrap_or_else(EventId::generate),
            source: raw.source,
            time: raw.time.as_deref().and_then(parse_time),
            data_content_type: raw.datacontenttype,
        });

        let data = match raw.data {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(value.to_string().into_bytes()),
        };

        Ok(Self { context, data })
    }

    /// Returns the declared event type, if there is a context.
    pub fn event_type(&self) -> Option<&str> {
        self.context.as_ref().map(|c| c.event_type.as_str())
    }

    /// Returns the raw body bytes, if any.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Deserializes the body as JSON into `T`.
    ///
    /// An absent body is treated as JSON `null`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.data {
            Some(bytes) => serde_json::from_slice(bytes),
            None => serde_json::from_value(serde_json::Value::Null),
        }
    }
}

/// Wire shape of a structured-mode event.
#[derive(Debug, Deserialize)]
struct StructuredEvent {
    specversion: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    id: Option<String>,
    source: Option<String>,
    time: Option<String>,
    #[serde(alias = "contenttype")]
    datacontenttype: Option<String>,
    data: Option<serde_json::Value>,
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
