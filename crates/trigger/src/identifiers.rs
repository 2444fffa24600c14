//! Newtype domain identifiers.
//!
//! Run names, namespaces, event types and the like are distinct newtypes
//! wrapping a `String`, so a [`Namespace`] cannot be passed where a
//! [`RunName`] is expected even though both are plain strings on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Cluster object names
// ---------------------------------------------------------------------------

string_id! {
    /// Name proposed for every pipeline run created by one coordinator.
    ///
    /// Derived once at startup from the listener identity (`<listener>-<port>`),
    /// never per event.
    RunName
}

string_id! {
    /// A Kubernetes namespace.
    Namespace
}

impl Namespace {
    /// The Kubernetes `default` namespace.
    pub fn default_namespace() -> Self {
        Self("default".to_string())
    }
}

string_id! {
    /// Name of the cluster-resident listener object holding the run template.
    ListenerName
}

// ---------------------------------------------------------------------------
// Event metadata
// ---------------------------------------------------------------------------

string_id! {
    /// A CloudEvents `type` attribute (e.g. `"com.github.checksuite"`).
    EventType
}

string_id! {
    /// A CloudEvents `specversion` attribute (e.g. `"0.2"`).
    SpecVersion
}

impl SpecVersion {
    /// The single version this trigger accepts.
    pub fn supported() -> Self {
        Self(crate::config::SUPPORTED_SPEC_VERSION.to_string())
    }
}

string_id! {
    /// A Git commit SHA reported by the CI system as the check suite's head.
    Revision
}

/// Identifies a single inbound event for log correlation.
///
/// Taken from the CloudEvents `id` attribute when the sender supplies one;
/// otherwise generated on receipt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Wraps a sender-supplied id, returning `None` if it is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
