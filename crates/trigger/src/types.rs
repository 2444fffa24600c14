//! Shared value types for the trigger domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! structure: the run template loaded at startup, the request materialised
//! from it for each event, and the decoded CI payload that drives it.

use serde::{Deserialize, Serialize};

use crate::{ListenerName, Namespace, Revision, RunName};

/// Parameter name that receives the check suite's head revision.
///
/// Matched case-insensitively.
pub const REVISION_PARAM: &str = "revision";

// ---------------------------------------------------------------------------
// Run template
// ---------------------------------------------------------------------------

/// A single named parameter of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name as declared by the pipeline.
    pub name: String,
    /// Value bound to the parameter.
    pub value: String,
}

impl Param {
    /// Creates a new parameter binding.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Reusable pipeline-run specification loaded once at startup.
///
/// The template is never mutated after load. Callers share it behind an
/// `Arc` and every [`RunRequest`] owns an independent deep copy, so concurrent
/// requests cannot observe each other's substitutions.
///
/// Fields other than `params` (pipeline reference, resources, service account,
/// timeouts, ...) are kept verbatim in `fields` and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTemplate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    params: Vec<Param>,

    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
}

impl RunTemplate {
    /// Creates a template from its parameters and remaining spec fields.
    pub fn new(params: Vec<Param>, fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { params, fields }
    }

    /// Returns the ordered parameter list.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the non-parameter spec fields.
    pub fn fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.fields
    }
}

/// Locates the cluster-resident object that holds the [`RunTemplate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    /// Namespace of the listener object.
    pub namespace: Namespace,
    /// Name of the listener object.
    pub listener: ListenerName,
}

impl std::fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.listener)
    }
}

// ---------------------------------------------------------------------------
// Run request / result
// ---------------------------------------------------------------------------

/// A concrete pipeline run ready for submission.
///
/// Always built from a [`RunTemplate`] by copy, stamped with the coordinator's
/// fixed name and namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Name the run is created under.
    pub name: RunName,
    /// Namespace the run is created in.
    pub namespace: Namespace,
    /// The run specification (a private copy of the template).
    pub spec: RunTemplate,
}

impl RunRequest {
    /// Copies `template` into a new request.
    pub fn from_template(template: &RunTemplate, name: RunName, namespace: Namespace) -> Self {
        Self {
            name,
            namespace,
            spec: template.clone(),
        }
    }

    /// Overwrites every parameter named `revision` (any case) with `revision`.
    ///
    /// Returns the number of parameters that were overwritten. Other
    /// parameters are left untouched.
    pub fn set_revision(&mut self, revision: &Revision) -> usize {
        let mut matched = 0;
        for param in self
            .spec
            .params
            .iter_mut()
            .filter(|p| p.name.eq_ignore_ascii_case(REVISION_PARAM))
        {
            param.value = revision.as_str().to_string();
            matched += 1;
        }
        matched
    }

    /// Returns the value of the named parameter, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.spec
            .params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// Identity of a resource the cluster actually stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentity {
    /// Object name as stored.
    pub name: String,
    /// Object namespace as stored.
    pub namespace: String,
    /// Server-assigned unique id, when the store reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl std::fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// ---------------------------------------------------------------------------
// Check suite payload
// ---------------------------------------------------------------------------

/// Final outcome reported for a completed check suite.
///
/// Unrecognised values decode to [`CheckSuiteConclusion::Other`] carrying the
/// raw string, so new conclusions never fail decoding and re-encode unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckSuiteConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
    ActionRequired,
    Stale,
    Skipped,
    Other(String),
}

impl CheckSuiteConclusion {
    /// Returns the wire form, e.g. `timed_out`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Neutral => "neutral",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
            Self::ActionRequired => "action_required",
            Self::Stale => "stale",
            Self::Skipped => "skipped",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for CheckSuiteConclusion {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "success" => Self::Success,
            "failure" => Self::Failure,
            "neutral" => Self::Neutral,
            "cancelled" => Self::Cancelled,
            "timed_out" => Self::TimedOut,
            "action_required" => Self::ActionRequired,
            "stale" => Self::Stale,
            "skipped" => Self::Skipped,
            _ => Self::Other(raw),
        }
    }
}

impl From<CheckSuiteConclusion> for String {
    fn from(conclusion: CheckSuiteConclusion) -> Self {
        match conclusion {
            CheckSuiteConclusion::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for CheckSuiteConclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `check_suite` object of a check suite event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_branch: Option<String>,

    /// Commit the suite ran against. Empty when the payload omits it.
    #[serde(default)]
    pub head_sha: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// `None` while the suite is still running.
    #[serde(default)]
    pub conclusion: Option<CheckSuiteConclusion>,
}

/// Minimal repository information carried by the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRepository {
    pub full_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
}

/// Decoded body of a check suite event.
///
/// Only the fields the trigger acts on are typed; everything else in the
/// upstream payload is ignored during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuitePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    pub check_suite: CheckSuite,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<PayloadRepository>,
}

impl CheckSuitePayload {
    /// Returns `true` when the suite concluded successfully.
    pub fn is_success(&self) -> bool {
        self.check_suite.conclusion == Some(CheckSuiteConclusion::Success)
    }

    /// Returns the head revision, or `None` if the payload carried an empty SHA.
    pub fn head_revision(&self) -> Option<Revision> {
        Revision::new(self.check_suite.head_sha.clone())
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
