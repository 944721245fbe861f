//! Errors surfaced by the filter core.

use serde::{Deserialize, Serialize};
use shapewatch_store::{ListError, StoreError};
use shapewatch_vocab::MappingError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Constraint,
    Filter,
    Subscriber,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Constraint => "constraint",
            ResourceKind::Filter => "filter",
            ResourceKind::Subscriber => "subscriber",
        })
    }
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl From<MappingError> for FieldIssue {
    fn from(err: MappingError) -> Self {
        FieldIssue {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid input: {}", describe_issues(.0))]
    Validation(Vec<FieldIssue>),

    #[error("unresolvable references: {}", describe_references(.constraints, .sub_filters))]
    Reference {
        constraints: Vec<String>,
        sub_filters: Vec<String>,
    },

    #[error("filter must reference at least one constraint or sub-filter")]
    EmptyFilter,

    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("no subscriber holds this token")]
    UnknownToken,

    #[error("filter {filter} is not subscribed by subscriber {subscriber}")]
    NotSubscribed { subscriber: String, filter: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: ResourceKind, id: String },

    #[error("cycle detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    #[error("malformed {kind} {id}: {reason}")]
    Malformed {
        kind: ResourceKind,
        id: String,
        reason: String,
    },

    #[error(transparent)]
    List(#[from] ListError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FilterError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FilterError::Validation(vec![FieldIssue {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        FilterError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn malformed(kind: ResourceKind, id: impl Into<String>, reason: impl Into<String>) -> Self {
        FilterError::Malformed {
            kind,
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::Validation(_) => "validation",
            FilterError::Reference { .. } => "reference",
            FilterError::EmptyFilter => "empty_filter",
            FilterError::NotFound { .. } => "not_found",
            FilterError::UnknownToken => "not_found",
            FilterError::NotSubscribed { .. } => "not_found",
            FilterError::AlreadyExists { .. } => "already_exists",
            FilterError::CycleDetected { .. } => "cycle_detected",
            FilterError::Malformed { .. } => "malformed",
            FilterError::List(ListError::Store(_)) => "store",
            FilterError::List(_) => "malformed",
            FilterError::Store(_) => "store",
        }
    }

    /// Message safe to show an untrusted client. Store failures are opaque.
    pub fn public_message(&self) -> String {
        match self {
            FilterError::Store(_) | FilterError::List(ListError::Store(_)) => {
                "graph store request failed".to_string()
            }
            FilterError::List(_) => "stored list structure is malformed".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the store itself failed, as opposed to the request or data.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            FilterError::Store(_) | FilterError::List(ListError::Store(_))
        )
    }
}

fn describe_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.field, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_references(constraints: &[String], sub_filters: &[String]) -> String {
    let mut parts = Vec::new();
    if !constraints.is_empty() {
        parts.push(format!("constraints [{}]", constraints.join(", ")));
    }
    if !sub_filters.is_empty() {
        parts.push(format!("sub-filters [{}]", sub_filters.join(", ")));
    }
    parts.join(", ")
}
