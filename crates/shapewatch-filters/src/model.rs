//! Resource shapes exchanged with callers.
//!
//! These are transient views; the graph is the source of truth.

use crate::error::ResourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shapewatch_vocab::iri::sh;
use shapewatch_vocab::{Field, Operator};

/// Boolean mode of a filter node over its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    All,
    Any,
}

impl Combinator {
    /// `sh:and` for ALL, `sh:or` for ANY.
    pub fn predicate(&self) -> &'static str {
        match self {
            Combinator::All => sh::AND,
            Combinator::Any => sh::OR,
        }
    }

    pub fn from_predicate(iri: &str) -> Option<Combinator> {
        match iri {
            sh::AND => Some(Combinator::All),
            sh::OR => Some(Combinator::Any),
            _ => None,
        }
    }

    pub fn from_require_all(require_all: bool) -> Combinator {
        if require_all {
            Combinator::All
        } else {
            Combinator::Any
        }
    }

    pub fn require_all(&self) -> bool {
        matches!(self, Combinator::All)
    }
}

/// Unvalidated constraint as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintInput {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl ConstraintInput {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub id: String,
    pub subject: Field,
    pub predicate: Operator,
    pub object: String,
}

/// A child of a filter node: which kind of resource, and its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub kind: ResourceKind,
    pub id: String,
}

impl Reference {
    pub fn constraint(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Constraint,
            id: id.into(),
        }
    }

    pub fn filter(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Filter,
            id: id.into(),
        }
    }
}

/// One filter node with its direct children, in stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterNode {
    pub id: String,
    pub combinator: Combinator,
    pub children: Vec<Reference>,
}

impl FilterNode {
    pub fn ids_of(&self, kind: ResourceKind) -> Vec<String> {
        self.children
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn to_resource(&self) -> FilterResource {
        FilterResource {
            id: self.id.clone(),
            require_all: self.combinator.require_all(),
            constraints: self.ids_of(ResourceKind::Constraint),
            sub_filters: self.ids_of(ResourceKind::Filter),
        }
    }
}

/// Unvalidated filter as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterInput {
    pub require_all: bool,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub sub_filters: Vec<String>,
}

impl FilterInput {
    pub fn combinator(&self) -> Combinator {
        Combinator::from_require_all(self.require_all)
    }
}

/// A filter node expanded one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResource {
    pub id: String,
    pub require_all: bool,
    pub constraints: Vec<String>,
    pub sub_filters: Vec<String>,
}

/// A filter node with its whole sub-tree loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTree {
    pub id: String,
    pub combinator: Combinator,
    pub children: Vec<TreeChild>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TreeChild {
    Constraint(Constraint),
    Filter(FilterTree),
    /// Referenced resource no longer exists.
    Dangling(Reference),
}

impl TreeChild {
    pub fn id(&self) -> &str {
        match self {
            TreeChild::Constraint(c) => &c.id,
            TreeChild::Filter(f) => &f.id,
            TreeChild::Dangling(r) => &r.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: String,
    pub email: String,
    pub created: DateTime<Utc>,
}
