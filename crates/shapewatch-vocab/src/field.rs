//! Filterable fields and the graph paths they traverse.

use crate::error::MappingError;
use crate::iri::{dcat, dct, foaf, rdfs, skos};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A field of the watched resource that a constraint can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Description,
    Keyword,
    Publisher,
    Location,
    Theme,
}

/// Graph path from the watched resource to the tested value.
///
/// Multi-hop paths are written to the store as a SHACL sequence path, i.e.
/// an RDF list of predicate IRIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathExpression {
    Predicate(&'static str),
    Sequence(&'static [&'static str]),
}

impl PathExpression {
    /// Predicate IRIs in traversal order.
    pub fn steps(&self) -> &[&'static str] {
        match self {
            PathExpression::Predicate(iri) => std::slice::from_ref(iri),
            PathExpression::Sequence(steps) => steps,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, PathExpression::Sequence(_))
    }
}

const PUBLISHER_PATH: &[&str] = &[dct::PUBLISHER, foaf::NAME];
const LOCATION_PATH: &[&str] = &[dct::SPATIAL, rdfs::LABEL];
const THEME_PATH: &[&str] = &[dcat::THEME, skos::PREF_LABEL];

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Title,
        Field::Description,
        Field::Keyword,
        Field::Publisher,
        Field::Location,
        Field::Theme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Keyword => "keyword",
            Field::Publisher => "publisher",
            Field::Location => "location",
            Field::Theme => "theme",
        }
    }

    pub fn path(&self) -> PathExpression {
        match self {
            Field::Title => PathExpression::Predicate(dct::TITLE),
            Field::Description => PathExpression::Predicate(dct::DESCRIPTION),
            Field::Keyword => PathExpression::Predicate(dcat::KEYWORD),
            Field::Publisher => PathExpression::Sequence(PUBLISHER_PATH),
            Field::Location => PathExpression::Sequence(LOCATION_PATH),
            Field::Theme => PathExpression::Sequence(THEME_PATH),
        }
    }

    /// Reverse lookup from a decoded path.
    ///
    /// A one-step sequence does not match a single-predicate field: the
    /// stored shape of the path is part of its identity.
    pub fn from_path(steps: &[String], is_sequence: bool) -> Option<Field> {
        Field::ALL.into_iter().find(|field| {
            let path = field.path();
            path.is_sequence() == is_sequence
                && path.steps().len() == steps.len()
                && path.steps().iter().zip(steps).all(|(a, b)| *a == b.as_str())
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| MappingError::FieldNotFound(s.to_string()))
    }
}

/// Resolve a field name to its graph path.
pub fn map_field(name: &str) -> Result<PathExpression, MappingError> {
    name.parse::<Field>().map(|field| field.path())
}
