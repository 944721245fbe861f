//! RDF terms, triples and triple patterns.
//!
//! There are no blank nodes: every node the encoding creates (list cells
//! included) is minted as an IRI, so a subject is always an IRI string.

use serde::{Deserialize, Serialize};
use shapewatch_vocab::iri::xsd;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Iri(String),
    Literal(Literal),
}

/// A typed literal. Plain strings carry `xsd:string`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    #[serde(default = "default_datatype")]
    pub datatype: String,
}

fn default_datatype() -> String {
    xsd::STRING.to_string()
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Term::typed(value, xsd::STRING)
    }

    pub fn integer(value: i64) -> Self {
        Term::typed(value.to_string(), xsd::INTEGER)
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            datatype: datatype.into(),
        })
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            Term::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            Term::Iri(_) => None,
        }
    }

    /// Lexical value of an `xsd:string` literal.
    pub fn as_string(&self) -> Option<&str> {
        self.as_literal()
            .filter(|lit| lit.datatype == xsd::STRING)
            .map(|lit| lit.value.as_str())
    }

    /// Value of an `xsd:integer` literal.
    pub fn as_integer(&self) -> Option<i64> {
        self.as_literal()
            .filter(|lit| lit.datatype == xsd::INTEGER)
            .and_then(|lit| lit.value.trim().parse().ok())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Literal(lit) if lit.datatype == xsd::STRING => write!(f, "{:?}", lit.value),
            Term::Literal(lit) => write!(f, "{:?}^^<{}>", lit.value, lit.datatype),
        }
    }
}

/// One fact in the named graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

/// A triple with optional positions; `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<Term>,
}

impl TriplePattern {
    pub fn any() -> Self {
        Self::default()
    }

    /// Every fact about `subject`.
    pub fn about(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Self::default()
        }
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_object(mut self, object: Term) -> Self {
        self.object = Some(object);
        self
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        self.subject.as_ref().is_none_or(|s| *s == triple.subject)
            && self.predicate.as_ref().is_none_or(|p| *p == triple.predicate)
            && self.object.as_ref().is_none_or(|o| *o == triple.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matches_bound_positions_only() {
        let triple = Triple::new("urn:s", "urn:p", Term::string("o"));
        assert!(TriplePattern::any().matches(&triple));
        assert!(TriplePattern::about("urn:s").matches(&triple));
        assert!(
            TriplePattern::about("urn:s")
                .with_predicate("urn:p")
                .with_object(Term::string("o"))
                .matches(&triple)
        );
        assert!(!TriplePattern::about("urn:s").with_predicate("urn:q").matches(&triple));
        assert!(!TriplePattern::any().with_object(Term::iri("o")).matches(&triple));
    }

    #[test]
    fn literal_accessors_check_datatype() {
        assert_eq!(Term::integer(3).as_integer(), Some(3));
        assert_eq!(Term::string("3").as_integer(), None);
        assert_eq!(Term::string("x").as_string(), Some("x"));
        assert_eq!(Term::iri("urn:x").as_string(), None);
    }

    #[test]
    fn literal_datatype_defaults_to_string_when_absent() {
        let term: Term = serde_json::from_str(r#"{"literal":{"value":"x"}}"#)
            .expect("literal without datatype should parse");
        assert_eq!(term, Term::string("x"));
    }
}
