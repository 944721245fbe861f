//! Comparison operators and the SHACL fragments they compile to.
//!
//! Every operator is a declarative fragment on a property shape. Textual
//! operators become an `sh:pattern` over the escaped object plus a
//! case-insensitive `sh:flags`; cardinality operators become
//! `sh:minCount` / `sh:maxCount`.

use crate::error::MappingError;
use crate::iri::sh;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    /// Whole value matches, ignoring case.
    TextEquals,
    /// Value contains the object, ignoring case.
    TextContains,
    /// Value starts with the object, ignoring case.
    TextStartsWith,
    /// At least one value is present.
    Exists,
    /// No value is present.
    NotExists,
}

/// Literal value carried by a fragment fact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FragmentValue {
    Text(String),
    Integer(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FragmentFact {
    pub predicate: &'static str,
    pub value: FragmentValue,
}

/// Facts attached to a property shape to express one operator.
///
/// Facts are kept sorted so two fragments compare equal regardless of the
/// order they were read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstraintFragment {
    facts: Vec<FragmentFact>,
}

/// Predicates a fragment may use. Anything else on a property shape is not
/// part of its fragment.
pub const FRAGMENT_PREDICATES: [&str; 4] = [sh::PATTERN, sh::FLAGS, sh::MIN_COUNT, sh::MAX_COUNT];

impl ConstraintFragment {
    pub fn new(mut facts: Vec<FragmentFact>) -> Self {
        facts.sort();
        facts.dedup();
        Self { facts }
    }

    pub fn facts(&self) -> &[FragmentFact] {
        &self.facts
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Canonical `&'static` form of a fragment predicate, if it is one.
    pub fn fragment_predicate(iri: &str) -> Option<&'static str> {
        FRAGMENT_PREDICATES.into_iter().find(|p| *p == iri)
    }

    fn pattern(pattern: String) -> Self {
        Self::new(vec![
            FragmentFact {
                predicate: sh::PATTERN,
                value: FragmentValue::Text(pattern),
            },
            FragmentFact {
                predicate: sh::FLAGS,
                value: FragmentValue::Text("i".to_string()),
            },
        ])
    }

    fn count(predicate: &'static str, n: i64) -> Self {
        Self::new(vec![FragmentFact {
            predicate,
            value: FragmentValue::Integer(n),
        }])
    }
}

impl Operator {
    pub const ALL: [Operator; 5] = [
        Operator::TextEquals,
        Operator::TextContains,
        Operator::TextStartsWith,
        Operator::Exists,
        Operator::NotExists,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::TextEquals => "textEquals",
            Operator::TextContains => "textContains",
            Operator::TextStartsWith => "textStartsWith",
            Operator::Exists => "exists",
            Operator::NotExists => "notExists",
        }
    }

    /// Compile the operator applied to `value`.
    pub fn fragment(&self, value: &str) -> ConstraintFragment {
        match self {
            Operator::TextEquals => {
                ConstraintFragment::pattern(format!("^{}$", escape_pattern(value)))
            }
            Operator::TextContains => ConstraintFragment::pattern(escape_pattern(value)),
            Operator::TextStartsWith => {
                ConstraintFragment::pattern(format!("^{}", escape_pattern(value)))
            }
            Operator::Exists => ConstraintFragment::count(sh::MIN_COUNT, 1),
            Operator::NotExists => ConstraintFragment::count(sh::MAX_COUNT, 0),
        }
    }

    /// Reverse lookup: the operator that compiles `value` into `fragment`.
    pub fn from_fragment(fragment: &ConstraintFragment, value: &str) -> Option<Operator> {
        Operator::ALL
            .into_iter()
            .find(|op| op.fragment(value) == *fragment)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| MappingError::OperatorNotFound(s.to_string()))
    }
}

/// Resolve an operator name and its object to a constraint fragment.
pub fn map_operator(op: &str, value: &str) -> Result<ConstraintFragment, MappingError> {
    op.parse::<Operator>().map(|op| op.fragment(value))
}

/// Escape every XPath regular-expression metacharacter in `value`.
///
/// `sh:pattern` is evaluated with XPath `fn:matches` semantics, which only
/// accepts single-character escapes for metacharacters, so this cannot be
/// delegated to a host regex escaper.
pub fn escape_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(
            ch,
            '\\' | '|' | '.' | '?' | '*' | '+' | '(' | ')' | '{' | '}' | '-' | '[' | ']' | '^'
                | '$'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
