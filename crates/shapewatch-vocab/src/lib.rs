//! # shapewatch-vocab
//!
//! The closed filter vocabulary and its graph encoding.
//!
//! A constraint names a [`Field`] and an [`Operator`]. The field resolves
//! to a [`PathExpression`] (one predicate, or a sequence of predicates for
//! multi-hop fields) and the operator, applied to the constraint's object,
//! resolves to a SHACL [`ConstraintFragment`]. Both lookups are pure and
//! exhaustive over the enums, and both have reverse lookups so stored
//! shapes can be read back into the same vocabulary.
//!
//! ```text
//! "publisher" ──map_field──▶ Sequence[dct:publisher, foaf:name]
//! "textContains", "x" ──map_operator──▶ { sh:pattern "x", sh:flags "i" }
//! ```

pub mod error;
pub mod field;
pub mod iri;
pub mod operator;

pub use error::MappingError;
pub use field::{Field, PathExpression, map_field};
pub use operator::{
    ConstraintFragment, FRAGMENT_PREDICATES, FragmentFact, FragmentValue, Operator,
    escape_pattern, map_operator,
};
