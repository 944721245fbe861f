//! Lookup failures for the closed filter vocabulary.

/// A field or operator name that is not part of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("unknown field: {0}")]
    FieldNotFound(String),

    #[error("unknown operator: {0}")]
    OperatorNotFound(String),
}

impl MappingError {
    /// The API-level field that carried the unknown name.
    pub fn field(&self) -> &'static str {
        match self {
            MappingError::FieldNotFound(_) => "subject",
            MappingError::OperatorNotFound(_) => "predicate",
        }
    }
}
