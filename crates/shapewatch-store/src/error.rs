//! Store and list-codec errors.

/// A failed round-trip to the graph store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("graph file lock busy: {lock_path}")]
    LockBusy { lock_path: String },

    #[error("graph file I/O error: {0}")]
    Io(String),

    #[error("line {line}: parse error: {message}")]
    Parse { line: usize, message: String },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted graph file: {0}")]
    Corrupt(String),

    #[error("subject already has facts: {subject}")]
    Conflict { subject: String },

    #[error("invalid IRI: {0}")]
    InvalidIri(String),

    #[error("SPARQL transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SPARQL endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected SPARQL response: {0}")]
    Response(String),

    #[error("store task failed: {0}")]
    Task(String),
}

/// A graph-resident list that could not be walked.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("list head is a literal, not a list node: {0}")]
    NotANode(String),

    #[error("list node {0} has no rdf:first")]
    MissingFirst(String),

    #[error("list node {0} has no rdf:rest")]
    MissingRest(String),

    #[error("list node {node} has {count} values for {predicate}")]
    Branching {
        node: String,
        predicate: &'static str,
        count: usize,
    },

    #[error("list node {0} is reached twice")]
    Cycle(String),

    #[error("list longer than {0} nodes")]
    TooLong(usize),
}
