//! # shapewatch-store
//!
//! Triple-store access for shapewatch.
//!
//! This crate provides:
//! - `Term`/`Triple`/`TriplePattern` (the fact model, no blank nodes)
//! - the `GraphStore` protocol: ask, select, and one atomic `GraphUpdate`
//! - backends: in-memory, JSONL file, SPARQL 1.1 over HTTP
//! - the RDF list codec for ordered sequences
//!
//! ## Backends
//!
//! ```text
//! GraphStore
//!     ├── MemoryGraphStore   (RwLock<BTreeSet<Triple>>)
//!     ├── FileGraphStore     (graph.jsonl + graph.jsonl.lock)
//!     └── SparqlHttpStore    (query/update endpoints, one named graph)
//! ```

pub mod error;
pub mod file;
pub mod graph;
pub mod http;
pub mod jsonl;
pub mod memory;
pub mod rdf_list;
pub mod sparql;
pub mod term;

pub use error::{ListError, StoreError};
pub use file::{FileGraphStore, graph_lock_path, mutate_graph_jsonl};
pub use graph::{GraphStore, GraphUpdate};
pub use http::{SparqlEndpoint, SparqlHttpStore};
pub use memory::MemoryGraphStore;
pub use rdf_list::{EncodedList, ListWalk, MAX_LIST_LENGTH, decode_list, encode_list, walk_list};
pub use term::{Literal, Term, Triple, TriplePattern};
