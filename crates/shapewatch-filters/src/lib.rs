//! # shapewatch-filters
//!
//! Boolean subscription filters persisted as SHACL shapes.
//!
//! A filter is a tree: each node combines its children with ALL (`sh:and`)
//! or ANY (`sh:or`), and each child is either a leaf constraint (a
//! `sh:PropertyShape`) or another filter node. Children are kept in an RDF
//! list so their order survives the unordered graph.
//!
//! ```text
//! SubscriptionService
//!     ├── ConstraintRepository   constraints/{id}   property shapes
//!     ├── FilterBuilder          filters/{id}       validate + write nodes
//!     ├── FilterLoader           filters/{id}       read nodes and trees
//!     └── SubscriberDirectory    subscribers/{id}   email, token, edges
//! ```
//!
//! Every write is one `GraphUpdate`, so readers never see half of a
//! create or replace.

pub mod builder;
mod chain;
pub mod constraints;
pub mod error;
pub mod iri;
pub mod loader;
pub mod model;
pub mod notify;
pub mod service;
pub mod subscribers;

pub use builder::FilterBuilder;
pub use constraints::ConstraintRepository;
pub use error::{FieldIssue, FilterError, ResourceKind};
pub use iri::{DEFAULT_BASE_IRI, ResourceIris};
pub use loader::{FilterLoader, Resolution};
pub use model::{
    Combinator, Constraint, ConstraintInput, FilterInput, FilterNode, FilterResource, FilterTree,
    Reference, Subscriber, TreeChild,
};
pub use notify::{Notifier, NotifyError};
pub use service::{CreatedFilter, SubscriberLink, SubscriptionService};
pub use subscribers::{SubscriberDirectory, generate_token, normalize_email, token_digest};
