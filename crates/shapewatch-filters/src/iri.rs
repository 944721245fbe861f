//! Resource IRIs minted under a configurable base.

use crate::error::{FilterError, ResourceKind};
use crate::model::Reference;

pub const DEFAULT_BASE_IRI: &str = "http://shapewatch.dev/id";

const CONSTRAINTS: &str = "constraints";
const FILTERS: &str = "filters";
const SUBSCRIBERS: &str = "subscribers";
const LISTS: &str = "lists";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIris {
    base: String,
}

impl Default for ResourceIris {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_IRI)
    }
}

impl ResourceIris {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn constraint(&self, id: &str) -> String {
        self.mint(CONSTRAINTS, id)
    }

    pub fn filter(&self, id: &str) -> String {
        self.mint(FILTERS, id)
    }

    pub fn subscriber(&self, id: &str) -> String {
        self.mint(SUBSCRIBERS, id)
    }

    pub fn for_kind(&self, kind: ResourceKind, id: &str) -> String {
        match kind {
            ResourceKind::Constraint => self.constraint(id),
            ResourceKind::Filter => self.filter(id),
            ResourceKind::Subscriber => self.subscriber(id),
        }
    }

    /// A fresh list node; every encoded chain gets its own.
    pub fn mint_list_node(&self) -> String {
        self.mint(LISTS, &uuid::Uuid::new_v4().to_string())
    }

    pub fn is_list_node(&self, iri: &str) -> bool {
        self.strip(LISTS, iri).is_some()
    }

    pub fn constraint_id<'a>(&self, iri: &'a str) -> Option<&'a str> {
        self.strip(CONSTRAINTS, iri)
    }

    pub fn filter_id<'a>(&self, iri: &'a str) -> Option<&'a str> {
        self.strip(FILTERS, iri)
    }

    pub fn subscriber_id<'a>(&self, iri: &'a str) -> Option<&'a str> {
        self.strip(SUBSCRIBERS, iri)
    }

    /// Child reference named by a list item IRI.
    pub fn reference(&self, iri: &str) -> Option<Reference> {
        if let Some(id) = self.constraint_id(iri) {
            return Some(Reference::constraint(id));
        }
        self.filter_id(iri).map(Reference::filter)
    }

    pub fn reference_iri(&self, reference: &Reference) -> String {
        self.for_kind(reference.kind, &reference.id)
    }

    fn mint(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.base)
    }

    fn strip<'a>(&self, collection: &str, iri: &'a str) -> Option<&'a str> {
        let id = iri
            .strip_prefix(self.base.as_str())?
            .strip_prefix('/')?
            .strip_prefix(collection)?
            .strip_prefix('/')?;
        is_valid_id(id).then_some(id)
    }
}

/// Ids become the last IRI segment, so they are restricted to unreserved
/// characters.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

pub fn validate_id(id: &str) -> Result<(), FilterError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(FilterError::validation(
            "id",
            format!("{id:?} is not a valid id (1-128 of A-Z a-z 0-9 - _ . ~)"),
        ))
    }
}

pub fn mint_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
