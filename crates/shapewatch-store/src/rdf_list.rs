//! Ordered sequences as graph-resident RDF lists.
//!
//! ```text
//! head ─rdf:first─▶ item0
//!   └─rdf:rest─▶ n1 ─rdf:first─▶ item1
//!                 └─rdf:rest─▶ rdf:nil
//! ```
//!
//! The graph itself is an unordered fact set, so order lives only in the
//! `rdf:rest` chain. Decoding walks that chain node by node; it never
//! gathers members with a bulk query.

use crate::error::ListError;
use crate::graph::GraphStore;
use crate::term::{Term, Triple, TriplePattern};
use shapewatch_vocab::iri::rdf;
use std::collections::HashSet;

/// Upper bound on nodes walked before a chain is rejected.
pub const MAX_LIST_LENGTH: usize = 10_000;

/// A freshly minted chain, ready to be written with the owner's facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedList {
    /// First node, or `rdf:nil` for an empty sequence.
    pub head: Term,
    pub facts: Vec<Triple>,
}

impl EncodedList {
    /// IRIs of the minted list nodes, in list order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.facts
            .iter()
            .filter(|t| t.predicate == rdf::FIRST)
            .map(|t| t.subject.as_str())
    }
}

/// Encode `items` as a new chain; `mint_node` supplies one fresh node IRI
/// per item.
pub fn encode_list(items: &[Term], mut mint_node: impl FnMut() -> String) -> EncodedList {
    let nodes: Vec<String> = items.iter().map(|_| mint_node()).collect();

    let mut facts = Vec::with_capacity(items.len() * 2);
    for (i, (node, item)) in nodes.iter().zip(items).enumerate() {
        facts.push(Triple::new(node.clone(), rdf::FIRST, item.clone()));
        let rest = match nodes.get(i + 1) {
            Some(next) => Term::iri(next.clone()),
            None => Term::iri(rdf::NIL),
        };
        facts.push(Triple::new(node.clone(), rdf::REST, rest));
    }

    let head = match nodes.first() {
        Some(first) => Term::iri(first.clone()),
        None => Term::iri(rdf::NIL),
    };
    EncodedList { head, facts }
}

/// Result of walking a chain: node IRIs and items, both in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListWalk {
    pub nodes: Vec<String>,
    pub items: Vec<Term>,
}

/// Walk the chain starting at `head`.
pub async fn walk_list(store: &dyn GraphStore, head: &Term) -> Result<ListWalk, ListError> {
    let mut walk = ListWalk::default();
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = head.clone();

    loop {
        let node = match current {
            Term::Iri(iri) if iri == rdf::NIL => break,
            Term::Iri(iri) => iri,
            Term::Literal(lit) => return Err(ListError::NotANode(lit.value)),
        };
        if !visited.insert(node.clone()) {
            return Err(ListError::Cycle(node));
        }
        if walk.nodes.len() >= MAX_LIST_LENGTH {
            return Err(ListError::TooLong(MAX_LIST_LENGTH));
        }

        let facts = store.select(&TriplePattern::about(node.clone())).await?;
        let first = single_object(&node, &facts, rdf::FIRST)?
            .ok_or_else(|| ListError::MissingFirst(node.clone()))?;
        let rest = single_object(&node, &facts, rdf::REST)?
            .ok_or_else(|| ListError::MissingRest(node.clone()))?;

        walk.items.push(first);
        walk.nodes.push(node);
        current = rest;
    }

    Ok(walk)
}

/// Decode the chain starting at `head` into its items, in order.
pub async fn decode_list(store: &dyn GraphStore, head: &Term) -> Result<Vec<Term>, ListError> {
    Ok(walk_list(store, head).await?.items)
}

fn single_object(
    node: &str,
    facts: &[Triple],
    predicate: &'static str,
) -> Result<Option<Term>, ListError> {
    let mut objects = facts.iter().filter(|t| t.predicate == predicate);
    let first = objects.next().map(|t| t.object.clone());
    let extra = objects.count();
    if extra > 0 {
        return Err(ListError::Branching {
            node: node.to_string(),
            predicate,
            count: extra + 1,
        });
    }
    Ok(first)
}
