//! List chains owned by a single resource.
//!
//! Chains are minted per write and never shared, so an owner that is
//! deleted or replaced takes its chain nodes with it.

use crate::error::FilterError;
use crate::iri::ResourceIris;
use shapewatch_store::{GraphStore, ListError, MAX_LIST_LENGTH, Term, walk_list};
use shapewatch_vocab::iri::rdf;
use std::collections::HashSet;

/// Node IRIs of the chain starting at `head`, if `head` is one of ours.
///
/// A broken chain yields the nodes reachable from its head through
/// single `rdf:rest` links, so a damaged owner can still be removed.
pub(crate) async fn owned_chain_nodes(
    store: &dyn GraphStore,
    iris: &ResourceIris,
    owner: &str,
    head: &Term,
) -> Result<Vec<String>, FilterError> {
    let Some(head_iri) = head.as_iri().filter(|iri| iris.is_list_node(iri)) else {
        return Ok(Vec::new());
    };
    match walk_list(store, head).await {
        Ok(walk) => Ok(walk.nodes),
        Err(ListError::Store(err)) => Err(err.into()),
        Err(err) => {
            tracing::warn!(
                %owner,
                error = %err,
                "owned list chain is broken; removing the walkable prefix"
            );
            walkable_prefix(store, iris, head_iri).await
        }
    }
}

/// Follow `rdf:rest` through our own list nodes, stopping at `rdf:nil`, a
/// foreign or repeated node, or a node without exactly one rest.
async fn walkable_prefix(
    store: &dyn GraphStore,
    iris: &ResourceIris,
    head_iri: &str,
) -> Result<Vec<String>, FilterError> {
    let mut nodes = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current = head_iri.to_string();

    while nodes.len() < MAX_LIST_LENGTH && seen.insert(current.clone()) {
        nodes.push(current.clone());
        let rests = store.objects(&current, rdf::REST).await?;
        let [next] = rests.as_slice() else {
            break;
        };
        match next.as_iri() {
            Some(iri) if iris.is_list_node(iri) => current = iri.to_string(),
            _ => break,
        }
    }
    Ok(nodes)
}
