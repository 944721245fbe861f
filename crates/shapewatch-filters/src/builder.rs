//! Validation and persistence of filter nodes.
//!
//! ```text
//! <filters/f1> a sh:NodeShape ;
//!     sh:or ( <constraints/c1> <constraints/c2> <filters/f0> ) .
//! ```
//!
//! Constraint references come first in the child list, then sub-filter
//! references, each group in submitted order. The node and its list are
//! written in one update, guarded on the node IRI being unused so two
//! creates racing on one id cannot both land.

use crate::chain::owned_chain_nodes;
use crate::constraints::ConstraintRepository;
use crate::error::{FilterError, ResourceKind};
use crate::iri::{ResourceIris, validate_id};
use crate::loader::FilterLoader;
use crate::model::{Combinator, FilterNode, Reference};
use shapewatch_store::{GraphStore, GraphUpdate, StoreError, Term, Triple, encode_list};
use shapewatch_vocab::iri::{rdf, sh};
use std::sync::Arc;

#[derive(Clone)]
pub struct FilterBuilder {
    store: Arc<dyn GraphStore>,
    iris: ResourceIris,
    constraints: ConstraintRepository,
    loader: FilterLoader,
}

impl FilterBuilder {
    pub fn new(store: Arc<dyn GraphStore>, iris: ResourceIris) -> Self {
        Self {
            constraints: ConstraintRepository::new(store.clone(), iris.clone()),
            loader: FilterLoader::new(store.clone(), iris.clone()),
            store,
            iris,
        }
    }

    pub async fn create_filter(
        &self,
        id: &str,
        combinator: Combinator,
        constraint_refs: &[String],
        sub_filter_refs: &[String],
    ) -> Result<FilterNode, FilterError> {
        validate_id(id)?;
        if constraint_refs.is_empty() && sub_filter_refs.is_empty() {
            return Err(FilterError::EmptyFilter);
        }
        let already_exists = || FilterError::AlreadyExists {
            kind: ResourceKind::Filter,
            id: id.to_string(),
        };
        if self.loader.exists(id).await? {
            return Err(already_exists());
        }
        self.validate_references(constraint_refs, sub_filter_refs)
            .await?;
        // A deleted id can still be referenced by surviving filters.
        self.reject_cycles(id, sub_filter_refs).await?;

        let (facts, node) = self.encode(id, combinator, constraint_refs, sub_filter_refs);
        let update = GraphUpdate::new()
            .require_absent(self.iris.filter(id))
            .insert(facts);
        match self.store.update(&update).await {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => return Err(already_exists()),
            Err(err) => return Err(err.into()),
        }
        tracing::info!(
            filter = %id,
            ?combinator,
            children = node.children.len(),
            "filter created"
        );
        Ok(node)
    }

    /// Replace an existing node's combinator and children in one update.
    ///
    /// A node left with several combinator edges is repaired: every edge
    /// and its chain is replaced.
    pub async fn replace_filter(
        &self,
        id: &str,
        combinator: Combinator,
        constraint_refs: &[String],
        sub_filter_refs: &[String],
    ) -> Result<FilterNode, FilterError> {
        validate_id(id)?;
        if constraint_refs.is_empty() && sub_filter_refs.is_empty() {
            return Err(FilterError::EmptyFilter);
        }
        let heads = self.loader.combinator_heads(id).await?;
        if heads.is_empty() {
            return Err(FilterError::not_found(ResourceKind::Filter, id));
        }
        self.validate_references(constraint_refs, sub_filter_refs)
            .await?;
        self.reject_cycles(id, sub_filter_refs).await?;

        let iri = self.iris.filter(id);
        let stale = self.owned_chains(&iri, &heads).await?;
        let (facts, node) = self.encode(id, combinator, constraint_refs, sub_filter_refs);
        let update = GraphUpdate::new()
            .delete_subject(iri)
            .delete_subjects(stale)
            .insert(facts);
        self.store.update(&update).await?;
        tracing::info!(
            filter = %id,
            ?combinator,
            children = node.children.len(),
            "filter replaced"
        );
        Ok(node)
    }

    /// Remove the node and the child list of each of its combinator edges.
    /// Referenced constraints, sub-filters and subscription edges are left
    /// alone.
    pub async fn delete_filter(&self, id: &str) -> Result<(), FilterError> {
        let heads = self.loader.combinator_heads(id).await?;
        if heads.is_empty() {
            return Err(FilterError::not_found(ResourceKind::Filter, id));
        }
        let iri = self.iris.filter(id);
        let chain = self.owned_chains(&iri, &heads).await?;
        self.store
            .update(&GraphUpdate::new().delete_subject(iri).delete_subjects(chain))
            .await?;
        tracing::info!(filter = %id, "filter deleted");
        Ok(())
    }

    async fn owned_chains(&self, owner: &str, heads: &[Term]) -> Result<Vec<String>, FilterError> {
        let mut nodes = Vec::new();
        for head in heads {
            nodes.extend(owned_chain_nodes(self.store.as_ref(), &self.iris, owner, head).await?);
        }
        Ok(nodes)
    }

    /// Check every reference, then report all the bad ones together.
    async fn validate_references(
        &self,
        constraint_refs: &[String],
        sub_filter_refs: &[String],
    ) -> Result<(), FilterError> {
        let mut bad_constraints: Vec<String> = Vec::new();
        for id in constraint_refs {
            if bad_constraints.contains(id) {
                continue;
            }
            match self.constraints.find(id).await {
                Ok(_) => {}
                Err(err) if err.is_store_failure() => return Err(err),
                Err(err) => {
                    tracing::debug!(
                        constraint = %id,
                        error = %err,
                        "unresolvable constraint reference"
                    );
                    bad_constraints.push(id.clone());
                }
            }
        }

        let mut bad_sub_filters: Vec<String> = Vec::new();
        for id in sub_filter_refs {
            if bad_sub_filters.contains(id) {
                continue;
            }
            match self.loader.load_node(id).await {
                Ok(_) => {}
                Err(err) if err.is_store_failure() => return Err(err),
                Err(err) => {
                    tracing::debug!(
                        sub_filter = %id,
                        error = %err,
                        "unresolvable sub-filter reference"
                    );
                    bad_sub_filters.push(id.clone());
                }
            }
        }

        if bad_constraints.is_empty() && bad_sub_filters.is_empty() {
            Ok(())
        } else {
            Err(FilterError::Reference {
                constraints: bad_constraints,
                sub_filters: bad_sub_filters,
            })
        }
    }

    async fn reject_cycles(&self, id: &str, sub_filter_refs: &[String]) -> Result<(), FilterError> {
        for sub in sub_filter_refs {
            if let Some(route) = self.loader.find_route(sub, id).await? {
                let mut path = vec![id.to_string()];
                path.extend(route);
                return Err(FilterError::CycleDetected { path });
            }
        }
        Ok(())
    }

    fn encode(
        &self,
        id: &str,
        combinator: Combinator,
        constraint_refs: &[String],
        sub_filter_refs: &[String],
    ) -> (Vec<Triple>, FilterNode) {
        let children: Vec<Reference> = constraint_refs
            .iter()
            .map(Reference::constraint)
            .chain(sub_filter_refs.iter().map(Reference::filter))
            .collect();
        let items: Vec<Term> = children
            .iter()
            .map(|child| Term::iri(self.iris.reference_iri(child)))
            .collect();
        let list = encode_list(&items, || self.iris.mint_list_node());

        let iri = self.iris.filter(id);
        let mut facts = list.facts;
        facts.push(Triple::new(&iri, rdf::TYPE, Term::iri(sh::NODE_SHAPE)));
        facts.push(Triple::new(&iri, combinator.predicate(), list.head));

        let node = FilterNode {
            id: id.to_string(),
            combinator,
            children,
        };
        (facts, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConstraintInput;
    use shapewatch_store::{FileGraphStore, MemoryGraphStore};

    struct Fixture {
        store: Arc<MemoryGraphStore>,
        builder: FilterBuilder,
        constraints: ConstraintRepository,
        loader: FilterLoader,
    }

    async fn fixture(constraint_ids: &[&str]) -> Fixture {
        let store = Arc::new(MemoryGraphStore::new("urn:test:graph"));
        let iris = ResourceIris::default();
        let constraints = ConstraintRepository::new(store.clone(), iris.clone());
        for id in constraint_ids {
            constraints
                .create(id, &ConstraintInput::new("keyword", "textEquals", *id))
                .await
                .expect("create constraint");
        }
        Fixture {
            builder: FilterBuilder::new(store.clone(), iris.clone()),
            loader: FilterLoader::new(store.clone(), iris),
            constraints,
            store,
        }
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_children_are_rejected_before_anything_is_written() {
        let fx = fixture(&[]).await;
        let err = fx
            .builder
            .create_filter("f1", Combinator::All, &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::EmptyFilter));
        assert!(fx.store.is_empty().await);
    }

    #[tokio::test]
    async fn all_bad_references_are_reported_together() {
        let fx = fixture(&["c1"]).await;
        let err = fx
            .builder
            .create_filter(
                "f1",
                Combinator::All,
                &ids(&["c1", "c404", "c404"]),
                &ids(&["f404", "f405"]),
            )
            .await
            .unwrap_err();
        let FilterError::Reference {
            constraints,
            sub_filters,
        } = err
        else {
            panic!("expected a reference error");
        };
        assert_eq!(constraints, ids(&["c404"]));
        assert_eq!(sub_filters, ids(&["f404", "f405"]));
        assert!(!fx.loader.exists("f1").await.expect("exists"));
    }

    #[tokio::test]
    async fn constraint_id_is_not_a_valid_sub_filter() {
        let fx = fixture(&["c1"]).await;
        let err = fx
            .builder
            .create_filter("f1", Combinator::Any, &[], &ids(&["c1"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FilterError::Reference { sub_filters, .. } if sub_filters == ids(&["c1"])
        ));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let fx = fixture(&["c1"]).await;
        fx.builder
            .create_filter("f1", Combinator::All, &ids(&["c1"]), &[])
            .await
            .expect("create");
        let err = fx
            .builder
            .create_filter("f1", Combinator::Any, &ids(&["c1"]), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::AlreadyExists { kind: ResourceKind::Filter, .. }));
    }

    /// Two creates on one id race; exactly one may land.
    async fn race_two_creates(store: Arc<dyn GraphStore>) {
        let iris = ResourceIris::default();
        let constraints = ConstraintRepository::new(store.clone(), iris.clone());
        for id in ["c1", "c2"] {
            constraints
                .create(id, &ConstraintInput::new("keyword", "textEquals", id))
                .await
                .expect("create constraint");
        }
        let builder = FilterBuilder::new(store.clone(), iris.clone());
        let loader = FilterLoader::new(store, iris);

        let tasks = [(Combinator::All, "c1"), (Combinator::Any, "c2")].map(|(combinator, c)| {
            let builder = builder.clone();
            tokio::spawn(async move {
                builder
                    .create_filter("f1", combinator, &ids(&[c]), &[])
                    .await
            })
        });
        let mut created = 0;
        for task in tasks {
            match task.await.expect("task") {
                Ok(_) => created += 1,
                Err(FilterError::AlreadyExists { id, .. }) => assert_eq!(id, "f1"),
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(created, 1);

        let node = loader.load_node("f1").await.expect("single combinator edge");
        assert_eq!(node.children.len(), 1);
        builder.delete_filter("f1").await.expect("delete");
        assert!(!loader.exists("f1").await.expect("exists"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_on_one_id_admit_one() {
        for _ in 0..20 {
            race_two_creates(Arc::new(MemoryGraphStore::new("urn:test:graph"))).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_over_the_file_backend_admit_one() {
        for _ in 0..10 {
            let dir = std::env::temp_dir().join(format!(
                "shapewatch-builder-race-{}-{}",
                std::process::id(),
                uuid::Uuid::new_v4().simple()
            ));
            let store = FileGraphStore::new("urn:test:graph", dir.join("graph.jsonl"));
            race_two_creates(Arc::new(store)).await;
            let _ = std::fs::remove_dir_all(&dir);
        }
    }

    #[tokio::test]
    async fn node_with_two_combinator_edges_can_still_be_removed() {
        let fx = fixture(&["c1", "c2"]).await;
        let constraint_facts = fx.store.len().await;
        fx.builder
            .create_filter("f1", Combinator::All, &ids(&["c1"]), &[])
            .await
            .expect("create");
        // A second edge and list, as an unguarded concurrent write would leave.
        let (facts, _) = fx
            .builder
            .encode("f1", Combinator::Any, &ids(&["c2"]), &[]);
        fx.store
            .update(&GraphUpdate::new().insert(facts))
            .await
            .expect("second edge");
        assert!(matches!(
            fx.loader.load_node("f1").await,
            Err(FilterError::Malformed { .. })
        ));

        fx.builder
            .replace_filter("f1", Combinator::Any, &ids(&["c2"]), &[])
            .await
            .expect("replace repairs the node");
        let node = fx.loader.load_node("f1").await.expect("load");
        assert_eq!(node.children, vec![Reference::constraint("c2")]);

        fx.store
            .update(&GraphUpdate::new().insert(
                fx.builder.encode("f1", Combinator::All, &ids(&["c1"]), &[]).0,
            ))
            .await
            .expect("second edge again");
        fx.builder.delete_filter("f1").await.expect("delete");
        assert_eq!(fx.store.len().await, constraint_facts, "no facts left about f1 or its lists");
    }

    #[tokio::test]
    async fn replace_swaps_children_atomically() {
        let fx = fixture(&["c1", "c2", "c3"]).await;
        fx.builder
            .create_filter("inner", Combinator::All, &ids(&["c3"]), &[])
            .await
            .expect("create inner");
        fx.builder
            .create_filter("f1", Combinator::All, &ids(&["c1", "c2"]), &[])
            .await
            .expect("create");
        let before = fx.store.len().await;

        fx.builder
            .replace_filter("f1", Combinator::Any, &ids(&["c2"]), &ids(&["inner"]))
            .await
            .expect("replace");
        let node = fx.loader.load_node("f1").await.expect("load");
        assert_eq!(node.combinator, Combinator::Any);
        assert_eq!(
            node.children,
            vec![Reference::constraint("c2"), Reference::filter("inner")]
        );
        assert_eq!(fx.store.len().await, before, "old list nodes are removed");
    }

    #[tokio::test]
    async fn replace_that_closes_a_cycle_is_rejected() {
        let fx = fixture(&["c1"]).await;
        fx.builder
            .create_filter("a", Combinator::All, &ids(&["c1"]), &[])
            .await
            .expect("create a");
        fx.builder
            .create_filter("b", Combinator::All, &[], &ids(&["a"]))
            .await
            .expect("create b");

        let err = fx
            .builder
            .replace_filter("a", Combinator::All, &[], &ids(&["b"]))
            .await
            .unwrap_err();
        let FilterError::CycleDetected { path } = err else {
            panic!("expected a cycle");
        };
        assert_eq!(path, ids(&["a", "b", "a"]));

        let err = fx
            .builder
            .replace_filter("a", Combinator::All, &[], &ids(&["a"]))
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::CycleDetected { .. }));
        assert_eq!(
            fx.loader.load_node("a").await.expect("a intact").children,
            vec![Reference::constraint("c1")]
        );
    }

    #[tokio::test]
    async fn delete_leaves_referenced_resources() {
        let fx = fixture(&["c1"]).await;
        let constraint_facts = fx.store.len().await;
        fx.builder
            .create_filter("f1", Combinator::All, &ids(&["c1"]), &[])
            .await
            .expect("create");

        fx.builder.delete_filter("f1").await.expect("delete");
        assert_eq!(fx.store.len().await, constraint_facts);
        assert!(fx.constraints.exists("c1").await.expect("exists"));

        let err = fx.builder.delete_filter("f1").await.unwrap_err();
        assert!(matches!(err, FilterError::NotFound { .. }));
    }
}
