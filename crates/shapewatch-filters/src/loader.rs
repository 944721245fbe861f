//! Reconstruction of filter trees from the graph.
//!
//! A filter node is a `sh:NodeShape` with exactly one `sh:and` or `sh:or`
//! edge pointing at the head of its child list. Children are resolved in
//! list order and loaded depth-first. The set of filters on the current
//! path is carried down, so a cyclic graph fails with `CycleDetected`
//! instead of recursing forever; a filter shared by two branches is not a
//! cycle, and is read from the store once per load.

use crate::constraints::ConstraintRepository;
use crate::error::{FilterError, ResourceKind};
use crate::iri::{ResourceIris, is_valid_id};
use crate::model::{Combinator, FilterNode, FilterTree, Reference, TreeChild};
use shapewatch_store::{GraphStore, Term, Triple, TriplePattern, decode_list};
use shapewatch_vocab::iri::{rdf, sh};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type TreeFuture<'a> = Pin<Box<dyn Future<Output = Result<FilterTree, FilterError>> + Send + 'a>>;

/// What a child reference turned out to be when resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Constraint,
    Filter,
    Missing,
}

/// The combinator edge of a stored filter node.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredNode {
    pub combinator: Combinator,
    pub head: Term,
}

#[derive(Clone)]
pub struct FilterLoader {
    store: Arc<dyn GraphStore>,
    iris: ResourceIris,
    constraints: ConstraintRepository,
}

impl FilterLoader {
    pub fn new(store: Arc<dyn GraphStore>, iris: ResourceIris) -> Self {
        let constraints = ConstraintRepository::new(store.clone(), iris.clone());
        Self {
            store,
            iris,
            constraints,
        }
    }

    /// Whether any combinator edge is stored for `id`. A node damaged into
    /// having two edges still exists.
    pub async fn exists(&self, id: &str) -> Result<bool, FilterError> {
        Ok(!self.combinator_heads(id).await?.is_empty())
    }

    /// List heads of every `sh:and`/`sh:or` edge on the node, in no order.
    pub(crate) async fn combinator_heads(&self, id: &str) -> Result<Vec<Term>, FilterError> {
        if !is_valid_id(id) {
            return Ok(Vec::new());
        }
        let facts = self
            .store
            .select(&TriplePattern::about(self.iris.filter(id)))
            .await?;
        Ok(facts
            .into_iter()
            .filter(|t| Combinator::from_predicate(&t.predicate).is_some())
            .map(|t| t.object)
            .collect())
    }

    async fn stored_node(&self, id: &str) -> Result<Option<StoredNode>, FilterError> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let facts = self
            .store
            .select(&TriplePattern::about(self.iris.filter(id)))
            .await?;
        combinator_edge(id, &facts)
    }

    /// One level: the node's combinator and its direct child references.
    pub async fn load_node(&self, id: &str) -> Result<FilterNode, FilterError> {
        let node = self
            .stored_node(id)
            .await?
            .ok_or_else(|| FilterError::not_found(ResourceKind::Filter, id))?;

        let mut children = Vec::new();
        for item in decode_list(self.store.as_ref(), &node.head).await? {
            let reference = item
                .as_iri()
                .and_then(|iri| self.iris.reference(iri))
                .ok_or_else(|| {
                    FilterError::malformed(
                        ResourceKind::Filter,
                        id,
                        format!("child {item} is not a constraint or filter reference"),
                    )
                })?;
            children.push(reference);
        }

        Ok(FilterNode {
            id: id.to_string(),
            combinator: node.combinator,
            children,
        })
    }

    /// Look up what a reference currently points at.
    pub async fn resolve(&self, reference: &Reference) -> Result<Resolution, FilterError> {
        let facts = self
            .store
            .select(&TriplePattern::about(self.iris.reference_iri(reference)))
            .await?;
        let is_constraint = facts
            .iter()
            .any(|t| t.predicate == rdf::TYPE && t.object == Term::iri(sh::PROPERTY_SHAPE));
        let is_filter = facts
            .iter()
            .any(|t| Combinator::from_predicate(&t.predicate).is_some());

        match (is_constraint, is_filter) {
            (true, true) => Err(FilterError::malformed(
                reference.kind,
                reference.id.clone(),
                "resolves as both a constraint and a filter",
            )),
            (true, false) => Ok(Resolution::Constraint),
            (false, true) => Ok(Resolution::Filter),
            (false, false) => Ok(Resolution::Missing),
        }
    }

    /// The node and its whole sub-tree, children in stored order.
    pub async fn load_filter(&self, id: &str) -> Result<FilterTree, FilterError> {
        let mut ancestors = Vec::new();
        let mut finished = HashMap::new();
        self.load_tree(id.to_string(), &mut ancestors, &mut finished)
            .await
    }

    fn load_tree<'a>(
        &'a self,
        id: String,
        ancestors: &'a mut Vec<String>,
        finished: &'a mut HashMap<String, FilterTree>,
    ) -> TreeFuture<'a> {
        Box::pin(async move {
            if let Some(tree) = finished.get(&id) {
                return Ok(tree.clone());
            }
            if let Some(start) = ancestors.iter().position(|a| *a == id) {
                let mut path = ancestors[start..].to_vec();
                path.push(id);
                return Err(FilterError::CycleDetected { path });
            }

            let node = self.load_node(&id).await?;
            ancestors.push(id.clone());

            let mut children = Vec::with_capacity(node.children.len());
            for reference in node.children {
                let child = match self.resolve(&reference).await? {
                    Resolution::Constraint if reference.kind == ResourceKind::Constraint => {
                        TreeChild::Constraint(self.constraints.find(&reference.id).await?)
                    }
                    Resolution::Filter if reference.kind == ResourceKind::Filter => {
                        TreeChild::Filter(self.load_tree(reference.id, ancestors, finished).await?)
                    }
                    Resolution::Missing => {
                        tracing::warn!(
                            filter = %id,
                            kind = %reference.kind,
                            child = %reference.id,
                            "filter references a missing resource"
                        );
                        TreeChild::Dangling(reference)
                    }
                    other => {
                        return Err(FilterError::malformed(
                            ResourceKind::Filter,
                            id,
                            format!(
                                "child {} is referenced as a {} but stored as {other:?}",
                                reference.id, reference.kind
                            ),
                        ));
                    }
                };
                children.push(child);
            }

            ancestors.pop();
            let tree = FilterTree {
                id,
                combinator: node.combinator,
                children,
            };
            finished.insert(tree.id.clone(), tree.clone());
            Ok(tree)
        })
    }

    /// A chain of sub-filter edges leading from `from` to `target`, both
    /// ends included. Unloadable nodes along the way are skipped.
    pub(crate) async fn find_route(
        &self,
        from: &str,
        target: &str,
    ) -> Result<Option<Vec<String>>, FilterError> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack = vec![vec![from.to_string()]];

        while let Some(route) = stack.pop() {
            let Some(current) = route.last() else {
                continue;
            };
            if current == target {
                return Ok(Some(route));
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            let node = match self.load_node(current).await {
                Ok(node) => node,
                Err(err) if err.is_store_failure() => return Err(err),
                Err(_) => continue,
            };
            for child in node.children.into_iter().rev() {
                if child.kind == ResourceKind::Filter {
                    let mut next = route.clone();
                    next.push(child.id);
                    stack.push(next);
                }
            }
        }
        Ok(None)
    }
}

fn combinator_edge(id: &str, facts: &[Triple]) -> Result<Option<StoredNode>, FilterError> {
    let mut edges = facts.iter().filter_map(|t| {
        Combinator::from_predicate(&t.predicate).map(|combinator| StoredNode {
            combinator,
            head: t.object.clone(),
        })
    });
    match (edges.next(), edges.next()) {
        (None, _) => Ok(None),
        (Some(node), None) => Ok(Some(node)),
        (Some(_), Some(_)) => Err(FilterError::malformed(
            ResourceKind::Filter,
            id,
            "more than one sh:and/sh:or edge",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shapewatch_store::{GraphUpdate, MemoryGraphStore, StoreError, encode_list};
    use std::sync::Mutex;

    /// Records the subject of every select it forwards.
    struct CountingStore {
        inner: MemoryGraphStore,
        selected: Mutex<Vec<Option<String>>>,
    }

    impl CountingStore {
        fn selects_about(&self, subject: &str) -> usize {
            self.selected
                .lock()
                .expect("select log")
                .iter()
                .filter(|s| s.as_deref() == Some(subject))
                .count()
        }
    }

    #[async_trait]
    impl GraphStore for CountingStore {
        fn graph(&self) -> &str {
            self.inner.graph()
        }

        async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StoreError> {
            self.inner.ask(pattern).await
        }

        async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, StoreError> {
            self.selected
                .lock()
                .expect("select log")
                .push(pattern.subject.clone());
            self.inner.select(pattern).await
        }

        async fn update(&self, update: &GraphUpdate) -> Result<(), StoreError> {
            self.inner.update(update).await
        }
    }

    /// Writes filter nodes directly, bypassing the builder's checks.
    async fn put_filter(store: &MemoryGraphStore, iris: &ResourceIris, id: &str, subs: &[&str]) {
        let items: Vec<Term> = subs.iter().map(|s| Term::iri(iris.filter(s))).collect();
        let list = encode_list(&items, || iris.mint_list_node());
        let iri = iris.filter(id);
        let update = GraphUpdate::new().insert(list.facts).insert([
            Triple::new(&iri, rdf::TYPE, Term::iri(sh::NODE_SHAPE)),
            Triple::new(&iri, sh::AND, list.head),
        ]);
        store.update(&update).await.expect("write filter");
    }

    fn loader() -> (Arc<MemoryGraphStore>, ResourceIris, FilterLoader) {
        let store = Arc::new(MemoryGraphStore::new("urn:test:graph"));
        let iris = ResourceIris::default();
        let loader = FilterLoader::new(store.clone(), iris.clone());
        (store, iris, loader)
    }

    #[tokio::test]
    async fn cyclic_graph_terminates_with_cycle_detected() {
        let (store, iris, loader) = loader();
        put_filter(&store, &iris, "a", &["b"]).await;
        put_filter(&store, &iris, "b", &["c"]).await;
        put_filter(&store, &iris, "c", &["a"]).await;

        let err = loader.load_filter("a").await.unwrap_err();
        let FilterError::CycleDetected { path } = err else {
            panic!("expected a cycle");
        };
        assert_eq!(path, vec!["a", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn shared_sub_filter_is_not_a_cycle() {
        let (store, iris, loader) = loader();
        put_filter(&store, &iris, "leaf", &["gone"]).await;
        put_filter(&store, &iris, "left", &["leaf"]).await;
        put_filter(&store, &iris, "right", &["leaf"]).await;
        put_filter(&store, &iris, "root", &["left", "right"]).await;

        let tree = loader.load_filter("root").await.expect("load");
        let ids: Vec<&str> = tree.children.iter().map(TreeChild::id).collect();
        assert_eq!(ids, vec!["left", "right"]);
        let TreeChild::Filter(left) = &tree.children[0] else {
            panic!("left should be a filter");
        };
        let TreeChild::Filter(leaf) = &left.children[0] else {
            panic!("leaf should be a filter");
        };
        assert_eq!(
            leaf.children,
            vec![TreeChild::Dangling(Reference::filter("gone"))]
        );
    }

    #[tokio::test]
    async fn stacked_diamonds_read_each_filter_once() {
        let iris = ResourceIris::default();
        let counting = Arc::new(CountingStore {
            inner: MemoryGraphStore::new("urn:test:graph"),
            selected: Mutex::new(Vec::new()),
        });
        put_filter(&counting.inner, &iris, "n0", &["gone"]).await;
        for level in 1..=6 {
            let below = format!("n{}", level - 1);
            let left = format!("l{level}");
            let right = format!("r{level}");
            put_filter(&counting.inner, &iris, &left, &[below.as_str()]).await;
            put_filter(&counting.inner, &iris, &right, &[below.as_str()]).await;
            let node = format!("n{level}");
            put_filter(&counting.inner, &iris, &node, &[left.as_str(), right.as_str()]).await;
        }
        let loader = FilterLoader::new(counting.clone(), iris.clone());

        let tree = loader.load_filter("n6").await.expect("load");
        let TreeChild::Filter(left) = &tree.children[0] else {
            panic!("left should be a filter");
        };
        let TreeChild::Filter(right) = &tree.children[1] else {
            panic!("right should be a filter");
        };
        assert_eq!(left.children, right.children);

        // One resolve from each parent plus one node read.
        assert_eq!(counting.selects_about(&iris.filter("n0")), 3);
    }

    #[tokio::test]
    async fn node_with_both_combinators_is_malformed() {
        let (store, iris, loader) = loader();
        put_filter(&store, &iris, "f", &["x"]).await;
        let iri = iris.filter("f");
        store
            .update(&GraphUpdate::new().insert([Triple::new(&iri, sh::OR, Term::iri(rdf::NIL))]))
            .await
            .expect("add second edge");

        let err = loader.load_node("f").await.unwrap_err();
        assert!(matches!(err, FilterError::Malformed { .. }), "got {err:?}");
        assert!(loader.exists("f").await.expect("exists"));
        assert_eq!(loader.combinator_heads("f").await.expect("heads").len(), 2);
    }

    #[tokio::test]
    async fn route_search_follows_sub_filter_edges() {
        let (store, iris, loader) = loader();
        put_filter(&store, &iris, "a", &["b"]).await;
        put_filter(&store, &iris, "b", &["c"]).await;
        put_filter(&store, &iris, "c", &["missing"]).await;

        let route = loader.find_route("a", "c").await.expect("route");
        assert_eq!(route, Some(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(loader.find_route("c", "a").await.expect("route"), None);
    }

    #[tokio::test]
    async fn missing_root_is_not_found() {
        let (_store, _iris, loader) = loader();
        let err = loader.load_filter("nope").await.unwrap_err();
        assert!(matches!(err, FilterError::NotFound { kind: ResourceKind::Filter, .. }));
    }
}
