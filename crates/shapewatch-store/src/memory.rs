//! In-memory graph backend.
//!
//! Holds the named graph as an ordered fact set behind an async `RwLock`.
//! Used by tests and by the CLI's `memory` backend.

use crate::error::StoreError;
use crate::graph::{GraphStore, GraphUpdate};
use crate::term::{Triple, TriplePattern};
use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct MemoryGraphStore {
    graph: String,
    facts: RwLock<BTreeSet<Triple>>,
}

impl MemoryGraphStore {
    pub fn new(graph: impl Into<String>) -> Self {
        Self::with_facts(graph, Vec::new())
    }

    pub fn with_facts(graph: impl Into<String>, facts: impl IntoIterator<Item = Triple>) -> Self {
        Self {
            graph: graph.into(),
            facts: RwLock::new(facts.into_iter().collect()),
        }
    }

    /// Every fact, in deterministic order.
    pub async fn snapshot(&self) -> Vec<Triple> {
        self.facts.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.facts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.facts.read().await.is_empty()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    fn graph(&self) -> &str {
        &self.graph
    }

    async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StoreError> {
        Ok(self.facts.read().await.iter().any(|t| pattern.matches(t)))
    }

    async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, StoreError> {
        Ok(self
            .facts
            .read()
            .await
            .iter()
            .filter(|t| pattern.matches(t))
            .cloned()
            .collect())
    }

    async fn update(&self, update: &GraphUpdate) -> Result<(), StoreError> {
        let mut facts = self.facts.write().await;
        let changed = update.apply_checked(&mut facts)?;
        tracing::debug!(
            graph = %self.graph,
            deleted_subjects = update.delete_subjects.len(),
            inserted = update.insert.len(),
            changed,
            "memory graph updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[tokio::test]
    async fn select_filters_by_pattern() {
        let store = MemoryGraphStore::with_facts(
            "urn:g",
            [
                Triple::new("urn:a", "urn:p", Term::string("1")),
                Triple::new("urn:a", "urn:q", Term::string("2")),
                Triple::new("urn:b", "urn:p", Term::string("3")),
            ],
        );

        let about_a = store
            .select(&TriplePattern::about("urn:a"))
            .await
            .expect("select");
        assert_eq!(about_a.len(), 2);

        let objects = store.objects("urn:b", "urn:p").await.expect("objects");
        assert_eq!(objects, vec![Term::string("3")]);

        assert!(
            !store
                .ask(&TriplePattern::about("urn:c"))
                .await
                .expect("ask")
        );
    }

    #[tokio::test]
    async fn update_replaces_subject_atomically() {
        let store = MemoryGraphStore::with_facts(
            "urn:g",
            [Triple::new("urn:a", "urn:p", Term::string("old"))],
        );
        let update = GraphUpdate::new()
            .delete_subject("urn:a")
            .insert([Triple::new("urn:a", "urn:p", Term::string("new"))]);
        store.update(&update).await.expect("update");

        assert_eq!(
            store.snapshot().await,
            vec![Triple::new("urn:a", "urn:p", Term::string("new"))]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_guarded_inserts_admit_one_writer() {
        let store = std::sync::Arc::new(MemoryGraphStore::new("urn:g"));
        let mut handles = Vec::new();
        for value in ["left", "right", "middle"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let update = GraphUpdate::new()
                    .require_absent("urn:a")
                    .insert([Triple::new("urn:a", "urn:p", Term::string(value))]);
                store.update(&update).await
            }));
        }

        let mut won = 0;
        for handle in handles {
            match handle.await.expect("task") {
                Ok(()) => won += 1,
                Err(StoreError::Conflict { subject }) => assert_eq!(subject, "urn:a"),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(won, 1);
        assert_eq!(store.snapshot().await.len(), 1);
    }
}
