//! The store protocol consumed by the filter core.

use crate::error::StoreError;
use crate::term::{Term, Triple, TriplePattern};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};

/// One write against the named graph, applied atomically by every backend.
///
/// Deletes run before inserts, so deleting a subject and re-inserting facts
/// about it in the same update replaces the subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphUpdate {
    /// Subjects whose facts are all removed.
    pub delete_subjects: Vec<String>,
    /// Individual facts to remove.
    pub delete: Vec<Triple>,
    /// Facts to add; already-present facts are left as they are.
    pub insert: Vec<Triple>,
    /// Subjects that must have no facts when the update runs. If any has,
    /// nothing is written and the update fails with [`StoreError::Conflict`].
    pub require_absent: Vec<String>,
}

impl GraphUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete_subject(mut self, subject: impl Into<String>) -> Self {
        self.delete_subjects.push(subject.into());
        self
    }

    pub fn delete_subjects(mut self, subjects: impl IntoIterator<Item = String>) -> Self {
        self.delete_subjects.extend(subjects);
        self
    }

    pub fn delete_triple(mut self, triple: Triple) -> Self {
        self.delete.push(triple);
        self
    }

    pub fn insert(mut self, triples: impl IntoIterator<Item = Triple>) -> Self {
        self.insert.extend(triples);
        self
    }

    pub fn require_absent(mut self, subject: impl Into<String>) -> Self {
        self.require_absent.push(subject.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.delete_subjects.is_empty() && self.delete.is_empty() && self.insert.is_empty()
    }

    /// Check the absence preconditions, then apply.
    ///
    /// Callers hold whatever lock guards `facts` across both steps.
    pub fn apply_checked(&self, facts: &mut BTreeSet<Triple>) -> Result<bool, StoreError> {
        if let Some(subject) = self
            .require_absent
            .iter()
            .find(|subject| facts.iter().any(|t| &t.subject == *subject))
        {
            return Err(StoreError::Conflict {
                subject: subject.clone(),
            });
        }
        Ok(self.apply_to(facts))
    }

    /// Apply to an in-memory fact set. Returns whether the set changed.
    pub fn apply_to(&self, facts: &mut BTreeSet<Triple>) -> bool {
        let mut removed: BTreeSet<Triple> = BTreeSet::new();
        if !self.delete_subjects.is_empty() {
            let doomed: HashSet<&str> = self.delete_subjects.iter().map(String::as_str).collect();
            facts.retain(|t| {
                let keep = !doomed.contains(t.subject.as_str());
                if !keep {
                    removed.insert(t.clone());
                }
                keep
            });
        }
        for triple in &self.delete {
            if facts.remove(triple) {
                removed.insert(triple.clone());
            }
        }

        let mut added = false;
        for triple in &self.insert {
            // A fact deleted and re-inserted by the same update is unchanged.
            if facts.insert(triple.clone()) && !removed.remove(triple) {
                added = true;
            }
        }
        added || !removed.is_empty()
    }
}

/// Declarative access to one named graph.
///
/// Every method is one round-trip; nothing spans two calls.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// IRI of the named graph all reads and writes are scoped to.
    fn graph(&self) -> &str;

    /// Whether any fact matches `pattern`.
    async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StoreError>;

    /// All facts matching `pattern`, in no guaranteed order.
    async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, StoreError>;

    /// Apply `update` as one atomic write.
    async fn update(&self, update: &GraphUpdate) -> Result<(), StoreError>;

    /// Objects of `subject predicate ?o`.
    async fn objects(&self, subject: &str, predicate: &str) -> Result<Vec<Term>, StoreError> {
        let pattern = TriplePattern::about(subject).with_predicate(predicate);
        Ok(self
            .select(&pattern)
            .await?
            .into_iter()
            .map(|t| t.object)
            .collect())
    }

    /// Subjects of `?s predicate object`.
    async fn subjects(&self, predicate: &str, object: &Term) -> Result<Vec<String>, StoreError> {
        let pattern = TriplePattern::any()
            .with_predicate(predicate)
            .with_object(object.clone());
        Ok(self
            .select(&pattern)
            .await?
            .into_iter()
            .map(|t| t.subject)
            .collect())
    }
}
