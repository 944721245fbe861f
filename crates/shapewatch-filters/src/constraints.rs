//! Leaf constraints stored as SHACL property shapes.
//!
//! ```text
//! <constraints/c1> a sh:PropertyShape ;
//!     sh:path dct:title ;               # or the head of a sequence path
//!     sh:pattern "station" ; sh:flags "i" ;
//!     rdf:value "station" .
//! ```
//!
//! `rdf:value` keeps the submitted object verbatim. On read the operator
//! is recovered by re-rendering fragments from it, so a shape whose
//! fragment was edited out of band is reported as malformed instead of
//! being reinterpreted.

use crate::chain::owned_chain_nodes;
use crate::error::{FieldIssue, FilterError, ResourceKind};
use crate::iri::{ResourceIris, is_valid_id};
use crate::model::{Constraint, ConstraintInput};
use shapewatch_store::{
    GraphStore, GraphUpdate, StoreError, Term, Triple, TriplePattern, decode_list, encode_list,
};
use shapewatch_vocab::iri::{rdf, sh};
use shapewatch_vocab::{
    ConstraintFragment, Field, FragmentFact, FragmentValue, Operator, PathExpression,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct ConstraintRepository {
    store: Arc<dyn GraphStore>,
    iris: ResourceIris,
}

impl ConstraintRepository {
    pub fn new(store: Arc<dyn GraphStore>, iris: ResourceIris) -> Self {
        Self { store, iris }
    }

    /// Resolve subject and predicate, reporting every bad field at once.
    pub fn validate(input: &ConstraintInput) -> Result<(Field, Operator), FilterError> {
        check(None, input)
    }

    pub async fn exists(&self, id: &str) -> Result<bool, FilterError> {
        if !is_valid_id(id) {
            return Ok(false);
        }
        let pattern = TriplePattern::about(self.iris.constraint(id))
            .with_predicate(rdf::TYPE)
            .with_object(Term::iri(sh::PROPERTY_SHAPE));
        Ok(self.store.ask(&pattern).await?)
    }

    /// Write a new shape. The write is guarded on the shape IRI being
    /// unused, so concurrent creates on one id leave exactly one shape.
    pub async fn create(
        &self,
        id: &str,
        input: &ConstraintInput,
    ) -> Result<Constraint, FilterError> {
        let (subject, predicate) = check(Some(id), input)?;
        let already_exists = || FilterError::AlreadyExists {
            kind: ResourceKind::Constraint,
            id: id.to_string(),
        };
        if self.exists(id).await? {
            return Err(already_exists());
        }

        let iri = self.iris.constraint(id);
        let facts = self.encode(&iri, subject, predicate, &input.object);
        let update = GraphUpdate::new().require_absent(iri).insert(facts);
        match self.store.update(&update).await {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => return Err(already_exists()),
            Err(err) => return Err(err.into()),
        }
        tracing::info!(constraint = %id, %subject, %predicate, "constraint created");

        Ok(Constraint {
            id: id.to_string(),
            subject,
            predicate,
            object: input.object.clone(),
        })
    }

    pub async fn find(&self, id: &str) -> Result<Constraint, FilterError> {
        if !is_valid_id(id) {
            return Err(FilterError::not_found(ResourceKind::Constraint, id));
        }
        let facts = self
            .store
            .select(&TriplePattern::about(self.iris.constraint(id)))
            .await?;
        let is_shape = facts
            .iter()
            .any(|t| t.predicate == rdf::TYPE && t.object == Term::iri(sh::PROPERTY_SHAPE));
        if !is_shape {
            return Err(FilterError::not_found(ResourceKind::Constraint, id));
        }
        let malformed =
            |reason: String| FilterError::malformed(ResourceKind::Constraint, id, reason);

        let path = single_object(&facts, sh::PATH)
            .ok_or_else(|| malformed("expected exactly one sh:path".to_string()))?;
        let subject = self
            .decode_path(path)
            .await?
            .ok_or_else(|| malformed(format!("path {path} does not map to a field")))?;

        let object = single_object(&facts, rdf::VALUE)
            .and_then(Term::as_string)
            .ok_or_else(|| malformed("expected exactly one string rdf:value".to_string()))?
            .to_string();

        let mut fragment = Vec::new();
        for fact in &facts {
            let Some(predicate) = ConstraintFragment::fragment_predicate(&fact.predicate) else {
                continue;
            };
            let value = match (fact.object.as_integer(), fact.object.as_string()) {
                (Some(n), _) => FragmentValue::Integer(n),
                (None, Some(text)) => FragmentValue::Text(text.to_string()),
                (None, None) => {
                    return Err(malformed(format!(
                        "unexpected {predicate} value {}",
                        fact.object
                    )));
                }
            };
            fragment.push(FragmentFact { predicate, value });
        }
        let predicate = Operator::from_fragment(&ConstraintFragment::new(fragment), &object)
            .ok_or_else(|| malformed("shape does not match any operator".to_string()))?;

        Ok(Constraint {
            id: id.to_string(),
            subject,
            predicate,
            object,
        })
    }

    /// Swap the constraint's facts for new ones in one update.
    pub async fn replace(
        &self,
        id: &str,
        input: &ConstraintInput,
    ) -> Result<Constraint, FilterError> {
        let (subject, predicate) = check(Some(id), input)?;
        if !self.exists(id).await? {
            return Err(FilterError::not_found(ResourceKind::Constraint, id));
        }

        let iri = self.iris.constraint(id);
        let stale = self.path_chain_nodes(&iri).await?;
        let update = GraphUpdate::new()
            .delete_subject(iri.clone())
            .delete_subjects(stale)
            .insert(self.encode(&iri, subject, predicate, &input.object));
        self.store.update(&update).await?;
        tracing::info!(constraint = %id, %subject, %predicate, "constraint replaced");

        Ok(Constraint {
            id: id.to_string(),
            subject,
            predicate,
            object: input.object.clone(),
        })
    }

    /// Remove the constraint and its own path chain. Filters that still
    /// reference it are left alone.
    pub async fn delete(&self, id: &str) -> Result<(), FilterError> {
        if !self.exists(id).await? {
            return Err(FilterError::not_found(ResourceKind::Constraint, id));
        }
        let iri = self.iris.constraint(id);
        let chain = self.path_chain_nodes(&iri).await?;
        let update = GraphUpdate::new().delete_subject(iri).delete_subjects(chain);
        self.store.update(&update).await?;
        tracing::info!(constraint = %id, "constraint deleted");
        Ok(())
    }

    fn encode(&self, iri: &str, subject: Field, predicate: Operator, object: &str) -> Vec<Triple> {
        let mut facts = vec![Triple::new(iri, rdf::TYPE, Term::iri(sh::PROPERTY_SHAPE))];

        let path = match subject.path() {
            PathExpression::Predicate(step) => Term::iri(step),
            PathExpression::Sequence(steps) => {
                let items: Vec<Term> = steps.iter().map(|step| Term::iri(*step)).collect();
                let list = encode_list(&items, || self.iris.mint_list_node());
                facts.extend(list.facts);
                list.head
            }
        };
        facts.push(Triple::new(iri, sh::PATH, path));

        for fact in predicate.fragment(object).facts() {
            let value = match &fact.value {
                FragmentValue::Text(text) => Term::string(text.clone()),
                FragmentValue::Integer(n) => Term::integer(*n),
            };
            facts.push(Triple::new(iri, fact.predicate, value));
        }
        facts.push(Triple::new(iri, rdf::VALUE, Term::string(object)));
        facts
    }

    async fn decode_path(&self, path: &Term) -> Result<Option<Field>, FilterError> {
        match path {
            Term::Iri(iri) if self.iris.is_list_node(iri) => {
                let steps: Option<Vec<String>> = decode_list(self.store.as_ref(), path)
                    .await?
                    .into_iter()
                    .map(|step| step.as_iri().map(str::to_string))
                    .collect();
                Ok(steps.and_then(|steps| Field::from_path(&steps, true)))
            }
            Term::Iri(iri) => Ok(Field::from_path(std::slice::from_ref(iri), false)),
            Term::Literal(_) => Ok(None),
        }
    }

    async fn path_chain_nodes(&self, iri: &str) -> Result<Vec<String>, FilterError> {
        let mut nodes = Vec::new();
        for head in self.store.objects(iri, sh::PATH).await? {
            nodes.extend(owned_chain_nodes(self.store.as_ref(), &self.iris, iri, &head).await?);
        }
        Ok(nodes)
    }
}

fn check(id: Option<&str>, input: &ConstraintInput) -> Result<(Field, Operator), FilterError> {
    let mut issues = Vec::new();
    if let Some(id) = id
        && !is_valid_id(id)
    {
        issues.push(FieldIssue {
            field: "id".to_string(),
            message: format!("{id:?} is not a valid id"),
        });
    }
    let subject = input
        .subject
        .parse::<Field>()
        .map_err(|e| issues.push(e.into()));
    let predicate = input
        .predicate
        .parse::<Operator>()
        .map_err(|e| issues.push(e.into()));

    match (subject, predicate) {
        (Ok(subject), Ok(predicate)) if issues.is_empty() => Ok((subject, predicate)),
        _ => Err(FilterError::Validation(issues)),
    }
}

fn single_object<'a>(facts: &'a [Triple], predicate: &str) -> Option<&'a Term> {
    let mut objects = facts.iter().filter(|t| t.predicate == predicate);
    match (objects.next(), objects.next()) {
        (Some(fact), None) => Some(&fact.object),
        _ => None,
    }
}
