//! Subscribers, keyed by email, and their subscription edges.
//!
//! ```text
//! <subscribers/{uuid}> a sw:Subscriber ;
//!     sw:email "a@example.com" ;
//!     sw:tokenDigest "9f86d0..." ;
//!     dct:created "2026-10-19T08:00:00Z"^^xsd:dateTime ;
//!     sw:hasSubscription <filters/f1>, <filters/f2> .
//! ```

use crate::error::{FilterError, ResourceKind};
use crate::iri::{ResourceIris, is_valid_id, mint_id};
use crate::model::Subscriber;
use crate::notify::Notifier;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use shapewatch_store::{GraphStore, GraphUpdate, Term, Triple, TriplePattern};
use shapewatch_vocab::iri::{dct, rdf, sw, xsd};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email regex must compile"))
}

/// Trim and lower-case an email, rejecting anything that is not
/// `local@domain`.
pub fn normalize_email(email: &str) -> Result<String, FilterError> {
    let normalized = email.trim().to_lowercase();
    if email_re().is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(FilterError::validation(
            "email",
            format!("{:?} is not an email address", email.trim()),
        ))
    }
}

/// A fresh opaque access token: 64 hex characters.
pub fn generate_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct SubscriberDirectory {
    store: Arc<dyn GraphStore>,
    iris: ResourceIris,
    notifier: Arc<dyn Notifier>,
    /// Serializes the lookup-then-create in `ensure_subscriber`.
    creating: Mutex<()>,
}

impl SubscriberDirectory {
    pub fn new(
        store: Arc<dyn GraphStore>,
        iris: ResourceIris,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            iris,
            notifier,
            creating: Mutex::new(()),
        }
    }

    /// The subscriber for `email`, creating one if none exists. The flag is
    /// true when this call created it.
    ///
    /// A new subscriber's token is handed to the notifier and nowhere else.
    pub async fn ensure_subscriber(&self, email: &str) -> Result<(Subscriber, bool), FilterError> {
        let email = normalize_email(email)?;

        let (subscriber, token) = {
            let _guard = self.creating.lock().await;
            if let Some(existing) = self.find_by_email(&email).await? {
                return Ok((existing, false));
            }

            let subscriber = Subscriber {
                id: mint_id(),
                email,
                created: Utc::now(),
            };
            let token = generate_token();
            let iri = self.iris.subscriber(&subscriber.id);
            let created = subscriber.created.to_rfc3339_opts(SecondsFormat::AutoSi, true);
            let facts = [
                Triple::new(&iri, rdf::TYPE, Term::iri(sw::SUBSCRIBER)),
                Triple::new(&iri, sw::EMAIL, Term::string(&subscriber.email)),
                Triple::new(&iri, sw::TOKEN_DIGEST, Term::string(token_digest(&token))),
                Triple::new(&iri, dct::CREATED, Term::typed(created, xsd::DATE_TIME)),
            ];
            self.store.update(&GraphUpdate::new().insert(facts)).await?;
            tracing::info!(subscriber = %subscriber.id, "subscriber created");
            (subscriber, token)
        };

        if let Err(err) = self.notifier.notify(&subscriber.email, &token).await {
            tracing::warn!(
                subscriber = %subscriber.id,
                error = %err,
                "could not deliver access token"
            );
        }
        Ok((subscriber, true))
    }

    pub async fn find(&self, id: &str) -> Result<Subscriber, FilterError> {
        self.load(id)
            .await?
            .ok_or_else(|| FilterError::not_found(ResourceKind::Subscriber, id))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, FilterError> {
        let email = normalize_email(email)?;
        self.find_by(sw::EMAIL, Term::string(email)).await
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<Subscriber>, FilterError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.find_by(sw::TOKEN_DIGEST, Term::string(token_digest(token)))
            .await
    }

    /// Record that `subscriber_id` follows `filter_id`. Repeating it changes
    /// nothing.
    pub async fn add_subscription(
        &self,
        subscriber_id: &str,
        filter_id: &str,
    ) -> Result<(), FilterError> {
        self.require(subscriber_id).await?;
        if !is_valid_id(filter_id) {
            return Err(FilterError::not_found(ResourceKind::Filter, filter_id));
        }
        let edge = self.edge(subscriber_id, filter_id);
        self.store.update(&GraphUpdate::new().insert([edge])).await?;
        tracing::debug!(subscriber = %subscriber_id, filter = %filter_id, "subscription added");
        Ok(())
    }

    pub async fn remove_subscription(
        &self,
        subscriber_id: &str,
        filter_id: &str,
    ) -> Result<(), FilterError> {
        self.require(subscriber_id).await?;
        let edge = self.edge(subscriber_id, filter_id);
        let pattern = TriplePattern::about(edge.subject.clone())
            .with_predicate(edge.predicate.clone())
            .with_object(edge.object.clone());
        if !is_valid_id(filter_id) || !self.store.ask(&pattern).await? {
            return Err(FilterError::NotSubscribed {
                subscriber: subscriber_id.to_string(),
                filter: filter_id.to_string(),
            });
        }
        self.store
            .update(&GraphUpdate::new().delete_triple(edge))
            .await?;
        tracing::debug!(subscriber = %subscriber_id, filter = %filter_id, "subscription removed");
        Ok(())
    }

    /// Ids of the filters `subscriber_id` follows, ascending.
    pub async fn subscriptions(&self, subscriber_id: &str) -> Result<Vec<String>, FilterError> {
        self.require(subscriber_id).await?;
        let mut ids: Vec<String> = self
            .store
            .objects(&self.iris.subscriber(subscriber_id), sw::HAS_SUBSCRIPTION)
            .await?
            .iter()
            .filter_map(|term| term.as_iri().and_then(|iri| self.iris.filter_id(iri)))
            .map(str::to_string)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn edge(&self, subscriber_id: &str, filter_id: &str) -> Triple {
        Triple::new(
            self.iris.subscriber(subscriber_id),
            sw::HAS_SUBSCRIPTION,
            Term::iri(self.iris.filter(filter_id)),
        )
    }

    async fn require(&self, id: &str) -> Result<(), FilterError> {
        let pattern = TriplePattern::about(self.iris.subscriber(id))
            .with_predicate(rdf::TYPE)
            .with_object(Term::iri(sw::SUBSCRIBER));
        if is_valid_id(id) && self.store.ask(&pattern).await? {
            Ok(())
        } else {
            Err(FilterError::not_found(ResourceKind::Subscriber, id))
        }
    }

    async fn find_by(
        &self,
        predicate: &str,
        value: Term,
    ) -> Result<Option<Subscriber>, FilterError> {
        let mut ids: Vec<String> = self
            .store
            .subjects(predicate, &value)
            .await?
            .iter()
            .filter_map(|iri| self.iris.subscriber_id(iri))
            .map(str::to_string)
            .collect();
        ids.sort();
        match ids.first() {
            Some(id) => self.load(id).await,
            None => Ok(None),
        }
    }

    async fn load(&self, id: &str) -> Result<Option<Subscriber>, FilterError> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let facts = self
            .store
            .select(&TriplePattern::about(self.iris.subscriber(id)))
            .await?;
        let is_subscriber = facts
            .iter()
            .any(|t| t.predicate == rdf::TYPE && t.object == Term::iri(sw::SUBSCRIBER));
        if !is_subscriber {
            return Ok(None);
        }
        let malformed =
            |reason: &str| FilterError::malformed(ResourceKind::Subscriber, id, reason);

        let email = facts
            .iter()
            .find(|t| t.predicate == sw::EMAIL)
            .and_then(|t| t.object.as_string())
            .ok_or_else(|| malformed("missing sw:email"))?
            .to_string();
        let created = facts
            .iter()
            .find(|t| t.predicate == dct::CREATED)
            .and_then(|t| t.object.as_literal())
            .and_then(|lit| DateTime::parse_from_rfc3339(&lit.value).ok())
            .ok_or_else(|| malformed("missing or invalid dct:created"))?
            .with_timezone(&Utc);

        Ok(Some(Subscriber {
            id: id.to_string(),
            email,
            created,
        }))
    }
}
