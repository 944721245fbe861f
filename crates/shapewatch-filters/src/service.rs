//! API-facing operations composed from the repositories.

use crate::builder::FilterBuilder;
use crate::constraints::ConstraintRepository;
use crate::error::{FilterError, ResourceKind};
use crate::iri::{ResourceIris, mint_id};
use crate::loader::FilterLoader;
use crate::model::{
    Constraint, ConstraintInput, FilterInput, FilterResource, FilterTree, Subscriber,
};
use crate::notify::Notifier;
use crate::subscribers::{SubscriberDirectory, normalize_email};
use serde::Serialize;
use shapewatch_store::GraphStore;
use std::sync::Arc;

/// Subscriber attached to a newly created filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberLink {
    pub subscriber: Subscriber,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFilter {
    pub filter: FilterResource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber: Option<SubscriberLink>,
}

pub struct SubscriptionService {
    constraints: ConstraintRepository,
    builder: FilterBuilder,
    loader: FilterLoader,
    subscribers: SubscriberDirectory,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn GraphStore>,
        iris: ResourceIris,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            constraints: ConstraintRepository::new(store.clone(), iris.clone()),
            builder: FilterBuilder::new(store.clone(), iris.clone()),
            loader: FilterLoader::new(store.clone(), iris.clone()),
            subscribers: SubscriberDirectory::new(store, iris, notifier),
        }
    }

    pub fn constraints(&self) -> &ConstraintRepository {
        &self.constraints
    }

    pub fn builder(&self) -> &FilterBuilder {
        &self.builder
    }

    pub fn loader(&self) -> &FilterLoader {
        &self.loader
    }

    pub fn subscribers(&self) -> &SubscriberDirectory {
        &self.subscribers
    }

    /// Create a constraint, minting an id when none is given.
    pub async fn create_constraint(
        &self,
        id: Option<&str>,
        input: &ConstraintInput,
    ) -> Result<Constraint, FilterError> {
        let id = id.map_or_else(mint_id, str::to_string);
        self.constraints.create(&id, input).await
    }

    pub async fn constraint(&self, id: &str) -> Result<Constraint, FilterError> {
        self.constraints.find(id).await
    }

    pub async fn replace_constraint(
        &self,
        id: &str,
        input: &ConstraintInput,
    ) -> Result<Constraint, FilterError> {
        self.constraints.replace(id, input).await
    }

    pub async fn delete_constraint(&self, id: &str) -> Result<(), FilterError> {
        self.constraints.delete(id).await
    }

    /// Create a filter and, when an email is given, subscribe its owner.
    ///
    /// The email is checked before anything is written; the subscriber is
    /// resolved only after the filter exists.
    pub async fn create_filter(
        &self,
        id: Option<&str>,
        input: &FilterInput,
        email: Option<&str>,
    ) -> Result<CreatedFilter, FilterError> {
        let email = email.map(normalize_email).transpose()?;
        let id = id.map_or_else(mint_id, str::to_string);

        let node = self
            .builder
            .create_filter(&id, input.combinator(), &input.constraints, &input.sub_filters)
            .await?;

        let subscriber = match email {
            Some(email) => {
                let (subscriber, created) = self.subscribers.ensure_subscriber(&email).await?;
                self.subscribers
                    .add_subscription(&subscriber.id, &node.id)
                    .await?;
                Some(SubscriberLink {
                    subscriber,
                    created,
                })
            }
            None => None,
        };

        Ok(CreatedFilter {
            filter: node.to_resource(),
            subscriber,
        })
    }

    pub async fn filter(&self, id: &str) -> Result<FilterResource, FilterError> {
        Ok(self.loader.load_node(id).await?.to_resource())
    }

    pub async fn filter_tree(&self, id: &str) -> Result<FilterTree, FilterError> {
        self.loader.load_filter(id).await
    }

    pub async fn replace_filter(
        &self,
        id: &str,
        input: &FilterInput,
    ) -> Result<FilterResource, FilterError> {
        let node = self
            .builder
            .replace_filter(id, input.combinator(), &input.constraints, &input.sub_filters)
            .await?;
        Ok(node.to_resource())
    }

    pub async fn delete_filter(&self, id: &str) -> Result<(), FilterError> {
        self.builder.delete_filter(id).await
    }

    /// The token holder's filter roots, each expanded one level, by id.
    ///
    /// Subscriptions to filters deleted since are skipped.
    pub async fn filters_by_token(&self, token: &str) -> Result<Vec<FilterResource>, FilterError> {
        let subscriber = self
            .subscribers
            .find_by_token(token)
            .await?
            .ok_or(FilterError::UnknownToken)?;

        let mut filters = Vec::new();
        for id in self.subscribers.subscriptions(&subscriber.id).await? {
            match self.loader.load_node(&id).await {
                Ok(node) => filters.push(node.to_resource()),
                Err(FilterError::NotFound { .. }) => {
                    tracing::warn!(
                        subscriber = %subscriber.id,
                        filter = %id,
                        "subscription points at a deleted filter"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(filters)
    }

    /// Subscribe an email to an existing filter, creating the subscriber
    /// (and sending its token) on first use.
    pub async fn subscribe(
        &self,
        email: &str,
        filter_id: &str,
    ) -> Result<SubscriberLink, FilterError> {
        let email = normalize_email(email)?;
        if !self.loader.exists(filter_id).await? {
            return Err(FilterError::not_found(ResourceKind::Filter, filter_id));
        }
        let (subscriber, created) = self.subscribers.ensure_subscriber(&email).await?;
        self.subscribers
            .add_subscription(&subscriber.id, filter_id)
            .await?;
        Ok(SubscriberLink {
            subscriber,
            created,
        })
    }

    pub async fn unsubscribe(&self, token: &str, filter_id: &str) -> Result<(), FilterError> {
        let subscriber = self
            .subscribers
            .find_by_token(token)
            .await?
            .ok_or(FilterError::UnknownToken)?;
        self.subscribers
            .remove_subscription(&subscriber.id, filter_id)
            .await
    }
}
