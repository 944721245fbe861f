//! Remote graph backend speaking the SPARQL 1.1 protocol over HTTP.

use crate::error::StoreError;
use crate::graph::{GraphStore, GraphUpdate};
use crate::sparql::{
    parse_ask_response, parse_select_response, render_ask, render_ask_all, render_select,
    render_update,
};
use crate::term::{Triple, TriplePattern};
use async_trait::async_trait;
use std::time::Duration;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Endpoints and limits for a SPARQL store.
#[derive(Debug, Clone)]
pub struct SparqlEndpoint {
    pub query_url: String,
    pub update_url: String,
    pub graph: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SparqlHttpStore {
    endpoint: SparqlEndpoint,
    http_client: reqwest::Client,
}

impl SparqlHttpStore {
    pub fn new(endpoint: SparqlEndpoint) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(endpoint.timeout)
            .build()?;
        Ok(Self {
            endpoint,
            http_client,
        })
    }

    async fn query(&self, query: String) -> Result<String, StoreError> {
        tracing::debug!(url = %self.endpoint.query_url, %query, "sparql query");
        let response = self
            .http_client
            .post(&self.endpoint.query_url)
            .header("Content-Type", "application/sparql-query")
            .header("Accept", SPARQL_RESULTS_JSON)
            .body(query)
            .send()
            .await?;
        read_success_body(response).await
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String, StoreError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

#[async_trait]
impl GraphStore for SparqlHttpStore {
    fn graph(&self) -> &str {
        &self.endpoint.graph
    }

    async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StoreError> {
        let body = self.query(render_ask(&self.endpoint.graph, pattern)?).await?;
        parse_ask_response(&body)
    }

    async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, StoreError> {
        let body = self
            .query(render_select(&self.endpoint.graph, pattern)?)
            .await?;
        parse_select_response(&body, pattern)
    }

    async fn update(&self, update: &GraphUpdate) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }
        let text = render_update(&self.endpoint.graph, update)?;
        tracing::debug!(url = %self.endpoint.update_url, update = %text, "sparql update");

        let response = self
            .http_client
            .post(&self.endpoint.update_url)
            .header("Content-Type", "application/sparql-update")
            .body(text)
            .send()
            .await?;
        read_success_body(response).await?;

        // A guarded update that matched nothing still succeeds; the inserted
        // facts are missing afterwards.
        if let Some(subject) = update.require_absent.first()
            && !update.insert.is_empty()
        {
            let body = self
                .query(render_ask_all(&self.endpoint.graph, &update.insert)?)
                .await?;
            if !parse_ask_response(&body)? {
                return Err(StoreError::Conflict {
                    subject: subject.clone(),
                });
            }
        }
        Ok(())
    }
}
