//! SPARQL 1.1 text for the store protocol.
//!
//! Every value that reaches query text goes through [`render_term`]:
//! IRIs are checked against the `IRIREF` production and literals are
//! escaped, so caller-supplied strings cannot alter the query structure.

use crate::error::StoreError;
use crate::graph::GraphUpdate;
use crate::term::{Term, Triple, TriplePattern};
use serde::Deserialize;
use shapewatch_vocab::iri::xsd;
use std::collections::HashMap;

/// Escape a string for use inside a double-quoted SPARQL literal.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out
}

/// Render an IRI as `<iri>`, rejecting characters `IRIREF` forbids.
pub fn render_iri(iri: &str) -> Result<String, StoreError> {
    let forbidden = |c: char| {
        matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') || c <= ' '
    };
    if iri.is_empty() || iri.chars().any(forbidden) {
        return Err(StoreError::InvalidIri(iri.to_string()));
    }
    Ok(format!("<{iri}>"))
}

pub fn render_term(term: &Term) -> Result<String, StoreError> {
    match term {
        Term::Iri(iri) => render_iri(iri),
        Term::Literal(lit) if lit.datatype == xsd::STRING => {
            Ok(format!("\"{}\"", escape_literal(&lit.value)))
        }
        Term::Literal(lit) => Ok(format!(
            "\"{}\"^^{}",
            escape_literal(&lit.value),
            render_iri(&lit.datatype)?
        )),
    }
}

fn render_triple(triple: &Triple) -> Result<String, StoreError> {
    Ok(format!(
        "{} {} {} .",
        render_iri(&triple.subject)?,
        render_iri(&triple.predicate)?,
        render_term(&triple.object)?
    ))
}

fn render_pattern(pattern: &TriplePattern) -> Result<String, StoreError> {
    let subject = match &pattern.subject {
        Some(s) => render_iri(s)?,
        None => "?s".to_string(),
    };
    let predicate = match &pattern.predicate {
        Some(p) => render_iri(p)?,
        None => "?p".to_string(),
    };
    let object = match &pattern.object {
        Some(o) => render_term(o)?,
        None => "?o".to_string(),
    };
    Ok(format!("{subject} {predicate} {object} ."))
}

pub fn render_ask(graph: &str, pattern: &TriplePattern) -> Result<String, StoreError> {
    Ok(format!(
        "ASK {{ GRAPH {} {{ {} }} }}",
        render_iri(graph)?,
        render_pattern(pattern)?
    ))
}

pub fn render_select(graph: &str, pattern: &TriplePattern) -> Result<String, StoreError> {
    Ok(format!(
        "SELECT DISTINCT * WHERE {{ GRAPH {} {{ {} }} }}",
        render_iri(graph)?,
        render_pattern(pattern)?
    ))
}

/// `ASK` whether every one of `triples` is in the graph.
pub fn render_ask_all(graph: &str, triples: &[Triple]) -> Result<String, StoreError> {
    let body = triples
        .iter()
        .map(render_triple)
        .collect::<Result<Vec<_>, _>>()?
        .join(" ");
    Ok(format!("ASK {{ GRAPH {} {{ {body} }} }}", render_iri(graph)?))
}

/// Render a [`GraphUpdate`] as one update request.
///
/// Operations are separated by `;` and run in order within the request:
/// subject deletes, triple deletes, then inserts. With absence
/// preconditions every operation carries the same `FILTER NOT EXISTS`
/// guard. The guard is evaluated per operation, so a guarded update must
/// not also delete its guarded subjects.
pub fn render_update(graph: &str, update: &GraphUpdate) -> Result<String, StoreError> {
    let graph = render_iri(graph)?;
    let guard = update
        .require_absent
        .iter()
        .enumerate()
        .map(|(i, subject)| {
            Ok(format!(
                "FILTER NOT EXISTS {{ GRAPH {graph} {{ {} ?gp{i} ?go{i} . }} }}",
                render_iri(subject)?
            ))
        })
        .collect::<Result<Vec<_>, StoreError>>()?
        .join(" ");
    let mut operations = Vec::new();

    for subject in &update.delete_subjects {
        let subject = render_iri(subject)?;
        operations.push(if guard.is_empty() {
            format!("DELETE WHERE {{ GRAPH {graph} {{ {subject} ?p ?o . }} }}")
        } else {
            format!(
                "DELETE {{ GRAPH {graph} {{ {subject} ?p ?o . }} }} \
                 WHERE {{ GRAPH {graph} {{ {subject} ?p ?o . }} {guard} }}"
            )
        });
    }
    if !update.delete.is_empty() {
        let body = update
            .delete
            .iter()
            .map(render_triple)
            .collect::<Result<Vec<_>, _>>()?
            .join(" ");
        operations.push(if guard.is_empty() {
            format!("DELETE DATA {{ GRAPH {graph} {{ {body} }} }}")
        } else {
            format!("DELETE {{ GRAPH {graph} {{ {body} }} }} WHERE {{ {guard} }}")
        });
    }
    if !update.insert.is_empty() {
        let body = update
            .insert
            .iter()
            .map(render_triple)
            .collect::<Result<Vec<_>, _>>()?
            .join(" ");
        operations.push(if guard.is_empty() {
            format!("INSERT DATA {{ GRAPH {graph} {{ {body} }} }}")
        } else {
            format!("INSERT {{ GRAPH {graph} {{ {body} }} }} WHERE {{ {guard} }}")
        });
    }

    Ok(operations.join(" ;\n"))
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    results: SelectResults,
}

#[derive(Debug, Deserialize)]
struct SelectResults {
    bindings: Vec<HashMap<String, Binding>>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(default)]
    datatype: Option<String>,
}

impl Binding {
    fn into_term(self) -> Result<Term, StoreError> {
        match self.kind.as_str() {
            "uri" => Ok(Term::Iri(self.value)),
            "literal" | "typed-literal" => Ok(Term::typed(
                self.value,
                self.datatype.unwrap_or_else(|| xsd::STRING.to_string()),
            )),
            other => Err(StoreError::Response(format!(
                "unsupported binding type {other:?}"
            ))),
        }
    }
}

/// Parse an `application/sparql-results+json` ASK response.
pub fn parse_ask_response(body: &str) -> Result<bool, StoreError> {
    serde_json::from_str::<AskResponse>(body)
        .map(|r| r.boolean)
        .map_err(|e| StoreError::Response(e.to_string()))
}

/// Parse a SELECT response for `pattern` back into triples, filling bound
/// positions from the pattern itself.
pub fn parse_select_response(
    body: &str,
    pattern: &TriplePattern,
) -> Result<Vec<Triple>, StoreError> {
    let response: SelectResponse =
        serde_json::from_str(body).map_err(|e| StoreError::Response(e.to_string()))?;

    let mut triples = Vec::with_capacity(response.results.bindings.len());
    for mut row in response.results.bindings {
        let subject = match &pattern.subject {
            Some(s) => s.clone(),
            None => match take(&mut row, "s")? {
                Term::Iri(iri) => iri,
                Term::Literal(lit) => {
                    return Err(StoreError::Response(format!(
                        "literal in subject position: {:?}",
                        lit.value
                    )));
                }
            },
        };
        let predicate = match &pattern.predicate {
            Some(p) => p.clone(),
            None => match take(&mut row, "p")? {
                Term::Iri(iri) => iri,
                Term::Literal(lit) => {
                    return Err(StoreError::Response(format!(
                        "literal in predicate position: {:?}",
                        lit.value
                    )));
                }
            },
        };
        let object = match &pattern.object {
            Some(o) => o.clone(),
            None => take(&mut row, "o")?,
        };
        triples.push(Triple {
            subject,
            predicate,
            object,
        });
    }
    Ok(triples)
}

fn take(row: &mut HashMap<String, Binding>, var: &str) -> Result<Term, StoreError> {
    row.remove(var)
        .ok_or_else(|| StoreError::Response(format!("missing binding for ?{var}")))?
        .into_term()
}
