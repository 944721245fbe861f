use crate::config::{Backend, Config};
use crate::outbox::OutboxNotifier;
use serde_json::{Value, json};
use shapewatch_filters::{FilterError, ResourceIris, SubscriptionService};
use shapewatch_store::{
    FileGraphStore, GraphStore, MemoryGraphStore, SparqlEndpoint, SparqlHttpStore,
};
use std::future::Future;
use std::sync::Arc;

pub fn open_store_or_exit(config: &Config) -> Arc<dyn GraphStore> {
    let store = &config.store;
    match store.backend {
        Backend::File => Arc::new(FileGraphStore::new(store.graph.clone(), store.path.clone())),
        Backend::Memory => {
            tracing::warn!("memory backend selected; nothing outlives this command");
            Arc::new(MemoryGraphStore::new(store.graph.clone()))
        }
        Backend::Sparql => {
            let endpoint = SparqlEndpoint {
                query_url: store.query_endpoint.clone(),
                update_url: store.update_endpoint.clone(),
                graph: store.graph.clone(),
                timeout: store.timeout(),
            };
            let client = SparqlHttpStore::new(endpoint).unwrap_or_else(|e| {
                eprintln!("error: failed to build sparql client: {e}");
                std::process::exit(1);
            });
            Arc::new(client)
        }
    }
}

pub fn service_or_exit(config: &Config) -> SubscriptionService {
    let store = open_store_or_exit(config);
    let iris = ResourceIris::new(&config.resources.base_iri);
    let notifier = Arc::new(OutboxNotifier::new(config.notify.outbox.clone()));
    SubscriptionService::new(store, iris, notifier)
}

/// Drive one async operation to completion on a fresh runtime.
pub fn block_on_or_exit<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to start async runtime: {e}");
            std::process::exit(1);
        });
    runtime.block_on(future)
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

pub fn error_payload(err: &FilterError) -> Value {
    let mut error = json!({
        "code": err.code(),
        "message": err.public_message(),
    });
    match err {
        FilterError::Validation(issues) => {
            error["issues"] = json!(issues);
        }
        FilterError::Reference {
            constraints,
            sub_filters,
        } => {
            error["constraints"] = json!(constraints);
            error["subFilters"] = json!(sub_filters);
        }
        FilterError::CycleDetected { path } => {
            error["path"] = json!(path);
        }
        _ => {}
    }
    json!({ "error": error })
}

/// Report a failed operation and exit non-zero.
///
/// Store failures are logged in full but shown only as the opaque public
/// message.
pub fn exit_with_error(err: FilterError, json_output: bool) -> ! {
    if err.is_store_failure() {
        tracing::error!(error = %err, "graph store failure");
    }
    eprintln!("error: {}", err.public_message());
    if json_output {
        print_json(&error_payload(&err));
    }
    std::process::exit(1);
}

pub fn ok_or_exit<T>(result: Result<T, FilterError>, json_output: bool) -> T {
    result.unwrap_or_else(|err| exit_with_error(err, json_output))
}
