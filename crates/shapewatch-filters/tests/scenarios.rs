//! End-to-end behavior of the subscription service over an in-memory graph.

use async_trait::async_trait;
use shapewatch_filters::{
    Combinator, ConstraintInput, FilterError, FilterInput, Notifier, NotifyError, Reference,
    ResourceIris, ResourceKind, SubscriptionService, TreeChild,
};
use shapewatch_store::{MemoryGraphStore, decode_list, encode_list};
use shapewatch_vocab::{MappingError, Operator, map_field, map_operator};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn tokens_for(&self, email: &str) -> Vec<String> {
        self.sent
            .lock()
            .expect("notifier lock")
            .iter()
            .filter(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, email: &str, token: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("notifier lock")
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryGraphStore>,
    notifier: Arc<RecordingNotifier>,
    service: SubscriptionService,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryGraphStore::new("urn:test:subscriptions"));
    let notifier = Arc::new(RecordingNotifier::default());
    let service =
        SubscriptionService::new(store.clone(), ResourceIris::default(), notifier.clone());
    Harness {
        store,
        notifier,
        service,
    }
}

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

async fn constraint(h: &Harness, id: &str, field: &str, op: &str, object: &str) {
    h.service
        .create_constraint(Some(id), &ConstraintInput::new(field, op, object))
        .await
        .expect("create constraint");
}

#[tokio::test]
async fn created_constraint_reads_back_unchanged() {
    let h = harness();
    let created = h
        .service
        .create_constraint(None, &ConstraintInput::new("title", "textContains", "station"))
        .await
        .expect("create");

    let found = h.service.constraint(&created.id).await.expect("find");
    assert_eq!(found, created);
    assert_eq!(found.subject.as_str(), "title");
    assert_eq!(found.predicate, Operator::TextContains);
    assert_eq!(found.object, "station");
}

#[tokio::test]
async fn any_filter_loads_with_children_in_order() {
    let h = harness();
    constraint(&h, "c1", "title", "textContains", "station").await;
    constraint(&h, "c2", "location", "textEquals", "Gent").await;

    let input = FilterInput {
        require_all: false,
        constraints: ids(&["c1", "c2"]),
        sub_filters: vec![],
    };
    let created = h
        .service
        .create_filter(Some("f1"), &input, None)
        .await
        .expect("create filter");
    assert_eq!(created.filter.constraints, ids(&["c1", "c2"]));
    assert!(created.subscriber.is_none());

    let tree = h.service.filter_tree("f1").await.expect("load");
    assert_eq!(tree.combinator, Combinator::Any);
    let children: Vec<&str> = tree.children.iter().map(TreeChild::id).collect();
    assert_eq!(children, vec!["c1", "c2"]);
}

#[tokio::test]
async fn nested_tree_round_trips_in_submitted_order() {
    let h = harness();
    for id in ["c3", "c1", "c2", "c4"] {
        constraint(&h, id, "keyword", "textEquals", id).await;
    }
    h.service
        .create_filter(
            Some("inner"),
            &FilterInput {
                require_all: true,
                constraints: ids(&["c4", "c3"]),
                sub_filters: vec![],
            },
            None,
        )
        .await
        .expect("inner");
    h.service
        .create_filter(
            Some("outer"),
            &FilterInput {
                require_all: true,
                constraints: ids(&["c2", "c1"]),
                sub_filters: ids(&["inner"]),
            },
            None,
        )
        .await
        .expect("outer");

    let tree = h.service.filter_tree("outer").await.expect("load");
    assert_eq!(tree.combinator, Combinator::All);
    let children: Vec<&str> = tree.children.iter().map(TreeChild::id).collect();
    assert_eq!(children, vec!["c2", "c1", "inner"]);
    let TreeChild::Filter(inner) = &tree.children[2] else {
        panic!("inner should load as a filter");
    };
    let inner_children: Vec<&str> = inner.children.iter().map(TreeChild::id).collect();
    assert_eq!(inner_children, vec!["c4", "c3"]);

    let resource = h.service.filter("outer").await.expect("one level");
    assert!(resource.require_all);
    assert_eq!(resource.constraints, ids(&["c2", "c1"]));
    assert_eq!(resource.sub_filters, ids(&["inner"]));
}

#[tokio::test]
async fn reference_error_names_only_missing_ids() {
    let h = harness();
    constraint(&h, "c1", "title", "exists", "").await;

    let err = h
        .service
        .create_filter(
            Some("f1"),
            &FilterInput {
                require_all: true,
                constraints: ids(&["c1", "c-missing"]),
                sub_filters: vec![],
            },
            None,
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
    assert_eq!(constraints, ids(&["c-missing"]));
    assert!(sub_filters.is_empty());
}

#[tokio::test]
async fn two_bad_sub_filters_are_reported_in_one_error() {
    let h = harness();
    constraint(&h, "c1", "title", "exists", "").await;

    let err = h
        .service
        .create_filter(
            Some("f1"),
            &FilterInput {
                require_all: false,
                constraints: ids(&["c1"]),
                sub_filters: ids(&["f404", "f405"]),
            },
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "reference");
    assert!(matches!(
        err,
        FilterError::Reference { sub_filters, .. } if sub_filters == ids(&["f404", "f405"])
    ));
}

#[tokio::test]
async fn empty_filter_is_rejected() {
    let h = harness();
    let err = h
        .service
        .create_filter(Some("f1"), &FilterInput::default(), Some("a@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, FilterError::EmptyFilter));
    assert!(h.store.is_empty().await, "nothing should be written");
}

#[tokio::test]
async fn deleting_missing_filter_is_not_found() {
    let h = harness();
    let err = h.service.delete_filter("f-missing").await.unwrap_err();
    assert!(matches!(
        err,
        FilterError::NotFound { kind: ResourceKind::Filter, ref id } if id == "f-missing"
    ));
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn second_ensure_returns_same_subscriber() {
    let h = harness();
    let directory = h.service.subscribers();
    let (first, created) = directory.ensure_subscriber("a@example.com").await.expect("first");
    assert!(created);
    let (second, created) = directory.ensure_subscriber("a@example.com").await.expect("second");
    assert!(!created);
    assert_eq!(second.id, first.id);
    assert_eq!(h.notifier.tokens_for("a@example.com").len(), 1);
}

#[tokio::test]
async fn token_lists_subscribed_filters_one_level_deep() {
    let h = harness();
    constraint(&h, "c1", "publisher", "textStartsWith", "City of").await;
    constraint(&h, "c2", "theme", "notExists", "").await;

    let inner = FilterInput {
        require_all: true,
        constraints: ids(&["c2"]),
        sub_filters: vec![],
    };
    let first = h
        .service
        .create_filter(Some("f-inner"), &inner, Some("sub@example.com"))
        .await
        .expect("first filter");
    let link = first.subscriber.expect("subscriber attached");
    assert!(link.created);

    let outer = FilterInput {
        require_all: false,
        constraints: ids(&["c1"]),
        sub_filters: ids(&["f-inner"]),
    };
    let second = h
        .service
        .create_filter(Some("f-outer"), &outer, Some("SUB@example.com"))
        .await
        .expect("second filter");
    assert!(!second.subscriber.expect("subscriber attached").created);

    let tokens = h.notifier.tokens_for("sub@example.com");
    assert_eq!(tokens.len(), 1);
    let listed = h.service.filters_by_token(&tokens[0]).await.expect("list");
    let listed_ids: Vec<&str> = listed.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(listed_ids, vec!["f-inner", "f-outer"]);
    assert_eq!(listed[1].sub_filters, ids(&["f-inner"]));

    h.service.delete_filter("f-inner").await.expect("delete");
    let listed = h.service.filters_by_token(&tokens[0]).await.expect("list");
    assert_eq!(listed.len(), 1, "deleted filters drop out of the listing");

    h.service
        .unsubscribe(&tokens[0], "f-outer")
        .await
        .expect("unsubscribe");
    assert!(h.service.filters_by_token(&tokens[0]).await.expect("list").is_empty());

    let err = h.service.filters_by_token("not-a-token").await.unwrap_err();
    assert!(matches!(err, FilterError::UnknownToken));
}

#[tokio::test]
async fn deleted_constraint_shows_as_dangling() {
    let h = harness();
    constraint(&h, "c1", "title", "exists", "").await;
    constraint(&h, "c2", "description", "textContains", "rail").await;
    h.service
        .create_filter(
            Some("f1"),
            &FilterInput {
                require_all: true,
                constraints: ids(&["c1", "c2"]),
                sub_filters: vec![],
            },
            None,
        )
        .await
        .expect("create");

    h.service.delete_constraint("c1").await.expect("delete");
    let tree = h.service.filter_tree("f1").await.expect("load");
    assert_eq!(tree.children[0], TreeChild::Dangling(Reference::constraint("c1")));
    assert!(matches!(tree.children[1], TreeChild::Constraint(_)));
}

#[tokio::test]
async fn invalid_email_is_rejected_before_filter_is_written() {
    let h = harness();
    constraint(&h, "c1", "title", "exists", "").await;
    let err = h
        .service
        .create_filter(
            Some("f1"),
            &FilterInput {
                require_all: true,
                constraints: ids(&["c1"]),
                sub_filters: vec![],
            },
            Some("not an email"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FilterError::Validation(ref issues) if issues[0].field == "email"));
    assert!(!h.service.loader().exists("f1").await.expect("exists"));
}

#[test]
fn unknown_vocabulary_is_not_found() {
    assert_eq!(
        map_field("not-a-real-field"),
        Err(MappingError::FieldNotFound("not-a-real-field".into()))
    );
    assert_eq!(
        map_operator("not-a-real-op", "x"),
        Err(MappingError::OperatorNotFound("not-a-real-op".into()))
    );
}

#[tokio::test]
async fn list_codec_preserves_order_at_scale() {
    let h = harness();
    let iris = ResourceIris::default();
    for len in [1usize, 3, 1000] {
        let items: Vec<_> = (0..len)
            .rev()
            .map(|i| shapewatch_store::Term::iri(iris.constraint(&format!("c{i}"))))
            .collect();
        let list = encode_list(&items, || iris.mint_list_node());
        shapewatch_store::GraphStore::update(
            h.store.as_ref(),
            &shapewatch_store::GraphUpdate::new().insert(list.facts.clone()),
        )
        .await
        .expect("write list");
        let decoded = decode_list(h.store.as_ref(), &list.head).await.expect("decode");
        assert_eq!(decoded, items, "length {len}");
    }
}

#[tokio::test]
async fn subscribe_requires_an_existing_filter() {
    let h = harness();
    let err = h
        .service
        .subscribe("late@example.com", "f-nope")
        .await
        .unwrap_err();
    assert!(matches!(err, FilterError::NotFound { kind: ResourceKind::Filter, .. }));
    assert!(h.notifier.tokens_for("late@example.com").is_empty());

    constraint(&h, "c1", "keyword", "textEquals", "rail").await;
    h.service
        .create_filter(
            Some("f1"),
            &FilterInput {
                require_all: true,
                constraints: ids(&["c1"]),
                sub_filters: vec![],
            },
            None,
        )
        .await
        .expect("create");

    let link = h
        .service
        .subscribe("Late@Example.com", "f1")
        .await
        .expect("subscribe");
    assert!(link.created);
    assert_eq!(link.subscriber.email, "late@example.com");

    let tokens = h.notifier.tokens_for("late@example.com");
    let listed = h.service.filters_by_token(&tokens[0]).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "f1");
}
