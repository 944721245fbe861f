//! Integration tests: the JSONL file backend behind the store protocol.

use shapewatch_store::{
    FileGraphStore, GraphStore, GraphUpdate, Term, Triple, TriplePattern, decode_list,
    encode_list, graph_lock_path,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "shapewatch-store-{prefix}-{}-{unique}",
            std::process::id()
        ));
        std::fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[tokio::test]
async fn list_written_to_file_decodes_from_a_new_instance() {
    let tmp = TempDirGuard::new("list");
    let path = tmp.path().join("graph.jsonl");
    let items: Vec<Term> = ["c1", "c2", "f1"]
        .iter()
        .map(|id| Term::iri(format!("urn:ref:{id}")))
        .collect();

    let writer = FileGraphStore::new("urn:g", &path);
    let list = encode_list(&items, || format!("urn:node:{}", uuid::Uuid::new_v4()));
    let owner = Triple::new("urn:owner", "urn:children", list.head.clone());
    writer
        .update(&GraphUpdate::new().insert(list.facts.clone()).insert([owner]))
        .await
        .expect("write list");

    let reader = FileGraphStore::new("urn:g", &path);
    let head = reader
        .objects("urn:owner", "urn:children")
        .await
        .expect("read head");
    assert_eq!(head.len(), 1);
    let decoded = decode_list(&reader, &head[0]).await.expect("decode");
    assert_eq!(decoded, items);
}

#[tokio::test]
async fn concurrent_writers_in_one_process_all_land() {
    let tmp = TempDirGuard::new("concurrent");
    let path = tmp.path().join("graph.jsonl");
    let store = Arc::new(FileGraphStore::new("urn:g", &path));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let fact = Triple::new(format!("urn:s:{i}"), "urn:p", Term::integer(i));
            store.update(&GraphUpdate::new().insert([fact])).await
        }));
    }
    for handle in handles {
        handle.await.expect("task joins").expect("update succeeds");
    }

    let facts = store.select(&TriplePattern::any()).await.expect("select");
    assert_eq!(facts.len(), 8);
    assert!(!graph_lock_path(&path).exists());
}
