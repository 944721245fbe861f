//! Token notifications queued as JSON lines for an external mailer.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use shapewatch_filters::{Notifier, NotifyError};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboxEntry<'a> {
    email: &'a str,
    token: &'a str,
    queued_at: String,
}

#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn notify(&self, email: &str, token: &str) -> Result<(), NotifyError> {
        let entry = OutboxEntry {
            email,
            token,
            queued_at: Utc::now().to_rfc3339(),
        };
        let mut line =
            serde_json::to_string(&entry).map_err(|e| NotifyError::Delivery(e.to_string()))?;
        line.push('\n');

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || append_line(&path, &line))
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?
            .map_err(|e| NotifyError::Delivery(format!("{}: {e}", self.path.display())))?;
        tracing::debug!(outbox = %self.path.display(), %email, "token queued");
        Ok(())
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn entries_append_one_per_line() {
        let dir = std::env::temp_dir().join(format!(
            "shapewatch-outbox-{}-{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let path = dir.join("nested").join("outbox.jsonl");
        let notifier = OutboxNotifier::new(&path);

        notifier.notify("a@example.com", "t1").await.expect("first");
        notifier.notify("b@example.com", "t2").await.expect("second");

        let content = fs::read_to_string(&path).expect("outbox written");
        let entries: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["email"], "b@example.com");
        assert_eq!(entries[1]["token"], "t2");
        assert!(entries[0]["queuedAt"].is_string());

        let _ = fs::remove_dir_all(&dir);
    }
}
