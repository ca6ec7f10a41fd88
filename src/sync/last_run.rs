use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::SourceKind;

/// When each job last finished a cycle. Process lifetime only.
///
/// Each entry is written by its own scheduler loop and may be read from anywhere;
/// clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct LastRunRegistry {
    inner: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl LastRunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every name already set to `at`.
    pub fn seeded<I, S>(names: I, at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = names.into_iter().map(|name| (name.into(), at)).collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn record(&self, name: &str, at: DateTime<Utc>) {
        self.inner.write().await.insert(name.to_string(), at);
    }

    pub async fn get(&self, name: &str) -> Option<DateTime<Utc>> {
        self.inner.read().await.get(name).copied()
    }

    pub async fn for_kind(&self, kind: SourceKind) -> Option<DateTime<Utc>> {
        self.get(kind.as_str()).await
    }

    pub async fn snapshot(&self) -> HashMap<String, DateTime<Utc>> {
        self.inner.read().await.clone()
    }
}
