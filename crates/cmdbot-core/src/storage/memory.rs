//! In-process document backend.

use super::{DocumentBackend, Namespace, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Volatile backend keeping every namespace in a map. Nothing survives a
/// restart; used by tests and by runs configured with `database_path = ":memory:"`.
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<Namespace, BTreeMap<i64, String>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn fetch(&self, namespace: Namespace, id: i64) -> Result<Option<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.get(&namespace).and_then(|t| t.get(&id)).cloned())
    }

    async fn put(&self, namespace: Namespace, id: i64, data: String) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.entry(namespace).or_default().insert(id, data);
        Ok(())
    }

    async fn remove(&self, namespace: Namespace, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(&namespace)
            .is_some_and(|t| t.remove(&id).is_some()))
    }

    async fn contains(&self, namespace: Namespace, id: i64) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.get(&namespace).is_some_and(|t| t.contains_key(&id)))
    }

    async fn keys(&self, namespace: Namespace) -> Result<Vec<i64>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&namespace)
            .map(|t| t.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, namespace: Namespace) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .remove(&namespace)
            .map_or(0, |t| t.len() as u64))
    }

    async fn check_connection(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
