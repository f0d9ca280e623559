//! Entity store: merge/upsert/delete semantics over opaque documents.

use super::{
    json_kind, Document, DocumentBackend, EntityId, IntoEntityId, Namespace, Outcome, Removal,
    StoreError,
};
use futures_util::future::try_join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Key under which `refresh` resets the ban flag.
pub const BANNED_KEY: &str = "isBanned";

/// Per-id async mutexes.
///
/// A slot lives as long as someone holds or awaits its mutex; the map only
/// keeps weak handles, pruned whenever a new slot is created.
#[derive(Default)]
struct KeyLocks {
    slots: std::sync::Mutex<HashMap<i64, Weak<Mutex<()>>>>,
}

impl KeyLocks {
    fn slot(&self, id: i64) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = slots.get(&id).and_then(Weak::upgrade) {
            return lock;
        }
        slots.retain(|_, slot| slot.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        slots.insert(id, Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn live(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }
}

/// Per-namespace document store.
///
/// Cheap to clone; clones share the backend and the per-key locks.
#[derive(Clone)]
pub struct EntityStore {
    namespace: Namespace,
    backend: Arc<dyn DocumentBackend>,
    // `None`: concurrent updates to one id are last-writer-wins
    locks: Option<Arc<KeyLocks>>,
}

impl EntityStore {
    /// Create a store over `backend`.
    ///
    /// With `serialize_updates` every write to the same id is ordered by an
    /// async mutex, so concurrent `update` / `remove_key` calls cannot lose
    /// each other's changes.
    #[must_use]
    pub fn new(
        namespace: Namespace,
        backend: Arc<dyn DocumentBackend>,
        serialize_updates: bool,
    ) -> Self {
        let locks = serialize_updates.then(|| Arc::new(KeyLocks::default()));
        Self {
            namespace,
            backend,
            locks,
        }
    }

    /// Namespace served by this store.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Check whether a record exists.
    ///
    /// # Errors
    ///
    /// `InvalidKey` for a non-integer id, `Unavailable` on backend failure.
    pub async fn exists(&self, id: impl IntoEntityId) -> Result<bool, StoreError> {
        let id = id.into_entity_id()?;
        self.backend.contains(self.namespace, id.get()).await
    }

    /// Fetch a document. `Ok(None)` means there is no record.
    ///
    /// # Errors
    ///
    /// `InvalidKey`, `Unavailable`, or `Corrupt` if the stored text is not an object.
    pub async fn retrieve(&self, id: impl IntoEntityId) -> Result<Option<Document>, StoreError> {
        let id = id.into_entity_id()?;
        self.read(id).await
    }

    /// Create or wholesale overwrite a document.
    ///
    /// # Errors
    ///
    /// `InvalidKey` or `Unavailable`.
    pub async fn upsert(&self, id: impl IntoEntityId, document: &Document) -> Result<(), StoreError> {
        let id = id.into_entity_id()?;
        let _guard = self.lock(id).await;
        self.write(id, document).await
    }

    /// Shallow-merge `partial` over an existing document.
    ///
    /// Keys in `partial` win; unrelated keys are kept. A missing record is
    /// reported as [`Outcome::NotFound`] and nothing is created.
    ///
    /// # Errors
    ///
    /// `InvalidKey`, `Unavailable`, or `Corrupt`.
    pub async fn update(
        &self,
        id: impl IntoEntityId,
        partial: Document,
    ) -> Result<Outcome, StoreError> {
        let id = id.into_entity_id()?;
        let _guard = self.lock(id).await;
        let Some(mut current) = self.read(id).await? else {
            return Ok(Outcome::NotFound);
        };
        current.extend(partial);
        self.write(id, &current).await?;
        Ok(Outcome::Applied)
    }

    /// Shallow-merge `partial` into a record, creating it when missing.
    ///
    /// The read and the write happen under one per-id lock, so a record
    /// created concurrently is merged into rather than overwritten.
    ///
    /// # Errors
    ///
    /// `InvalidKey`, `Unavailable`, or `Corrupt`.
    pub async fn merge_or_create(
        &self,
        id: impl IntoEntityId,
        partial: Document,
    ) -> Result<Outcome, StoreError> {
        let id = id.into_entity_id()?;
        let _guard = self.lock(id).await;
        let (mut current, outcome) = match self.read(id).await? {
            Some(current) => (current, Outcome::Applied),
            None => (Document::new(), Outcome::NotFound),
        };
        current.extend(partial);
        self.write(id, &current).await?;
        Ok(outcome)
    }

    /// Force a record with an empty document, overwriting any existing one.
    ///
    /// # Errors
    ///
    /// `InvalidKey` or `Unavailable`.
    pub async fn create(&self, id: impl IntoEntityId) -> Result<(), StoreError> {
        self.upsert(id, &Document::new()).await
    }

    /// Intentional full replacement that bypasses the merge path.
    ///
    /// # Errors
    ///
    /// `InvalidKey` or `Unavailable`.
    pub async fn force(&self, id: impl IntoEntityId, document: &Document) -> Result<(), StoreError> {
        self.upsert(id, document).await
    }

    /// Replace the record with a fresh profile snapshot and clear the ban flag.
    ///
    /// # Errors
    ///
    /// `InvalidKey` or `Unavailable`.
    pub async fn refresh(
        &self,
        id: impl IntoEntityId,
        mut profile: Document,
    ) -> Result<(), StoreError> {
        profile.insert(BANNED_KEY.to_string(), Value::Bool(false));
        self.upsert(id, &profile).await
    }

    /// Remove the named keys from a document. Absent keys are ignored.
    ///
    /// # Errors
    ///
    /// `InvalidKey`, `Unavailable`, or `Corrupt`.
    pub async fn remove_key<I, S>(&self, id: impl IntoEntityId, keys: I) -> Result<Outcome, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let id = id.into_entity_id()?;
        let _guard = self.lock(id).await;
        let Some(mut current) = self.read(id).await? else {
            return Ok(Outcome::NotFound);
        };
        for key in keys {
            current.remove(key.as_ref());
        }
        self.write(id, &current).await?;
        Ok(Outcome::Applied)
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// `InvalidKey` or `Unavailable`.
    pub async fn delete(&self, id: impl IntoEntityId) -> Result<Removal, StoreError> {
        let id = id.into_entity_id()?;
        let _guard = self.lock(id).await;
        if self.backend.remove(self.namespace, id.get()).await? {
            Ok(Removal::Found)
        } else {
            Ok(Removal::NotFound)
        }
    }

    /// Every document in the namespace, in backend iteration order.
    ///
    /// A record deleted between listing keys and reading it is skipped.
    ///
    /// # Errors
    ///
    /// `Unavailable` or `Corrupt`.
    pub async fn list_all(&self) -> Result<Vec<Document>, StoreError> {
        let keys = self.backend.keys(self.namespace).await?;
        let documents = try_join_all(keys.into_iter().map(|id| self.read(EntityId::new(id)))).await?;
        Ok(documents.into_iter().flatten().collect())
    }

    /// Delete every record in the namespace.
    ///
    /// # Errors
    ///
    /// `Unavailable`.
    pub async fn clear(&self) -> Result<u64, StoreError> {
        let removed = self.backend.clear(self.namespace).await?;
        debug!(namespace = %self.namespace, removed, "Namespace cleared");
        Ok(removed)
    }

    async fn lock(&self, id: EntityId) -> Option<OwnedMutexGuard<()>> {
        let lock = self.locks.as_ref()?.slot(id.get());
        Some(lock.lock_owned().await)
    }

    async fn read(&self, id: EntityId) -> Result<Option<Document>, StoreError> {
        let Some(raw) = self.backend.fetch(self.namespace, id.get()).await? else {
            return Ok(None);
        };
        self.decode(id, &raw).map(Some)
    }

    async fn write(&self, id: EntityId, document: &Document) -> Result<(), StoreError> {
        let data = serde_json::to_string(document)?;
        self.backend.put(self.namespace, id.get(), data).await
    }

    fn decode(&self, id: EntityId, raw: &str) -> Result<Document, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            namespace: self.namespace,
            id: id.get(),
            reason,
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(corrupt(format!("expected object, found {}", json_kind(&other)))),
            Err(e) => Err(corrupt(e.to_string())),
        }
    }
}
