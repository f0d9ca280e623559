//! Storage layer for per-user and per-thread documents
//!
//! Every record is an opaque JSON object keyed by an integer id. Two
//! namespaces exist (`users`, `threads`) with identical semantics; the
//! [`EntityStore`] type implements them on top of a [`DocumentBackend`].

mod memory;
mod sqlite;
mod store;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use store::EntityStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// A stored document: string-keyed, arbitrarily nested JSON object.
pub type Document = Map<String, Value>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The identifier cannot be coerced to an integer key
    #[error("Invalid entity key: {0}")]
    InvalidKey(String),
    /// The underlying storage failed
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// A persisted document is not a JSON object
    #[error("Corrupt document at {namespace}/{id}: {reason}")]
    Corrupt {
        /// Namespace of the broken record.
        namespace: Namespace,
        /// Key of the broken record.
        id: i64,
        /// What went wrong while decoding it.
        reason: String,
    },
    /// A value handed to the store is not a JSON object
    #[error("Document must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    /// Error during JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convert an arbitrary JSON value into a [`Document`].
///
/// # Errors
///
/// Returns [`StoreError::NotAnObject`] for arrays, scalars and `null`.
pub fn to_document(value: Value) -> Result<Document, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::NotAnObject(json_kind(&other))),
    }
}

pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Result of a write that requires the record to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The record existed and the change was persisted.
    Applied,
    /// No record with this id; nothing was written.
    NotFound,
}

/// Result of deleting a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The record existed and is gone now.
    Found,
    /// There was nothing to delete.
    NotFound,
}

/// Disjoint key spaces of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Per-sender documents.
    Users,
    /// Per-chat documents.
    Threads,
}

impl Namespace {
    /// Backing table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Threads => "threads",
        }
    }

    /// All namespaces, used when creating the schema.
    pub const ALL: [Self; 2] = [Self::Users, Self::Threads];
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Integer primary key of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(i64);

impl EntityId {
    /// Wrap a raw integer id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw integer.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Anything that can be coerced into an [`EntityId`].
///
/// Integers convert directly; strings must parse as a base-10 integer
/// (surrounding whitespace is ignored). Anything else is `InvalidKey`.
pub trait IntoEntityId {
    /// Perform the coercion.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if the value is not an integer.
    fn into_entity_id(self) -> Result<EntityId, StoreError>;
}

impl IntoEntityId for EntityId {
    fn into_entity_id(self) -> Result<EntityId, StoreError> {
        Ok(self)
    }
}

impl IntoEntityId for i64 {
    fn into_entity_id(self) -> Result<EntityId, StoreError> {
        Ok(EntityId(self))
    }
}

impl IntoEntityId for i32 {
    fn into_entity_id(self) -> Result<EntityId, StoreError> {
        Ok(EntityId(i64::from(self)))
    }
}

impl IntoEntityId for u64 {
    fn into_entity_id(self) -> Result<EntityId, StoreError> {
        i64::try_from(self)
            .map(EntityId)
            .map_err(|_| StoreError::InvalidKey(self.to_string()))
    }
}

impl IntoEntityId for &str {
    fn into_entity_id(self) -> Result<EntityId, StoreError> {
        self.trim()
            .parse::<i64>()
            .map(EntityId)
            .map_err(|_| StoreError::InvalidKey(self.to_string()))
    }
}

impl IntoEntityId for String {
    fn into_entity_id(self) -> Result<EntityId, StoreError> {
        self.as_str().into_entity_id()
    }
}

impl IntoEntityId for &Value {
    fn into_entity_id(self) -> Result<EntityId, StoreError> {
        match self {
            Value::Number(n) => n
                .as_i64()
                .map(EntityId)
                .ok_or_else(|| StoreError::InvalidKey(n.to_string())),
            Value::String(s) => s.as_str().into_entity_id(),
            other => Err(StoreError::InvalidKey(other.to_string())),
        }
    }
}

/// Interface for persistence backends
///
/// Backends store one serialized document per `(namespace, id)` and must
/// make each single-record write atomic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Point lookup of the raw serialized document
    async fn fetch(&self, namespace: Namespace, id: i64) -> Result<Option<String>, StoreError>;
    /// Insert or overwrite the serialized document
    async fn put(&self, namespace: Namespace, id: i64, data: String) -> Result<(), StoreError>;
    /// Delete a record, returning whether it existed
    async fn remove(&self, namespace: Namespace, id: i64) -> Result<bool, StoreError>;
    /// Check whether a record exists
    async fn contains(&self, namespace: Namespace, id: i64) -> Result<bool, StoreError>;
    /// Enumerate every key in the namespace
    async fn keys(&self, namespace: Namespace) -> Result<Vec<i64>, StoreError>;
    /// Delete every record in the namespace, returning how many were removed
    async fn clear(&self, namespace: Namespace) -> Result<u64, StoreError>;
    /// Check connection to the backend
    async fn check_connection(&self) -> Result<(), StoreError>;
}
