//! Compiled handlers addressable from manifests.

use super::CommandHandler;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps manifest `entry_point` ids to compiled handlers.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a handler under `id`.
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        self.insert(id, handler);
        self
    }

    /// Add (or replace) a handler under `id`.
    pub fn insert(&mut self, id: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(id.into(), handler);
    }

    /// Handler registered under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(id).cloned()
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
