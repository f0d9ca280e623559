//! SQLite document backend.
//!
//! All statements run on tokio-rusqlite's single background thread, so each
//! write is one atomic statement against one connection.

use super::{DocumentBackend, Namespace, StoreError};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{error, info};

fn unavailable(e: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// SQLite-backed document storage with one table per namespace.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database file and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the file cannot be opened or the
    /// schema cannot be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(unavailable)?;
        }
        let conn = Connection::open(path).await.map_err(unavailable)?;
        let backend = Self { conn };
        backend.init_schema().await?;
        info!(path = %path.display(), "SQLite document store opened");
        Ok(backend)
    }

    /// Open a private in-memory database (used by tests and ephemeral runs).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the schema cannot be created.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await.map_err(unavailable)?;
        let backend = Self { conn };
        backend.init_schema().await?;
        Ok(backend)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                for namespace in Namespace::ALL {
                    conn.execute_batch(&format!(
                        "CREATE TABLE IF NOT EXISTS {} (
                            id INTEGER PRIMARY KEY,
                            data TEXT NOT NULL
                        );",
                        namespace.table()
                    ))?;
                }
                Ok(())
            })
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl DocumentBackend for SqliteBackend {
    async fn fetch(&self, namespace: Namespace, id: i64) -> Result<Option<String>, StoreError> {
        self.conn
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row(
                    &format!("SELECT data FROM {} WHERE id = ?1", namespace.table()),
                    params![id],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(unavailable)
    }

    async fn put(&self, namespace: Namespace, id: i64, data: String) -> Result<(), StoreError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (id, data) VALUES (?1, ?2)
                         ON CONFLICT(id) DO UPDATE SET data = excluded.data",
                        namespace.table()
                    ),
                    params![id, data],
                )?;
                Ok(())
            })
            .await
            .map_err(unavailable)
    }

    async fn remove(&self, namespace: Namespace, id: i64) -> Result<bool, StoreError> {
        self.conn
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let changed = conn.execute(
                    &format!("DELETE FROM {} WHERE id = ?1", namespace.table()),
                    params![id],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(unavailable)
    }

    async fn contains(&self, namespace: Namespace, id: i64) -> Result<bool, StoreError> {
        self.conn
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", namespace.table()),
                    params![id],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(unavailable)
    }

    async fn keys(&self, namespace: Namespace) -> Result<Vec<i64>, StoreError> {
        self.conn
            .call(move |conn| -> Result<Vec<i64>, rusqlite::Error> {
                let mut stmt = conn.prepare(&format!("SELECT id FROM {}", namespace.table()))?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<i64>, _>>()?;
                Ok(ids)
            })
            .await
            .map_err(unavailable)
    }

    async fn clear(&self, namespace: Namespace) -> Result<u64, StoreError> {
        self.conn
            .call(move |conn| -> Result<u64, rusqlite::Error> {
                let removed = conn.execute(&format!("DELETE FROM {}", namespace.table()), [])?;
                Ok(removed as u64)
            })
            .await
            .map_err(unavailable)
    }

    async fn check_connection(&self) -> Result<(), StoreError> {
        match self
            .conn
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
        {
            Ok(()) => {
                info!("Successfully connected to SQLite storage.");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "SQLite connectivity test failed");
                Err(unavailable(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrites_single_row() -> Result<(), StoreError> {
        let backend = SqliteBackend::open_in_memory().await?;
        backend.put(Namespace::Users, 1, r#"{"a":1}"#.into()).await?;
        backend.put(Namespace::Users, 1, r#"{"b":2}"#.into()).await?;

        assert_eq!(backend.keys(Namespace::Users).await?, vec![1]);
        assert_eq!(
            backend.fetch(Namespace::Users, 1).await?.as_deref(),
            Some(r#"{"b":2}"#)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_namespaces_are_disjoint() -> Result<(), StoreError> {
        let backend = SqliteBackend::open_in_memory().await?;
        backend.put(Namespace::Users, 7, "{}".into()).await?;

        assert!(backend.contains(Namespace::Users, 7).await?);
        assert!(!backend.contains(Namespace::Threads, 7).await?);
        assert_eq!(backend.fetch(Namespace::Threads, 7).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_and_clear_report_changes() -> Result<(), StoreError> {
        let backend = SqliteBackend::open_in_memory().await?;
        backend.put(Namespace::Threads, 1, "{}".into()).await?;
        backend.put(Namespace::Threads, 2, "{}".into()).await?;

        assert!(backend.remove(Namespace::Threads, 1).await?);
        assert!(!backend.remove(Namespace::Threads, 1).await?);
        assert_eq!(backend.clear(Namespace::Threads).await?, 1);
        assert!(backend.keys(Namespace::Threads).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_file_database_persists_between_opens() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().map_err(unavailable)?;
        let path = dir.path().join("nested").join("bot.sqlite3");

        {
            let backend = SqliteBackend::open(&path).await?;
            backend.put(Namespace::Users, 5, r#"{"x":true}"#.into()).await?;
        }

        let reopened = SqliteBackend::open(&path).await?;
        assert_eq!(
            reopened.fetch(Namespace::Users, 5).await?.as_deref(),
            Some(r#"{"x":true}"#)
        );
        Ok(())
    }
}
