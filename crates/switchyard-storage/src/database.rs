// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management: PRAGMA setup, migrations, lifecycle.
//!
//! Every statement in a process runs on tokio-rusqlite's single background
//! thread. Separate processes coordinate through WAL and the busy timeout.

use std::path::Path;
use std::time::Duration;

use switchyard_core::SwitchyardError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// How long a writer waits on another process's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Convert a tokio-rusqlite error into `SwitchyardError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SwitchyardError {
    SwitchyardError::Storage {
        source: Box::new(e),
    }
}

/// Unwrap a `SwitchyardError` produced inside a connection closure.
fn map_inner_err(e: tokio_rusqlite::Error<SwitchyardError>) -> SwitchyardError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => SwitchyardError::Storage {
            source: Box::new(other),
        },
    }
}

/// Handle to the shared SQLite database holding tasks and the usage ledger.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and migrate it.
    pub async fn open(path: &str) -> Result<Self, SwitchyardError> {
        Self::open_with(path, true).await
    }

    /// Open with explicit journal mode selection.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, SwitchyardError> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SwitchyardError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| SwitchyardError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        info!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Private in-memory database, migrated. Used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, SwitchyardError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| SwitchyardError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), SwitchyardError> {
        let journal_mode = self
            .conn
            .call(move |conn| {
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                let mode = if wal_mode { "WAL" } else { "DELETE" };
                conn.pragma_update_and_check(None, "journal_mode", mode, |row| {
                    row.get::<_, String>(0)
                })
            })
            .await
            .map_err(map_tr_err)?;
        debug!(journal_mode = %journal_mode, "pragmas applied");

        self.conn
            .call(|conn| run_migrations(conn))
            .await
            .map_err(map_inner_err)
    }

    /// The underlying connection, for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the connection, flushing the background thread.
    pub async fn close(self) -> Result<(), SwitchyardError> {
        self.conn.close().await.map_err(|e| SwitchyardError::Storage {
            source: Box::new(e),
        })
    }
}
