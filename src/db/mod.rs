use rusqlite::Connection;
use std::path::Path;
use tokio::task;

use crate::error::{AutomapError, Result};

/// SQLite pragmas applied to every connection.
/// WAL mode for better concurrency, NORMAL sync for speed, foreign keys for
/// integrity, in-memory temp store and a 64MB page cache.
const PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA foreign_keys = ON; \
     PRAGMA temp_store = MEMORY; \
     PRAGMA cache_size = -65536;";

/// Database connection wrapper
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Open a new database connection with the standard pragmas
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(AutomapError::Database)?;
        conn.execute_batch(PRAGMAS)?;
        Ok(conn)
    }

    /// Execute a closure with a database connection in a blocking task.
    ///
    /// The closure runs synchronously on the blocking pool; the closure
    /// engine executes entirely inside one such call so that it can share
    /// the write transaction that committed the triggering edge.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path).map_err(AutomapError::Database)?;
            conn.execute_batch(PRAGMAS)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| AutomapError::Config(format!("Blocking task failed: {}", e)))?
    }
}

pub mod migrate;
