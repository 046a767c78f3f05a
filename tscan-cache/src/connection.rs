//! Scoped SQLite connection management.
//!
//! A [`CacheConnection`] is either Closed (no connection, no cursor) or Open.
//! Opening applies the throughput-oriented PRAGMAs and starts a transaction;
//! closing commits or rolls back depending on how the scope ended, then always
//! closes the handle and returns to Closed. Cleanup failures are logged, never
//! raised, so the manager cannot get stuck half-open.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, error, info, instrument, warn};

use crate::executor::{Cursor, CursorState};
use crate::{Error, Result};

/// PRAGMAs applied to every new connection
const TUNING_PRAGMAS: &str = "PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;
PRAGMA cache_size=65536;
PRAGMA temp_store=MEMORY;";

/// 256 MiB of memory-mapped I/O
#[cfg(not(windows))]
const MMAP_PRAGMA: &str = "PRAGMA mmap_size=268435456;";

/// How a scope is being left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The body finished; commit
    Normal,
    /// The body failed or panicked; roll back
    Abnormal,
}

/// Connection manager for the cache database file
#[derive(Debug)]
pub struct CacheConnection {
    path: PathBuf,
    connection: Option<Connection>,
    cursor: Option<CursorState>,
}

impl CacheConnection {
    /// Create a closed manager for the database at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connection: None,
            cursor: None,
        }
    }

    /// Create a closed manager for the default cache file inside `dir`
    pub fn in_cache_dir(dir: &Path) -> Self {
        Self::new(crate::cache_dir::default_cache_file(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// The live connection
    pub fn connection(&self) -> Result<&Connection> {
        match &self.connection {
            Some(connection) => Ok(connection),
            None => {
                warn!("Connection is not established.");
                Err(Error::not_established("Connection"))
            }
        }
    }

    /// A cursor over the live connection
    pub fn cursor(&mut self) -> Result<Cursor<'_>> {
        match (self.connection.as_ref(), self.cursor.as_mut()) {
            (Some(connection), Some(state)) => Ok(Cursor::new(connection, state)),
            _ => {
                warn!("Cursor is not established.");
                Err(Error::not_established("Cursor"))
            }
        }
    }

    /// Open the connection, tune it and begin a transaction.
    ///
    /// Fails with [`Error::AlreadyOpen`] if a scope is already open; scopes do
    /// not nest.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen {
                path: self.path.clone(),
            });
        }

        info!("Creating a connection and adding rules.");
        let connection = Connection::open(&self.path)?;
        connection.execute_batch(TUNING_PRAGMAS)?;
        #[cfg(not(windows))]
        connection.execute_batch(MMAP_PRAGMA)?;
        connection.execute_batch("BEGIN")?;

        self.connection = Some(connection);
        self.cursor = Some(CursorState::default());
        info!("Connection established.");
        Ok(())
    }

    /// Leave the scope.
    ///
    /// On [`Exit::Normal`] the transaction is committed and a commit failure is
    /// returned (after a best-effort rollback). On [`Exit::Abnormal`] it is rolled
    /// back. Either way the connection is closed and the manager is Closed
    /// afterwards. Calling this while Closed does nothing.
    pub fn close(&mut self, exit: Exit) -> Result<()> {
        self.cursor = None;
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };

        let outcome = match exit {
            Exit::Normal => commit(&connection),
            Exit::Abnormal => {
                rollback(&connection);
                Ok(())
            }
        };

        match connection.close() {
            Ok(()) => debug!(path = %self.path.display(), "Connection closed."),
            Err((_, err)) => error!(error = %err, "Failed to close connection."),
        }
        outcome
    }

    /// Run `body` inside an open scope.
    ///
    /// Commits when `body` returns `Ok` and rolls back when it returns `Err`
    /// or panics. The body's own error is returned unchanged; on success a
    /// commit failure is returned instead of the value.
    ///
    /// # Examples
    /// ```no_run
    /// use tscan_cache::{CacheConnection, QueryBuilder};
    ///
    /// let mut cache = CacheConnection::new("/tmp/tscan_cache.sqlite3");
    /// let removed = cache.scope(|conn| {
    ///     let stmt = QueryBuilder::new().delete("entries").less_than("expires_at", 0)?.build()?;
    ///     conn.cursor()?.execute(&stmt)
    /// })?;
    /// # Ok::<(), tscan_cache::Error>(())
    /// ```
    pub fn scope<T, F>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(&mut CacheConnection) -> Result<T>,
    {
        self.open()?;
        let mut guard = ScopeGuard {
            connection: self,
            armed: true,
        };
        let result = body(&mut *guard.connection);
        guard.armed = false;

        match result {
            Ok(value) => {
                guard.connection.close(Exit::Normal)?;
                Ok(value)
            }
            Err(err) => {
                let _ = guard.connection.close(Exit::Abnormal);
                Err(err)
            }
        }
    }
}

impl Drop for CacheConnection {
    fn drop(&mut self) {
        if self.is_open() {
            warn!(path = %self.path.display(), "Connection dropped while open, rolling back.");
            let _ = self.close(Exit::Abnormal);
        }
    }
}

/// Rolls the scope back if the body unwinds
struct ScopeGuard<'a> {
    connection: &'a mut CacheConnection,
    armed: bool,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.connection.close(Exit::Abnormal);
        }
    }
}

fn commit(connection: &Connection) -> Result<()> {
    if connection.is_autocommit() {
        debug!("No transaction open, nothing to commit.");
        return Ok(());
    }
    if let Err(err) = connection.execute_batch("COMMIT") {
        error!(error = %err, "Failed to commit transaction.");
        if let Err(rollback_err) = connection.execute_batch("ROLLBACK") {
            debug!(error = %rollback_err, "Rollback after failed commit also failed.");
        }
        return Err(err.into());
    }
    Ok(())
}

fn rollback(connection: &Connection) {
    if connection.is_autocommit() {
        return;
    }
    if let Err(err) = connection.execute_batch("ROLLBACK") {
        error!(error = %err, "Failed to rollback transaction.");
    }
}
