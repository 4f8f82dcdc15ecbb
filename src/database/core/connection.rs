//! Database connection management
//!
//! This module provides the core database connection wrapper used throughout geoscope.

use anyhow::{anyhow, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections. Range
/// datasets are provisioned by an external tool, so connections used for
/// lookups are opened read-only and the writable variants exist for building
/// fixture datasets.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open an existing dataset file for read-only queries
    ///
    /// Fails if the file does not exist; SQLite would otherwise silently
    /// create an empty database.
    pub fn open_read_only(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(anyhow!("Database file not found: '{}'", path));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| anyhow!("Failed to open database at '{}': {}", path, e))?;

        let db = DatabaseConn { conn };
        db.configure_read_only()?;
        Ok(db)
    }

    /// Open (or create) a writable database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        Ok(DatabaseConn { conn })
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    /// Configure a read-only connection
    fn configure_read_only(&self) -> Result<()> {
        // Reject any accidental writes at the statement level too
        self.conn
            .pragma_update(None, "query_only", true)
            .map_err(|e| anyhow!("Failed to set query-only mode: {}", e))?;

        // Increase cache size for better performance (100MB)
        self.conn
            .pragma_update(None, "cache_size", 100000)
            .map_err(|e| anyhow!("Failed to set cache size: {}", e))?;

        // Store temp tables in memory
        self.conn
            .pragma_update(None, "temp_store", "MEMORY")
            .map_err(|e| anyhow!("Failed to set temp store: {}", e))?;

        Ok(())
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", table_name);
        let count: u64 = self
            .conn
            .query_row(&query, [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get table count: {}", e))?;
        Ok(count)
    }
}
