//! Core database infrastructure
//!
//! This module provides the foundational database components used throughout geoscope:
//! - `DatabaseConn`: Core SQLite connection wrapper (read-only for served datasets)
//! - `SchemaManager`: Schema verification and fixture initialization
//! - `SchemaStatus`: Schema state enumeration

mod connection;
mod schema;

pub use connection::DatabaseConn;
pub use schema::{SchemaDefinitions, SchemaManager, SchemaStatus};
