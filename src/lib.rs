#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Geoscope - IP geolocation from range datasets
//!
//! Geoscope resolves IPv4 and IPv6 addresses to geography (continent,
//! country, subdivisions, city, coordinates) and network ownership (ASN and
//! organization) by longest-prefix matching against a SQLite range dataset.
//! It can be used as both a command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Dataset access, lookup lens, configuration | `rusqlite`, `rayon` |
//! | `display` | Table formatting with `tabled` | `tabled`, `json_to_table` |
//! | `cli` | CLI binary and HTTP API server | All above + `clap`, `axum` |
//!
//! ```toml
//! # Library only
//! geoscope = { version = "0.1", default-features = false }
//!
//! # Default (CLI binary)
//! geoscope = "0.1"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: dataset access
//!   - `core`: SQLite connection management and schema definitions
//!   - `geo`: block and location repositories, the in-memory range index,
//!     and hot-swappable snapshots
//!
//! - **[`lens`]**: lookup logic
//!   - `geoip`: address normalization, tier resolution, document composition
//!   - `utils`: output formats
//!
//! - **[`config`]**: configuration management
//!
//! - **`server`**: HTTP lookup API (requires `cli`)
//!
//! # Quick Start
//!
//! ## Direct SQLite lookups
//!
//! ```rust,ignore
//! use geoscope::database::GeoDatabase;
//! use geoscope::lens::geoip::GeoLens;
//!
//! let db = GeoDatabase::open("/data/WhatTimeIsIn-geoip.db")?;
//! let doc = GeoLens::new(&db).lookup("8.8.8.8", "en")?;
//! println!("{}", serde_json::to_string_pretty(&doc)?);
//! ```
//!
//! ## In-memory snapshot
//!
//! ```rust,ignore
//! use geoscope::database::{GeoSnapshot, SnapshotStore};
//! use geoscope::lens::geoip::GeoLens;
//!
//! let store = SnapshotStore::new(GeoSnapshot::load_from_path("/data/geo.db")?);
//! let snapshot = store.current();
//! let doc = GeoLens::new(snapshot.as_ref()).lookup("2001:4860::8888", "de")?;
//!
//! // later, pick up a new dataset without disturbing readers
//! store.reload_from_path("/data/geo.db")?;
//! ```

pub mod config;
pub mod database;
pub mod lens;

// Server module - requires CLI feature
#[cfg(feature = "cli")]
pub mod server;

// =============================================================================
// Configuration
// =============================================================================

pub use config::GeoscopeConfig;

pub use config::{format_size, get_dataset_info, DatasetInfo, TableInfo};

// =============================================================================
// Database Module - Re-export commonly used types
// =============================================================================

pub use database::{DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus};

pub use database::{
    AsnBlock, BlockRange, BlockTraits, CityBlock, CityLocation, CountryBlock, CountryLocation,
    GeoDatabase, GeoDataset, GeoSnapshot, IpVersion, RangeIndex, SnapshotInfo, SnapshotStore,
};

// =============================================================================
// Lens Module
// =============================================================================

pub use lens::geoip::{GeoDocument, GeoLens, GeoLookupArgs, GeoLookupResult, LookupError};
pub use lens::utils::OutputFormat;

// =============================================================================
// Server Module (HTTP API) - requires "cli" feature
// =============================================================================

#[cfg(feature = "cli")]
pub use server::{create_axum_router, start_server, ApiError, ServerConfig, ServerState};
