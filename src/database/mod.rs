//! Database module
//!
//! This module provides all dataset storage for geoscope, organized into:
//!
//! - **core**: Core database infrastructure (SQLite connections, schema checks)
//! - **geo**: Range dataset access (SQLite lookups, in-memory snapshots)
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/             # Foundation
//! │   ├── connection    # SQLite DatabaseConn wrapper (read-only for datasets)
//! │   └── schema        # Range dataset schema definitions and verification
//! │
//! └── geo/              # Range dataset
//!     ├── blocks        # City/Country/ASN block repositories (prefix lookups)
//!     ├── locations     # Localized location repository
//!     ├── range_index   # Flattened in-memory longest-prefix-match index
//!     └── snapshot      # Immutable snapshot and swappable store
//! ```
//!
//! # Usage
//!
//! ## Direct SQLite lookups
//!
//! ```rust,ignore
//! use geoscope::database::{GeoDatabase, GeoDataset, IpVersion};
//!
//! let db = GeoDatabase::open("~/.geoscope/WhatTimeIsIn-geoip.db")?;
//! let block = db.find_city(IpVersion::V4, 0x0808_0808)?;
//! ```
//!
//! ## In-memory snapshot
//!
//! ```rust,ignore
//! use geoscope::database::{GeoSnapshot, SnapshotStore};
//!
//! let store = SnapshotStore::new(GeoSnapshot::load_from_path(path)?);
//! let snapshot = store.current();
//! let asn = snapshot.find_asn(IpVersion::V4, 0x0808_0808)?;
//! ```

pub mod core;
pub mod geo;

// Core database infrastructure
pub use core::{DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus};

// Range dataset
pub use geo::{
    AsnBlock, BlockRange, BlockTraits, CityBlock, CityLocation, CountryBlock, CountryLocation,
    GeoDatabase, GeoDataset, GeoSnapshot, IpVersion, RangeIndex, SnapshotInfo, SnapshotStore,
};
