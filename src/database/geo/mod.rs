//! Range dataset storage
//!
//! A range dataset is a read-only SQLite file provisioned by an external
//! build tool. It holds three independent block tables (City, Country, ASN)
//! and two localized location tables. This module provides:
//!
//! - [`GeoDatabase`]: direct SQLite access using prefix-aligned point lookups
//! - [`GeoSnapshot`]: the whole dataset flattened into in-memory indexes
//! - [`SnapshotStore`]: atomic replacement of the snapshot used by a server
//!
//! Both access paths implement [`GeoDataset`], the query contract the
//! resolver is written against.

mod blocks;
#[cfg(test)]
pub(crate) mod fixtures;
mod locations;
mod range_index;
mod snapshot;

pub use blocks::{
    aligned_start, key_from_sql, key_to_sql, AsnBlock, BlockRange, BlockRecord, BlockRepository,
    BlockTraits, CityBlock, CountryBlock,
};
pub use locations::{CityLocation, CountryLocation, LocationRepository};
pub use range_index::RangeIndex;
pub use snapshot::{GeoSnapshot, SnapshotInfo, SnapshotStore};

use crate::database::core::{DatabaseConn, SchemaManager, SchemaStatus};
use anyhow::{anyhow, Result};
use blocks::PrefixLengthCache;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::{info, warn};

/// IP address family of a lookup key or range record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Value stored in the `ip_version` column
    pub fn as_i64(&self) -> i64 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            4 => Some(IpVersion::V4),
            6 => Some(IpVersion::V6),
            _ => None,
        }
    }

    /// Width of the lookup-key domain in bits
    pub fn key_bits(&self) -> u32 {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 64,
        }
    }
}

impl From<IpVersion> for u8 {
    fn from(version: IpVersion) -> Self {
        version.as_i64() as u8
    }
}

impl TryFrom<u8> for IpVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        IpVersion::from_i64(value as i64).ok_or_else(|| format!("invalid IP version: {}", value))
    }
}

impl Display for IpVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// Read-only query contract over a range dataset
pub trait GeoDataset {
    /// Most specific City block covering the key
    fn find_city(&self, version: IpVersion, key: u64) -> Result<Option<CityBlock>>;

    /// Most specific Country block covering the key
    fn find_country(&self, version: IpVersion, key: u64) -> Result<Option<CountryBlock>>;

    /// Most specific ASN block covering the key
    fn find_asn(&self, version: IpVersion, key: u64) -> Result<Option<AsnBlock>>;

    fn city_location(&self, geoname_id: u32, locale: &str) -> Result<Option<CityLocation>>;

    fn country_location(&self, geoname_id: u32, locale: &str) -> Result<Option<CountryLocation>>;
}

/// Read-only SQLite range dataset
pub struct GeoDatabase {
    db: DatabaseConn,
    path: String,
    prefix_lengths: PrefixLengthCache,
}

impl GeoDatabase {
    /// Open the dataset at the specified path
    ///
    /// The file must exist and contain every range and location table.
    /// Missing lookup indexes are reported but not fatal.
    pub fn open(path: &str) -> Result<Self> {
        let db = DatabaseConn::open_read_only(path)?;
        let schema = SchemaManager::new(&db.conn);

        match schema.check_status()? {
            SchemaStatus::Current => {
                info!("Opened range dataset at {}", path);
            }
            SchemaStatus::NotInitialized => {
                return Err(anyhow!("'{}' does not contain a range dataset", path));
            }
            SchemaStatus::Incomplete { missing } => {
                return Err(anyhow!(
                    "Range dataset at '{}' is incomplete, missing tables: {}",
                    path,
                    missing.join(", ")
                ));
            }
        }

        let missing_indexes = schema.missing_indexes()?;
        if !missing_indexes.is_empty() {
            warn!(
                "Range dataset at '{}' lacks lookup indexes ({}), lookups will scan",
                path,
                missing_indexes.join(", ")
            );
        }

        Ok(Self {
            db,
            path: path.to_string(),
            prefix_lengths: PrefixLengthCache::default(),
        })
    }

    /// Path the dataset was opened from
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn city_blocks(&self) -> BlockRepository<'_, CityBlock> {
        BlockRepository::new(&self.db.conn, &self.prefix_lengths)
    }

    pub fn country_blocks(&self) -> BlockRepository<'_, CountryBlock> {
        BlockRepository::new(&self.db.conn, &self.prefix_lengths)
    }

    pub fn asn_blocks(&self) -> BlockRepository<'_, AsnBlock> {
        BlockRepository::new(&self.db.conn, &self.prefix_lengths)
    }

    pub fn locations(&self) -> LocationRepository<'_> {
        LocationRepository::new(&self.db.conn)
    }

    /// Get the underlying database connection
    pub fn connection(&self) -> &rusqlite::Connection {
        &self.db.conn
    }

    /// Dataset version recorded by the build tool, if any
    pub fn dataset_version(&self) -> Result<Option<String>> {
        SchemaManager::new(&self.db.conn).get_meta("dataset_version")
    }

    /// Row counts of every dataset table
    pub fn table_counts(&self) -> Result<Vec<(String, u64)>> {
        let mut counts = Vec::new();
        for table in crate::database::core::SchemaDefinitions::REQUIRED_TABLES {
            counts.push((table.to_string(), self.db.table_count(table)?));
        }
        Ok(counts)
    }
}

impl GeoDataset for GeoDatabase {
    fn find_city(&self, version: IpVersion, key: u64) -> Result<Option<CityBlock>> {
        self.city_blocks().find(version, key)
    }

    fn find_country(&self, version: IpVersion, key: u64) -> Result<Option<CountryBlock>> {
        self.country_blocks().find(version, key)
    }

    fn find_asn(&self, version: IpVersion, key: u64) -> Result<Option<AsnBlock>> {
        self.asn_blocks().find(version, key)
    }

    fn city_location(&self, geoname_id: u32, locale: &str) -> Result<Option<CityLocation>> {
        self.locations().city(geoname_id, locale)
    }

    fn country_location(&self, geoname_id: u32, locale: &str) -> Result<Option<CountryLocation>> {
        self.locations().country(geoname_id, locale)
    }
}
