//! Range block repositories for the City, Country, and ASN datasets
//!
//! Each dataset stores one row per CIDR block with inclusive integer bounds
//! in the lookup-key domain (32-bit IPv4 values, top 64 bits of IPv6
//! addresses). Bounds are stored as the two's-complement reinterpretation of
//! the unsigned key, so the repositories never compare them in SQL; lookups
//! use equality lookups on prefix-aligned starts and verify containment in Rust.
//!
//! # Longest prefix match
//!
//! The distinct prefix lengths of a table are read once per IP version. A
//! lookup walks them from most to least specific, aligns the key to each
//! length, and queries `(ip_version, prefix_length, network_start)` on the
//! lookup index. The first containing block is the most specific one.

use super::IpVersion;
use anyhow::{anyhow, Result};
use ipnet::IpNet;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;
use std::str::FromStr;
use tracing::debug;

// =============================================================================
// Records
// =============================================================================

/// Range bounds and specificity shared by every block record
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRange {
    /// CIDR text as stored in the dataset (e.g. "8.8.8.0/24")
    pub network: String,
    /// First lookup key covered (inclusive)
    pub network_start: u64,
    /// Last lookup key covered (inclusive)
    pub network_end: u64,
    /// Prefix length of the block, higher is more specific
    pub prefix_length: u8,
    pub ip_version: IpVersion,
}

impl BlockRange {
    /// Check whether the block covers the given key
    pub fn contains(&self, key: u64) -> bool {
        self.network_start <= key && key <= self.network_end
    }
}

impl FromStr for BlockRange {
    type Err = anyhow::Error;

    /// Derive the key bounds of a CIDR; host bits below the prefix are ignored
    fn from_str(cidr: &str) -> Result<Self> {
        let net: IpNet = cidr
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid network '{}': {}", cidr, e))?;
        let (start, end, version) = match net {
            IpNet::V4(n) => (
                u32::from(n.network()) as u64,
                u32::from(n.broadcast()) as u64,
                IpVersion::V4,
            ),
            IpNet::V6(n) => (
                (u128::from(n.network()) >> 64) as u64,
                (u128::from(n.broadcast()) >> 64) as u64,
                IpVersion::V6,
            ),
        };
        Ok(BlockRange {
            network: net.trunc().to_string(),
            network_start: start,
            network_end: end,
            prefix_length: net.prefix_len(),
            ip_version: version,
        })
    }
}

/// Anonymizer and routing trait flags of a geography block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockTraits {
    pub is_anonymous_proxy: Option<bool>,
    pub is_satellite_provider: Option<bool>,
    pub is_anycast: Option<bool>,
}

/// City-level geography block
#[derive(Debug, Clone, PartialEq)]
pub struct CityBlock {
    pub range: BlockRange,
    pub geoname_id: Option<u32>,
    pub registered_country_geoname_id: Option<u32>,
    pub represented_country_geoname_id: Option<u32>,
    pub traits: BlockTraits,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_radius: Option<u32>,
}

/// Country-level geography block
#[derive(Debug, Clone, PartialEq)]
pub struct CountryBlock {
    pub range: BlockRange,
    pub geoname_id: Option<u32>,
    pub registered_country_geoname_id: Option<u32>,
    pub represented_country_geoname_id: Option<u32>,
    pub traits: BlockTraits,
}

/// Autonomous system ownership block
#[derive(Debug, Clone, PartialEq)]
pub struct AsnBlock {
    pub range: BlockRange,
    pub autonomous_system_number: Option<u32>,
    pub autonomous_system_organization: Option<String>,
}

// =============================================================================
// Row mapping
// =============================================================================

/// A block record that can be read from its dataset table
pub trait BlockRecord: Sized + Clone + Send + Sync {
    /// Dataset table name
    const TABLE: &'static str;

    /// Column list selected for this record, after `rowid`
    const COLUMNS: &'static str;

    /// Build the record from a row whose column 0 is `rowid`
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn range(&self) -> &BlockRange;
}

/// Read the five range columns starting at `idx`
fn range_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<BlockRange> {
    let version: i64 = row.get(idx + 4)?;
    let ip_version = IpVersion::from_i64(version).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx + 4,
            rusqlite::types::Type::Integer,
            format!("unsupported ip_version {}", version).into(),
        )
    })?;

    Ok(BlockRange {
        network: row.get(idx)?,
        network_start: key_from_sql(row.get(idx + 1)?),
        network_end: key_from_sql(row.get(idx + 2)?),
        prefix_length: row.get(idx + 3)?,
        ip_version,
    })
}

fn traits_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<BlockTraits> {
    Ok(BlockTraits {
        is_anonymous_proxy: row.get(idx)?,
        is_satellite_provider: row.get(idx + 1)?,
        is_anycast: row.get(idx + 2)?,
    })
}

/// Read a free-form text column that some datasets store as a number
pub(crate) fn lenient_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    })
}

impl BlockRecord for CityBlock {
    const TABLE: &'static str = "city_blocks";
    const COLUMNS: &'static str = "network, network_start, network_end, prefix_length, ip_version, \
         geoname_id, registered_country_geoname_id, represented_country_geoname_id, \
         is_anonymous_proxy, is_satellite_provider, is_anycast, \
         postal_code, latitude, longitude, accuracy_radius";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CityBlock {
            range: range_from_row(row, 1)?,
            geoname_id: row.get(6)?,
            registered_country_geoname_id: row.get(7)?,
            represented_country_geoname_id: row.get(8)?,
            traits: traits_from_row(row, 9)?,
            postal_code: lenient_text(row, 12)?,
            latitude: row.get(13)?,
            longitude: row.get(14)?,
            accuracy_radius: row.get(15)?,
        })
    }

    fn range(&self) -> &BlockRange {
        &self.range
    }
}

impl BlockRecord for CountryBlock {
    const TABLE: &'static str = "country_blocks";
    const COLUMNS: &'static str = "network, network_start, network_end, prefix_length, ip_version, \
         geoname_id, registered_country_geoname_id, represented_country_geoname_id, \
         is_anonymous_proxy, is_satellite_provider, is_anycast";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CountryBlock {
            range: range_from_row(row, 1)?,
            geoname_id: row.get(6)?,
            registered_country_geoname_id: row.get(7)?,
            represented_country_geoname_id: row.get(8)?,
            traits: traits_from_row(row, 9)?,
        })
    }

    fn range(&self) -> &BlockRange {
        &self.range
    }
}

impl BlockRecord for AsnBlock {
    const TABLE: &'static str = "asn_blocks";
    const COLUMNS: &'static str = "network, network_start, network_end, prefix_length, ip_version, \
         autonomous_system_number, autonomous_system_organization";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AsnBlock {
            range: range_from_row(row, 1)?,
            autonomous_system_number: row.get(6)?,
            autonomous_system_organization: row.get(7)?,
        })
    }

    fn range(&self) -> &BlockRange {
        &self.range
    }
}

// =============================================================================
// Key helpers
// =============================================================================

/// Reinterpret an unsigned lookup key for storage in an SQLite INTEGER column
pub fn key_to_sql(key: u64) -> i64 {
    key as i64
}

/// Inverse of [`key_to_sql`]
pub fn key_from_sql(value: i64) -> u64 {
    value as u64
}

/// Align a lookup key down to the start of its enclosing block of the given
/// prefix length
///
/// IPv6 prefixes longer than 64 bits cannot be told apart in the key domain,
/// so they align to the key itself.
pub fn aligned_start(key: u64, version: IpVersion, prefix_length: u8) -> u64 {
    let width = version.key_bits();
    let significant = (prefix_length as u32).min(width);
    if significant == 0 {
        return 0;
    }
    let host_bits = width - significant;
    if host_bits == 0 {
        key
    } else {
        (key >> host_bits) << host_bits
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Cache of distinct prefix lengths per (table, version), most specific first
pub(crate) type PrefixLengthCache = RefCell<HashMap<(&'static str, IpVersion), Rc<Vec<u8>>>>;

/// Repository for one block dataset
pub struct BlockRepository<'a, T: BlockRecord> {
    conn: &'a Connection,
    prefix_lengths: &'a PrefixLengthCache,
    _record: PhantomData<T>,
}

impl<'a, T: BlockRecord> BlockRepository<'a, T> {
    pub(crate) fn new(conn: &'a Connection, prefix_lengths: &'a PrefixLengthCache) -> Self {
        Self {
            conn,
            prefix_lengths,
            _record: PhantomData,
        }
    }

    /// Distinct prefix lengths stored for a version, most specific first
    pub fn prefix_lengths(&self, version: IpVersion) -> Result<Rc<Vec<u8>>> {
        if let Some(lengths) = self.prefix_lengths.borrow().get(&(T::TABLE, version)) {
            return Ok(lengths.clone());
        }

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT DISTINCT prefix_length FROM {} WHERE ip_version = ?1 ORDER BY prefix_length DESC",
                T::TABLE
            ))
            .map_err(|e| anyhow!("Failed to prepare prefix length query on {}: {}", T::TABLE, e))?;

        let rows = stmt.query_map([version.as_i64()], |row| row.get::<_, u8>(0))?;
        let mut lengths = Vec::new();
        for row in rows {
            lengths.push(row?);
        }

        debug!(
            "{} holds {} distinct IPv{} prefix lengths",
            T::TABLE,
            lengths.len(),
            version
        );

        let lengths = Rc::new(lengths);
        self.prefix_lengths
            .borrow_mut()
            .insert((T::TABLE, version), lengths.clone());
        Ok(lengths)
    }

    /// Longest prefix match: find the most specific block covering the key
    ///
    /// Among blocks of equal prefix length sharing a start, the first loaded
    /// (lowest `rowid`) wins.
    pub fn find(&self, version: IpVersion, key: u64) -> Result<Option<T>> {
        let lengths = self.prefix_lengths(version)?;

        let mut stmt = self
            .conn
            .prepare_cached(&format!(
                "SELECT rowid, {} FROM {}
                 WHERE ip_version = ?1 AND prefix_length = ?2 AND network_start = ?3
                 ORDER BY rowid",
                T::COLUMNS,
                T::TABLE
            ))
            .map_err(|e| anyhow!("Failed to prepare lookup on {}: {}", T::TABLE, e))?;

        for &prefix_length in lengths.iter() {
            let start = aligned_start(key, version, prefix_length);
            let rows = stmt.query_map(
                params![version.as_i64(), prefix_length, key_to_sql(start)],
                T::from_row,
            )?;

            for row in rows {
                let record = row?;
                if record.range().contains(key) {
                    return Ok(Some(record));
                }
            }
        }

        Ok(None)
    }

    /// Load every block of the table in `rowid` order
    pub fn load_all(&self) -> Result<Vec<T>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT rowid, {} FROM {} ORDER BY rowid",
                T::COLUMNS,
                T::TABLE
            ))
            .map_err(|e| anyhow!("Failed to prepare scan of {}: {}", T::TABLE, e))?;

        let rows = stmt.query_map([], T::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| anyhow!("Failed to read {} row: {}", T::TABLE, e))?);
        }

        Ok(records)
    }

    /// Get the total number of blocks
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", T::TABLE), [], |row| {
                row.get(0)
            })
            .map_err(|e| anyhow!("Failed to count {}: {}", T::TABLE, e))?;
        Ok(count as u64)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::geo::fixtures::FixtureBuilder;
    use crate::database::geo::GeoDatabase;

    fn v4(ip: &str) -> u64 {
        u32::from(ip.parse::<std::net::Ipv4Addr>().unwrap()) as u64
    }

    #[test]
    fn test_range_from_cidr() {
        let range: BlockRange = "8.8.8.0/24".parse().unwrap();
        assert_eq!(range.network_start, v4("8.8.8.0"));
        assert_eq!(range.network_end, v4("8.8.8.255"));
        assert_eq!(range.prefix_length, 24);
        assert_eq!(range.ip_version, IpVersion::V4);

        // host bits are dropped
        let range: BlockRange = "10.1.2.3/8".parse().unwrap();
        assert_eq!(range.network, "10.0.0.0/8");

        let range: BlockRange = "2001:db8::/32".parse().unwrap();
        assert_eq!(range.network_start, 0x2001_0db8_0000_0000);
        assert_eq!(range.network_end, 0x2001_0db8_ffff_ffff);
        assert_eq!(range.ip_version, IpVersion::V6);

        assert!("8.8.8.8".parse::<BlockRange>().is_err());
        assert!("300.0.0.0/8".parse::<BlockRange>().is_err());
    }

    #[test]
    fn test_aligned_start_ipv4() {
        let key = v4("8.8.8.8");
        assert_eq!(aligned_start(key, IpVersion::V4, 32), key);
        assert_eq!(aligned_start(key, IpVersion::V4, 24), v4("8.8.8.0"));
        assert_eq!(aligned_start(key, IpVersion::V4, 16), v4("8.8.0.0"));
        assert_eq!(aligned_start(key, IpVersion::V4, 0), 0);
    }

    #[test]
    fn test_aligned_start_ipv6() {
        let key = 0x2001_0db8_1234_5678u64;
        assert_eq!(aligned_start(key, IpVersion::V6, 64), key);
        assert_eq!(aligned_start(key, IpVersion::V6, 128), key);
        assert_eq!(aligned_start(key, IpVersion::V6, 32), 0x2001_0db8_0000_0000);
        assert_eq!(aligned_start(key, IpVersion::V6, 1), 0);
        assert_eq!(aligned_start(u64::MAX, IpVersion::V6, 1), 1 << 63);
    }

    #[test]
    fn test_key_sql_roundtrip_high_bit() {
        let key = 0xfe80_0000_0000_0000u64;
        assert!(key_to_sql(key) < 0);
        assert_eq!(key_from_sql(key_to_sql(key)), key);
    }

    #[test]
    fn test_find_most_specific_city_block() {
        let fixture = FixtureBuilder::new()
            .city_block("10.1.0.0/16", Some(100))
            .city_block("10.1.2.0/24", Some(200))
            .city_block("10.0.0.0/8", Some(300))
            .build();
        let db = GeoDatabase::open(fixture.path()).unwrap();

        let hit = db
            .city_blocks()
            .find(IpVersion::V4, v4("10.1.2.3"))
            .unwrap()
            .unwrap();
        assert_eq!(hit.range.network, "10.1.2.0/24");
        assert_eq!(hit.range.prefix_length, 24);
        assert_eq!(hit.geoname_id, Some(200));

        let hit = db
            .city_blocks()
            .find(IpVersion::V4, v4("10.1.9.9"))
            .unwrap()
            .unwrap();
        assert_eq!(hit.range.network, "10.1.0.0/16");

        let hit = db
            .city_blocks()
            .find(IpVersion::V4, v4("10.200.0.1"))
            .unwrap()
            .unwrap();
        assert_eq!(hit.range.network, "10.0.0.0/8");

        assert!(db
            .city_blocks()
            .find(IpVersion::V4, v4("11.0.0.1"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_find_does_not_cross_versions() {
        let fixture = FixtureBuilder::new()
            .country_block("0.0.0.0/1", Some(1))
            .build();
        let db = GeoDatabase::open(fixture.path()).unwrap();

        assert!(db.country_blocks().find(IpVersion::V4, 5).unwrap().is_some());
        assert!(db.country_blocks().find(IpVersion::V6, 5).unwrap().is_none());
    }

    #[test]
    fn test_find_ipv6_high_keys() {
        let fixture = FixtureBuilder::new()
            .asn_block("fe80::/10", 64512, "LINK-LOCAL-TEST")
            .asn_block("2001:db8::/32", 64496, "DOC-NET")
            .build();
        let db = GeoDatabase::open(fixture.path()).unwrap();

        let hit = db
            .asn_blocks()
            .find(IpVersion::V6, 0xfe80_0000_0000_0001)
            .unwrap()
            .unwrap();
        assert_eq!(hit.autonomous_system_number, Some(64512));

        let hit = db
            .asn_blocks()
            .find(IpVersion::V6, 0x2001_0db8_ffff_0000)
            .unwrap()
            .unwrap();
        assert_eq!(
            hit.autonomous_system_organization.as_deref(),
            Some("DOC-NET")
        );
    }

    #[test]
    fn test_equal_prefix_tie_is_first_loaded() {
        let fixture = FixtureBuilder::new()
            .country_block("192.0.2.0/24", Some(1))
            .country_block("192.0.2.0/24", Some(2))
            .build();
        let db = GeoDatabase::open(fixture.path()).unwrap();

        for _ in 0..3 {
            let hit = db
                .country_blocks()
                .find(IpVersion::V4, v4("192.0.2.7"))
                .unwrap()
                .unwrap();
            assert_eq!(hit.geoname_id, Some(1));
        }
    }

    #[test]
    fn test_load_all_and_count() {
        let fixture = FixtureBuilder::new()
            .city_block("10.0.0.0/8", Some(1))
            .city_block("2001:db8::/32", Some(2))
            .build();
        let db = GeoDatabase::open(fixture.path()).unwrap();

        let all = db.city_blocks().load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].range.ip_version, IpVersion::V4);
        assert_eq!(all[1].range.ip_version, IpVersion::V6);
        assert_eq!(db.city_blocks().count().unwrap(), 2);
        assert_eq!(db.asn_blocks().count().unwrap(), 0);
    }
}
