//! Database schema management
//!
//! This module provides the schema definitions of a range dataset and the
//! checks used to verify that an externally provisioned dataset can be served.
//! All tables are defined here to ensure consistency between the repositories
//! that read them and the fixtures that build them.

use anyhow::{anyhow, Result};
use rusqlite::Connection;

/// Schema definitions for all tables in a range dataset
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// SQL for creating the optional meta table (dataset version and build metadata)
    pub const META_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS geoscope_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// SQL for creating the city range table
    pub const CITY_BLOCKS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS city_blocks (
            network TEXT NOT NULL,
            network_start INTEGER NOT NULL,
            network_end INTEGER NOT NULL,
            prefix_length INTEGER NOT NULL,
            ip_version INTEGER NOT NULL,
            geoname_id INTEGER,
            registered_country_geoname_id INTEGER,
            represented_country_geoname_id INTEGER,
            is_anonymous_proxy INTEGER,
            is_satellite_provider INTEGER,
            is_anycast INTEGER,
            postal_code TEXT,
            latitude REAL,
            longitude REAL,
            accuracy_radius INTEGER
        );
    "#;

    /// SQL for creating the country range table
    pub const COUNTRY_BLOCKS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS country_blocks (
            network TEXT NOT NULL,
            network_start INTEGER NOT NULL,
            network_end INTEGER NOT NULL,
            prefix_length INTEGER NOT NULL,
            ip_version INTEGER NOT NULL,
            geoname_id INTEGER,
            registered_country_geoname_id INTEGER,
            represented_country_geoname_id INTEGER,
            is_anonymous_proxy INTEGER,
            is_satellite_provider INTEGER,
            is_anycast INTEGER
        );
    "#;

    /// SQL for creating the ASN range table
    pub const ASN_BLOCKS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS asn_blocks (
            network TEXT NOT NULL,
            network_start INTEGER NOT NULL,
            network_end INTEGER NOT NULL,
            prefix_length INTEGER NOT NULL,
            ip_version INTEGER NOT NULL,
            autonomous_system_number INTEGER,
            autonomous_system_organization TEXT
        );
    "#;

    /// SQL for creating the city location table
    pub const CITY_LOCATIONS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS city_locations (
            geoname_id INTEGER NOT NULL,
            locale_code TEXT NOT NULL,
            continent_code TEXT,
            continent_name TEXT,
            country_iso_code TEXT,
            country_name TEXT,
            subdivision_1_iso_code TEXT,
            subdivision_1_name TEXT,
            subdivision_2_iso_code TEXT,
            subdivision_2_name TEXT,
            city_name TEXT,
            metro_code TEXT,
            time_zone TEXT,
            is_in_european_union INTEGER,
            PRIMARY KEY (geoname_id, locale_code)
        );
    "#;

    /// SQL for creating the country location table
    pub const COUNTRY_LOCATIONS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS country_locations (
            geoname_id INTEGER NOT NULL,
            locale_code TEXT NOT NULL,
            continent_code TEXT,
            continent_name TEXT,
            country_iso_code TEXT,
            country_name TEXT,
            is_in_european_union INTEGER,
            PRIMARY KEY (geoname_id, locale_code)
        );
    "#;

    /// Indexes backing the prefix-aligned point lookups of the block repositories
    pub const LOOKUP_INDEXES: &'static [(&'static str, &'static str)] = &[
        (
            "idx_city_blocks_lookup",
            "CREATE INDEX IF NOT EXISTS idx_city_blocks_lookup ON city_blocks(ip_version, prefix_length, network_start)",
        ),
        (
            "idx_country_blocks_lookup",
            "CREATE INDEX IF NOT EXISTS idx_country_blocks_lookup ON country_blocks(ip_version, prefix_length, network_start)",
        ),
        (
            "idx_asn_blocks_lookup",
            "CREATE INDEX IF NOT EXISTS idx_asn_blocks_lookup ON asn_blocks(ip_version, prefix_length, network_start)",
        ),
    ];

    /// Tables a dataset must provide to be served
    pub const REQUIRED_TABLES: &'static [&'static str] = &[
        "city_blocks",
        "country_blocks",
        "asn_blocks",
        "city_locations",
        "country_locations",
    ];
}

/// Schema manager for a range dataset
///
/// Handles schema verification of provisioned datasets and creation of
/// fixture datasets.
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Initialize the dataset schema
    ///
    /// Creates all tables and lookup indexes if they don't exist. Only used to
    /// build fixture datasets; served datasets are opened read-only.
    pub fn initialize(&self) -> Result<()> {
        let tables = [
            ("geoscope_meta", SchemaDefinitions::META_TABLE),
            ("city_blocks", SchemaDefinitions::CITY_BLOCKS_TABLE),
            ("country_blocks", SchemaDefinitions::COUNTRY_BLOCKS_TABLE),
            ("asn_blocks", SchemaDefinitions::ASN_BLOCKS_TABLE),
            ("city_locations", SchemaDefinitions::CITY_LOCATIONS_TABLE),
            ("country_locations", SchemaDefinitions::COUNTRY_LOCATIONS_TABLE),
        ];

        for (name, sql) in tables {
            self.conn
                .execute(sql, [])
                .map_err(|e| anyhow!("Failed to create {} table: {}", name, e))?;
        }

        for (_, index_sql) in SchemaDefinitions::LOOKUP_INDEXES {
            self.conn
                .execute(index_sql, [])
                .map_err(|e| anyhow!("Failed to create lookup index: {}", e))?;
        }

        Ok(())
    }

    /// Check the current schema status
    pub fn check_status(&self) -> Result<SchemaStatus> {
        let missing = self.missing_tables()?;

        if missing.len() == SchemaDefinitions::REQUIRED_TABLES.len() {
            Ok(SchemaStatus::NotInitialized)
        } else if missing.is_empty() {
            Ok(SchemaStatus::Current)
        } else {
            Ok(SchemaStatus::Incomplete { missing })
        }
    }

    /// List required tables that are absent from the dataset
    pub fn missing_tables(&self) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for table in SchemaDefinitions::REQUIRED_TABLES {
            if !self.object_exists("table", table)? {
                missing.push(table.to_string());
            }
        }
        Ok(missing)
    }

    /// List lookup indexes that are absent from the dataset
    ///
    /// Lookups still work without them, but fall back to table scans.
    pub fn missing_indexes(&self) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for (name, _) in SchemaDefinitions::LOOKUP_INDEXES {
            if !self.object_exists("index", name)? {
                missing.push(name.to_string());
            }
        }
        Ok(missing)
    }

    fn object_exists(&self, kind: &str, name: &str) -> Result<bool> {
        let exists: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type=?1 AND name=?2",
                [kind, name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check {} '{}': {}", kind, name, e))?;
        Ok(exists > 0)
    }

    /// Set a metadata value
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO geoscope_meta (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))",
                [key, value],
            )
            .map_err(|e| anyhow!("Failed to set meta value: {}", e))?;
        Ok(())
    }

    /// Get a metadata value
    ///
    /// Datasets built without a meta table simply have no metadata.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        if !self.object_exists("table", "geoscope_meta")? {
            return Ok(None);
        }

        let result: Result<String, _> = self.conn.query_row(
            "SELECT value FROM geoscope_meta WHERE key = ?1",
            [key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!("Failed to get meta value: {}", e)),
        }
    }
}

/// Status of the dataset schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// None of the dataset tables exist
    NotInitialized,

    /// All required tables exist
    Current,

    /// Some required tables are missing
    Incomplete { missing: Vec<String> },
}

impl std::fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaStatus::NotInitialized => write!(f, "not initialized"),
            SchemaStatus::Current => write!(f, "current"),
            SchemaStatus::Incomplete { missing } => {
                write!(f, "incomplete (missing: {})", missing.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_not_initialized() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = SchemaManager::new(&conn);

        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
    }

    #[test]
    fn test_schema_initialize() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();

        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
        assert!(manager.missing_indexes().unwrap().is_empty());
    }

    #[test]
    fn test_schema_incomplete() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(SchemaDefinitions::CITY_BLOCKS_TABLE, [])
            .unwrap();
        let manager = SchemaManager::new(&conn);

        match manager.check_status().unwrap() {
            SchemaStatus::Incomplete { missing } => {
                assert_eq!(missing.len(), 4);
                assert!(missing.contains(&"asn_blocks".to_string()));
                assert!(!missing.contains(&"city_blocks".to_string()));
            }
            other => panic!("unexpected status: {:?}", other),
        }
        assert_eq!(manager.missing_indexes().unwrap().len(), 3);
    }

    #[test]
    fn test_meta_operations() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = SchemaManager::new(&conn);

        // No meta table yet
        assert_eq!(manager.get_meta("dataset_version").unwrap(), None);

        manager.initialize().unwrap();
        manager.set_meta("dataset_version", "2026-10-01").unwrap();
        assert_eq!(
            manager.get_meta("dataset_version").unwrap(),
            Some("2026-10-01".to_string())
        );
        assert_eq!(manager.get_meta("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SchemaStatus::Current.to_string(), "current");
        assert_eq!(
            SchemaStatus::Incomplete {
                missing: vec!["asn_blocks".to_string()]
            }
            .to_string(),
            "incomplete (missing: asn_blocks)"
        );
    }
}
