//! Immutable in-memory snapshot of a range dataset
//!
//! A [`GeoSnapshot`] is loaded once from a [`GeoDatabase`] and answers
//! lookups without touching SQLite. The [`SnapshotStore`] lets a running
//! server swap in a freshly loaded snapshot while in-flight requests keep
//! using the one they started with.

use super::blocks::{AsnBlock, CityBlock, CountryBlock};
use super::locations::{CityLocation, CountryLocation};
use super::range_index::RangeIndex;
use super::{GeoDatabase, GeoDataset, IpVersion};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Locations grouped by locale, then geoname id
type LocaleTable<T> = HashMap<String, HashMap<u32, T>>;

/// Summary of a loaded snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub source: String,
    pub dataset_version: Option<String>,
    pub loaded_at: DateTime<Utc>,
    pub city_blocks: usize,
    pub country_blocks: usize,
    pub asn_blocks: usize,
    pub city_locations: usize,
    pub country_locations: usize,
}

/// Fully materialized dataset for concurrent lookups
pub struct GeoSnapshot {
    city: RangeIndex<CityBlock>,
    country: RangeIndex<CountryBlock>,
    asn: RangeIndex<AsnBlock>,
    city_locations: LocaleTable<CityLocation>,
    country_locations: LocaleTable<CountryLocation>,
    info: SnapshotInfo,
}

impl GeoSnapshot {
    /// Load every table of the dataset into memory
    pub fn load(db: &GeoDatabase) -> Result<Self> {
        let city_rows = db.city_blocks().load_all()?;
        let country_rows = db.country_blocks().load_all()?;
        let asn_rows = db.asn_blocks().load_all()?;
        let city_location_rows = db.locations().load_all_cities()?;
        let country_location_rows = db.locations().load_all_countries()?;

        let info = SnapshotInfo {
            source: db.path().to_string(),
            dataset_version: db.dataset_version()?,
            loaded_at: Utc::now(),
            city_blocks: city_rows.len(),
            country_blocks: country_rows.len(),
            asn_blocks: asn_rows.len(),
            city_locations: city_location_rows.len(),
            country_locations: country_location_rows.len(),
        };

        let (city, (country, asn)) = rayon::join(
            || RangeIndex::build(city_rows),
            || {
                rayon::join(
                    || RangeIndex::build(country_rows),
                    || RangeIndex::build(asn_rows),
                )
            },
        );

        let mut city_locations: LocaleTable<CityLocation> = HashMap::new();
        for location in city_location_rows {
            city_locations
                .entry(location.locale_code.clone())
                .or_default()
                .insert(location.geoname_id, location);
        }

        let mut country_locations: LocaleTable<CountryLocation> = HashMap::new();
        for location in country_location_rows {
            country_locations
                .entry(location.locale_code.clone())
                .or_default()
                .insert(location.geoname_id, location);
        }

        info!(
            "Loaded snapshot of {}: {} city, {} country, {} ASN blocks",
            info.source, info.city_blocks, info.country_blocks, info.asn_blocks
        );

        Ok(Self {
            city,
            country,
            asn,
            city_locations,
            country_locations,
            info,
        })
    }

    /// Open the dataset at `path` and load it
    pub fn load_from_path(path: &str) -> Result<Self> {
        let db = GeoDatabase::open(path)?;
        Self::load(&db)
    }

    pub fn info(&self) -> &SnapshotInfo {
        &self.info
    }
}

impl GeoDataset for GeoSnapshot {
    fn find_city(&self, version: IpVersion, key: u64) -> Result<Option<CityBlock>> {
        Ok(self.city.find(version, key).cloned())
    }

    fn find_country(&self, version: IpVersion, key: u64) -> Result<Option<CountryBlock>> {
        Ok(self.country.find(version, key).cloned())
    }

    fn find_asn(&self, version: IpVersion, key: u64) -> Result<Option<AsnBlock>> {
        Ok(self.asn.find(version, key).cloned())
    }

    fn city_location(&self, geoname_id: u32, locale: &str) -> Result<Option<CityLocation>> {
        Ok(self
            .city_locations
            .get(locale)
            .and_then(|by_id| by_id.get(&geoname_id))
            .cloned())
    }

    fn country_location(&self, geoname_id: u32, locale: &str) -> Result<Option<CountryLocation>> {
        Ok(self
            .country_locations
            .get(locale)
            .and_then(|by_id| by_id.get(&geoname_id))
            .cloned())
    }
}

/// Shared holder of the current snapshot
pub struct SnapshotStore {
    current: RwLock<Arc<GeoSnapshot>>,
}

impl SnapshotStore {
    pub fn new(snapshot: GeoSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot new lookups should use
    pub fn current(&self) -> Arc<GeoSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the current snapshot, returning the previous one
    pub fn replace(&self, snapshot: GeoSnapshot) -> Arc<GeoSnapshot> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }

    /// Reload from `path` and swap on success
    ///
    /// On failure the current snapshot stays in place.
    pub fn reload_from_path(&self, path: &str) -> Result<SnapshotInfo> {
        let snapshot = GeoSnapshot::load_from_path(path)?;
        let info = snapshot.info().clone();
        self.replace(snapshot);
        Ok(info)
    }
}
