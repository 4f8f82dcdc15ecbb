//! Localized location records referenced by geography blocks
//!
//! Locations are keyed by `(geoname_id, locale_code)`. A block whose
//! geoname has no row for the requested locale resolves without names.

use super::blocks::lenient_text;
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, Row};

/// Localized city-level location
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityLocation {
    pub geoname_id: u32,
    pub locale_code: String,
    pub continent_code: Option<String>,
    pub continent_name: Option<String>,
    pub country_iso_code: Option<String>,
    pub country_name: Option<String>,
    pub subdivision_1_iso_code: Option<String>,
    pub subdivision_1_name: Option<String>,
    pub subdivision_2_iso_code: Option<String>,
    pub subdivision_2_name: Option<String>,
    pub city_name: Option<String>,
    pub metro_code: Option<String>,
    pub time_zone: Option<String>,
    pub is_in_european_union: Option<bool>,
}

/// Localized country-level location
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryLocation {
    pub geoname_id: u32,
    pub locale_code: String,
    pub continent_code: Option<String>,
    pub continent_name: Option<String>,
    pub country_iso_code: Option<String>,
    pub country_name: Option<String>,
    pub is_in_european_union: Option<bool>,
}

const CITY_COLUMNS: &str = "geoname_id, locale_code, continent_code, continent_name, \
     country_iso_code, country_name, subdivision_1_iso_code, subdivision_1_name, \
     subdivision_2_iso_code, subdivision_2_name, city_name, metro_code, time_zone, \
     is_in_european_union";

const COUNTRY_COLUMNS: &str = "geoname_id, locale_code, continent_code, continent_name, \
     country_iso_code, country_name, is_in_european_union";

impl CityLocation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CityLocation {
            geoname_id: row.get(0)?,
            locale_code: row.get(1)?,
            continent_code: row.get(2)?,
            continent_name: row.get(3)?,
            country_iso_code: row.get(4)?,
            country_name: row.get(5)?,
            subdivision_1_iso_code: row.get(6)?,
            subdivision_1_name: row.get(7)?,
            subdivision_2_iso_code: row.get(8)?,
            subdivision_2_name: row.get(9)?,
            city_name: row.get(10)?,
            metro_code: lenient_text(row, 11)?,
            time_zone: row.get(12)?,
            is_in_european_union: row.get(13)?,
        })
    }
}

impl CountryLocation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CountryLocation {
            geoname_id: row.get(0)?,
            locale_code: row.get(1)?,
            continent_code: row.get(2)?,
            continent_name: row.get(3)?,
            country_iso_code: row.get(4)?,
            country_name: row.get(5)?,
            is_in_european_union: row.get(6)?,
        })
    }
}

/// Repository for location lookups
pub struct LocationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LocationRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn city(&self, geoname_id: u32, locale: &str) -> Result<Option<CityLocation>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!(
                "SELECT {} FROM city_locations WHERE geoname_id = ?1 AND locale_code = ?2",
                CITY_COLUMNS
            ))
            .map_err(|e| anyhow!("Failed to prepare city location query: {}", e))?;

        let mut rows = stmt.query_map(params![geoname_id, locale], CityLocation::from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(|e| {
                anyhow!("Failed to read city location {}: {}", geoname_id, e)
            })?)),
            None => Ok(None),
        }
    }

    pub fn country(&self, geoname_id: u32, locale: &str) -> Result<Option<CountryLocation>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!(
                "SELECT {} FROM country_locations WHERE geoname_id = ?1 AND locale_code = ?2",
                COUNTRY_COLUMNS
            ))
            .map_err(|e| anyhow!("Failed to prepare country location query: {}", e))?;

        let mut rows = stmt.query_map(params![geoname_id, locale], CountryLocation::from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(|e| {
                anyhow!("Failed to read country location {}: {}", geoname_id, e)
            })?)),
            None => Ok(None),
        }
    }

    /// Load every city location, all locales
    pub fn load_all_cities(&self) -> Result<Vec<CityLocation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM city_locations", CITY_COLUMNS))
            .map_err(|e| anyhow!("Failed to prepare city location scan: {}", e))?;

        let rows = stmt.query_map([], CityLocation::from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read city locations: {}", e))
    }

    /// Load every country location, all locales
    pub fn load_all_countries(&self) -> Result<Vec<CountryLocation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM country_locations", COUNTRY_COLUMNS))
            .map_err(|e| anyhow!("Failed to prepare country location scan: {}", e))?;

        let rows = stmt.query_map([], CountryLocation::from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read country locations: {}", e))
    }

    /// Distinct locale codes present in the city location table
    pub fn locales(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT locale_code FROM city_locations ORDER BY locale_code")
            .map_err(|e| anyhow!("Failed to prepare locale query: {}", e))?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read locales: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use crate::database::geo::fixtures::FixtureBuilder;
    use crate::database::geo::GeoDatabase;

    #[test]
    fn test_city_location_by_locale() {
        let fixture = FixtureBuilder::new()
            .city_location(2643743, "en", "GB", "London")
            .city_location(2643743, "de", "GB", "London")
            .build();
        let db = GeoDatabase::open(fixture.path()).unwrap();

        let london = db.locations().city(2643743, "en").unwrap().unwrap();
        assert_eq!(london.city_name.as_deref(), Some("London"));
        assert_eq!(london.country_iso_code.as_deref(), Some("GB"));
        assert_eq!(london.locale_code, "en");

        assert!(db.locations().city(2643743, "fr").unwrap().is_none());
        assert!(db.locations().city(1, "en").unwrap().is_none());
    }

    #[test]
    fn test_country_location() {
        let fixture = FixtureBuilder::new()
            .country_location(2921044, "en", "DE", "Germany", true)
            .build();
        let db = GeoDatabase::open(fixture.path()).unwrap();

        let germany = db.locations().country(2921044, "en").unwrap().unwrap();
        assert_eq!(germany.country_name.as_deref(), Some("Germany"));
        assert_eq!(germany.is_in_european_union, Some(true));
        assert_eq!(germany.continent_code.as_deref(), Some("EU"));
    }

    #[test]
    fn test_load_all_and_locales() {
        let fixture = FixtureBuilder::new()
            .city_location(1, "en", "US", "Austin")
            .city_location(1, "es", "US", "Austin")
            .city_location(2, "en", "US", "Dallas")
            .country_location(6252001, "en", "US", "United States", false)
            .build();
        let db = GeoDatabase::open(fixture.path()).unwrap();

        assert_eq!(db.locations().load_all_cities().unwrap().len(), 3);
        assert_eq!(db.locations().load_all_countries().unwrap().len(), 1);
        assert_eq!(db.locations().locales().unwrap(), vec!["en", "es"]);
    }
}
