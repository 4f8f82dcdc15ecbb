//! Temporary range datasets for tests

use super::blocks::key_to_sql;
use super::{
    AsnBlock, BlockRange, BlockTraits, CityBlock, CityLocation, CountryBlock, CountryLocation,
};
use crate::database::core::{DatabaseConn, SchemaManager};
use rusqlite::params;
use tempfile::TempDir;

/// A dataset file that lives as long as the fixture
pub struct Fixture {
    _dir: TempDir,
    path: String,
}

impl Fixture {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Range bounds of a CIDR in the lookup-key domain
pub fn range_of(cidr: &str) -> BlockRange {
    cidr.parse().unwrap()
}

fn continent_of(iso: &str) -> (Option<String>, Option<String>) {
    let (code, name) = match iso {
        "US" | "CA" => ("NA", "North America"),
        "GB" | "DE" | "FR" => ("EU", "Europe"),
        "JP" | "AU" => ("AS", "Asia"),
        _ => return (None, None),
    };
    (Some(code.to_string()), Some(name.to_string()))
}

#[derive(Default)]
pub struct FixtureBuilder {
    city_blocks: Vec<CityBlock>,
    country_blocks: Vec<CountryBlock>,
    asn_blocks: Vec<AsnBlock>,
    city_locations: Vec<CityLocation>,
    country_locations: Vec<CountryLocation>,
    meta: Vec<(String, String)>,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn city_block(self, cidr: &str, geoname_id: Option<u32>) -> Self {
        self.city_block_record(CityBlock {
            range: range_of(cidr),
            geoname_id,
            registered_country_geoname_id: None,
            represented_country_geoname_id: None,
            traits: BlockTraits::default(),
            postal_code: None,
            latitude: None,
            longitude: None,
            accuracy_radius: None,
        })
    }

    pub fn city_block_record(mut self, block: CityBlock) -> Self {
        self.city_blocks.push(block);
        self
    }

    pub fn country_block(self, cidr: &str, geoname_id: Option<u32>) -> Self {
        self.country_block_record(CountryBlock {
            range: range_of(cidr),
            geoname_id,
            registered_country_geoname_id: geoname_id,
            represented_country_geoname_id: None,
            traits: BlockTraits::default(),
        })
    }

    pub fn country_block_record(mut self, block: CountryBlock) -> Self {
        self.country_blocks.push(block);
        self
    }

    pub fn asn_block(mut self, cidr: &str, number: u32, organization: &str) -> Self {
        self.asn_blocks.push(AsnBlock {
            range: range_of(cidr),
            autonomous_system_number: Some(number),
            autonomous_system_organization: Some(organization.to_string()),
        });
        self
    }

    pub fn city_location(self, geoname_id: u32, locale: &str, iso: &str, city: &str) -> Self {
        let (continent_code, continent_name) = continent_of(iso);
        self.city_location_record(CityLocation {
            geoname_id,
            locale_code: locale.to_string(),
            continent_code,
            continent_name,
            country_iso_code: Some(iso.to_string()),
            city_name: Some(city.to_string()),
            ..Default::default()
        })
    }

    pub fn city_location_record(mut self, location: CityLocation) -> Self {
        self.city_locations.push(location);
        self
    }

    pub fn country_location(
        mut self,
        geoname_id: u32,
        locale: &str,
        iso: &str,
        name: &str,
        in_eu: bool,
    ) -> Self {
        let (continent_code, continent_name) = continent_of(iso);
        self.country_locations.push(CountryLocation {
            geoname_id,
            locale_code: locale.to_string(),
            continent_code,
            continent_name,
            country_iso_code: Some(iso.to_string()),
            country_name: Some(name.to_string()),
            is_in_european_union: Some(in_eu),
        });
        self
    }

    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.meta.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("geoscope-fixture.db")
            .to_str()
            .unwrap()
            .to_string();

        let mut db = DatabaseConn::open(Some(path.as_str())).unwrap();
        SchemaManager::new(&db.conn).initialize().unwrap();
        for (key, value) in &self.meta {
            SchemaManager::new(&db.conn).set_meta(key, value).unwrap();
        }

        let tx = db.conn.transaction().unwrap();
        for b in &self.city_blocks {
            tx.execute(
                "INSERT INTO city_blocks VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    b.range.network,
                    key_to_sql(b.range.network_start),
                    key_to_sql(b.range.network_end),
                    b.range.prefix_length,
                    b.range.ip_version.as_i64(),
                    b.geoname_id,
                    b.registered_country_geoname_id,
                    b.represented_country_geoname_id,
                    b.traits.is_anonymous_proxy,
                    b.traits.is_satellite_provider,
                    b.traits.is_anycast,
                    b.postal_code,
                    b.latitude,
                    b.longitude,
                    b.accuracy_radius,
                ],
            )
            .unwrap();
        }
        for b in &self.country_blocks {
            tx.execute(
                "INSERT INTO country_blocks VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    b.range.network,
                    key_to_sql(b.range.network_start),
                    key_to_sql(b.range.network_end),
                    b.range.prefix_length,
                    b.range.ip_version.as_i64(),
                    b.geoname_id,
                    b.registered_country_geoname_id,
                    b.represented_country_geoname_id,
                    b.traits.is_anonymous_proxy,
                    b.traits.is_satellite_provider,
                    b.traits.is_anycast,
                ],
            )
            .unwrap();
        }
        for b in &self.asn_blocks {
            tx.execute(
                "INSERT INTO asn_blocks VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    b.range.network,
                    key_to_sql(b.range.network_start),
                    key_to_sql(b.range.network_end),
                    b.range.prefix_length,
                    b.range.ip_version.as_i64(),
                    b.autonomous_system_number,
                    b.autonomous_system_organization,
                ],
            )
            .unwrap();
        }
        for l in &self.city_locations {
            tx.execute(
                "INSERT INTO city_locations VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    l.geoname_id,
                    l.locale_code,
                    l.continent_code,
                    l.continent_name,
                    l.country_iso_code,
                    l.country_name,
                    l.subdivision_1_iso_code,
                    l.subdivision_1_name,
                    l.subdivision_2_iso_code,
                    l.subdivision_2_name,
                    l.city_name,
                    l.metro_code,
                    l.time_zone,
                    l.is_in_european_union,
                ],
            )
            .unwrap();
        }
        for l in &self.country_locations {
            tx.execute(
                "INSERT INTO country_locations VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    l.geoname_id,
                    l.locale_code,
                    l.continent_code,
                    l.continent_name,
                    l.country_iso_code,
                    l.country_name,
                    l.is_in_european_union,
                ],
            )
            .unwrap();
        }
        tx.commit().unwrap();
        drop(db);

        Fixture { _dir: dir, path }
    }
}
