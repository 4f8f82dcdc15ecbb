//! Composition of a resolved lookup into the response document

use super::types::{
    AsnSection, City, Continent, Coordinates, Country, GeoDocument, GeoSection, GeoSource,
    Geography, LocationSection, NetworkSection, ResolvedLookup, Subdivision, Traits,
    LOOKUP_MESSAGE,
};
use crate::database::{AsnBlock, BlockRange, BlockTraits};

/// Build the response document for a resolved lookup
///
/// Country-tier results carry no subdivisions, city, time zone,
/// coordinates, or postal code. Missing location data yields null fields.
pub fn compose(ip: &str, lookup: &ResolvedLookup) -> GeoDocument {
    let location = match &lookup.geography {
        Geography::City { block, location } => {
            let loc = location.as_ref();
            let iso_code = loc.and_then(|l| l.country_iso_code.clone());
            LocationSection {
                source: GeoSource::City,
                network: network_section(&block.range),
                geo: GeoSection {
                    continent: Continent {
                        code: loc.and_then(|l| l.continent_code.clone()),
                        name: loc.and_then(|l| l.continent_name.clone()),
                    },
                    country: Country {
                        flag_emoji: flag_emoji(iso_code.as_deref()),
                        iso_code,
                        name: loc.and_then(|l| l.country_name.clone()),
                        is_in_european_union: loc.and_then(|l| l.is_in_european_union),
                    },
                    subdivision_1: Subdivision {
                        iso_code: loc.and_then(|l| l.subdivision_1_iso_code.clone()),
                        name: loc.and_then(|l| l.subdivision_1_name.clone()),
                    },
                    subdivision_2: Subdivision {
                        iso_code: loc.and_then(|l| l.subdivision_2_iso_code.clone()),
                        name: loc.and_then(|l| l.subdivision_2_name.clone()),
                    },
                    city: City {
                        name: loc.and_then(|l| l.city_name.clone()),
                        metro_code: loc.and_then(|l| l.metro_code.clone()),
                    },
                    time_zone: loc.and_then(|l| l.time_zone.clone()),
                },
                coordinates: Coordinates {
                    latitude: block.latitude,
                    longitude: block.longitude,
                    accuracy_radius: block.accuracy_radius,
                },
                postal_code: block.postal_code.clone(),
                traits: traits(&block.traits),
                geoname_id: block.geoname_id,
                registered_country_geoname_id: block.registered_country_geoname_id,
                represented_country_geoname_id: block.represented_country_geoname_id,
            }
        }
        Geography::Country { block, location } => {
            let loc = location.as_ref();
            let iso_code = loc.and_then(|l| l.country_iso_code.clone());
            LocationSection {
                source: GeoSource::Country,
                network: network_section(&block.range),
                geo: GeoSection {
                    continent: Continent {
                        code: loc.and_then(|l| l.continent_code.clone()),
                        name: loc.and_then(|l| l.continent_name.clone()),
                    },
                    country: Country {
                        flag_emoji: flag_emoji(iso_code.as_deref()),
                        iso_code,
                        name: loc.and_then(|l| l.country_name.clone()),
                        is_in_european_union: loc.and_then(|l| l.is_in_european_union),
                    },
                    ..Default::default()
                },
                coordinates: Coordinates::default(),
                postal_code: None,
                traits: traits(&block.traits),
                geoname_id: block.geoname_id,
                registered_country_geoname_id: block.registered_country_geoname_id,
                represented_country_geoname_id: block.represented_country_geoname_id,
            }
        }
    };

    GeoDocument {
        status: 200,
        ip: ip.to_string(),
        ip_version: lookup.version,
        location,
        asn: lookup.asn.as_ref().map(asn_section),
        message: LOOKUP_MESSAGE.to_string(),
    }
}

fn network_section(range: &BlockRange) -> NetworkSection {
    NetworkSection {
        cidr: range.network.clone(),
        prefix_length: range.prefix_length,
        ip_version: range.ip_version,
    }
}

fn traits(flags: &BlockTraits) -> Traits {
    Traits {
        is_anonymous_proxy: flags.is_anonymous_proxy.unwrap_or(false),
        is_satellite_provider: flags.is_satellite_provider.unwrap_or(false),
        is_anycast: flags.is_anycast.unwrap_or(false),
    }
}

fn asn_section(block: &AsnBlock) -> AsnSection {
    AsnSection {
        network: network_section(&block.range),
        number: block.autonomous_system_number,
        organization: block.autonomous_system_organization.clone(),
    }
}

/// Regional indicator pair for a two-letter country code
///
/// Anything other than exactly two ASCII letters yields `None`.
pub fn flag_emoji(iso_code: Option<&str>) -> Option<String> {
    let code = iso_code?.as_bytes();
    if code.len() != 2 || !code.iter().all(u8::is_ascii_alphabetic) {
        return None;
    }
    code.iter()
        .map(|b| char::from_u32(0x1F1E6 + (b.to_ascii_uppercase() - b'A') as u32))
        .collect()
}
