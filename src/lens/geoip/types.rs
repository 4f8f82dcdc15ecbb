//! Types for the GeoIP lens

use crate::database::{AsnBlock, CityBlock, CityLocation, CountryBlock, CountryLocation, IpVersion};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Informational notice attached to every successful lookup
pub const LOOKUP_MESSAGE: &str = "If you are using this solution, please reference the main project at https://whattimeis.in. This helps us keep the project actively maintained with new blocks and updates.";

// =============================================================================
// Errors
// =============================================================================

/// Outcome taxonomy of a failed lookup
#[derive(Debug)]
pub enum LookupError {
    /// The input is not an IPv4 or IPv6 literal
    InvalidAddress(String),
    /// Neither the City nor the Country tier covers the address
    NotFound,
    /// The dataset could not be read
    Dataset(anyhow::Error),
}

impl LookupError {
    /// HTTP status code of the error
    pub fn status_code(&self) -> u16 {
        match self {
            LookupError::InvalidAddress(_) => 400,
            LookupError::NotFound => 404,
            LookupError::Dataset(_) => 500,
        }
    }

    /// Client-facing detail message
    pub fn detail(&self) -> &'static str {
        match self {
            LookupError::InvalidAddress(_) => "Invalid IP address",
            LookupError::NotFound => "IP not found in ranges",
            LookupError::Dataset(_) => "Database query failed",
        }
    }
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::InvalidAddress(input) => write!(f, "invalid IP address '{}'", input),
            LookupError::NotFound => write!(f, "IP not found in ranges"),
            LookupError::Dataset(e) => write!(f, "dataset query failed: {}", e),
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LookupError::Dataset(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for LookupError {
    fn from(e: anyhow::Error) -> Self {
        LookupError::Dataset(e)
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Geography matched by the first tier that covered the address
#[derive(Debug, Clone, PartialEq)]
pub enum Geography {
    City {
        block: CityBlock,
        location: Option<CityLocation>,
    },
    Country {
        block: CountryBlock,
        location: Option<CountryLocation>,
    },
}

/// Result of a successful tiered resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLookup {
    pub version: IpVersion,
    pub geography: Geography,
    pub asn: Option<AsnBlock>,
}

// =============================================================================
// Document
// =============================================================================

/// Tier that produced the location section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoSource {
    City,
    Country,
}

impl Display for GeoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoSource::City => write!(f, "city"),
            GeoSource::Country => write!(f, "country"),
        }
    }
}

/// Response document of a successful lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoDocument {
    pub status: u16,
    /// The address exactly as given
    pub ip: String,
    pub ip_version: IpVersion,
    pub location: LocationSection,
    pub asn: Option<AsnSection>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSection {
    pub source: GeoSource,
    pub network: NetworkSection,
    pub geo: GeoSection,
    pub coordinates: Coordinates,
    pub postal_code: Option<String>,
    pub traits: Traits,
    pub geoname_id: Option<u32>,
    pub registered_country_geoname_id: Option<u32>,
    pub represented_country_geoname_id: Option<u32>,
}

/// CIDR descriptor of a matched block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSection {
    pub cidr: String,
    pub prefix_length: u8,
    pub ip_version: IpVersion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoSection {
    pub continent: Continent,
    pub country: Country,
    pub subdivision_1: Subdivision,
    pub subdivision_2: Subdivision,
    pub city: City,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Continent {
    pub code: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub iso_code: Option<String>,
    pub name: Option<String>,
    pub flag_emoji: Option<String>,
    pub is_in_european_union: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subdivision {
    pub iso_code: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: Option<String>,
    pub metro_code: Option<String>,
}

/// Present only for City-tier results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_radius: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traits {
    pub is_anonymous_proxy: bool,
    pub is_satellite_provider: bool,
    pub is_anycast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsnSection {
    pub network: NetworkSection,
    pub number: Option<u32>,
    pub organization: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let invalid = LookupError::InvalidAddress("256.1.1.1".to_string());
        assert_eq!(invalid.status_code(), 400);
        assert_eq!(invalid.detail(), "Invalid IP address");
        assert_eq!(invalid.to_string(), "invalid IP address '256.1.1.1'");

        assert_eq!(LookupError::NotFound.status_code(), 404);
        assert_eq!(LookupError::NotFound.detail(), "IP not found in ranges");

        let dataset = LookupError::from(anyhow::anyhow!("disk I/O error"));
        assert_eq!(dataset.status_code(), 500);
        assert_eq!(dataset.detail(), "Database query failed");
        assert!(std::error::Error::source(&dataset).is_some());
    }

    #[test]
    fn test_source_serialization() {
        assert_eq!(serde_json::to_string(&GeoSource::City).unwrap(), "\"city\"");
        assert_eq!(GeoSource::Country.to_string(), "country");
    }
}
