//! Tiered resolution across the City, Country, and ASN datasets

use super::types::{Geography, LookupError, ResolvedLookup};
use crate::database::{AsnBlock, GeoDataset, IpVersion};
use tracing::debug;

/// Progress of a single resolution
#[derive(Debug)]
pub enum ResolveState {
    Unresolved,
    /// ASN tier queried; its result is carried forward regardless of outcome
    AsnChecked { asn: Option<AsnBlock> },
    CityFound(ResolvedLookup),
    CountryFound(ResolvedLookup),
    /// No geography tier covers the address
    Exhausted,
}

/// Resolve a normalized key against all tiers
///
/// The ASN tier is queried independently. Geography comes from the City
/// tier, or the Country tier when no City block covers the key. A key with
/// no geography is `NotFound` even if an ASN block covers it.
pub fn resolve<D: GeoDataset + ?Sized>(
    dataset: &D,
    version: IpVersion,
    key: u64,
    locale: &str,
) -> Result<ResolvedLookup, LookupError> {
    let mut state = ResolveState::Unresolved;

    loop {
        state = match state {
            ResolveState::Unresolved => ResolveState::AsnChecked {
                asn: dataset.find_asn(version, key)?,
            },
            ResolveState::AsnChecked { asn } => step_geography(dataset, version, key, locale, asn)?,
            ResolveState::CityFound(lookup) | ResolveState::CountryFound(lookup) => {
                debug!(
                    "resolved IPv{} key {:#x} with asn={}",
                    version,
                    key,
                    lookup.asn.is_some()
                );
                return Ok(lookup);
            }
            ResolveState::Exhausted => {
                debug!("IPv{} key {:#x} not covered by any tier", version, key);
                return Err(LookupError::NotFound);
            }
        };
    }
}

fn step_geography<D: GeoDataset + ?Sized>(
    dataset: &D,
    version: IpVersion,
    key: u64,
    locale: &str,
    asn: Option<AsnBlock>,
) -> Result<ResolveState, LookupError> {
    if let Some(block) = dataset.find_city(version, key)? {
        let location = match block.geoname_id {
            Some(id) => dataset.city_location(id, locale)?,
            None => None,
        };
        return Ok(ResolveState::CityFound(ResolvedLookup {
            version,
            geography: Geography::City { block, location },
            asn,
        }));
    }

    if let Some(block) = dataset.find_country(version, key)? {
        let location = match block.geoname_id {
            Some(id) => dataset.country_location(id, locale)?,
            None => None,
        };
        return Ok(ResolveState::CountryFound(ResolvedLookup {
            version,
            geography: Geography::Country { block, location },
            asn,
        }));
    }

    Ok(ResolveState::Exhausted)
}
