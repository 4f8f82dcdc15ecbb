//! Address normalization into the lookup-key domain

use super::types::LookupError;
use crate::database::IpVersion;
use std::net::IpAddr;

/// Convert textual address into `(version, key)`
///
/// IPv4 keys are the 32-bit address value. IPv6 keys are the top 64 bits of
/// the address; the dataset stores IPv6 boundaries at that granularity.
/// IPv4-mapped IPv6 literals stay IPv6. The text must be a bare literal,
/// surrounding whitespace included makes it invalid.
pub fn normalize(text: &str) -> Result<(IpVersion, u64), LookupError> {
    let addr: IpAddr = text
        .parse()
        .map_err(|_| LookupError::InvalidAddress(text.to_string()))?;

    Ok(match addr {
        IpAddr::V4(v4) => (IpVersion::V4, u32::from(v4) as u64),
        IpAddr::V6(v6) => (IpVersion::V6, (u128::from(v6) >> 64) as u64),
    })
}
