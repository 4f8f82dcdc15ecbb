//! GeoIP lookup lens
//!
//! This module provides the `GeoLens`, the single entry point for resolving
//! an IP address against a range dataset. A lookup runs four stages:
//!
//! 1. **normalize**: text to `(IpVersion, key)` ([`normalize`])
//! 2. **find**: longest prefix match in the City, Country, and ASN datasets
//! 3. **resolve**: City tier, else Country tier, ASN alongside ([`resolve`])
//! 4. **compose**: locale join and response document ([`compose`])
//!
//! The lens works over any [`GeoDataset`], so the same code serves direct
//! SQLite lookups and in-memory snapshots.
//!
//! # Example
//!
//! ```rust,ignore
//! use geoscope::database::GeoDatabase;
//! use geoscope::lens::geoip::GeoLens;
//!
//! let db = GeoDatabase::open("~/.geoscope/WhatTimeIsIn-geoip.db")?;
//! let lens = GeoLens::new(&db);
//!
//! let doc = lens.lookup("8.8.8.8", "en")?;
//! println!("{:?}", doc.location.geo.country.name);
//! ```

mod address;
mod compose;
mod resolve;
mod types;

pub use address::normalize;
pub use compose::{compose, flag_emoji};
pub use resolve::{resolve, ResolveState};
pub use types::*;

use crate::database::GeoDataset;
use crate::lens::utils::OutputFormat;
use serde::{Deserialize, Serialize};
use tracing::debug;

// =============================================================================
// Args
// =============================================================================

/// Arguments for GeoIP lookups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct GeoLookupArgs {
    /// IP addresses to look up
    #[cfg_attr(feature = "cli", clap(required = true, value_name = "IP"))]
    pub ips: Vec<String>,

    /// Locale code for location names (e.g. en, de, ja), overrides the configured locale
    #[cfg_attr(feature = "cli", clap(short, long))]
    pub locale: Option<String>,

    /// Load the whole dataset into memory before looking up
    #[cfg_attr(feature = "cli", clap(short, long))]
    #[serde(default)]
    pub memory: bool,
}

impl GeoLookupArgs {
    /// Create new args for a single address
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ips: vec![ip.into()],
            ..Default::default()
        }
    }

    /// Add another address
    pub fn add_ip(mut self, ip: impl Into<String>) -> Self {
        self.ips.push(ip.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_memory(mut self, memory: bool) -> Self {
        self.memory = memory;
        self
    }

    /// Locale to use, falling back to the given default
    pub fn locale_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.locale.as_deref().unwrap_or(default)
    }
}

// =============================================================================
// Results
// =============================================================================

/// A failed lookup in a batch, shaped like the HTTP error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLookupFailure {
    pub status: u16,
    pub ip: String,
    pub detail: String,
}

/// Outcome of one address in a batch lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoLookupResult {
    Found(Box<GeoDocument>),
    Failed(GeoLookupFailure),
}

impl GeoLookupResult {
    pub fn is_found(&self) -> bool {
        matches!(self, GeoLookupResult::Found(_))
    }
}

/// One-line summary of a lookup for tabular output
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct GeoSummaryRow {
    pub ip: String,
    pub source: String,
    pub network: String,
    pub country: String,
    pub city: String,
    pub asn: String,
    pub organization: String,
}

impl From<&GeoLookupResult> for GeoSummaryRow {
    fn from(result: &GeoLookupResult) -> Self {
        match result {
            GeoLookupResult::Found(doc) => {
                let geo = &doc.location.geo;
                let country = match (&geo.country.flag_emoji, &geo.country.iso_code) {
                    (Some(flag), Some(iso)) => format!("{} {}", flag, iso),
                    (None, Some(iso)) => iso.clone(),
                    _ => String::new(),
                };
                GeoSummaryRow {
                    ip: doc.ip.clone(),
                    source: doc.location.source.to_string(),
                    network: doc.location.network.cidr.clone(),
                    country,
                    city: geo.city.name.clone().unwrap_or_default(),
                    asn: doc
                        .asn
                        .as_ref()
                        .and_then(|a| a.number)
                        .map(|n| n.to_string())
                        .unwrap_or_default(),
                    organization: doc
                        .asn
                        .as_ref()
                        .and_then(|a| a.organization.clone())
                        .unwrap_or_default(),
                }
            }
            GeoLookupResult::Failed(failure) => GeoSummaryRow {
                ip: failure.ip.clone(),
                source: failure.detail.clone(),
                network: String::new(),
                country: String::new(),
                city: String::new(),
                asn: String::new(),
                organization: String::new(),
            },
        }
    }
}

// =============================================================================
// Lens
// =============================================================================

/// GeoIP lookup lens over any range dataset
pub struct GeoLens<'a, D: GeoDataset + ?Sized> {
    dataset: &'a D,
}

impl<'a, D: GeoDataset + ?Sized> GeoLens<'a, D> {
    /// Create a new GeoIP lens
    pub fn new(dataset: &'a D) -> Self {
        Self { dataset }
    }

    /// Resolve one address into its response document
    pub fn lookup(&self, ip: &str, locale: &str) -> Result<GeoDocument, LookupError> {
        let (version, key) = normalize(ip)?;
        debug!("looking up {} as IPv{} key {:#x}", ip, version, key);
        let resolved = resolve(self.dataset, version, key, locale)?;
        Ok(compose(ip, &resolved))
    }

    /// Resolve every address of the args, in order
    ///
    /// Failures are reported per address; the batch itself never fails.
    pub fn lookup_all(&self, args: &GeoLookupArgs, default_locale: &str) -> Vec<GeoLookupResult> {
        let locale = args.locale_or(default_locale);
        args.ips
            .iter()
            .map(|ip| match self.lookup(ip, locale) {
                Ok(doc) => GeoLookupResult::Found(Box::new(doc)),
                Err(e) => {
                    if let LookupError::Dataset(inner) = &e {
                        tracing::warn!("lookup of {} failed: {}", ip, inner);
                    }
                    GeoLookupResult::Failed(GeoLookupFailure {
                        status: e.status_code(),
                        ip: ip.clone(),
                        detail: e.detail().to_string(),
                    })
                }
            })
            .collect()
    }

    // =========================================================================
    // Formatting
    // =========================================================================

    /// Format lookup results for display
    pub fn format_results(&self, results: &[GeoLookupResult], format: &OutputFormat) -> String {
        match format {
            OutputFormat::Json => match results {
                [single] => serde_json::to_string(single).unwrap_or_default(),
                _ => serde_json::to_string(results).unwrap_or_default(),
            },
            OutputFormat::JsonPretty => match results {
                [single] => serde_json::to_string_pretty(single).unwrap_or_default(),
                _ => serde_json::to_string_pretty(results).unwrap_or_default(),
            },
            OutputFormat::JsonLine => results
                .iter()
                .map(|r| serde_json::to_string(r).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Psv => {
                let mut lines = vec!["ip|source|network|country|city|asn|organization".to_string()];
                for row in results.iter().map(GeoSummaryRow::from) {
                    lines.push(format!(
                        "{}|{}|{}|{}|{}|{}|{}",
                        row.ip,
                        row.source,
                        row.network,
                        row.country,
                        row.city,
                        row.asn,
                        row.organization
                    ));
                }
                lines.join("\n")
            }
            OutputFormat::Table => format_detail_tables(results),
            OutputFormat::Markdown => format_summary_table(results),
        }
    }
}

/// Collapsed nested table per result
#[cfg(feature = "display")]
fn format_detail_tables(results: &[GeoLookupResult]) -> String {
    use json_to_table::json_to_table;

    results
        .iter()
        .map(|r| {
            let value = serde_json::to_value(r).unwrap_or_default();
            let mut table = json_to_table(&value);
            table.collapse();
            table.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(not(feature = "display"))]
fn format_detail_tables(results: &[GeoLookupResult]) -> String {
    serde_json::to_string_pretty(results).unwrap_or_default()
}

/// One markdown row per result
#[cfg(feature = "display")]
fn format_summary_table(results: &[GeoLookupResult]) -> String {
    use tabled::settings::Style;
    use tabled::Table;

    let rows: Vec<GeoSummaryRow> = results.iter().map(GeoSummaryRow::from).collect();
    Table::new(rows).with(Style::markdown()).to_string()
}

#[cfg(not(feature = "display"))]
fn format_summary_table(results: &[GeoLookupResult]) -> String {
    serde_json::to_string_pretty(results).unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================
