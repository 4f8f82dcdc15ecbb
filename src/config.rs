use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Prefix of environment variables overriding the configuration file
pub const ENV_PREFIX: &str = "GEOIP";

pub const DEFAULT_LOCALE: &str = "en";
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5022;
pub const DEFAULT_DB_FILE: &str = "WhatTimeIsIn-geoip.db";

#[derive(Debug, Clone, Serialize)]
pub struct GeoscopeConfig {
    /// Path to the range dataset (SQLite)
    pub db_path: String,

    /// Default locale for location names
    pub locale: String,

    /// HTTP API bind address
    pub address: String,

    /// HTTP API port
    pub port: u16,

    /// Configuration file the settings were read from
    pub config_file: String,
}

const EMPTY_CONFIG: &str = r#"### geoscope configuration file
### every setting can be overridden with a GEOIP_* environment variable

### path to the range dataset (GEOIP_DB_PATH)
# db_path = "~/.geoscope/WhatTimeIsIn-geoip.db"

### default locale for location names (GEOIP_LOCALE)
# locale = "en"

### HTTP API listener (GEOIP_ADDRESS, GEOIP_PORT)
# address = "0.0.0.0"
# port = 5022
"#;

fn home_dir() -> String {
    dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("{}/{}", home_dir(), rest),
        None => path.to_string(),
    }
}

impl Default for GeoscopeConfig {
    fn default() -> Self {
        let geoscope_dir = format!("{}/.geoscope", home_dir());
        Self {
            db_path: format!("{}/{}", geoscope_dir, DEFAULT_DB_FILE),
            locale: DEFAULT_LOCALE.to_string(),
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            config_file: format!("{}/geoscope.toml", geoscope_dir),
        }
    }
}

impl GeoscopeConfig {
    /// Function to create and initialize a new configuration
    ///
    /// Reads the TOML file at `path` (by default `~/.geoscope/geoscope.toml`,
    /// created with commented defaults when missing), then `GEOIP_*`
    /// environment variables.
    pub fn new(path: &Option<String>) -> Result<GeoscopeConfig> {
        let config_file = match path {
            Some(p) => p.clone(),
            None => {
                let geoscope_dir = format!("{}/.geoscope", home_dir());
                std::fs::create_dir_all(geoscope_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create geoscope directory: {}", e))?;
                format!("{}/geoscope.toml", geoscope_dir)
            }
        };

        if !Path::new(config_file.as_str()).exists() {
            std::fs::write(config_file.as_str(), EMPTY_CONFIG).map_err(|e| {
                anyhow!("Unable to create config file {}: {}", config_file.as_str(), e)
            })?;
        }

        Self::load(&config_file, ENV_PREFIX)
    }

    /// Build the configuration from an existing file and an environment prefix
    fn load(config_file: &str, env_prefix: &str) -> Result<GeoscopeConfig> {
        let settings = Config::builder()
            .add_source(config::File::new(config_file, config::FileFormat::Toml).required(false))
            // E.g., `GEOIP_PORT=8080 geoscope serve` would set the listener port
            .add_source(config::Environment::with_prefix(env_prefix))
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let values = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_values(&values, config_file)
    }

    fn from_values(values: &HashMap<String, String>, config_file: &str) -> Result<GeoscopeConfig> {
        let defaults = GeoscopeConfig::default();

        let db_path = match values.get("db_path").filter(|p| !p.trim().is_empty()) {
            Some(p) => expand_home(p.trim()),
            None => defaults.db_path,
        };

        let locale = values
            .get("locale")
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or(defaults.locale);

        let address = values
            .get("address")
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or(defaults.address);

        let port = match values.get("port") {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow!("Invalid port '{}' in configuration", p))?,
            None => defaults.port,
        };

        Ok(GeoscopeConfig {
            db_path,
            locale,
            address,
            port,
            config_file: config_file.to_string(),
        })
    }

    /// Socket address string for the HTTP API
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Config File:   {}", self.config_file),
            format!("Database:      {}", self.db_path),
            format!("Locale:        {}", self.locale),
            format!("Listen:        {}", self.bind_address()),
        ]
        .join("\n")
    }
}

// =============================================================================
// Dataset info (used by the status command)
// =============================================================================

/// Row count of a dataset table
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub table: String,
    pub rows: u64,
}

/// Information about the configured range dataset
#[derive(Debug, Serialize, Clone)]
pub struct DatasetInfo {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<TableInfo>,
    /// Locales with city location names
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locales: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_indexes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Get range dataset information
///
/// Never fails; problems opening the dataset are reported in `error`.
pub fn get_dataset_info(config: &GeoscopeConfig) -> DatasetInfo {
    use crate::database::{DatabaseConn, GeoDatabase, SchemaManager};

    let path = config.db_path.clone();
    let exists = Path::new(&path).exists();
    let mut info = DatasetInfo {
        size_bytes: if exists {
            std::fs::metadata(&path).ok().map(|m| m.len())
        } else {
            None
        },
        path,
        exists,
        schema: "missing".to_string(),
        dataset_version: None,
        tables: vec![],
        locales: vec![],
        missing_indexes: vec![],
        error: None,
    };

    if !exists {
        return info;
    }

    match DatabaseConn::open_read_only(&info.path) {
        Ok(conn) => {
            let schema = SchemaManager::new(&conn.conn);
            match schema.check_status() {
                Ok(status) => info.schema = status.to_string(),
                Err(e) => info.error = Some(e.to_string()),
            }
            info.missing_indexes = schema.missing_indexes().unwrap_or_default();
        }
        Err(e) => {
            info.error = Some(e.to_string());
            return info;
        }
    }

    match GeoDatabase::open(&info.path) {
        Ok(db) => {
            info.dataset_version = db.dataset_version().ok().flatten();
            match db.table_counts() {
                Ok(counts) => {
                    info.tables = counts
                        .into_iter()
                        .map(|(table, rows)| TableInfo { table, rows })
                        .collect()
                }
                Err(e) => info.error = Some(e.to_string()),
            }
            match db.locations().locales() {
                Ok(locales) => info.locales = locales,
                Err(e) => info.error = Some(e.to_string()),
            }
        }
        Err(e) => {
            if info.error.is_none() {
                info.error = Some(e.to_string());
            }
        }
    }

    info
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
