//! Lens module
//!
//! This module provides high-level "lens" abstractions that combine business logic
//! with output formatting. Lenses are designed to be reusable across different
//! interfaces (CLI and HTTP API).
//!
//! # Architecture
//!
//! Each lens module exports:
//! - A **Lens struct** (`GeoLens`) - the main entry point for all operations
//! - **Args structs** - input arguments for lens methods
//! - **Output types** - return types and the response document
//!
//! # Usage
//!
//! ```rust,ignore
//! use geoscope::lens::geoip::{GeoLens, GeoLookupArgs, GeoDocument};
//! use geoscope::lens::utils::OutputFormat;
//! ```

pub mod utils;

// GeoLens - range resolution into response documents
pub mod geoip;
