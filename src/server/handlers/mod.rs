//! HTTP handlers
//!
//! - `lookup` - address resolution (`GET /lookup`)
//! - `system` - health check and unknown routes

pub mod lookup;
pub mod system;

pub use lookup::{lookup_handler, IP_PARAM, LOCALE_PARAM};
pub use system::{fallback_handler, health_handler};
