//! Address lookup handler

use crate::lens::geoip::{GeoDocument, GeoLens};
use crate::server::handler::{ApiError, ApiResult};
use crate::server::ServerState;
use axum::extract::{Query, State};
use axum::response::Json;
use std::collections::HashMap;

/// Query parameter holding the address
pub const IP_PARAM: &str = "ip";

/// Query parameter overriding the default locale
pub const LOCALE_PARAM: &str = "locale";

/// `GET /lookup?ip=<addr>[&locale=<code>]`
///
/// Parameters are read from a plain map so that malformed or missing values
/// produce the API's own error bodies instead of extractor rejections.
pub async fn lookup_handler(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<GeoDocument>> {
    let ip = match params.get(IP_PARAM) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(ApiError::bad_request("Missing ip parameter")),
    };

    let locale = params
        .get(LOCALE_PARAM)
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .unwrap_or(state.config.locale.as_str());

    let snapshot = state.store.current();
    let doc = GeoLens::new(snapshot.as_ref()).lookup(ip, locale)?;
    Ok(Json(doc))
}
