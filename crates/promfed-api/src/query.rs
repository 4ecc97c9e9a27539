use axum::{extract::Query, http::Uri};

use promfed_prometheus::FamilyFilter;

use crate::ApiError;

const METRIC_KEY: &str = "metric[]";
const SOURCE_ID_KEY: &str = "source_id[]";

/// Build the scrape filter from the request query string.
///
/// A key that appears at all enables its filter, even with no usable value.
/// Malformed percent escapes and `;` separators are rejected.
pub fn parse_filter(uri: &Uri) -> Result<FamilyFilter, ApiError> {
    let Some(raw) = uri.query() else {
        return Ok(FamilyFilter::default());
    };
    validate(raw)?;

    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|e| ApiError::InvalidRequest(e.body_text()))?;

    let mut filter = FamilyFilter::default();
    for (key, value) in pairs {
        match key.as_str() {
            METRIC_KEY => filter = filter.with_metrics([value]),
            SOURCE_ID_KEY => filter = filter.with_source_ids([value]),
            _ => {}
        }
    }
    Ok(filter)
}

fn validate(raw: &str) -> Result<(), ApiError> {
    if raw.contains(';') {
        return Err(ApiError::InvalidRequest("invalid semicolon separator in query".into()));
    }

    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                let end = (i + 3).min(bytes.len());
                let shown = String::from_utf8_lossy(&bytes[i..end]);
                return Err(ApiError::InvalidRequest(format!("invalid URL escape \"{shown}\"")));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
