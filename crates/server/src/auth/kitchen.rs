use axum::http::HeaderMap;
use brigade_core::AuthRequest;

pub const KITCHEN_HEADER: &str = "x-kitchen";
pub const KITCHEN_QUERY_PARAM: &str = "kitchen";
pub const DEFAULT_KITCHEN: &str = "default";

/// Resolve the kitchen a request targets.
///
/// The `X-Kitchen` header wins over the `kitchen` query parameter. Both are
/// trimmed and ignored when blank. Falls back to `default`.
pub fn extract_kitchen(headers: &HeaderMap, query: Option<&str>) -> String {
    let from_header = headers
        .get(KITCHEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(kitchen) = from_header {
        return kitchen.to_owned();
    }

    let params = AuthRequest::new().with_query(query.unwrap_or_default());
    params
        .query_param(KITCHEN_QUERY_PARAM)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_KITCHEN)
        .to_owned()
}
