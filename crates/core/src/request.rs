use std::collections::HashMap;

/// Transport-neutral view of an inbound request, as seen by credential
/// validators.
///
/// Header names are matched case-insensitively. When a header or query
/// parameter appears more than once, the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl AuthRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.into());
        self
    }

    /// Add a single query parameter.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .entry(name.into())
            .or_insert_with(|| value.into());
        self
    }

    /// Parse a raw, URL-encoded query string (without the leading `?`).
    ///
    /// Malformed query strings contribute no parameters.
    #[must_use]
    pub fn with_query(mut self, raw: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).unwrap_or_default();
        for (name, value) in pairs {
            self.query.entry(name).or_insert(value);
        }
        self
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Look up a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}
