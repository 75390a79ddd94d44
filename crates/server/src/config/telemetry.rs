use serde::Deserialize;

/// The `[telemetry]` table.
///
/// `RUST_LOG` takes precedence over `filter` when set.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Emit one JSON object per log line instead of human-readable text.
    #[serde(default)]
    pub json: bool,
    /// Default `EnvFilter` directive.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_owned()
}
