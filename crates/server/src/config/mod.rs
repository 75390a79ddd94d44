mod auth;
mod server;
mod telemetry;


pub use auth::*;
pub use server::*;
pub use telemetry::*;

use std::path::Path;

use brigade_notify::NotifyConfig;
use serde::Deserialize;

use crate::error::ServerError;

pub const API_KEYS_ENV: &str = "BRIGADE_API_KEYS";
pub const API_KEY_ROLE_ENV: &str = "BRIGADE_API_KEY_ROLE";
pub const SA_SECRET_ENV: &str = "BRIGADE_SA_SECRET";
pub const REQUIRE_AUTH_ENV: &str = "BRIGADE_REQUIRE_AUTH";
pub const HOST_ENV: &str = "BRIGADE_HOST";
pub const PORT_ENV: &str = "BRIGADE_PORT";

/// Top-level configuration for the Brigade server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct BrigadeConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Credential validators and the anonymous-access policy.
    #[serde(default)]
    pub auth: AuthChainConfig,
    /// Outbound notification dispatch.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Log output.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl BrigadeConfig {
    /// Read `path` if it exists, otherwise fall back to defaults.
    ///
    /// Returns the config and whether the file was found.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, bool), ServerError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok((Self::default(), false));
        }
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Ok((config, true))
    }

    /// Overlay the `BRIGADE_*` environment variables on the loaded file.
    ///
    /// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(API_KEYS_ENV) {
            self.auth.api_keys = brigade_auth::api_key::parse_key_list(&raw);
        }
        if let Some(role) = lookup(API_KEY_ROLE_ENV)
            && !role.trim().is_empty()
        {
            self.auth.api_key_role = role.trim().to_owned();
        }
        if let Some(secret) = lookup(SA_SECRET_ENV) {
            self.auth.service_account_secret = Some(secret).filter(|s| !s.is_empty());
        }
        if let Some(flag) = lookup(REQUIRE_AUTH_ENV) {
            self.auth.require_auth = flag == "true";
        }
        if let Some(host) = lookup(HOST_ENV)
            && !host.is_empty()
        {
            self.server.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| ServerError::Config(format!("invalid {PORT_ENV} {port:?}: {e}")))?;
        }
        Ok(())
    }
}
