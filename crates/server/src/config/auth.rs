use std::fmt;

use brigade_core::Role;
use serde::Deserialize;
use tracing::warn;

/// The `[auth]` table.
///
/// ```toml
/// [auth]
/// require_auth = true
/// api_keys = ["k-one", "k-two"]
/// api_key_role = "chef"
/// service_account_secret = "..."
/// ```
#[derive(Clone, Deserialize)]
pub struct AuthChainConfig {
    /// Reject anonymous requests on non-public paths.
    #[serde(default)]
    pub require_auth: bool,
    /// Static API keys. Empty disables the API-key validator.
    #[serde(default)]
    pub api_keys: Vec<String>,
    /// Role granted to API-key callers.
    #[serde(default = "default_api_key_role")]
    pub api_key_role: String,
    /// HMAC secret for service tokens. Unset disables the token validator.
    #[serde(default)]
    pub service_account_secret: Option<String>,
    /// Realm advertised in `WWW-Authenticate`.
    #[serde(default = "default_realm")]
    pub realm: String,
}

impl Default for AuthChainConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            api_keys: Vec::new(),
            api_key_role: default_api_key_role(),
            service_account_secret: None,
            realm: default_realm(),
        }
    }
}

impl AuthChainConfig {
    /// The configured API-key role, or `baker` if it does not parse.
    pub fn api_key_role(&self) -> Role {
        Role::from_str_loose(&self.api_key_role).unwrap_or_else(|| {
            warn!(role = %self.api_key_role, "unknown api_key_role, using baker");
            Role::Baker
        })
    }
}

impl fmt::Debug for AuthChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthChainConfig")
            .field("require_auth", &self.require_auth)
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .field("api_key_role", &self.api_key_role)
            .field(
                "service_account_secret",
                &self.service_account_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("realm", &self.realm)
            .finish()
    }
}

fn default_api_key_role() -> String {
    "baker".to_owned()
}

fn default_realm() -> String {
    "brigade".to_owned()
}
