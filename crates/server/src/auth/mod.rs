pub mod kitchen;
pub mod middleware;

use std::sync::Arc;

use brigade_auth::{ApiKeyValidator, AuthChain, ServiceTokenValidator};
use brigade_core::Identity;

use crate::config::AuthChainConfig;

pub use kitchen::{DEFAULT_KITCHEN, KITCHEN_HEADER, KITCHEN_QUERY_PARAM, extract_kitchen};
pub use middleware::{AuthLayer, AuthMiddleware, is_public_path};

/// Per-request caller context inserted by [`AuthMiddleware`].
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The authenticated caller, if any credential matched.
    pub identity: Option<Identity>,
    /// The kitchen the request operates on.
    pub kitchen: String,
}

/// Build the validator chain: API keys first, then service tokens.
///
/// Validators with no configured credentials are still registered so the
/// chain reports them; they report themselves disabled and are skipped.
pub async fn build_chain(config: &AuthChainConfig) -> Arc<AuthChain> {
    let chain = AuthChain::new();
    chain
        .register_validator(ApiKeyValidator::new(
            config.api_keys.iter().cloned(),
            config.api_key_role(),
        ))
        .await;
    chain
        .register_validator(ServiceTokenValidator::new(
            config.service_account_secret.as_deref().unwrap_or_default(),
        ))
        .await;
    Arc::new(chain)
}
