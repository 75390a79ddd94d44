use std::collections::HashSet;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use brigade_core::{AuthRequest, Identity, Role};
use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::error::AuthError;
use crate::validator::{AuthOutcome, CredentialValidator};

/// Provider name reported on identities produced by [`ApiKeyValidator`].
pub const PROVIDER_NAME: &str = "apikey";

/// Environment variable holding the comma-separated key list.
pub const KEYS_ENV: &str = "BRIGADE_API_KEYS";

/// Environment variable holding the role granted to API-key callers.
pub const ROLE_ENV: &str = "BRIGADE_API_KEY_ROLE";

const DISPLAY_NAME: &str = "API Key User";
const SUBJECT_HASH_LEN: usize = 16;

/// Validates static API keys.
///
/// Keys are read from `Authorization: Bearer`, then `X-API-Key`, then the
/// `api_key` query parameter. The validator is enabled while at least one key
/// is configured.
pub struct ApiKeyValidator {
    keys: RwLock<HashSet<String>>,
    default_role: Role,
    validity: TimeDelta,
}

impl ApiKeyValidator {
    /// Create a validator from a set of keys. Blank keys are ignored.
    pub fn new<I, S>(keys: I, default_role: Role) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys
            .into_iter()
            .map(Into::into)
            .map(|k: String| k.trim().to_owned())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keys: RwLock::new(keys),
            default_role,
            validity: TimeDelta::hours(24),
        }
    }

    /// Build a validator from `BRIGADE_API_KEYS` and `BRIGADE_API_KEY_ROLE`.
    ///
    /// Missing variables leave the validator disabled. An unrecognised role
    /// falls back to `baker`.
    pub fn from_env() -> Self {
        let keys = std::env::var(KEYS_ENV).unwrap_or_default();
        let role = std::env::var(ROLE_ENV).ok();
        Self::new(parse_key_list(&keys), resolve_role(role.as_deref()))
    }

    /// Override the validity window granted to each authenticated request.
    #[must_use]
    pub fn with_validity(mut self, validity: TimeDelta) -> Self {
        self.validity = validity;
        self
    }

    pub fn default_role(&self) -> Role {
        self.default_role
    }

    /// Add a key while serving traffic.
    pub fn add_key(&self, key: impl Into<String>) {
        let key = key.into().trim().to_owned();
        if key.is_empty() {
            return;
        }
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        info!("API key added");
    }

    /// Remove a key while serving traffic. Removing the last key disables the
    /// validator.
    pub fn remove_key(&self, key: &str) {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        if keys.remove(key) {
            info!(remaining = keys.len(), "API key removed");
        }
    }

    pub fn key_count(&self) -> usize {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Compare `candidate` against every configured key without
    /// short-circuiting on the first match.
    fn is_valid(&self, candidate: &str) -> bool {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        keys.iter().fold(false, |found, key| {
            found | constant_time_eq(candidate.as_bytes(), key.as_bytes())
        })
    }
}

impl CredentialValidator for ApiKeyValidator {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn enabled(&self) -> bool {
        self.key_count() > 0
    }

    async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome {
        let Some(candidate) = extract_api_key(request) else {
            return AuthOutcome::Skip;
        };

        if !self.is_valid(candidate) {
            return AuthOutcome::Rejected(AuthError::InvalidApiKey);
        }

        let identity = Identity::new(
            subject_for_key(candidate),
            PROVIDER_NAME,
            self.default_role,
            Utc::now()
                .checked_add_signed(self.validity)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
        .with_display_name(DISPLAY_NAME);
        AuthOutcome::Matched(identity)
    }
}

impl fmt::Debug for ApiKeyValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyValidator")
            .field("keys", &format_args!("[{} redacted]", self.key_count()))
            .field("default_role", &self.default_role)
            .field("validity", &self.validity)
            .finish()
    }
}

/// Split a comma-separated key list, trimming whitespace and dropping blanks.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}

fn resolve_role(raw: Option<&str>) -> Role {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Role::default(),
        Some(raw) => Role::from_str_loose(raw).unwrap_or_else(|| {
            warn!(role = raw, "unknown API key role, falling back to default");
            Role::default()
        }),
    }
}

fn extract_api_key(request: &AuthRequest) -> Option<&str> {
    if let Some(token) = request
        .header("authorization")
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return (!token.is_empty()).then_some(token);
    }
    request
        .header("x-api-key")
        .filter(|k| !k.is_empty())
        .or_else(|| request.query_param("api_key").filter(|k| !k.is_empty()))
}

/// Stable subject derived from a key: `apikey:` plus the first 16 hex
/// characters of its SHA-256 digest.
pub fn subject_for_key(key: &str) -> String {
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("{PROVIDER_NAME}:{}", &digest[..SUBJECT_HASH_LEN])
}

/// Length-aware constant-time byte comparison.
///
/// Equal-length inputs are compared in time independent of their contents.
/// Inputs of different lengths compare unequal.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
