use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use brigade_core::{AuthRequest, Identity, Role};
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{AuthError, TokenError};
use crate::validator::{AuthOutcome, CredentialValidator};

type HmacSha256 = Hmac<Sha256>;

/// Provider name reported on identities produced by [`ServiceTokenValidator`].
pub const PROVIDER_NAME: &str = "service_account";

/// Header carrying the signed token.
pub const TOKEN_HEADER: &str = "x-service-token";

/// Environment variable holding the signing secret.
pub const SECRET_ENV: &str = "BRIGADE_SA_SECRET";

const SUBJECT_PREFIX: &str = "svc:";

/// Identity lifetime, in hours, for tokens that carry no expiry.
const UNBOUNDED_TOKEN_WINDOW_HOURS: i64 = 24;

/// Claims carried in a service token payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    sub: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    kitchen: String,
    #[serde(default)]
    role: String,
    /// Unix seconds. Zero means the token never expires.
    #[serde(default)]
    exp: i64,
}

/// Validates HMAC-SHA256 signed service tokens presented in the
/// `X-Service-Token` header.
///
/// Token format: `base64url(payload_json) "." base64url(hmac(payload_b64))`,
/// both segments unpadded. The signature covers the encoded payload segment,
/// not the decoded JSON.
#[derive(Clone)]
pub struct ServiceTokenValidator {
    mac: Option<HmacSha256>,
    default_role: Role,
}

impl ServiceTokenValidator {
    /// Create a validator keyed with `secret`. An empty secret leaves it
    /// disabled.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            mac: keyed_mac(secret.as_ref()),
            default_role: Role::default(),
        }
    }

    /// Build a validator from `BRIGADE_SA_SECRET`.
    pub fn from_env() -> Self {
        Self::new(std::env::var(SECRET_ENV).unwrap_or_default())
    }

    /// Role granted when a token's `role` claim is empty.
    #[must_use]
    pub fn with_default_role(mut self, role: Role) -> Self {
        self.default_role = role;
        self
    }

    /// Validate a raw token as of `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let mac = self.mac.as_ref().ok_or(TokenError::SignatureMismatch)?;

        let (payload_b64, signature_b64) =
            token.rsplit_once('.').ok_or(TokenError::Malformed)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::SignatureEncoding)?;
        let mut mac = mac.clone();
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::SignatureMismatch)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::PayloadEncoding)?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::PayloadJson)?;

        if claims.exp > 0 && now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.sub.is_empty() {
            return Err(TokenError::MissingSubject);
        }
        let role = if claims.role.trim().is_empty() {
            self.default_role
        } else {
            Role::from_str_loose(&claims.role).ok_or(TokenError::UnknownRole(claims.role))?
        };

        let unbounded = now
            .checked_add_signed(TimeDelta::hours(UNBOUNDED_TOKEN_WINDOW_HOURS))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let expires_at = if claims.exp > 0 {
            DateTime::from_timestamp(claims.exp, 0).unwrap_or(unbounded)
        } else {
            unbounded
        };

        Ok(Identity::new(
            format!("{SUBJECT_PREFIX}{}", claims.sub),
            PROVIDER_NAME,
            role,
            expires_at,
        )
        .with_display_name(claims.sub)
        .with_tenant_scope(claims.kitchen))
    }

    /// Validate a raw token against the current time.
    pub fn validate(&self, token: &str) -> Result<Identity, TokenError> {
        self.validate_at(token, Utc::now())
    }
}

impl CredentialValidator for ServiceTokenValidator {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn enabled(&self) -> bool {
        self.mac.is_some()
    }

    async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome {
        match request.header(TOKEN_HEADER).filter(|t| !t.is_empty()) {
            None => AuthOutcome::Skip,
            Some(token) => match self.validate(token) {
                Ok(identity) => AuthOutcome::Matched(identity),
                Err(err) => AuthOutcome::Rejected(AuthError::from(err)),
            },
        }
    }
}

impl fmt::Debug for ServiceTokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTokenValidator")
            .field("secret", &self.mac.as_ref().map(|_| "[REDACTED]"))
            .field("default_role", &self.default_role)
            .finish()
    }
}

/// Issue a signed service token that [`ServiceTokenValidator`] accepts.
///
/// Meant for trusted issuers (CLI tooling, tests); the server never mints
/// tokens itself.
pub fn generate_service_token(
    secret: impl AsRef<[u8]>,
    subject: &str,
    kitchen: &str,
    role: Role,
    ttl: TimeDelta,
) -> Result<String, TokenError> {
    let expires_at = Utc::now()
        .checked_add_signed(ttl)
        .ok_or(TokenError::InvalidExpiry)?;
    generate_service_token_at(secret.as_ref(), subject, kitchen, role, expires_at)
}

fn generate_service_token_at(
    secret: &[u8],
    subject: &str,
    kitchen: &str,
    role: Role,
    expires_at: DateTime<Utc>,
) -> Result<String, TokenError> {
    let mut mac = keyed_mac(secret).ok_or(TokenError::InvalidSecret)?;

    let claims = TokenClaims {
        sub: subject.to_owned(),
        kitchen: kitchen.to_owned(),
        role: role.as_str().to_owned(),
        exp: expires_at.timestamp(),
    };
    let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::PayloadJson)?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload);

    mac.update(payload_b64.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{payload_b64}.{signature_b64}"))
}

fn keyed_mac(secret: &[u8]) -> Option<HmacSha256> {
    if secret.is_empty() {
        return None;
    }
    HmacSha256::new_from_slice(secret).ok()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const SECRET: &[u8] = b"kitchen-secret";

    fn validator() -> ServiceTokenValidator {
        ServiceTokenValidator::new(SECRET)
    }

    fn sign_raw(payload_json: &str) -> String {
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
        let mut mac = keyed_mac(SECRET).unwrap();
        mac.update(payload_b64.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{payload_b64}.{sig}")
    }

    #[test]
    fn round_trip() {
        let token =
            generate_service_token(SECRET, "ci-pipeline", "pastry", Role::Chef, TimeDelta::hours(1))
                .unwrap();
        let identity = validator().validate(&token).unwrap();
        assert_eq!(identity.subject, "svc:ci-pipeline");
        assert_eq!(identity.display_name.as_deref(), Some("ci-pipeline"));
        assert_eq!(identity.provider, "service_account");
        assert_eq!(identity.tenant_scope.as_deref(), Some("pastry"));
        assert_eq!(identity.role, Role::Chef);
    }

    #[test]
    fn expiry_boundary() {
        let exp = Utc::now() + TimeDelta::minutes(5);
        let token = generate_service_token_at(SECRET, "ci", "", Role::Baker, exp).unwrap();
        let exp = DateTime::from_timestamp(exp.timestamp(), 0).unwrap();

        let identity = validator().validate_at(&token, exp).unwrap();
        assert_eq!(identity.expires_at, exp);
        assert!(identity.tenant_scope.is_none());

        let err = validator()
            .validate_at(&token, exp + TimeDelta::seconds(1))
            .unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn zero_exp_never_expires() {
        let token = sign_raw(r#"{"sub":"cron","role":"viewer","exp":0}"#);
        let far_future = Utc::now() + TimeDelta::days(3650);
        let identity = validator().validate_at(&token, far_future).unwrap();
        assert_eq!(identity.role, Role::Viewer);
        assert!(identity.expires_at > far_future);
    }

    #[test]
    fn validation_errors_in_order() {
        let v = validator();
        assert_eq!(v.validate("no-separator").unwrap_err(), TokenError::Malformed);
        assert_eq!(
            v.validate("payload.!!!").unwrap_err(),
            TokenError::SignatureEncoding
        );
        assert_eq!(
            v.validate("payload.c2lnbmF0dXJl").unwrap_err(),
            TokenError::SignatureMismatch
        );

        // Correctly signed, but the payload segment is not valid base64url.
        let bad_b64 = "not*base64";
        let mut mac = keyed_mac(SECRET).unwrap();
        mac.update(bad_b64.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        assert_eq!(
            v.validate(&format!("{bad_b64}.{sig}")).unwrap_err(),
            TokenError::PayloadEncoding
        );

        assert_eq!(
            v.validate(&sign_raw("not json")).unwrap_err(),
            TokenError::PayloadJson
        );
        assert_eq!(
            v.validate(&sign_raw(r#"{"sub":"","role":"baker","exp":0}"#))
                .unwrap_err(),
            TokenError::MissingSubject
        );
        assert_eq!(
            v.validate(&sign_raw(r#"{"sub":"x","role":"pirate","exp":0}"#))
                .unwrap_err(),
            TokenError::UnknownRole("pirate".into())
        );
    }

    #[test]
    fn expiry_checked_before_subject() {
        let token = sign_raw(r#"{"sub":"","role":"baker","exp":1}"#);
        assert_eq!(validator().validate(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn empty_role_uses_default() {
        let token = sign_raw(r#"{"sub":"ci","exp":0}"#);
        assert_eq!(validator().validate(&token).unwrap().role, Role::Baker);

        let v = validator().with_default_role(Role::Viewer);
        assert_eq!(v.validate(&token).unwrap().role, Role::Viewer);
    }

    #[test]
    fn wrong_secret_is_mismatch() {
        let token =
            generate_service_token(b"other", "ci", "", Role::Baker, TimeDelta::hours(1)).unwrap();
        assert_eq!(
            validator().validate(&token).unwrap_err(),
            TokenError::SignatureMismatch
        );
    }

    #[test]
    fn out_of_range_ttl_is_an_error() {
        for ttl in [TimeDelta::MAX, TimeDelta::MIN] {
            assert_eq!(
                generate_service_token(SECRET, "ci", "", Role::Baker, ttl).unwrap_err(),
                TokenError::InvalidExpiry
            );
        }
    }

    #[test]
    fn unbounded_window_saturates_near_max_time() {
        let token = sign_raw(r#"{"sub":"cron","role":"viewer","exp":0}"#);
        let now = DateTime::<Utc>::MAX_UTC - TimeDelta::minutes(1);
        let identity = validator().validate_at(&token, now).unwrap();
        assert_eq!(identity.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn empty_secret_disables_and_refuses_to_sign() {
        let v = ServiceTokenValidator::new("");
        assert!(!v.enabled());
        assert_eq!(
            generate_service_token("", "ci", "", Role::Baker, TimeDelta::hours(1)).unwrap_err(),
            TokenError::InvalidSecret
        );
    }

    #[tokio::test]
    async fn authenticate_reads_header() {
        let v = validator();
        assert_eq!(v.authenticate(&AuthRequest::new()).await, AuthOutcome::Skip);

        let token =
            generate_service_token(SECRET, "ci", "pastry", Role::Baker, TimeDelta::hours(1))
                .unwrap();
        let outcome = v
            .authenticate(&AuthRequest::new().with_header("X-Service-Token", token))
            .await;
        assert_eq!(
            outcome.identity().map(|i| i.subject.as_str()),
            Some("svc:ci")
        );

        let outcome = v
            .authenticate(&AuthRequest::new().with_header("X-Service-Token", "garbage"))
            .await;
        assert_eq!(
            outcome,
            AuthOutcome::Rejected(AuthError::InvalidServiceToken(TokenError::Malformed))
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", validator());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("kitchen-secret"));
    }

    proptest! {
        #[test]
        fn flipping_any_signature_bit_is_rejected(byte in 0usize..32, bit in 0u8..8) {
            let token = generate_service_token(
                SECRET, "ci", "pastry", Role::Baker, TimeDelta::hours(1),
            ).unwrap();
            let (payload, sig) = token.rsplit_once('.').unwrap();
            let mut raw = URL_SAFE_NO_PAD.decode(sig).unwrap();
            raw[byte] ^= 1 << bit;
            let tampered = format!("{payload}.{}", URL_SAFE_NO_PAD.encode(raw));
            prop_assert_eq!(
                validator().validate(&tampered).unwrap_err(),
                TokenError::SignatureMismatch
            );
        }

        #[test]
        fn round_trip_preserves_claims(
            subject in "[a-z][a-z0-9-]{0,23}",
            kitchen in "[a-z]{0,12}",
            role in prop_oneof![
                Just(Role::Admin), Just(Role::Chef), Just(Role::Baker),
                Just(Role::Auditor), Just(Role::Finance), Just(Role::Viewer),
            ],
        ) {
            let token = generate_service_token(
                SECRET, &subject, &kitchen, role, TimeDelta::minutes(10),
            ).unwrap();
            let identity = validator().validate(&token).unwrap();
            prop_assert_eq!(identity.subject, format!("svc:{subject}"));
            prop_assert_eq!(identity.role, role);
            prop_assert_eq!(identity.tenant_scope, (!kitchen.is_empty()).then_some(kitchen));
        }
    }
}
