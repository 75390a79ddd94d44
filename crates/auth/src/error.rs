use thiserror::Error;

/// Reasons a presented credential was rejected.
///
/// Returning any of these from a validator rejects the whole request; the
/// chain never falls through to the next validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// An API key was presented but matches no configured key.
    #[error("invalid API key")]
    InvalidApiKey,

    /// A service token was presented but failed validation.
    #[error("invalid service account token: {0}")]
    InvalidServiceToken(#[from] TokenError),

    /// A validator outside this crate rejected the credential.
    #[error("{provider}: {reason}")]
    Rejected { provider: String, reason: String },
}

impl AuthError {
    /// Short machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidApiKey => "invalid_api_key",
            Self::InvalidServiceToken(TokenError::Expired) => "token_expired",
            Self::InvalidServiceToken(_) => "invalid_token",
            Self::Rejected { .. } => "credential_rejected",
        }
    }
}

/// Signed service token failures.
///
/// Validation failures are listed in the order they are checked. The last
/// two variants are only raised when issuing a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token: expected payload.signature")]
    Malformed,

    #[error("invalid signature encoding")]
    SignatureEncoding,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("invalid payload encoding")]
    PayloadEncoding,

    #[error("invalid payload JSON")]
    PayloadJson,

    #[error("token expired")]
    Expired,

    #[error("missing subject")]
    MissingSubject,

    #[error("invalid payload: unknown role {0:?}")]
    UnknownRole(String),

    /// Raised when issuing a token whose expiry is out of range.
    #[error("token expiry out of range")]
    InvalidExpiry,

    /// Raised when issuing a token with an unusable signing secret.
    #[error("invalid signing secret")]
    InvalidSecret,
}
