use async_trait::async_trait;
use brigade_core::{AuthRequest, Identity};

use crate::error::AuthError;

/// What a single validator concluded about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A credential of this validator's kind was present and valid.
    Matched(Identity),

    /// No credential of this validator's kind was present.
    Skip,

    /// A credential of this validator's kind was present but invalid.
    Rejected(AuthError),
}

impl AuthOutcome {
    /// Collapse the outcome into the `Result<Option<_>>` shape used at
    /// request boundaries. `Skip` becomes `Ok(None)` (anonymous).
    pub fn into_result(self) -> Result<Option<Identity>, AuthError> {
        match self {
            Self::Matched(identity) => Ok(Some(identity)),
            Self::Skip => Ok(None),
            Self::Rejected(err) => Err(err),
        }
    }

    /// Returns the identity if the outcome is a match.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Matched(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl From<AuthError> for AuthOutcome {
    fn from(err: AuthError) -> Self {
        Self::Rejected(err)
    }
}

/// A pluggable credential strategy with native `async fn`.
///
/// Not object-safe. Register validators with an [`AuthChain`](crate::AuthChain)
/// through [`DynCredentialValidator`], which every implementor gets for free.
pub trait CredentialValidator: Send + Sync {
    /// Stable name of the strategy, copied into [`Identity::provider`].
    fn name(&self) -> &str;

    /// Disabled validators are skipped by the chain. May change at runtime.
    fn enabled(&self) -> bool;

    /// Inspect the request for a credential of this validator's kind.
    fn authenticate(
        &self,
        request: &AuthRequest,
    ) -> impl std::future::Future<Output = AuthOutcome> + Send;
}

/// Object-safe counterpart of [`CredentialValidator`], for use behind
/// `Arc<dyn DynCredentialValidator>`.
#[async_trait]
pub trait DynCredentialValidator: Send + Sync {
    fn name(&self) -> &str;

    fn enabled(&self) -> bool;

    async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome;
}

#[async_trait]
impl<T: CredentialValidator + Sync> DynCredentialValidator for T {
    fn name(&self) -> &str {
        CredentialValidator::name(self)
    }

    fn enabled(&self) -> bool {
        CredentialValidator::enabled(self)
    }

    async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome {
        CredentialValidator::authenticate(self, request).await
    }
}
