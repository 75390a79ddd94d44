use std::sync::Arc;

use brigade_core::AuthRequest;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::validator::{AuthOutcome, CredentialValidator, DynCredentialValidator};

/// Ordered sequence of credential validators.
///
/// Registration order defines priority. Validators can be registered while
/// requests are being authenticated; each call to [`authenticate`] works on a
/// snapshot taken when it starts.
///
/// [`authenticate`]: AuthChain::authenticate
#[derive(Default)]
pub struct AuthChain {
    validators: RwLock<Vec<Arc<dyn DynCredentialValidator>>>,
}

impl AuthChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator to the end of the chain.
    pub async fn register(&self, validator: Arc<dyn DynCredentialValidator>) {
        info!(
            provider = validator.name(),
            enabled = validator.enabled(),
            "registered credential validator"
        );
        self.validators.write().await.push(validator);
    }

    /// Convenience wrapper around [`register`](Self::register) for concrete
    /// validator types.
    pub async fn register_validator<V>(&self, validator: V)
    where
        V: CredentialValidator + 'static,
    {
        self.register(Arc::new(validator)).await;
    }

    /// Run the chain against a request.
    ///
    /// Disabled validators are skipped. The first `Matched` or `Rejected`
    /// outcome is returned as-is. If every enabled validator skips, the
    /// result is `Skip`, meaning the caller is anonymous.
    pub async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome {
        let snapshot = self.validators.read().await.clone();

        for validator in snapshot {
            if !validator.enabled() {
                continue;
            }
            match validator.authenticate(request).await {
                AuthOutcome::Skip => {}
                AuthOutcome::Matched(identity) => {
                    debug!(
                        provider = validator.name(),
                        subject = %identity.subject,
                        role = %identity.role,
                        "request authenticated"
                    );
                    return AuthOutcome::Matched(identity);
                }
                AuthOutcome::Rejected(err) => {
                    debug!(provider = validator.name(), error = %err, "credential rejected");
                    return AuthOutcome::Rejected(err);
                }
            }
        }

        AuthOutcome::Skip
    }

    /// Names of the registered validators, in registration order.
    pub async fn validator_names(&self) -> Vec<String> {
        self.validators
            .read()
            .await
            .iter()
            .map(|v| v.name().to_owned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.validators.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.validators.read().await.is_empty()
    }
}

impl std::fmt::Debug for AuthChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthChain").finish_non_exhaustive()
    }
}
