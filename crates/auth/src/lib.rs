//! Credential validation for Brigade.
//!
//! An [`AuthChain`] holds an ordered list of credential validators and runs
//! them against each inbound request. Every validator answers with an
//! [`AuthOutcome`]: it either recognised and accepted a credential, found no
//! credential of its kind, or found one that is invalid. The first definitive
//! answer ends the chain.

pub mod api_key;
pub mod chain;
pub mod error;
pub mod service_token;
pub mod validator;

pub use api_key::ApiKeyValidator;
pub use chain::AuthChain;
pub use error::{AuthError, TokenError};
pub use service_token::{ServiceTokenValidator, generate_service_token};
pub use validator::{AuthOutcome, CredentialValidator, DynCredentialValidator};
