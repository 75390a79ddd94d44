//! Notification dispatch for Brigade.
//!
//! [`NotificationService`] delivers lifecycle events to MCP tools over a
//! JSON-RPC `tools/call` request and to notification channels through
//! pluggable [`ChannelDriver`]s. A signing webhook driver is registered by
//! default. Deliveries retry with linear backoff and every target produces
//! its own [`NotifyResult`](brigade_core::NotifyResult); one failing target
//! never affects the others.

pub mod config;
pub mod directory;
pub mod driver;
pub mod error;
pub mod http;
pub mod retry;
pub mod service;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

pub use config::NotifyConfig;
pub use directory::{MemoryDirectory, NotifyDirectory};
pub use driver::{ChannelDriver, DriverRegistry, DynChannelDriver};
pub use error::NotifyError;
pub use http::{apply_auth, send_with_retries};
pub use retry::RetryPolicy;
pub use service::NotificationService;
pub use webhook::{WebhookChannelDriver, sign_body};
