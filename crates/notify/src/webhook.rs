use brigade_core::{ChannelKind, NotificationChannel, NotificationEvent};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::driver::ChannelDriver;
use crate::error::NotifyError;
use crate::http::{apply_auth, send_with_retries};
use crate::retry::RetryPolicy;

type HmacSha256 = Hmac<Sha256>;

pub const USER_AGENT: &str = "Brigade-Webhook/1.0";
pub const EVENT_HEADER: &str = "X-Brigade-Event";
pub const KITCHEN_HEADER: &str = "X-Brigade-Kitchen";
pub const SIGNATURE_HEADER: &str = "X-Brigade-Signature";

/// Delivers events as signed JSON POSTs to the channel URL.
#[derive(Debug, Clone)]
pub struct WebhookChannelDriver {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl WebhookChannelDriver {
    pub fn new(client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

impl ChannelDriver for WebhookChannelDriver {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WEBHOOK
    }

    #[instrument(
        skip(self, event, channel, cancel),
        fields(channel = %channel.name, event = %event.event_type, run_id = %event.run_id)
    )]
    async fn send(
        &self,
        event: &NotificationEvent,
        channel: &NotificationChannel,
        cancel: &CancellationToken,
    ) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(event)?;
        let signature = match channel.secret.as_deref() {
            Some(secret) if !secret.is_empty() => Some(format!("sha256={}", sign_body(secret, &body)?)),
            _ => None,
        };

        debug!(url = %channel.url, signed = signature.is_some(), "dispatching webhook");

        send_with_retries(&self.retry, cancel, "webhook", &channel.url, || {
            let mut request = self
                .client
                .post(&channel.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .header(EVENT_HEADER, event.event_type.as_str())
                .header(KITCHEN_HEADER, event.kitchen.as_str())
                .body(body.clone());
            if let Some(signature) = &signature {
                request = request.header(SIGNATURE_HEADER, signature.as_str());
            }
            apply_auth(request, channel.config.as_ref())
        })
        .await
    }
}

/// Hex-encoded HMAC-SHA256 of `body` keyed with `secret`.
pub fn sign_body(secret: &str, body: &[u8]) -> Result<String, NotifyError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NotifyError::Configuration(format!("invalid HMAC key: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
