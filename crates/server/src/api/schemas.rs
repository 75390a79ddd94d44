use brigade_core::{
    AuthConfig, ChannelKind, EventType, Identity, NotificationChannel, NotifyResult, Tool,
};
use serde::{Deserialize, Serialize};

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Response body for `GET /version`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

/// Response body for `GET /v1/whoami`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    pub authenticated: bool,
    pub kitchen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

/// Body of `PUT /v1/tools`. The kitchen comes from the request context.
#[derive(Debug, Deserialize)]
pub struct UpsertToolRequest {
    pub name: String,
    pub endpoint: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub auth_config: Option<AuthConfig>,
}

/// Body of `PUT /v1/channels`. The kitchen comes from the request context.
#[derive(Debug, Deserialize)]
pub struct UpsertChannelRequest {
    pub name: String,
    pub kind: ChannelKind,
    pub url: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub config: Option<AuthConfig>,
}

/// A tool as listed by `GET /v1/tools`, without its outbound credentials.
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolView {
    pub name: String,
    pub kitchen: String,
    pub endpoint: String,
    pub capabilities: Vec<String>,
    pub enabled: bool,
    pub authenticated: bool,
}

impl From<&Tool> for ToolView {
    fn from(tool: &Tool) -> Self {
        Self {
            name: tool.name.clone(),
            kitchen: tool.kitchen.clone(),
            endpoint: tool.endpoint.clone(),
            capabilities: tool.capabilities.clone(),
            enabled: tool.enabled,
            authenticated: tool.auth_config.is_some(),
        }
    }
}

/// A channel as listed by `GET /v1/channels`. The signing secret and
/// outbound credentials are never echoed back.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelView {
    pub name: String,
    pub kitchen: String,
    pub kind: ChannelKind,
    pub url: String,
    pub active: bool,
    pub events: Vec<String>,
    pub signed: bool,
    pub authenticated: bool,
}

impl From<&NotificationChannel> for ChannelView {
    fn from(channel: &NotificationChannel) -> Self {
        Self {
            name: channel.name.clone(),
            kitchen: channel.kitchen.clone(),
            kind: channel.kind.clone(),
            url: channel.url.clone(),
            active: channel.active,
            events: channel.events.clone(),
            signed: channel.secret.is_some(),
            authenticated: channel.config.is_some(),
        }
    }
}

/// The event half of a `POST /v1/notify` body.
#[derive(Debug, Deserialize)]
pub struct EventBody {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub run_id: String,
    #[serde(default)]
    pub recipe_name: String,
    #[serde(default)]
    pub step_name: String,
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /v1/notify`.
#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    /// Tools to call in addition to every channel of the kitchen.
    #[serde(default)]
    pub tools: Vec<String>,
    pub event: EventBody,
}

/// Response body for `POST /v1/notify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub delivered: usize,
    pub failed: usize,
    pub results: Vec<NotifyResult>,
}

fn default_true() -> bool {
    true
}
