use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies which channel driver delivers to a channel.
///
/// Kinds are open-ended: the built-in ones are provided as constants, and
/// drivers registered later may introduce their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelKind(Cow<'static, str>);

impl ChannelKind {
    /// Signed HTTP POST to an arbitrary URL.
    pub const WEBHOOK: Self = Self(Cow::Borrowed("webhook"));
    pub const SLACK: Self = Self(Cow::Borrowed("slack"));
    pub const TEAMS: Self = Self(Cow::Borrowed("teams"));
    pub const DISCORD: Self = Self(Cow::Borrowed("discord"));
    pub const EMAIL: Self = Self(Cow::Borrowed("email"));

    /// Create a kind from an arbitrary name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outbound authentication applied to tool and channel requests.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// `Authorization: Bearer <token>`.
    Bearer { token: String },

    /// A named header carrying a static key.
    ApiKey { header: String, key: String },

    /// HTTP Basic authentication.
    Basic { username: String, password: String },
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::ApiKey { header, .. } => f
                .debug_struct("ApiKey")
                .field("header", header)
                .field("key", &"[REDACTED]")
                .finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

/// A per-kitchen notification destination.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    /// Channel name, unique within its kitchen.
    pub name: String,

    /// Owning kitchen.
    pub kitchen: String,

    /// Which driver delivers to this channel.
    pub kind: ChannelKind,

    /// Destination URL.
    pub url: String,

    /// Shared secret used to sign deliveries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Inactive channels are skipped with an error result.
    #[serde(default = "default_active")]
    pub active: bool,

    /// Event types this channel subscribes to. Empty or `"*"` means all.
    #[serde(default)]
    pub events: Vec<String>,

    /// Driver-specific outbound authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AuthConfig>,
}

fn default_active() -> bool {
    true
}

impl NotificationChannel {
    /// Create an active channel subscribed to every event.
    pub fn new(
        kitchen: impl Into<String>,
        name: impl Into<String>,
        kind: ChannelKind,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kitchen: kitchen.into(),
            kind,
            url: url.into(),
            secret: None,
            active: true,
            events: Vec::new(),
            config: None,
        }
    }

    /// Set the signing secret. An empty secret disables signing.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.secret = (!secret.is_empty()).then_some(secret);
        self
    }

    /// Restrict the channel to the given event types.
    #[must_use]
    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Set outbound authentication.
    #[must_use]
    pub fn with_auth(mut self, config: AuthConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Mark the channel inactive.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns `true` if the subscription filter admits `event_type`.
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.events.is_empty() || self.events.iter().any(|e| e == "*" || e == event_type)
    }

    /// Identifier used for this channel in dispatch results.
    pub fn target_label(&self) -> String {
        format!("channel:{}/{}", self.kind, self.name)
    }
}

impl fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("name", &self.name)
            .field("kitchen", &self.kitchen)
            .field("kind", &self.kind)
            .field("url", &self.url)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("active", &self.active)
            .field("events", &self.events)
            .field("config", &self.config)
            .finish()
    }
}
