use thiserror::Error;

/// Errors produced while resolving or delivering a notification.
///
/// Dispatch operations never return these to their caller; they are
/// rendered into the `error` field of the target's `NotifyResult`.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// No tool with this name exists in the kitchen.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// The tool exists but does not advertise the `notify` capability.
    #[error("tool {0} does not have notify capability")]
    MissingCapability(String),

    /// The tool is disabled.
    #[error("tool {0} is disabled")]
    ToolDisabled(String),

    /// The channel is marked inactive.
    #[error("channel {0} is inactive")]
    ChannelInactive(String),

    /// The channel's subscription filter excludes the event type.
    #[error("channel {channel} does not subscribe to {event_type} events")]
    NotSubscribed { channel: String, event_type: String },

    /// No driver is registered for the channel's kind.
    #[error("no driver registered for channel kind {0}")]
    NoDriver(String),

    /// The event or request body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The outbound request could not be built or sent.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote end answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Every attempt failed. Carries the last failure.
    #[error("{what} failed after {attempts} attempts: {last}")]
    Exhausted {
        what: &'static str,
        attempts: u32,
        #[source]
        last: Box<NotifyError>,
    },

    /// The caller cancelled the delivery.
    #[error("delivery cancelled")]
    Cancelled,

    /// The tool/channel directory could not be read.
    #[error("directory error: {0}")]
    Directory(String),

    /// The HTTP client or a signing key could not be set up.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl NotifyError {
    /// Returns `true` if a later attempt could plausibly succeed.
    ///
    /// A request that reqwest refused to build (bad URL, invalid header
    /// value) fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => !err.is_builder(),
            Self::HttpStatus { .. } => true,
            _ => false,
        }
    }
}
