pub mod channel;
pub mod event;
pub mod identity;
pub mod request;
pub mod tool;

pub use channel::{AuthConfig, ChannelKind, NotificationChannel};
pub use event::{EventType, NotificationEvent, NotifyResult};
pub use identity::{Identity, Role};
pub use request::AuthRequest;
pub use tool::{NOTIFY_CAPABILITY, Tool};
