use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use brigade_core::{ChannelKind, NotificationChannel, NotificationEvent};
use tokio_util::sync::CancellationToken;

use crate::error::NotifyError;

/// A pluggable channel delivery mechanism with native `async fn`.
///
/// Not object-safe; every implementor is usable as a [`DynChannelDriver`]
/// through the blanket implementation.
pub trait ChannelDriver: Send + Sync {
    /// The channel kind this driver serves.
    fn kind(&self) -> ChannelKind;

    /// Deliver `event` to `channel`. Retries, if any, happen inside.
    fn send(
        &self,
        event: &NotificationEvent,
        channel: &NotificationChannel,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}

/// Object-safe counterpart of [`ChannelDriver`].
#[async_trait]
pub trait DynChannelDriver: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(
        &self,
        event: &NotificationEvent,
        channel: &NotificationChannel,
        cancel: &CancellationToken,
    ) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: ChannelDriver + Sync> DynChannelDriver for T {
    fn kind(&self) -> ChannelKind {
        ChannelDriver::kind(self)
    }

    async fn send(
        &self,
        event: &NotificationEvent,
        channel: &NotificationChannel,
        cancel: &CancellationToken,
    ) -> Result<(), NotifyError> {
        ChannelDriver::send(self, event, channel, cancel).await
    }
}

/// Channel drivers keyed by kind.
///
/// Safe to share: registration may happen while deliveries are resolving
/// drivers. The last registration for a kind wins.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<ChannelKind, Arc<dyn DynChannelDriver>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its own kind, returning the driver it
    /// replaced, if any.
    pub fn register(&self, driver: Arc<dyn DynChannelDriver>) -> Option<Arc<dyn DynChannelDriver>> {
        let kind = driver.kind();
        self.drivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, driver)
    }

    /// Look up the driver for a kind.
    pub fn get(&self, kind: &ChannelKind) -> Option<Arc<dyn DynChannelDriver>> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned()
    }

    /// Sorted list of registered kinds.
    pub fn kinds(&self) -> Vec<ChannelKind> {
        let mut kinds: Vec<ChannelKind> = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn len(&self) -> usize {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
