use async_trait::async_trait;
use brigade_core::{NotificationChannel, Tool};
use dashmap::DashMap;

use crate::error::NotifyError;

/// Read access to the tools and channels registered for each kitchen.
#[async_trait]
pub trait NotifyDirectory: Send + Sync {
    /// Look up a tool by name within a kitchen.
    async fn get_tool(&self, kitchen: &str, name: &str) -> Result<Option<Tool>, NotifyError>;

    /// Every channel owned by a kitchen, active or not.
    async fn list_channels(&self, kitchen: &str) -> Result<Vec<NotificationChannel>, NotifyError>;
}

type Key = (String, String);

/// In-memory [`NotifyDirectory`] backed by concurrent maps.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    tools: DashMap<Key, Tool>,
    channels: DashMap<Key, NotificationChannel>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tool.
    pub fn put_tool(&self, tool: Tool) {
        self.tools
            .insert((tool.kitchen.clone(), tool.name.clone()), tool);
    }

    /// Insert or replace a channel.
    pub fn put_channel(&self, channel: NotificationChannel) {
        self.channels
            .insert((channel.kitchen.clone(), channel.name.clone()), channel);
    }

    pub fn remove_tool(&self, kitchen: &str, name: &str) -> Option<Tool> {
        self.tools
            .remove(&(kitchen.to_owned(), name.to_owned()))
            .map(|(_, tool)| tool)
    }

    pub fn remove_channel(&self, kitchen: &str, name: &str) -> Option<NotificationChannel> {
        self.channels
            .remove(&(kitchen.to_owned(), name.to_owned()))
            .map(|(_, channel)| channel)
    }

    /// Tools in a kitchen, sorted by name.
    pub fn tools_in(&self, kitchen: &str) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools
            .iter()
            .filter(|entry| entry.key().0 == kitchen)
            .map(|entry| entry.value().clone())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Channels in a kitchen, sorted by name.
    pub fn channels_in(&self, kitchen: &str) -> Vec<NotificationChannel> {
        let mut channels: Vec<NotificationChannel> = self
            .channels
            .iter()
            .filter(|entry| entry.key().0 == kitchen)
            .map(|entry| entry.value().clone())
            .collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        channels
    }
}

#[async_trait]
impl NotifyDirectory for MemoryDirectory {
    async fn get_tool(&self, kitchen: &str, name: &str) -> Result<Option<Tool>, NotifyError> {
        Ok(self
            .tools
            .get(&(kitchen.to_owned(), name.to_owned()))
            .map(|entry| entry.value().clone()))
    }

    async fn list_channels(&self, kitchen: &str) -> Result<Vec<NotificationChannel>, NotifyError> {
        Ok(self.channels_in(kitchen))
    }
}
