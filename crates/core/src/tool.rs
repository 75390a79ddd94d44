use serde::{Deserialize, Serialize};

use crate::channel::AuthConfig;

/// Capability a tool must advertise to receive notifications.
pub const NOTIFY_CAPABILITY: &str = "notify";

/// A registered MCP tool. The dispatcher only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name, unique within its kitchen.
    pub name: String,

    /// Owning kitchen.
    pub kitchen: String,

    /// JSON-RPC endpoint.
    pub endpoint: String,

    /// Advertised capabilities.
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Disabled tools are never called.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Outbound authentication for calls to the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_config: Option<AuthConfig>,
}

fn default_enabled() -> bool {
    true
}

impl Tool {
    /// Create an enabled tool with no capabilities.
    pub fn new(
        kitchen: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kitchen: kitchen.into(),
            endpoint: endpoint.into(),
            capabilities: Vec::new(),
            enabled: true,
            auth_config: None,
        }
    }

    /// Add a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Set outbound authentication.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth_config = Some(auth);
        self
    }

    /// Mark the tool disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_lookup_is_exact() {
        let tool = Tool::new("k", "pager", "http://x").with_capability(NOTIFY_CAPABILITY);
        assert!(tool.has_capability("notify"));
        assert!(!tool.has_capability("Notify"));
        assert!(!tool.has_capability("search"));
    }

    #[test]
    fn deserialized_tool_defaults_to_enabled() {
        let tool: Tool = serde_json::from_value(serde_json::json!({
            "name": "pager",
            "kitchen": "pastry",
            "endpoint": "http://localhost:9000/mcp",
            "capabilities": ["notify"]
        }))
        .unwrap();
        assert!(tool.enabled);
        assert!(tool.auth_config.is_none());
    }
}
