use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Roles recognised by the control plane.
///
/// The set is fixed; credential validators map whatever their credential
/// carries onto one of these, falling back to a configured default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Chef,
    #[default]
    Baker,
    Auditor,
    Finance,
    Viewer,
}

impl Role {
    /// Parse a role from a string, ignoring case and surrounding whitespace.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "chef" => Some(Self::Chef),
            "baker" => Some(Self::Baker),
            "auditor" => Some(Self::Auditor),
            "finance" => Some(Self::Finance),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Returns the lowercase wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Chef => "chef",
            Self::Baker => "baker",
            Self::Auditor => "auditor",
            Self::Finance => "finance",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated principal.
///
/// Produced by the authentication chain once per request and consumed by
/// every downstream authorization check. Handlers never learn which
/// credential strategy produced it beyond the `provider` label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque unique identifier (API key digest, service account name, ...).
    pub subject: String,

    /// Email address, when the credential carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Name of the validator that authenticated this identity.
    pub provider: String,

    /// Kitchen the identity is scoped to. `None` means the caller must
    /// supply the kitchen through the request itself.
    #[serde(
        rename = "kitchen",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tenant_scope: Option<String>,

    /// Role granted to this identity.
    pub role: Role,

    /// Group memberships reported by the credential issuer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Raw claims carried by the credential, kept for custom policies.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub raw_claims: HashMap<String, String>,

    /// When this identity stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    /// Create an identity with the mandatory fields set.
    pub fn new(
        subject: impl Into<String>,
        provider: impl Into<String>,
        role: Role,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            display_name: None,
            provider: provider.into(),
            tenant_scope: None,
            role,
            groups: Vec::new(),
            raw_claims: HashMap::new(),
            expires_at,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Scope the identity to a kitchen. An empty string leaves it unscoped.
    #[must_use]
    pub fn with_tenant_scope(mut self, kitchen: impl Into<String>) -> Self {
        let kitchen = kitchen.into();
        self.tenant_scope = (!kitchen.is_empty()).then_some(kitchen);
        self
    }

    /// Set the group memberships.
    #[must_use]
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// Record a raw claim.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw_claims.insert(key.into(), value.into());
        self
    }

    /// Returns `true` once `now` has reached the expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
