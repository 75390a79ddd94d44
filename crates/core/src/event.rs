use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle occurrences the workflow layer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A human gate is waiting for approval.
    GateWaiting,
    /// A recipe step finished successfully.
    StepCompleted,
    /// A recipe step failed.
    StepFailed,
    /// A whole recipe run finished successfully.
    RunCompleted,
    /// A whole recipe run failed.
    RunFailed,
}

impl EventType {
    /// Returns the wire name used in headers, payloads, and subscription
    /// filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GateWaiting => "gate_waiting",
            Self::StepCompleted => "step_completed",
            Self::StepFailed => "step_failed",
            Self::RunCompleted => "run_completed",
            Self::RunFailed => "run_failed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single lifecycle event, delivered unchanged to every notification target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// What happened.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Recipe run the event belongs to.
    pub run_id: String,

    /// Recipe name, when the event is tied to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,

    /// Step name, for step-level events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,

    /// Kitchen (tenant) that owns the run.
    pub kitchen: String,

    /// Free-form event details.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub payload: serde_json::Map<String, serde_json::Value>,

    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    /// Create an event stamped with the current UTC time.
    ///
    /// Empty recipe and step names are treated as absent.
    pub fn new(
        event_type: EventType,
        kitchen: impl Into<String>,
        run_id: impl Into<String>,
        recipe_name: impl Into<String>,
        step_name: impl Into<String>,
        payload: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let recipe_name = recipe_name.into();
        let step_name = step_name.into();
        Self {
            event_type,
            run_id: run_id.into(),
            recipe_name: (!recipe_name.is_empty()).then_some(recipe_name),
            step_name: (!step_name.is_empty()).then_some(step_name),
            kitchen: kitchen.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of delivering one event to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyResult {
    /// Tool name, or `channel:<kind>/<name>` for channels.
    #[serde(rename = "tool")]
    pub target: String,

    /// Whether delivery succeeded.
    pub success: bool,

    /// Failure description; present iff `success` is `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the delivery attempt started.
    pub timestamp: DateTime<Utc>,
}

impl NotifyResult {
    /// A successful delivery to `target`.
    #[must_use]
    pub fn success(target: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            target: target.into(),
            success: true,
            error: None,
            timestamp,
        }
    }

    /// A failed delivery to `target`.
    #[must_use]
    pub fn failure(
        target: impl Into<String>,
        error: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            target: target.into(),
            success: false,
            error: Some(error.into()),
            timestamp,
        }
    }
}
