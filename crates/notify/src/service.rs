use std::collections::HashMap;
use std::sync::Arc;

use brigade_core::{
    ChannelKind, NOTIFY_CAPABILITY, NotificationChannel, NotificationEvent, NotifyResult,
};
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::NotifyConfig;
use crate::directory::NotifyDirectory;
use crate::driver::{DriverRegistry, DynChannelDriver};
use crate::error::NotifyError;
use crate::http::{apply_auth, send_with_retries};
use crate::retry::RetryPolicy;
use crate::webhook::WebhookChannelDriver;

/// Delivers lifecycle events to MCP tools and notification channels.
///
/// Cheap to clone; clones share the HTTP client, the driver registry, and
/// the directory.
#[derive(Clone)]
pub struct NotificationService {
    directory: Arc<dyn NotifyDirectory>,
    client: reqwest::Client,
    drivers: Arc<DriverRegistry>,
    retry: RetryPolicy,
    max_concurrent_targets: Option<usize>,
}

impl NotificationService {
    /// Build the service and register the built-in webhook driver.
    pub fn new(
        directory: Arc<dyn NotifyDirectory>,
        config: &NotifyConfig,
    ) -> Result<Self, NotifyError> {
        Self::with_retry_policy(directory, config, config.retry_policy())
    }

    /// Like [`new`](Self::new) but with an explicit retry policy, overriding
    /// the attempts and backoff from `config`.
    pub fn with_retry_policy(
        directory: Arc<dyn NotifyDirectory>,
        config: &NotifyConfig,
        retry: RetryPolicy,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| NotifyError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let service = Self {
            directory,
            client,
            drivers: Arc::new(DriverRegistry::new()),
            retry,
            max_concurrent_targets: config.max_concurrent_targets,
        };
        service.register_driver(Arc::new(WebhookChannelDriver::new(
            service.client.clone(),
            retry,
        )));
        Ok(service)
    }

    /// Register a channel driver. Replaces any driver of the same kind.
    pub fn register_driver(&self, driver: Arc<dyn DynChannelDriver>) {
        let kind = driver.kind();
        let replaced = self.drivers.register(driver).is_some();
        info!(kind = %kind, replaced, "registered channel driver");
    }

    /// The driver currently registered for `kind`.
    pub fn driver(&self, kind: &ChannelKind) -> Option<Arc<dyn DynChannelDriver>> {
        self.drivers.get(kind)
    }

    pub fn driver_kinds(&self) -> Vec<ChannelKind> {
        self.drivers.kinds()
    }

    /// The shared outbound HTTP client, for drivers that want to reuse it.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send `event` to a single MCP tool as a `tools/call` request.
    #[instrument(
        skip(self, event, cancel),
        fields(event = %event.event_type, run_id = %event.run_id)
    )]
    pub async fn dispatch_to_tool(
        &self,
        kitchen: &str,
        tool_name: &str,
        event: &NotificationEvent,
        cancel: &CancellationToken,
    ) -> NotifyResult {
        let started = Utc::now();
        match self.deliver_to_tool(kitchen, tool_name, event, cancel).await {
            Ok(()) => {
                info!(tool = tool_name, "notification delivered to tool");
                NotifyResult::success(tool_name, started)
            }
            Err(err) => {
                warn!(tool = tool_name, error = %err, "tool notification failed");
                NotifyResult::failure(tool_name, err.to_string(), started)
            }
        }
    }

    /// Send `event` to a single channel through the driver for its kind.
    #[instrument(
        skip(self, channel, event, cancel),
        fields(channel = %channel.name, kind = %channel.kind, event = %event.event_type)
    )]
    pub async fn dispatch_to_channel(
        &self,
        channel: &NotificationChannel,
        event: &NotificationEvent,
        cancel: &CancellationToken,
    ) -> NotifyResult {
        let started = Utc::now();
        let target = channel.target_label();
        match self.deliver_to_channel(channel, event, cancel).await {
            Ok(()) => {
                info!("notification delivered to channel");
                NotifyResult::success(target, started)
            }
            Err(err) => {
                warn!(error = %err, "channel notification failed");
                NotifyResult::failure(target, err.to_string(), started)
            }
        }
    }

    /// Fan `event` out to the named tools and every channel of the kitchen.
    ///
    /// Each target is delivered on its own task and gets its own result; the
    /// call returns once every task has finished. Result order is
    /// unspecified. Cancelling `cancel` cancels every outstanding delivery.
    #[instrument(
        skip(self, tool_names, event, cancel),
        fields(event = %event.event_type, run_id = %event.run_id, tools = tool_names.len())
    )]
    pub async fn dispatch_all(
        &self,
        kitchen: &str,
        tool_names: &[String],
        event: &NotificationEvent,
        cancel: &CancellationToken,
    ) -> Vec<NotifyResult> {
        let event = Arc::new(event.clone());
        let limiter = self.max_concurrent_targets.map(|n| Arc::new(Semaphore::new(n.max(1))));
        let mut tasks = JoinSet::new();
        let mut labels = HashMap::new();

        for name in tool_names {
            let service = self.clone();
            let kitchen = kitchen.to_owned();
            let tool_name = name.clone();
            let event = Arc::clone(&event);
            let cancel = cancel.child_token();
            let limiter = limiter.clone();
            let handle = tasks.spawn(async move {
                let _permit = acquire(limiter.as_ref(), &cancel).await;
                service
                    .dispatch_to_tool(&kitchen, &tool_name, &event, &cancel)
                    .await
            });
            labels.insert(handle.id(), name.clone());
        }

        match self.directory.list_channels(kitchen).await {
            Ok(channels) => {
                for channel in channels {
                    let service = self.clone();
                    let label = channel.target_label();
                    let event = Arc::clone(&event);
                    let cancel = cancel.child_token();
                    let limiter = limiter.clone();
                    let handle = tasks.spawn(async move {
                        let _permit = acquire(limiter.as_ref(), &cancel).await;
                        service.dispatch_to_channel(&channel, &event, &cancel).await
                    });
                    labels.insert(handle.id(), label);
                }
            }
            Err(err) => {
                warn!(kitchen, error = %err, "failed to list notification channels");
            }
        }

        let mut results = Vec::with_capacity(labels.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, result)) => results.push(result),
                Err(err) => {
                    let target = labels.remove(&err.id()).unwrap_or_default();
                    warn!(target = %target, error = %err, "notification task did not complete");
                    results.push(NotifyResult::failure(
                        target,
                        format!("delivery task failed: {err}"),
                        Utc::now(),
                    ));
                }
            }
        }

        debug!(
            targets = results.len(),
            delivered = results.iter().filter(|r| r.success).count(),
            "fan-out complete"
        );
        results
    }

    async fn deliver_to_tool(
        &self,
        kitchen: &str,
        tool_name: &str,
        event: &NotificationEvent,
        cancel: &CancellationToken,
    ) -> Result<(), NotifyError> {
        let tool = self
            .directory
            .get_tool(kitchen, tool_name)
            .await?
            .ok_or_else(|| NotifyError::ToolNotFound(tool_name.to_owned()))?;
        if !tool.has_capability(NOTIFY_CAPABILITY) {
            return Err(NotifyError::MissingCapability(tool.name));
        }
        if !tool.enabled {
            return Err(NotifyError::ToolDisabled(tool.name));
        }

        let body = serde_json::to_vec(&tool_call_request(event)?)?;

        send_with_retries(&self.retry, cancel, "notification", &tool.endpoint, || {
            let request = self
                .client
                .post(&tool.endpoint)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone());
            apply_auth(request, tool.auth_config.as_ref())
        })
        .await
    }

    async fn deliver_to_channel(
        &self,
        channel: &NotificationChannel,
        event: &NotificationEvent,
        cancel: &CancellationToken,
    ) -> Result<(), NotifyError> {
        if !channel.active {
            return Err(NotifyError::ChannelInactive(channel.name.clone()));
        }
        if !channel.subscribes_to(event.event_type.as_str()) {
            return Err(NotifyError::NotSubscribed {
                channel: channel.name.clone(),
                event_type: event.event_type.to_string(),
            });
        }
        let driver = self
            .drivers
            .get(&channel.kind)
            .ok_or_else(|| NotifyError::NoDriver(channel.kind.to_string()))?;

        driver.send(event, channel, cancel).await
    }
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("drivers", &self.drivers)
            .field("retry", &self.retry)
            .field("max_concurrent_targets", &self.max_concurrent_targets)
            .finish_non_exhaustive()
    }
}

/// Wait for a fan-out slot, if fan-out is capped. Gives up when cancelled;
/// the delivery then observes the cancellation itself.
async fn acquire(
    limiter: Option<&Arc<Semaphore>>,
    cancel: &CancellationToken,
) -> Option<tokio::sync::OwnedSemaphorePermit> {
    let limiter = Arc::clone(limiter?);
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        permit = limiter.acquire_owned() => permit.ok(),
    }
}

/// JSON-RPC `tools/call` request invoking a tool's `notify` function.
fn tool_call_request(event: &NotificationEvent) -> Result<serde_json::Value, NotifyError> {
    let raw_event = serde_json::to_value(event)?;
    Ok(serde_json::json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "id": format!("notify-{}-{}", event.run_id, Utc::now().timestamp_millis()),
        "params": {
            "name": NOTIFY_CAPABILITY,
            "arguments": {
                "event_type": event.event_type,
                "run_id": event.run_id,
                "recipe_name": event.recipe_name.as_deref().unwrap_or_default(),
                "step_name": event.step_name.as_deref().unwrap_or_default(),
                "kitchen": event.kitchen,
                "payload": raw_event,
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use brigade_core::{EventType, Tool};

    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::driver::ChannelDriver;
    use crate::testing::MockServer;

    fn event(event_type: EventType) -> NotificationEvent {
        NotificationEvent::new(
            event_type,
            "pastry",
            "run-42",
            "croissant",
            "proof",
            serde_json::Map::new(),
        )
    }

    fn service(directory: Arc<MemoryDirectory>) -> NotificationService {
        service_with(directory, NotifyConfig::default())
    }

    fn service_with(directory: Arc<MemoryDirectory>, config: NotifyConfig) -> NotificationService {
        NotificationService::with_retry_policy(
            directory,
            &config,
            RetryPolicy::new(3, Duration::from_millis(5)),
        )
        .unwrap()
    }

    fn notify_tool(name: &str, endpoint: &str) -> Tool {
        Tool::new("pastry", name, endpoint).with_capability(NOTIFY_CAPABILITY)
    }

    struct PanickingDriver;

    impl ChannelDriver for PanickingDriver {
        fn kind(&self) -> ChannelKind {
            ChannelKind::new("flaky")
        }

        async fn send(
            &self,
            _event: &NotificationEvent,
            _channel: &NotificationChannel,
            _cancel: &CancellationToken,
        ) -> Result<(), NotifyError> {
            panic!("driver blew up");
        }
    }

    struct RecordingDriver {
        sent: std::sync::Mutex<Vec<String>>,
    }

    impl ChannelDriver for RecordingDriver {
        fn kind(&self) -> ChannelKind {
            ChannelKind::SLACK
        }

        async fn send(
            &self,
            event: &NotificationEvent,
            channel: &NotificationChannel,
            _cancel: &CancellationToken,
        ) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push(format!("{}:{}", channel.name, event.event_type));
            Ok(())
        }
    }

    #[test]
    fn webhook_driver_registered_by_default() {
        let svc = service(Arc::new(MemoryDirectory::new()));
        assert_eq!(svc.driver_kinds(), vec![ChannelKind::WEBHOOK]);
        assert!(svc.driver(&ChannelKind::WEBHOOK).is_some());
        assert!(svc.driver(&ChannelKind::SLACK).is_none());
    }

    #[tokio::test]
    async fn tool_lookup_failures_are_reported_not_raised() {
        let dir = Arc::new(MemoryDirectory::new());
        dir.put_tool(Tool::new("pastry", "search", "http://127.0.0.1:1/"));
        dir.put_tool(notify_tool("pager", "http://127.0.0.1:1/").disabled());
        let svc = service(dir);
        let cancel = CancellationToken::new();
        let ev = event(EventType::RunFailed);

        let missing = svc.dispatch_to_tool("pastry", "ghost", &ev, &cancel).await;
        assert!(!missing.success);
        assert_eq!(missing.target, "ghost");
        assert_eq!(missing.error.as_deref(), Some("tool not found: ghost"));

        let no_cap = svc.dispatch_to_tool("pastry", "search", &ev, &cancel).await;
        assert_eq!(
            no_cap.error.as_deref(),
            Some("tool search does not have notify capability")
        );

        let disabled = svc.dispatch_to_tool("pastry", "pager", &ev, &cancel).await;
        assert_eq!(disabled.error.as_deref(), Some("tool pager is disabled"));
    }

    #[tokio::test]
    async fn tool_call_payload_shape() {
        let server = MockServer::start(vec![200]).await;
        let dir = Arc::new(MemoryDirectory::new());
        dir.put_tool(notify_tool("pager", &server.url()).with_auth(
            brigade_core::AuthConfig::ApiKey {
                header: "X-Pager-Key".into(),
                key: "pk".into(),
            },
        ));
        let svc = service(dir);
        let ev = event(EventType::GateWaiting);

        let result = svc
            .dispatch_to_tool("pastry", "pager", &ev, &CancellationToken::new())
            .await;
        assert!(result.success, "{:?}", result.error);
        assert!(result.error.is_none());

        let requests = server.finish().await;
        let request = &requests[0];
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("x-pager-key"), Some("pk"));

        let body = request.json();
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "tools/call");
        assert!(body["id"].as_str().unwrap().starts_with("notify-run-42-"));
        assert_eq!(body["params"]["name"], "notify");
        let args = &body["params"]["arguments"];
        assert_eq!(args["event_type"], "gate_waiting");
        assert_eq!(args["run_id"], "run-42");
        assert_eq!(args["recipe_name"], "croissant");
        assert_eq!(args["step_name"], "proof");
        assert_eq!(args["kitchen"], "pastry");
        assert_eq!(args["payload"], serde_json::to_value(&ev).unwrap());
    }

    #[tokio::test]
    async fn tool_retries_then_reports_last_status() {
        let server = MockServer::start(vec![502, 502, 503]).await;
        let url = server.url();
        let dir = Arc::new(MemoryDirectory::new());
        dir.put_tool(notify_tool("pager", &url));
        let svc = service(dir);

        let result = svc
            .dispatch_to_tool(
                "pastry",
                "pager",
                &event(EventType::RunFailed),
                &CancellationToken::new(),
            )
            .await;
        assert!(!result.success);
        assert_eq!(
            result.error,
            Some(format!(
                "notification failed after 3 attempts: HTTP 503 from {url}"
            ))
        );
        assert_eq!(server.finish().await.len(), 3);
    }

    #[tokio::test]
    async fn channel_preconditions() {
        let svc = service(Arc::new(MemoryDirectory::new()));
        let cancel = CancellationToken::new();

        let inactive =
            NotificationChannel::new("pastry", "ops", ChannelKind::WEBHOOK, "http://127.0.0.1:1/")
                .inactive();
        let r = svc
            .dispatch_to_channel(&inactive, &event(EventType::RunFailed), &cancel)
            .await;
        assert_eq!(r.target, "channel:webhook/ops");
        assert_eq!(r.error.as_deref(), Some("channel ops is inactive"));

        let filtered =
            NotificationChannel::new("pastry", "alerts", ChannelKind::WEBHOOK, "http://127.0.0.1:1/")
                .with_events(["run_failed"]);
        let r = svc
            .dispatch_to_channel(&filtered, &event(EventType::StepCompleted), &cancel)
            .await;
        assert_eq!(
            r.error.as_deref(),
            Some("channel alerts does not subscribe to step_completed events")
        );

        let orphan =
            NotificationChannel::new("pastry", "chat", ChannelKind::TEAMS, "http://127.0.0.1:1/");
        let r = svc
            .dispatch_to_channel(&orphan, &event(EventType::RunFailed), &cancel)
            .await;
        assert_eq!(r.target, "channel:teams/chat");
        assert_eq!(
            r.error.as_deref(),
            Some("no driver registered for channel kind teams")
        );
    }

    #[tokio::test]
    async fn registered_driver_receives_channel_events() {
        let svc = service(Arc::new(MemoryDirectory::new()));
        let driver = Arc::new(RecordingDriver {
            sent: std::sync::Mutex::new(Vec::new()),
        });
        svc.register_driver(driver.clone());
        assert_eq!(
            svc.driver_kinds(),
            vec![ChannelKind::SLACK, ChannelKind::WEBHOOK]
        );

        let channel =
            NotificationChannel::new("pastry", "kitchen-chat", ChannelKind::SLACK, "https://slack");
        let r = svc
            .dispatch_to_channel(&channel, &event(EventType::RunCompleted), &CancellationToken::new())
            .await;
        assert!(r.success);
        assert_eq!(
            *driver.sent.lock().unwrap(),
            vec!["kitchen-chat:run_completed".to_owned()]
        );
    }

    #[tokio::test]
    async fn dispatch_all_isolates_failures() {
        let tool_server = MockServer::start(vec![200]).await;
        let hook_server = MockServer::start(vec![200]).await;

        let dir = Arc::new(MemoryDirectory::new());
        dir.put_tool(notify_tool("healthy", &tool_server.url()));
        dir.put_tool(notify_tool("sleepy", "http://127.0.0.1:1/").disabled());
        dir.put_tool(Tool::new("pastry", "search", "http://127.0.0.1:1/"));
        dir.put_channel(
            NotificationChannel::new("pastry", "archived", ChannelKind::WEBHOOK, "http://127.0.0.1:1/")
                .inactive(),
        );
        dir.put_channel(
            NotificationChannel::new("pastry", "ops", ChannelKind::WEBHOOK, hook_server.url())
                .with_events(["run_failed"])
                .with_secret("s"),
        );
        dir.put_channel(NotificationChannel::new(
            "grill",
            "other-kitchen",
            ChannelKind::WEBHOOK,
            "http://127.0.0.1:1/",
        ));
        let svc = service(dir);

        let names = vec!["healthy".to_owned(), "sleepy".to_owned(), "search".to_owned()];
        let results = svc
            .dispatch_all("pastry", &names, &event(EventType::RunFailed), &CancellationToken::new())
            .await;

        assert_eq!(results.len(), 5);
        let ok: Vec<&str> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(ok.len(), 2);
        assert!(ok.contains(&"healthy"));
        assert!(ok.contains(&"channel:webhook/ops"));
        assert!(
            results
                .iter()
                .all(|r| r.success == r.error.is_none())
        );

        assert_eq!(tool_server.finish().await.len(), 1);
        assert_eq!(hook_server.finish().await.len(), 1);
    }

    #[tokio::test]
    async fn panicking_driver_becomes_failure_result() {
        let dir = Arc::new(MemoryDirectory::new());
        dir.put_channel(NotificationChannel::new(
            "pastry",
            "boom",
            ChannelKind::new("flaky"),
            "http://unused",
        ));
        let svc = service(dir);
        svc.register_driver(Arc::new(PanickingDriver));

        let results = svc
            .dispatch_all("pastry", &[], &event(EventType::RunFailed), &CancellationToken::new())
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].target, "channel:flaky/boom");
        assert!(!results[0].success);
        assert!(
            results[0]
                .error
                .as_deref()
                .unwrap()
                .starts_with("delivery task failed")
        );
    }

    #[tokio::test]
    async fn capped_fan_out_still_delivers_everything() {
        let dir = Arc::new(MemoryDirectory::new());
        for i in 0..4 {
            dir.put_tool(Tool::new("pastry", format!("t{i}"), "http://127.0.0.1:1/"));
        }
        let config = NotifyConfig {
            max_concurrent_targets: Some(1),
            ..NotifyConfig::default()
        };
        let svc = service_with(dir, config);

        let names: Vec<String> = (0..4).map(|i| format!("t{i}")).collect();
        let results = svc
            .dispatch_all("pastry", &names, &event(EventType::RunFailed), &CancellationToken::new())
            .await;
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| !r.success));
    }

    #[tokio::test]
    async fn cancelled_dispatch_reports_cancellation() {
        let dir = Arc::new(MemoryDirectory::new());
        dir.put_tool(notify_tool("pager", "http://127.0.0.1:1/"));
        let svc = service(dir);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = svc
            .dispatch_all(
                "pastry",
                &["pager".to_owned()],
                &event(EventType::RunFailed),
                &cancel,
            )
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error.as_deref(), Some("delivery cancelled"));
    }
}
