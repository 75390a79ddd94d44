pub mod channels;
pub mod health;
pub mod notify;
pub mod schemas;
pub mod tools;
pub mod whoami;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use brigade_notify::{MemoryDirectory, NotificationService};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthLayer, build_chain};
use crate::config::BrigadeConfig;
use crate::error::ServerError;

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Dispatcher reading targets from `directory`.
    pub notify: NotificationService,
    /// Tools and channels registered through the API.
    pub directory: Arc<MemoryDirectory>,
    /// Authentication applied to every non-public route.
    pub auth: AuthLayer,
    /// Cancelled when the server gives up on in-flight deliveries.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Assemble the state described by `config`: an empty directory, the
    /// dispatcher with its built-in webhook driver, and the credential chain.
    pub async fn build(config: &BrigadeConfig) -> Result<Self, ServerError> {
        let directory = Arc::new(MemoryDirectory::new());
        let notify = NotificationService::new(directory.clone(), &config.notify)?;
        let chain = build_chain(&config.auth).await;
        Ok(Self {
            notify,
            directory,
            auth: AuthLayer::new(chain, config.auth.require_auth, config.auth.realm.as_str()),
            shutdown: CancellationToken::new(),
        })
    }
}

/// Build the axum router.
pub fn router(state: AppState) -> Router {
    let auth = state.auth.clone();
    Router::new()
        .route("/health", get(health::health))
        .route("/version", get(health::version))
        .route("/v1/whoami", get(whoami::whoami))
        .route("/v1/tools", get(tools::list_tools).put(tools::put_tool))
        .route(
            "/v1/channels",
            get(channels::list_channels).put(channels::put_channel),
        )
        .route("/v1/notify", post(notify::notify))
        .layer(auth)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
