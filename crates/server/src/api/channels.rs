use axum::extract::State;
use axum::{Extension, Json};
use brigade_core::NotificationChannel;
use tracing::info;

use super::AppState;
use super::schemas::{ChannelView, UpsertChannelRequest};
use crate::auth::RequestContext;
use crate::error::ServerError;

/// `GET /v1/channels` -- channels owned by the caller's kitchen.
pub async fn list_channels(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Json<Vec<ChannelView>> {
    let channels = state.directory.channels_in(&ctx.kitchen);
    Json(channels.iter().map(ChannelView::from).collect())
}

/// `PUT /v1/channels` -- create or replace a channel in the caller's kitchen.
///
/// Kinds without a registered driver are refused up front rather than
/// failing on every dispatch.
pub async fn put_channel(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<UpsertChannelRequest>,
) -> Result<Json<ChannelView>, ServerError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ServerError::BadRequest("channel name must not be empty".into()));
    }
    if body.url.trim().is_empty() {
        return Err(ServerError::BadRequest("channel url must not be empty".into()));
    }
    if state.notify.driver(&body.kind).is_none() {
        return Err(ServerError::BadRequest(format!(
            "no driver registered for channel kind {}",
            body.kind
        )));
    }

    let mut channel = NotificationChannel::new(ctx.kitchen, name, body.kind, body.url.trim())
        .with_secret(body.secret.unwrap_or_default())
        .with_events(body.events);
    channel.active = body.active;
    channel.config = body.config;

    info!(
        kitchen = %channel.kitchen,
        channel = %channel.name,
        kind = %channel.kind,
        "channel registered"
    );
    let view = ChannelView::from(&channel);
    state.directory.put_channel(channel);
    Ok(Json(view))
}
