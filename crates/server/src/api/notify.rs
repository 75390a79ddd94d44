use axum::extract::State;
use axum::{Extension, Json};
use brigade_core::NotificationEvent;
use tracing::info;

use super::AppState;
use super::schemas::{NotifyRequest, NotifyResponse};
use crate::auth::RequestContext;
use crate::error::ServerError;

/// `POST /v1/notify` -- fan an event out to the named tools and every
/// channel of the caller's kitchen.
///
/// The event is always stamped with the request kitchen, so a caller cannot
/// notify another kitchen's targets.
pub async fn notify(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>, ServerError> {
    if body.event.run_id.trim().is_empty() {
        return Err(ServerError::BadRequest("event.run_id must not be empty".into()));
    }

    let event = NotificationEvent::new(
        body.event.event_type,
        ctx.kitchen.as_str(),
        body.event.run_id,
        body.event.recipe_name,
        body.event.step_name,
        body.event.payload,
    );

    let results = state
        .notify
        .dispatch_all(&ctx.kitchen, &body.tools, &event, &state.shutdown.child_token())
        .await;
    let delivered = results.iter().filter(|r| r.success).count();
    let failed = results.len() - delivered;

    info!(
        kitchen = %ctx.kitchen,
        event = %event.event_type,
        run_id = %event.run_id,
        delivered,
        failed,
        "notification fan-out finished"
    );

    Ok(Json(NotifyResponse {
        delivered,
        failed,
        results,
    }))
}
