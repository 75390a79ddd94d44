use axum::extract::State;
use axum::{Extension, Json};
use brigade_core::Tool;
use tracing::info;

use super::AppState;
use super::schemas::{ToolView, UpsertToolRequest};
use crate::auth::RequestContext;
use crate::error::ServerError;

/// `GET /v1/tools` -- tools registered in the caller's kitchen.
pub async fn list_tools(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Json<Vec<ToolView>> {
    let tools = state.directory.tools_in(&ctx.kitchen);
    Json(tools.iter().map(ToolView::from).collect())
}

/// `PUT /v1/tools` -- create or replace a tool in the caller's kitchen.
pub async fn put_tool(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<UpsertToolRequest>,
) -> Result<Json<ToolView>, ServerError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ServerError::BadRequest("tool name must not be empty".into()));
    }
    if body.endpoint.trim().is_empty() {
        return Err(ServerError::BadRequest("tool endpoint must not be empty".into()));
    }

    let mut tool = Tool::new(ctx.kitchen, name, body.endpoint.trim());
    tool.capabilities = body.capabilities;
    tool.enabled = body.enabled;
    tool.auth_config = body.auth_config;

    info!(kitchen = %tool.kitchen, tool = %tool.name, "tool registered");
    let view = ToolView::from(&tool);
    state.directory.put_tool(tool);
    Ok(Json(view))
}
