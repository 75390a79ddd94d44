use axum::{Extension, Json};

use super::schemas::WhoAmIResponse;
use crate::auth::RequestContext;

/// `GET /v1/whoami` -- echoes the caller identity resolved by the chain.
pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        authenticated: ctx.identity.is_some(),
        kitchen: ctx.kitchen,
        identity: ctx.identity,
    })
}
