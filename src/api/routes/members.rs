//! Organization member listing.

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::api::{AppState, RequestContext};
use crate::error::CoreError;

/// Create the members router.
pub fn router(state: AppState) -> Router {
    Router::new().route("/", get(list_members)).with_state(state)
}

/// GET /members - List the organization's members. Only members of the
/// organization can see the roster.
async fn list_members(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    if !state.resolver.is_org_member(&ctx.user_id).await? {
        return Err(CoreError::not_authorized(
            "You are not a member of this organization",
        )
        .into());
    }

    let members = state.resolver.members().await?;
    let members: Vec<Value> = members
        .iter()
        .map(|m| {
            json!({
                "user_id": m.user_id,
                "username": m.username,
                "full_name": m.full_name,
                "rol": m.rol,
            })
        })
        .collect();

    Ok(Json(json!({ "members": members })))
}
