//! Sharing group endpoints.
//!
//! Group lifecycle, membership management, and the share/unshare
//! operations that attach meetings to groups. Wire field names follow
//! the platform's vocabulary (`nombre`, `descripcion`, `rol`,
//! `permisos`, `mensaje`).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{meetings, with_db};
use crate::access;
use crate::api::error::{ApiError, ApiResult};
use crate::api::{AppState, RequestContext};
use crate::db::{
    AddMemberOutcome, Group, GroupMember, GroupRepository, GroupRole, PermissionGrant,
    SharedMeeting,
};
use crate::error::CoreError;
use crate::membership;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: String,
    #[serde(default)]
    pub rol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub rol: String,
}

#[derive(Debug, Deserialize)]
pub struct ShareMeetingRequest {
    pub meeting_id: i64,
    #[serde(default)]
    pub permisos: Option<PermissionGrant>,
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Create the groups router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/:id", get(get_group).put(update_group).delete(delete_group))
        .route("/:id/members", get(list_members).post(add_member))
        .route(
            "/:id/members/:member_id",
            put(update_member).delete(remove_member),
        )
        .route("/:id/share-meeting", post(share_meeting))
        .route("/:id/shared-meetings", get(list_shared_meetings))
        .route("/:id/shared-meetings/:meeting_id", delete(unshare_meeting))
        .route(
            "/:id/shared-meetings/:meeting_id/files",
            get(meetings::shared_files),
        )
        .route(
            "/:id/shared-meetings/:meeting_id/details",
            get(meetings::shared_details),
        )
        .with_state(state)
}

pub(crate) fn group_json(group: &Group) -> Value {
    json!({
        "id": group.id,
        "nombre": group.name,
        "descripcion": group.description,
        "owner_id": group.owner_id,
        "is_active": group.is_active,
        "created_at": group.created_at,
    })
}

fn member_json(member: &GroupMember) -> Value {
    json!({
        "id": member.id,
        "group_id": member.group_id,
        "user_id": member.user_id,
        "rol": member.rol,
        "created_at": member.created_at,
    })
}

pub(crate) fn shared_json(edge: &SharedMeeting) -> Value {
    json!({
        "id": edge.id,
        "group_id": edge.group_id,
        "meeting_id": edge.meeting_id,
        "shared_by": edge.shared_by,
        "permisos": edge.permisos,
        "mensaje": edge.message,
        "expires_at": edge.expires_at,
        "created_at": edge.created_at,
    })
}

/// Load the group and require the caller to be a member of it.
pub(crate) fn member_group(
    conn: &rusqlite::Connection,
    group_id: i64,
    user_id: &str,
) -> crate::error::CoreResult<Group> {
    let group = GroupRepository::get(conn, group_id)?
        .ok_or_else(|| CoreError::not_found(format!("Group {group_id}")))?;
    if !membership::is_group_member(conn, &group, user_id)? {
        return Err(CoreError::not_authorized(
            "You are not a member of this group",
        ));
    }
    Ok(group)
}

/// GET /groups - List the caller's sharing groups.
async fn list_groups(ctx: RequestContext) -> ApiResult<Json<Value>> {
    let groups = with_db(move |conn| GroupRepository::groups_for_user(conn, &ctx.user_id)).await?;
    let groups: Vec<Value> = groups.iter().map(group_json).collect();
    Ok(Json(json!({ "groups": groups })))
}

/// POST /groups - Create a sharing group owned by the caller.
async fn create_group(
    ctx: RequestContext,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let group = with_db(move |conn| {
        GroupRepository::create_group(
            conn,
            &request.nombre,
            request.descripcion.as_deref(),
            &ctx.user_id,
        )
    })
    .await?;

    info!("Group {} created by {}", group.id, group.owner_id);
    Ok((StatusCode::CREATED, Json(group_json(&group))))
}

/// GET /groups/:id - Get a group with its member list.
async fn get_group(ctx: RequestContext, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let (group, members) = with_db(move |conn| {
        let group = member_group(conn, id, &ctx.user_id)?;
        let members = GroupRepository::list_members(conn, id)?;
        Ok((group, members))
    })
    .await?;

    let members: Vec<Value> = members.iter().map(member_json).collect();
    let mut body = group_json(&group);
    body["members"] = Value::Array(members);
    Ok(Json(body))
}

/// PUT /groups/:id - Update a group (owner or organization admin).
async fn update_group(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateGroupRequest>,
) -> ApiResult<Json<Value>> {
    let group = with_db(move |conn| {
        GroupRepository::get(conn, id)?
            .ok_or_else(|| CoreError::not_found(format!("Group {id}")))
    })
    .await?;

    if !access::can_manage_group(&state.resolver, &group, &ctx.user_id)
        .await
        .is_allowed()
    {
        return Err(ApiError::forbidden("You cannot manage this group"));
    }

    let updated = with_db(move |conn| {
        GroupRepository::update(
            conn,
            id,
            request.nombre.as_deref(),
            request.descripcion.as_deref(),
            request.is_active,
        )?;
        GroupRepository::get(conn, id)?
            .ok_or_else(|| CoreError::not_found(format!("Group {id}")))
    })
    .await?;

    Ok(Json(group_json(&updated)))
}

/// DELETE /groups/:id - Delete a group. Owner only; removes members and
/// shared-meeting edges in the same transaction.
async fn delete_group(ctx: RequestContext, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    with_db(move |conn| GroupRepository::delete_group(conn, id, &ctx.user_id)).await?;

    info!("Group {} deleted", id);
    Ok(Json(json!({ "message": "Group deleted" })))
}

/// GET /groups/:id/members - List group members.
async fn list_members(ctx: RequestContext, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let members = with_db(move |conn| {
        member_group(conn, id, &ctx.user_id)?;
        GroupRepository::list_members(conn, id)
    })
    .await?;

    let members: Vec<Value> = members.iter().map(member_json).collect();
    Ok(Json(json!({ "members": members })))
}

/// POST /groups/:id/members - Add an organization member to the group.
async fn add_member(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let group = with_db(move |conn| {
        GroupRepository::get(conn, id)?
            .ok_or_else(|| CoreError::not_found(format!("Group {id}")))
    })
    .await?;

    if !access::can_manage_group(&state.resolver, &group, &ctx.user_id)
        .await
        .is_allowed()
    {
        return Err(ApiError::forbidden("You cannot manage this group"));
    }

    // Only members of the organization can be enrolled.
    if !state.resolver.is_org_member(&request.user_id).await? {
        return Err(ApiError::from(CoreError::validation(
            "User is not a member of the organization",
        )));
    }

    let rol = match request.rol.as_deref() {
        Some(s) => GroupRole::parse(s).map_err(ApiError::from)?,
        None => GroupRole::Colaborador,
    };

    let outcome =
        with_db(move |conn| GroupRepository::add_member(conn, id, &request.user_id, rol)).await?;

    match outcome {
        AddMemberOutcome::Added(member) => {
            info!("User {} added to group {}", member.user_id, id);
            Ok((StatusCode::CREATED, Json(member_json(&member))))
        }
        AddMemberOutcome::AlreadyMember => Ok((
            StatusCode::OK,
            Json(json!({ "message": "User is already a member of this group" })),
        )),
    }
}

/// PUT /groups/:id/members/:member_id - Change a member's role.
async fn update_member(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((id, member_id)): Path<(i64, i64)>,
    Json(request): Json<UpdateMemberRequest>,
) -> ApiResult<Json<Value>> {
    let group = with_db(move |conn| {
        GroupRepository::get(conn, id)?
            .ok_or_else(|| CoreError::not_found(format!("Group {id}")))
    })
    .await?;

    if !access::can_manage_group(&state.resolver, &group, &ctx.user_id)
        .await
        .is_allowed()
    {
        return Err(ApiError::forbidden("You cannot manage this group"));
    }

    let rol = GroupRole::parse(&request.rol).map_err(ApiError::from)?;
    with_db(move |conn| GroupRepository::update_member_role(conn, id, member_id, rol)).await?;

    Ok(Json(json!({ "message": "Member role updated" })))
}

/// DELETE /groups/:id/members/:member_id - Remove a member.
async fn remove_member(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((id, member_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let group = with_db(move |conn| {
        GroupRepository::get(conn, id)?
            .ok_or_else(|| CoreError::not_found(format!("Group {id}")))
    })
    .await?;

    if !access::can_manage_group(&state.resolver, &group, &ctx.user_id)
        .await
        .is_allowed()
    {
        return Err(ApiError::forbidden("You cannot manage this group"));
    }

    with_db(move |conn| GroupRepository::remove_member(conn, id, member_id)).await?;

    Ok(Json(json!({ "message": "Member removed" })))
}

/// POST /groups/:id/share-meeting - Share a meeting into the group.
///
/// The caller must belong to the group and be allowed to manage the
/// meeting (its owner, or a member of a group it is already shared
/// with). Sharing the same meeting twice returns the existing edge.
async fn share_meeting(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ShareMeetingRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let caller = ctx.clone();
    with_db(move |conn| member_group(conn, id, &caller.user_id).map(|_| ())).await?;

    let meeting = state
        .meetings
        .get_meeting(request.meeting_id)
        .await?
        .ok_or_else(|| {
            ApiError::from(CoreError::not_found(format!(
                "Meeting {}",
                request.meeting_id
            )))
        })?;

    let edge = with_db(move |conn| {
        if !access::can_manage_meeting(conn, &meeting, &ctx.user_id, &ctx.username).is_allowed() {
            return Err(CoreError::not_authorized(
                "You cannot share this meeting",
            ));
        }
        GroupRepository::share_meeting(
            conn,
            id,
            request.meeting_id,
            &ctx.user_id,
            request.permisos.unwrap_or_default(),
            request.mensaje.as_deref(),
            request.expires_at.as_deref(),
        )
    })
    .await?;

    info!(
        "Meeting {} shared into group {} by {}",
        edge.meeting_id, edge.group_id, edge.shared_by
    );
    Ok((StatusCode::CREATED, Json(shared_json(&edge))))
}

/// GET /groups/:id/shared-meetings - List the group's shared meetings,
/// with names resolved best-effort from the platform.
async fn list_shared_meetings(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let edges = with_db(move |conn| {
        member_group(conn, id, &ctx.user_id)?;
        GroupRepository::list_shared_meetings(conn, id)
    })
    .await?;

    let mut body = Vec::with_capacity(edges.len());
    for edge in &edges {
        let mut entry = shared_json(edge);
        entry["meeting_name"] = match state.meetings.get_meeting(edge.meeting_id).await {
            Ok(Some(meeting)) => Value::String(meeting.meeting_name),
            _ => Value::Null,
        };
        body.push(entry);
    }

    Ok(Json(json!({ "shared_meetings": body })))
}

/// DELETE /groups/:id/shared-meetings/:meeting_id - Stop sharing. Only
/// the identity that shared the meeting may revoke it.
async fn unshare_meeting(
    ctx: RequestContext,
    Path((id, meeting_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    with_db(move |conn| GroupRepository::unshare_meeting(conn, id, meeting_id, &ctx.user_id))
        .await?;

    info!("Meeting {} unshared from group {}", meeting_id, id);
    Ok(Json(json!({ "message": "Meeting is no longer shared" })))
}
