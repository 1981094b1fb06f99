use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::{notify::nest_invite, validate_nest_name, Nest, Username};
use serde::Deserialize;
use serde_json::{json, Value};
use storage::Feed;
use tracing::info;

use super::comments::{list_response, ListResponse};
use super::{load_nest, load_visible_nest, Page};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, AuthUser, MaybeUser};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNestRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    #[serde(default)]
    pub username: String,
}

pub async fn create_nest(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<CreateNestRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = validate_nest_name(&payload.name)?;
    let nest = state
        .db
        .create_nest(&name, payload.is_private, &user)
        .await?
        .ok_or_else(|| ApiError::bad_request("A nest with this name already exists."))?;

    info!("nest {} ({}) created by {}", nest.name, nest.id, user);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Nest created!", "nest": nest })),
    ))
}

pub async fn list_nests(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> ApiResult<Json<Vec<Nest>>> {
    let nests = state
        .db
        .list_nests(viewer.as_ref().map(Username::as_str))
        .await?;
    Ok(Json(nests))
}

pub async fn get_nest(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(nest_id): Path<String>,
) -> ApiResult<Json<Nest>> {
    Ok(Json(load_visible_nest(&state, &nest_id, viewer.as_ref()).await?))
}

pub async fn join_nest(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(nest_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let nest = load_nest(&state, &nest_id).await?;
    if nest.has_member(&user) {
        return Ok(Json(json!({ "message": "Already a member." })));
    }
    if nest.is_private {
        return Err(ApiError::forbidden("This nest is invite only."));
    }

    state.db.add_nest_member(&nest.id, &user).await?;
    info!("{} joined nest {}", user, nest.id);
    Ok(Json(json!({ "message": "Joined nest!" })))
}

pub async fn leave_nest(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(nest_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let nest = load_nest(&state, &nest_id).await?;
    if !state.db.remove_nest_member(&nest.id, &user).await? {
        return Err(ApiError::bad_request("You are not a member of this nest."));
    }
    info!("{} left nest {}", user, nest.id);
    Ok(Json(json!({ "message": "Left nest." })))
}

/// Members can add other users; the invitee gets a notification.
pub async fn add_member(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(nest_id): Path<String>,
    ApiJson(payload): ApiJson<AddMemberRequest>,
) -> ApiResult<Json<Value>> {
    let nest = load_nest(&state, &nest_id).await?;
    if !nest.has_member(&user) {
        return Err(ApiError::forbidden("Only members can add people to a nest."));
    }

    let requested = payload.username.trim();
    if requested.is_empty() {
        return Err(ApiError::bad_request("Username is required."));
    }
    let invitee = state
        .db
        .resolve_usernames(&[requested.to_string()])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    if !state.db.add_nest_member(&nest.id, &invitee).await? {
        return Err(ApiError::bad_request("User is already a member."));
    }
    state
        .db
        .notify(&[nest_invite(&user, &invitee, &nest.id, &nest.name)])
        .await?;

    info!("{} added {} to nest {}", user, invitee, nest.id);
    Ok(Json(json!({ "message": "Member added!", "username": invitee })))
}

pub async fn nest_comments(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(nest_id): Path<String>,
    ApiQuery(page): ApiQuery<Page>,
) -> ApiResult<ListResponse> {
    let nest = load_visible_nest(&state, &nest_id, viewer.as_ref()).await?;
    let (limit, offset) = page.resolve(state.wall.page_size);
    let (comments, total) = state.db.list_feed(Feed::Nest(&nest.id), limit, offset).await?;
    Ok(list_response(comments, total))
}
