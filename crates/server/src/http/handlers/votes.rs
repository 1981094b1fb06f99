use axum::{extract::State, Json};
use domain::{VoteKind, WallEvent};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ensure_comment_visible, load_live_comment};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, AuthUser};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub comment_id: Option<String>,
}

pub async fn like_comment(
    state: State<AppState>,
    user: AuthUser,
    payload: ApiJson<VoteRequest>,
) -> ApiResult<Json<Value>> {
    vote(state, user, payload, VoteKind::Like).await
}

pub async fn dislike_comment(
    state: State<AppState>,
    user: AuthUser,
    payload: ApiJson<VoteRequest>,
) -> ApiResult<Json<Value>> {
    vote(state, user, payload, VoteKind::Dislike).await
}

async fn vote(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<VoteRequest>,
    kind: VoteKind,
) -> ApiResult<Json<Value>> {
    let comment_id = payload
        .comment_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Comment ID is required."))?;

    let comment = load_live_comment(&state, &comment_id).await?;
    ensure_comment_visible(&state, &comment, Some(&user)).await?;

    let tally = state
        .db
        .toggle_vote(&comment.id, &user, kind)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found."))?;

    tracing::debug!("{} voted {:?} on {}", user, tally.vote, comment.id);
    state.publish(WallEvent::votes_changed(&comment, &tally));

    let message = match tally.vote {
        Some(VoteKind::Like) => "Comment liked!",
        Some(VoteKind::Dislike) => "Comment disliked!",
        None => "Vote removed.",
    };
    Ok(Json(json!({
        "message": message,
        "likes": tally.likes,
        "dislikes": tally.dislikes,
        "vote": tally.vote,
    })))
}
