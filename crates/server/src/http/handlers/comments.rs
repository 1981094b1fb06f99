use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use domain::{
    notify::{newly_tagged, plan_comment_notifications, CommentRef},
    tags::extract_tags,
    validate_comment_text, Comment, Nest, Username, WallEvent,
};
use serde::Deserialize;
use serde_json::{json, Value};
use storage::{Feed, NewComment};
use tracing::info;

use super::{ensure_comment_visible, load_live_comment, load_nest, Page};
use crate::config::WallSettings;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, AuthUser, MaybeUser};
use crate::media::parse_media_url;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub comment: Option<String>,
    pub parent_id: Option<String>,
    pub nest_id: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Deserialize)]
pub struct EditCommentRequest {
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct SinceQuery {
    pub since: Option<String>,
}

pub type ListResponse = ([(&'static str, String); 1], Json<Vec<Comment>>);

pub fn list_response(comments: Vec<Comment>, total: i64) -> ListResponse {
    ([("x-total-count", total.to_string())], Json(comments))
}

fn check_cooldown(wall: &WallSettings, last_posted_at: Option<DateTime<Utc>>) -> ApiResult<()> {
    if wall.post_cooldown_secs <= 0 {
        return Ok(());
    }
    let Some(last) = last_posted_at else {
        return Ok(());
    };
    // 超出时间范围的冷却时间视为一直冷却
    let Some(until) = Duration::try_seconds(wall.post_cooldown_secs)
        .and_then(|cooldown| last.checked_add_signed(cooldown))
    else {
        return Err(ApiError::TooManyRequests(
            "Please wait before posting again.".into(),
        ));
    };
    let remaining = until - Utc::now();
    if remaining > Duration::zero() {
        return Err(ApiError::TooManyRequests(format!(
            "Please wait {} more seconds before posting again.",
            remaining.num_seconds().max(1)
        )));
    }
    Ok(())
}

/// Existing users tagged in `content`. In a private nest only members count.
async fn resolve_tags(
    state: &AppState,
    content: &str,
    nest: Option<&Nest>,
) -> ApiResult<Vec<Username>> {
    let mut tagged = state.db.resolve_usernames(&extract_tags(content)).await?;
    if let Some(nest) = nest.filter(|n| n.is_private) {
        tagged.retain(|u| nest.has_member(u));
    }
    Ok(tagged)
}

pub async fn list_comments(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<Page>,
) -> ApiResult<ListResponse> {
    let (limit, offset) = page.resolve(state.wall.page_size);
    let (comments, total) = state.db.list_feed(Feed::Wall, limit, offset).await?;
    Ok(list_response(comments, total))
}

pub async fn get_comment(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(comment_id): Path<String>,
) -> ApiResult<Json<Comment>> {
    let comment = state
        .db
        .get_comment(&comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found."))?;
    ensure_comment_visible(&state, &comment, viewer.as_ref()).await?;
    Ok(Json(comment))
}

pub async fn list_replies(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(comment_id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    let parent = state
        .db
        .get_comment(&comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found."))?;
    ensure_comment_visible(&state, &parent, viewer.as_ref()).await?;
    Ok(Json(state.db.list_replies(&parent.id).await?))
}

pub async fn post_comment(
    State(state): State<AppState>,
    AuthUser(author): AuthUser,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let content = validate_comment_text(
        payload.comment.as_deref().unwrap_or_default(),
        state.wall.max_comment_length,
    )?;

    let profile = state
        .db
        .get_profile(author.as_str())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists.".into()))?;
    check_cooldown(&state.wall, profile.last_posted_at)?;

    let media = payload
        .media_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .map(parse_media_url)
        .transpose()?;

    let parent = match payload.parent_id.as_deref() {
        Some(parent_id) => {
            let parent = state
                .db
                .get_comment(parent_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Parent comment not found."))?;
            if parent.deleted {
                return Err(ApiError::bad_request("Cannot reply to a deleted comment."));
            }
            Some(parent)
        }
        None => None,
    };

    // 回复永远跟随父评论所在的 nest
    let nest_id = match (&parent, payload.nest_id) {
        (Some(p), Some(requested)) if p.nest_id.as_deref() != Some(requested.as_str()) => {
            return Err(ApiError::bad_request(
                "A reply must stay in the nest of its parent comment.",
            ));
        }
        (Some(p), _) => p.nest_id.clone(),
        (None, requested) => requested,
    };

    let nest = match nest_id.as_deref() {
        Some(id) => {
            let nest = load_nest(&state, id).await?;
            if nest.is_private && !nest.has_member(&author) {
                return Err(ApiError::forbidden("You are not a member of this nest."));
            }
            Some(nest)
        }
        None => None,
    };

    let tagged = resolve_tags(&state, &content, nest.as_ref()).await?;
    let parent_author = parent
        .as_ref()
        .map(|p| Username::new_unchecked(p.username.clone()));

    let new = NewComment {
        author,
        content,
        parent_id: parent.map(|p| p.id),
        nest_id,
        media,
        tagged,
    };

    let comment = state
        .db
        .create_comment(&new, |id| {
            plan_comment_notifications(
                &new.author,
                CommentRef {
                    id,
                    nest_id: new.nest_id.as_deref(),
                },
                &new.tagged,
                parent_author.as_ref(),
            )
        })
        .await?;

    info!(
        "comment {} posted by {} (parent={:?}, nest={:?}, tags={})",
        comment.id,
        comment.username,
        comment.parent_id,
        comment.nest_id,
        comment.tagged_users.len()
    );
    state.publish(WallEvent::CommentPosted {
        comment: comment.clone(),
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment added!", "comment": comment })),
    ))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
    ApiJson(payload): ApiJson<EditCommentRequest>,
) -> ApiResult<Json<Value>> {
    let content = validate_comment_text(
        payload.comment.as_deref().unwrap_or_default(),
        state.wall.max_comment_length,
    )?;

    let existing = load_live_comment(&state, &comment_id).await?;
    if !existing.is_authored_by(&user) {
        return Err(ApiError::forbidden("You can only edit your own comments."));
    }

    let nest = match existing.nest_id.as_deref() {
        Some(id) => state.db.get_nest(id).await?,
        None => None,
    };
    let tagged = resolve_tags(&state, &content, nest.as_ref()).await?;
    let fresh = newly_tagged(&existing.tagged_users, &tagged);
    let drafts = plan_comment_notifications(
        &user,
        CommentRef {
            id: &existing.id,
            nest_id: existing.nest_id.as_deref(),
        },
        &fresh,
        None,
    );

    let comment = state
        .db
        .edit_comment(&existing.id, &content, &tagged, &drafts)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found."))?;

    state.publish(WallEvent::CommentEdited {
        comment: comment.clone(),
    });
    Ok(Json(json!({ "message": "Comment updated!", "comment": comment })))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let existing = load_live_comment(&state, &comment_id).await?;
    if !existing.is_authored_by(&user) {
        return Err(ApiError::forbidden("You can only delete your own comments."));
    }

    if !state.db.soft_delete_comment(&existing.id).await? {
        return Err(ApiError::not_found("Comment not found."));
    }

    info!("comment {} deleted by {}", existing.id, user);
    state.publish(WallEvent::CommentDeleted {
        comment_id: existing.id,
        nest_id: existing.nest_id,
    });
    Ok(Json(json!({ "message": "Comment deleted." })))
}

pub async fn new_comments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<SinceQuery>,
) -> ApiResult<Json<Value>> {
    let since = query
        .since
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Last checked timestamp is required."))?;
    let since = DateTime::parse_from_rfc3339(since)
        .map_err(|_| ApiError::bad_request("Timestamp must be in RFC 3339 format."))?
        .with_timezone(&Utc);

    let comments = state.db.comments_since(since, user.as_str()).await?;
    Ok(Json(json!({ "count": comments.len(), "newComments": comments })))
}
