pub mod accounts;
pub mod comments;
pub mod nests;
pub mod notifications;
pub mod sse;
pub mod votes;

use domain::{Comment, Nest, Username};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 200;

#[derive(Deserialize, Default)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    /// `(limit, offset)` with the limit clamped to `1..=200`.
    pub fn resolve(&self, default_limit: i64) -> (i64, i64) {
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

pub(crate) async fn load_nest(state: &AppState, nest_id: &str) -> ApiResult<Nest> {
    state
        .db
        .get_nest(nest_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Nest not found."))
}

/// Loads a nest and refuses private ones the viewer is not part of.
pub(crate) async fn load_visible_nest(
    state: &AppState,
    nest_id: &str,
    viewer: Option<&Username>,
) -> ApiResult<Nest> {
    let nest = load_nest(state, nest_id).await?;
    if !nest.is_visible_to(viewer) {
        return Err(ApiError::forbidden("This nest is private."));
    }
    Ok(nest)
}

pub(crate) async fn load_live_comment(state: &AppState, comment_id: &str) -> ApiResult<Comment> {
    match state.db.get_comment(comment_id).await? {
        Some(c) if !c.deleted => Ok(c),
        _ => Err(ApiError::not_found("Comment not found.")),
    }
}

pub(crate) async fn ensure_comment_visible(
    state: &AppState,
    comment: &Comment,
    viewer: Option<&Username>,
) -> ApiResult<()> {
    let Some(nest_id) = comment.nest_id.as_deref() else {
        return Ok(());
    };
    match state.db.get_nest(nest_id).await? {
        Some(nest) if !nest.is_visible_to(viewer) => {
            Err(ApiError::forbidden("This comment belongs to a private nest."))
        }
        _ => Ok(()),
    }
}
