use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiQuery, AuthUser};
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Deserialize, Default)]
pub struct MarkReadRequest {
    /// Absent means every notification.
    pub ids: Option<Vec<String>>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Value>> {
    let notifications = state
        .db
        .list_notifications(user.as_str(), query.unread_only)
        .await?;
    let unread = state.db.unread_count(user.as_str()).await?;
    Ok(Json(json!({ "notifications": notifications, "unread": unread })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    // 空 body 表示全部已读；有内容就必须是合法的请求体
    let request: MarkReadRequest = if body.iter().all(u8::is_ascii_whitespace) {
        MarkReadRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?
    };
    let updated = state
        .db
        .mark_notifications_read(user.as_str(), request.ids.as_deref())
        .await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn clear_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let deleted = state.db.clear_notifications(user.as_str()).await?;
    Ok(Json(json!({ "deleted": deleted })))
}
