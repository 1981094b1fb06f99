use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::{UserProfile, Username};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, AuthUser};
use crate::state::AppState;

const MAX_PASSWORD_BYTES: usize = 256;

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    fn require(self) -> ApiResult<(String, String)> {
        let username = self.username.trim().to_string();
        if username.is_empty() || self.password.is_empty() {
            return Err(ApiError::bad_request("Username and password are required."));
        }
        Ok((username, self.password))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub unread_notifications: i64,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Credentials>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (username, password) = payload.require()?;
    let username = Username::new(username)?;
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::bad_request("Password is too long."));
    }

    // 先查一次，避免为已存在的用户名白算一次 argon2
    if state.db.get_profile(username.as_str()).await?.is_some() {
        return Err(ApiError::bad_request("Username already exists."));
    }

    let hash = hash_password(password).await?;
    if !state.db.create_user(&username, &hash).await? {
        return Err(ApiError::bad_request("Username already exists."));
    }

    info!("registered user {}", username);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully!" })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Credentials>,
) -> ApiResult<Json<Value>> {
    let (username, password) = payload.require()?;

    let (user, hash) = state
        .db
        .find_credentials(&username)
        .await?
        .ok_or_else(|| ApiError::bad_request("User not found. Please register."))?;

    if !verify_password(password, hash).await? {
        return Err(ApiError::Unauthorized("Incorrect password.".into()));
    }

    let token = state.tokens.issue(&user)?;
    Ok(Json(json!({
        "message": "Login successful!",
        "token": token,
        "username": user,
    })))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<MeResponse>> {
    let profile = state
        .db
        .get_profile(user.as_str())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists.".into()))?;
    let unread_notifications = state.db.unread_count(user.as_str()).await?;

    Ok(Json(MeResponse {
        profile,
        unread_notifications,
    }))
}

pub async fn user_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    state
        .db
        .get_profile(&username)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found."))
}
