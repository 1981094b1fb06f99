use super::handlers::{accounts, comments, nests, notifications, sse, votes};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

const METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins == "*" {
        return CorsLayer::new()
            .allow_methods(METHODS)
            .allow_origin(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS config is invalid or empty, falling back to allow ANY.");
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_origin(Any)
            .allow_headers(Any)
    } else {
        tracing::info!("CORS enabled for origins: {:?}", origins);
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_origin(origins)
            .allow_headers(Any)
    }
}

pub fn build_router(state: AppState, allowed_origins: &str) -> Router {
    Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/me", get(accounts::me))
        .route("/users/:username", get(accounts::user_profile))
        .route(
            "/comments",
            get(comments::list_comments).post(comments::post_comment),
        )
        .route("/comments/stream", get(sse::sse_handler))
        .route(
            "/comments/:id",
            get(comments::get_comment)
                .put(comments::edit_comment)
                .delete(comments::delete_comment),
        )
        .route("/comments/:id/replies", get(comments::list_replies))
        .route("/like-comment", post(votes::like_comment))
        .route("/dislike-comment", post(votes::dislike_comment))
        .route("/new-comments", get(comments::new_comments))
        .route(
            "/notifications",
            get(notifications::list_notifications).delete(notifications::clear_notifications),
        )
        .route("/notifications/read", post(notifications::mark_read))
        .route("/nests", get(nests::list_nests).post(nests::create_nest))
        .route("/nests/:id", get(nests::get_nest))
        .route("/nests/:id/join", post(nests::join_nest))
        .route("/nests/:id/leave", post(nests::leave_nest))
        .route("/nests/:id/members", post(nests::add_member))
        .route("/nests/:id/comments", get(nests::nest_comments))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}
