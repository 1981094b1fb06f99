use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, SecondsFormat, Utc};
use domain::WallEvent;
use serde_json::{json, Value};
use storage::Db;
use tower::ServiceExt;

use super::router::build_router;
use crate::auth::TokenKeys;
use crate::config::WallSettings;
use crate::state::AppState;

async fn app_with(wall: WallSettings) -> (Router, AppState) {
    let db = Db::new("sqlite::memory:").await.unwrap();
    let state = AppState::new(db, TokenKeys::new(b"test-secret", 60), wall);
    (build_router(state.clone(), "*"), state)
}

async fn app() -> Router {
    app_with(WallSettings::default()).await.0
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header("authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn signup(app: &Router, username: &str) -> String {
    let creds = json!({ "username": username, "password": "correct horse" });
    let (status, _) = call(app, Method::POST, "/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(app, Method::POST, "/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn post_comment(app: &Router, token: &str, body: Value) -> Value {
    let (status, body) = call(app, Method::POST, "/comments", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["comment"].clone()
}

async fn inbox(app: &Router, token: &str) -> Vec<Value> {
    let (status, body) = call(app, Method::GET, "/notifications", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    body["notifications"].as_array().unwrap().clone()
}

#[tokio::test]
async fn registration_and_login_rules() {
    let app = app().await;
    signup(&app, "alice").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "ALICE", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already exists.");

    let (status, body) = call(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username and password are required.");

    let (status, _) = call(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "no spaces", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect password.");

    let (status, body) = call(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "nobody", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User not found. Please register.");

    let (status, body) = call(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "Alice", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn bearer_token_is_required_and_checked() {
    let app = app().await;
    let body = json!({ "comment": "hello" });

    let (status, resp) = call(&app, Method::POST, "/comments", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["error"], "Access denied. No token provided.");

    let (status, resp) = call(&app, Method::POST, "/comments", Some("garbage"), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["error"], "Invalid token.");

    let token = signup(&app, "alice").await;
    let (status, me) = call(&app, Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["unreadNotifications"], 0);
}

#[tokio::test]
async fn posting_and_listing_the_wall() {
    let app = app().await;
    let token = signup(&app, "alice").await;

    let first = post_comment(&app, &token, json!({ "comment": "first!" })).await;
    let second = post_comment(
        &app,
        &token,
        json!({ "comment": "  look  ", "mediaUrl": "https://example.com/a.gif" }),
    )
    .await;
    assert_eq!(second["comment"], "look");
    assert_eq!(second["media"]["kind"], "image");
    assert_eq!(second["likes"], 0);
    assert_eq!(second["likedBy"], json!([]));

    let (status, list) = call(&app, Method::GET, "/comments", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = list.as_array().unwrap().iter().map(|c| c["id"].clone()).collect();
    assert_eq!(ids, vec![second["id"].clone(), first["id"].clone()]);

    let (status, _) = call(&app, Method::GET, "/comments?limit=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        call(&app, Method::POST, "/comments", Some(&token), Some(json!({ "comment": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Comment cannot be empty.");

    let (status, body) = call(
        &app,
        Method::POST,
        "/comments",
        Some(&token),
        Some(json!({ "comment": "x", "mediaUrl": "ftp://example.com/a.gif" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (profile_status, profile) = call(&app, Method::GET, "/users/alice", None, None).await;
    assert_eq!(profile_status, StatusCode::OK);
    assert!(profile["lastPostedAt"].is_string());
    assert!(profile.get("passwordHash").is_none());
}

#[tokio::test]
async fn like_and_dislike_toggle_exclusively() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    let comment = post_comment(&app, &alice, json!({ "comment": "rate me" })).await;
    let target = json!({ "commentId": comment["id"] });

    let (status, body) =
        call(&app, Method::POST, "/like-comment", Some(&bob), Some(target.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((body["likes"].clone(), body["dislikes"].clone()), (json!(1), json!(0)));
    assert_eq!(body["vote"], "like");

    let (_, body) =
        call(&app, Method::POST, "/dislike-comment", Some(&bob), Some(target.clone())).await;
    assert_eq!((body["likes"].clone(), body["dislikes"].clone()), (json!(0), json!(1)));

    let (_, body) =
        call(&app, Method::POST, "/dislike-comment", Some(&bob), Some(target.clone())).await;
    assert_eq!((body["likes"].clone(), body["dislikes"].clone()), (json!(0), json!(0)));
    assert_eq!(body["vote"], Value::Null);

    call(&app, Method::POST, "/like-comment", Some(&alice), Some(target.clone())).await;
    let (_, fetched) = call(
        &app,
        Method::GET,
        &format!("/comments/{}", comment["id"].as_str().unwrap()),
        None,
        None,
    )
    .await;
    assert_eq!(fetched["likedBy"], json!(["alice"]));
    assert_eq!(fetched["dislikedBy"], json!([]));

    let (status, _) = call(
        &app,
        Method::POST,
        "/like-comment",
        Some(&bob),
        Some(json!({ "commentId": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::POST, "/like-comment", Some(&bob), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tags_and_replies_fan_out_notifications() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    let carol = signup(&app, "carol").await;

    let root = post_comment(
        &app,
        &alice,
        json!({ "comment": "hey @Bob and @ghost, and me @alice" }),
    )
    .await;
    assert_eq!(root["taggedUsers"], json!(["alice", "bob"]));

    let bob_inbox = inbox(&app, &bob).await;
    assert_eq!(bob_inbox.len(), 1);
    assert_eq!(bob_inbox[0]["kind"], "tag");
    assert_eq!(bob_inbox[0]["from"], "alice");
    assert!(inbox(&app, &alice).await.is_empty());

    post_comment(
        &app,
        &bob,
        json!({ "comment": "@alice thanks! cc @carol", "parentId": root["id"] }),
    )
    .await;

    let alice_inbox = inbox(&app, &alice).await;
    assert_eq!(alice_inbox.len(), 1);
    assert_eq!(alice_inbox[0]["kind"], "reply");
    assert_eq!(inbox(&app, &carol).await[0]["kind"], "tag");

    let (_, marked) = call(&app, Method::POST, "/notifications/read", Some(&alice), None).await;
    assert_eq!(marked["updated"], 1);
    let (_, listed) = call(
        &app,
        Method::GET,
        "/notifications?unreadOnly=true",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(listed["unread"], 0);
    assert_eq!(listed["notifications"], json!([]));

    let (_, cleared) = call(&app, Method::DELETE, "/notifications", Some(&bob), None).await;
    assert_eq!(cleared["deleted"], 1);
}

#[tokio::test]
async fn edit_and_delete_are_author_only() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    let carol = signup(&app, "carol").await;

    let comment = post_comment(&app, &alice, json!({ "comment": "hi @bob" })).await;
    let uri = format!("/comments/{}", comment["id"].as_str().unwrap());

    let (status, _) = call(&app, Method::PUT, &uri, Some(&bob), Some(json!({ "comment": "x" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some(&alice),
        Some(json!({ "comment": "hi @bob and @carol" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["comment"]["editedAt"].is_string());

    // bob was already tagged, only carol hears about the edit
    assert_eq!(inbox(&app, &bob).await.len(), 1);
    assert_eq!(inbox(&app, &carol).await.len(), 1);

    let (status, _) = call(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, deleted) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(deleted["deleted"], true);
    assert_eq!(deleted["comment"], "");

    let (status, _) = call(
        &app,
        Method::POST,
        "/comments",
        Some(&bob),
        Some(json!({ "comment": "late reply", "parentId": comment["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn private_nests_keep_outsiders_out() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;

    let (status, created) = call(
        &app,
        Method::POST,
        "/nests",
        Some(&alice),
        Some(json!({ "name": "Secret Garden", "isPrivate": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let nest_id = created["nest"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::POST,
        "/nests",
        Some(&bob),
        Some(json!({ "name": "secret garden" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let nested = post_comment(
        &app,
        &alice,
        json!({ "comment": "members only @bob", "nestId": nest_id }),
    )
    .await;
    // bob is not a member yet, so the tag is dropped
    assert_eq!(nested["taggedUsers"], json!([]));

    let feed = format!("/nests/{}/comments", nest_id);
    let (status, _) = call(&app, Method::GET, &feed, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::GET, &feed, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/comments/{}", nested["id"].as_str().unwrap()),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        Method::POST,
        "/comments",
        Some(&bob),
        Some(json!({ "comment": "let me in", "nestId": nest_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/nests/{}/join", nest_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, nests) = call(&app, Method::GET, "/nests", Some(&bob), None).await;
    assert_eq!(nests, json!([]));

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/nests/{}/members", nest_id),
        Some(&alice),
        Some(json!({ "username": "BOB" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bob_inbox = inbox(&app, &bob).await;
    assert_eq!(bob_inbox[0]["kind"], "nest_invite");
    assert_eq!(bob_inbox[0]["nestId"], nest_id.as_str());

    let reply = post_comment(
        &app,
        &bob,
        json!({ "comment": "thanks", "parentId": nested["id"] }),
    )
    .await;
    assert_eq!(reply["nestId"], nest_id.as_str());

    let (status, list) = call(&app, Method::GET, &feed, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (_, wall) = call(&app, Method::GET, "/comments", None, None).await;
    assert_eq!(wall, json!([]));
}

#[tokio::test]
async fn public_nests_can_be_joined_and_left() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;

    let (_, created) = call(
        &app,
        Method::POST,
        "/nests",
        Some(&alice),
        Some(json!({ "name": "Open Kitchen" })),
    )
    .await;
    let nest_id = created["nest"]["id"].as_str().unwrap().to_string();

    let join = format!("/nests/{}/join", nest_id);
    let leave = format!("/nests/{}/leave", nest_id);
    assert_eq!(call(&app, Method::POST, &join, Some(&bob), None).await.0, StatusCode::OK);
    assert_eq!(call(&app, Method::POST, &join, Some(&bob), None).await.0, StatusCode::OK);

    let (_, nest) = call(&app, Method::GET, &format!("/nests/{}", nest_id), None, None).await;
    assert_eq!(nest["members"].as_array().unwrap().len(), 2);

    assert_eq!(call(&app, Method::POST, &leave, Some(&bob), None).await.0, StatusCode::OK);
    assert_eq!(
        call(&app, Method::POST, &leave, Some(&bob), None).await.0,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        call(&app, Method::GET, "/nests/nope", None, None).await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn cooldown_limits_posting_rate() {
    let wall = WallSettings {
        post_cooldown_secs: 60,
        ..WallSettings::default()
    };
    let (app, _) = app_with(wall).await;
    let token = signup(&app, "alice").await;

    post_comment(&app, &token, json!({ "comment": "one" })).await;
    let (status, body) =
        call(&app, Method::POST, "/comments", Some(&token), Some(json!({ "comment": "two" }))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().starts_with("Please wait"));
}

#[tokio::test]
async fn new_comments_since_timestamp() {
    let app = app().await;
    let token = signup(&app, "alice").await;
    let since = (Utc::now() - Duration::minutes(1)).to_rfc3339_opts(SecondsFormat::Secs, true);

    post_comment(&app, &token, json!({ "comment": "fresh" })).await;

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/new-comments?since={}", since),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["newComments"][0]["comment"], "fresh");

    let (status, _) = call(&app, Method::GET, "/new-comments", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) =
        call(&app, Method::GET, "/new-comments?since=yesterday", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn posting_publishes_live_events() {
    let (app, state) = app_with(WallSettings::default()).await;
    let mut rx = state.tx_events.subscribe();
    let token = signup(&app, "alice").await;

    let comment = post_comment(&app, &token, json!({ "comment": "live" })).await;
    match rx.recv().await.unwrap() {
        WallEvent::CommentPosted { comment: event } => {
            assert_eq!(event.id, comment["id"].as_str().unwrap());
            assert_eq!(event.content, "live");
        }
        other => panic!("unexpected event {:?}", other),
    }

    let (status, _) = call(&app, Method::GET, "/comments/stream?nest=missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn create_nest(app: &Router, token: &str, name: &str, is_private: bool) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/nests",
        Some(token),
        Some(json!({ "name": name, "isPrivate": is_private })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["nest"]["id"].as_str().unwrap().to_string()
}

async fn call_raw(app: &Router, uri: &str, token: &str, body: &'static str) -> StatusCode {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(req).await.unwrap().status()
}

#[tokio::test]
async fn marking_notifications_read_by_id() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    post_comment(&app, &alice, json!({ "comment": "one @bob" })).await;
    post_comment(&app, &alice, json!({ "comment": "two @bob" })).await;

    let unread = |app: Router, token: String| async move {
        let (_, body) = call(&app, Method::GET, "/notifications", Some(&token), None).await;
        body["unread"].clone()
    };

    for bad in [r#"{"ids":"not-a-list"}"#, "{nope", r#"{"ids":[1,2]}"#] {
        assert_eq!(
            call_raw(&app, "/notifications/read", &bob, bad).await,
            StatusCode::BAD_REQUEST,
            "{}",
            bad
        );
    }
    assert_eq!(unread(app.clone(), bob.clone()).await, 2);

    let first = inbox(&app, &bob).await[0]["id"].clone();
    let (status, body) = call(
        &app,
        Method::POST,
        "/notifications/read",
        Some(&bob),
        Some(json!({ "ids": [first] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);
    assert_eq!(unread(app.clone(), bob.clone()).await, 1);

    // alice cannot touch bob's notifications
    let (_, body) = call(
        &app,
        Method::POST,
        "/notifications/read",
        Some(&alice),
        Some(json!({ "ids": [inbox(&app, &bob).await[1]["id"].clone()] })),
    )
    .await;
    assert_eq!(body["updated"], 0);

    assert_eq!(call_raw(&app, "/notifications/read", &bob, "").await, StatusCode::OK);
    assert_eq!(unread(app.clone(), bob.clone()).await, 0);
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() {
    let app = app().await;
    let token = signup(&app, "alice").await;
    let req = Request::builder()
        .uri("/me")
        .header("authorization", format!("bearer {}", token))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn private_nest_comments_refuse_outside_votes() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    let nest_id = create_nest(&app, &alice, "Inner Circle", true).await;
    let comment = post_comment(&app, &alice, json!({ "comment": "secret", "nestId": nest_id })).await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/like-comment",
        Some(&bob),
        Some(json!({ "commentId": comment["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, fetched) = call(
        &app,
        Method::GET,
        &format!("/comments/{}", comment["id"].as_str().unwrap()),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(fetched["likes"], 0);
}

#[tokio::test]
async fn replies_cannot_move_to_another_nest() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let nest_id = create_nest(&app, &alice, "Garden", false).await;
    let root = post_comment(&app, &alice, json!({ "comment": "on the wall" })).await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/comments",
        Some(&alice),
        Some(json!({ "comment": "moved", "parentId": root["id"], "nestId": nest_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_members_can_add_existing_users() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    signup(&app, "carol").await;
    let nest_id = create_nest(&app, &alice, "Book Club", true).await;
    let members = format!("/nests/{}/members", nest_id);

    let (status, _) = call(
        &app,
        Method::POST,
        &members,
        Some(&bob),
        Some(json!({ "username": "carol" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        Method::POST,
        &members,
        Some(&alice),
        Some(json!({ "username": "nobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::POST,
        &members,
        Some(&alice),
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wall_stream_skips_nest_events() {
    use futures::StreamExt;

    let (app, state) = app_with(WallSettings::default()).await;
    let alice = signup(&app, "alice").await;
    let private_id = create_nest(&app, &alice, "Hidden", true).await;

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/comments/stream?nest={}", private_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = Request::builder()
        .uri("/comments/stream")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let mut body = resp.into_body().into_data_stream();

    state.publish(WallEvent::CommentDeleted {
        comment_id: "in-nest".into(),
        nest_id: Some(private_id),
    });
    state.publish(WallEvent::CommentDeleted {
        comment_id: "on-wall".into(),
        nest_id: None,
    });

    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), body.next())
        .await
        .expect("stream produced no event")
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&frame);
    assert!(text.contains("event: delete_comment"), "{}", text);
    assert!(text.contains("on-wall"), "{}", text);
    assert!(!text.contains("in-nest"), "{}", text);
}
