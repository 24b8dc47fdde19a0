//! Integration tests for bandstand-server API endpoints
//!
//! Tests cover:
//! - Health endpoint and member identity requirements
//! - Suggestion intake, quota reporting and quota exhaustion
//! - Vote queue and casting (including another member's vote)
//! - Rankings ordering and pagination metadata
//! - Setlist editing, reorder conflicts, lifecycle filters and documents
//! - Media search with and without a configured provider

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bandstand_common::db::init_memory_database;
use bandstand_common::models::Setlist;
use bandstand_server::render::SetlistRenderer;
use bandstand_server::search::{MediaHit, MediaSearch};
use bandstand_server::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over a fresh in-memory database
async fn setup_app() -> Router {
    let db = init_memory_database().await.expect("memory database");
    build_router(AppState::new(db))
}

/// Test helper: send a request and return status plus parsed JSON body
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    member: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(member) = member {
        builder = builder.header("x-member-id", member);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

/// Test helper: register a member and return its id
async fn register(app: &Router, name: &str) -> String {
    let (status, body) = send(app, "POST", "/api/members", None, Some(json!({"display_name": name}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

/// Test helper: suggest a song and return its id
async fn suggest(app: &Router, member: &str, title: &str, minutes: f64) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/suggestions",
        Some(member),
        Some(json!({"title": title, "artist": "The Band", "duration_minutes": minutes})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "suggest failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Health and identity
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_identity_required() {
    let app = setup_app().await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "bandstand-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_missing_member_header_is_unauthorized() {
    let app = setup_app().await;

    let (status, body) = send(&app, "GET", "/api/quota", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn test_malformed_member_header_is_validation_error() {
    let app = setup_app().await;

    let (status, body) = send(&app, "GET", "/api/quota", Some("not-a-uuid"), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

// =============================================================================
// Suggestions and quota
// =============================================================================

#[tokio::test]
async fn test_quota_counts_down_and_rejects_fourth_suggestion() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;

    let (status, body) = send(&app, "GET", "/api/quota", Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], 3);
    assert_eq!(body["limit"], 3);

    for title in ["One", "Two", "Three"] {
        suggest(&app, &ana, title, 3.0).await;
    }

    let (status, body) = send(
        &app,
        "POST",
        "/api/suggestions",
        Some(&ana),
        Some(json!({"title": "Four", "artist": "The Band"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "quota_exceeded");

    let (_, body) = send(&app, "GET", "/api/quota", Some(&ana), None).await;
    assert_eq!(body["remaining"], 0);
    assert_eq!(body["used"], 3);

    let (status, body) = send(&app, "GET", "/api/quota/history", Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["used"], 3);
}

#[tokio::test]
async fn test_blank_title_is_rejected_without_using_quota() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/suggestions",
        Some(&ana),
        Some(json!({"title": "  ", "artist": "The Band"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    let (_, body) = send(&app, "GET", "/api/quota", Some(&ana), None).await;
    assert_eq!(body["remaining"], 3);
}

#[tokio::test]
async fn test_missing_body_field_is_validation_error() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/suggestions",
        Some(&ana),
        Some(json!({"artist": "The Band"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("title"));
    let (_, body) = send(&app, "GET", "/api/quota", Some(&ana), None).await;
    assert_eq!(body["remaining"], 3);
}

#[tokio::test]
async fn test_body_without_json_content_type_is_validation_error() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/suggestions")
        .header("x-member-id", ana.as_str())
        .body(Body::from(r#"{"title": "Valerie", "artist": "The Band"}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body: Value = serde_json::from_slice(&bytes).expect("JSON error body");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_late_joiner_is_enrolled_on_existing_songs() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;
    suggest(&app, &ana, "Valerie", 3.9).await;

    let (status, body) = send(&app, "POST", "/api/members", None, Some(json!({"display_name": "Ben"}))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pending_votes"], 1);
}

// =============================================================================
// Voting
// =============================================================================

#[tokio::test]
async fn test_vote_flow_updates_rankings() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;
    let ben = register(&app, "Ben").await;
    let valerie = suggest(&app, &ana, "Valerie", 3.9).await;
    suggest(&app, &ana, "Jolene", 2.7).await;

    // Ben's queue is oldest first
    let (status, body) = send(&app, "GET", "/api/votes/next", Some(&ben), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"], 2);
    assert_eq!(body["song"]["title"], "Valerie");
    let vote_id = body["vote"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/votes/{}", vote_id),
        Some(&ben),
        Some(json!({"vote_type": "up"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["vote_type"], "up");

    // Second cast of the same vote
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/votes/{}", vote_id),
        Some(&ben),
        Some(json!({"vote_type": "down"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_state_transition");

    let (status, body) = send(&app, "GET", "/api/rankings", Some(&ben), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_results"], 2);
    assert_eq!(body["songs"][0]["title"], "Valerie");
    assert_eq!(body["songs"][0]["rank"], 1);
    assert_eq!(body["songs"][0]["yes_votes"], 1);
    assert_eq!(body["songs"][1]["rank"], 2);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/songs/{}/tally", valerie),
        Some(&ben),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"up": 1, "down": 0, "skip": 0, "pending": 0}));
}

#[tokio::test]
async fn test_cannot_cast_another_members_vote() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;
    let ben = register(&app, "Ben").await;
    suggest(&app, &ana, "Valerie", 3.9).await;

    let (_, body) = send(&app, "GET", "/api/votes/next", Some(&ben), None).await;
    let vote_id = body["vote"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/votes/{}", vote_id),
        Some(&ana),
        Some(json!({"vote_type": "up"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_open_vote_endpoint_rejects_existing_and_own_songs() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;
    let ben = register(&app, "Ben").await;
    let song_id = suggest(&app, &ana, "Valerie", 3.9).await;
    let uri = format!("/api/songs/{}/votes", song_id);

    // Ben was fanned out a vote on submission
    let (status, body) = send(&app, "POST", &uri, Some(&ben), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "duplicate_vote");

    let (status, body) = send(&app, "POST", &uri, Some(&ana), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let unknown = format!("/api/songs/{}/votes", uuid::Uuid::new_v4());
    let (status, _) = send(&app, "POST", &unknown, Some(&ben), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/votes/next", Some(&ben), None).await;
    assert_eq!(body["pending"], 1);
}

#[tokio::test]
async fn test_unknown_vote_type_is_rejected() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;
    let ben = register(&app, "Ben").await;
    suggest(&app, &ana, "Valerie", 3.9).await;
    let (_, body) = send(&app, "GET", "/api/votes/next", Some(&ben), None).await;
    let vote_id = body["vote"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/votes/{}", vote_id),
        Some(&ben),
        Some(json!({"vote_type": "maybe"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_queue_returns_null_vote() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;

    let (status, body) = send(&app, "GET", "/api/votes/next", Some(&ana), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"], 0);
    assert!(body["vote"].is_null());
}

#[tokio::test]
async fn test_unknown_sort_is_rejected() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;

    let (status, _) = send(&app, "GET", "/api/rankings?sort=loudness", Some(&ana), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Setlists
// =============================================================================

#[tokio::test]
async fn test_setlist_editing_flow() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;
    let songs = [
        suggest(&app, &ana, "A", 3.0).await,
        suggest(&app, &ana, "B", 4.0).await,
        suggest(&app, &ana, "C", 2.5).await,
    ];

    let (status, setlist) = send(
        &app,
        "POST",
        "/api/setlists",
        Some(&ana),
        Some(json!({
            "name": "Friday",
            "event_date": "2099-11-20",
            "event_time": "21:00:00",
            "target_duration_minutes": 10.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", setlist);
    assert_eq!(setlist["phase"], "upcoming");
    assert_eq!(setlist["duration_status"], "under_target");
    let setlist_id = setlist["id"].as_str().unwrap().to_string();

    let mut item_ids = Vec::new();
    for song_id in &songs {
        let (status, item) = send(
            &app,
            "POST",
            &format!("/api/setlists/{}/items", setlist_id),
            Some(&ana),
            Some(json!({"song_id": song_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        item_ids.push(item["id"].as_str().unwrap().to_string());
    }

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/setlists/{}/items", setlist_id),
        Some(&ana),
        Some(json!({"song_id": songs[0]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "duplicate_song");

    // Move C to the front
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/setlists/{}/items/{}/position", setlist_id, item_ids[2]),
        Some(&ana),
        Some(json!({"new_index": 0, "expected_version": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["C", "A", "B"]);
    assert_eq!(body["version"], 4);
    assert_eq!(body["duration_status"], "near_target");

    // A stale editor loses
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/setlists/{}/items/{}/position", setlist_id, item_ids[0]),
        Some(&ana),
        Some(json!({"new_index": 2, "expected_version": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "version_conflict");

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/setlists/{}/items/{}", setlist_id, item_ids[0]),
        Some(&ana),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][1]["position"], 2);

    let (status, candidates) = send(
        &app,
        "GET",
        &format!("/api/setlists/{}/candidates", setlist_id),
        Some(&ana),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(candidates.as_array().unwrap().len(), 1);
    assert_eq!(candidates[0]["title"], "A");
}

#[tokio::test]
async fn test_setlist_phase_filters() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;

    for (name, date) in [("Future", "2099-01-01"), ("Old", "2001-01-01")] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/setlists",
            Some(&ana),
            Some(json!({"name": name, "event_date": date})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, upcoming) = send(&app, "GET", "/api/setlists?phase=upcoming", Some(&ana), None).await;
    assert_eq!(upcoming.as_array().unwrap().len(), 1);
    assert_eq!(upcoming[0]["name"], "Future");

    let (_, archived) = send(&app, "GET", "/api/setlists?phase=archived", Some(&ana), None).await;
    assert_eq!(archived.as_array().unwrap().len(), 1);
    assert_eq!(archived[0]["name"], "Old");

    let (_, all) = send(&app, "GET", "/api/setlists", Some(&ana), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    // Archiving by hand moves the future setlist too
    let future_id = upcoming[0]["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/setlists/{}/archive", future_id),
        Some(&ana),
        Some(json!({"archived": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "archived");

    let (status, _) = send(&app, "GET", "/api/setlists?phase=someday", Some(&ana), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_setlist_document_and_delete() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;
    let song = suggest(&app, &ana, "Valerie", 3.5).await;
    let (_, setlist) = send(
        &app,
        "POST",
        "/api/setlists",
        Some(&ana),
        Some(json!({"name": "Friday", "event_date": "2099-11-20"})),
    )
    .await;
    let setlist_id = setlist["id"].as_str().unwrap().to_string();
    send(
        &app,
        "POST",
        &format!("/api/setlists/{}/items", setlist_id),
        Some(&ana),
        Some(json!({"song_id": song})),
    )
    .await;

    let request = Request::builder()
        .uri(format!("/api/setlists/{}/document", setlist_id))
        .header("x-member-id", &ana)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(" 1. Valerie - The Band (3:30)"));

    let (status, _) = send(&app, "DELETE", &format!("/api/setlists/{}", setlist_id), Some(&ana), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "GET", &format!("/api/setlists/{}", setlist_id), Some(&ana), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

struct MarkdownRenderer;

impl SetlistRenderer for MarkdownRenderer {
    fn content_type(&self) -> &'static str {
        "text/markdown"
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, setlist: &Setlist) -> bandstand_common::Result<Vec<u8>> {
        Ok(format!("# {}\n", setlist.name).into_bytes())
    }
}

#[tokio::test]
async fn test_document_uses_configured_renderer() {
    let db = init_memory_database().await.unwrap();
    let app = build_router(AppState::new(db).with_renderer(Arc::new(MarkdownRenderer)));
    let ana = register(&app, "Ana").await;
    let (_, setlist) = send(
        &app,
        "POST",
        "/api/setlists",
        Some(&ana),
        Some(json!({"name": "Friday", "event_date": "2099-11-20"})),
    )
    .await;

    let request = Request::builder()
        .uri(format!("/api/setlists/{}/document", setlist["id"].as_str().unwrap()))
        .header("x-member-id", &ana)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/markdown");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"setlist-2099-11-20.md\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"# Friday\n");
}

// =============================================================================
// Media search
// =============================================================================

struct FixedSearch;

#[async_trait]
impl MediaSearch for FixedSearch {
    async fn search(&self, query: &str) -> bandstand_common::Result<Vec<MediaHit>> {
        Ok(vec![MediaHit {
            id: "abc123".to_string(),
            title: format!("{} (Official Video)", query),
            channel: "The Band".to_string(),
            thumbnail: None,
            view_count: Some(42),
        }])
    }
}

#[tokio::test]
async fn test_search_without_provider_is_unavailable() {
    let app = setup_app().await;
    let ana = register(&app, "Ana").await;

    let (status, body) = send(&app, "GET", "/api/search?q=valerie", Some(&ana), None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "service_unavailable");
}

#[tokio::test]
async fn test_search_uses_configured_provider() {
    let db = init_memory_database().await.unwrap();
    let app = build_router(AppState::new(db).with_media_search(Arc::new(FixedSearch)));
    let ana = register(&app, "Ana").await;

    let (status, body) = send(&app, "GET", "/api/search?q=Valerie", Some(&ana), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], "abc123");
    assert_eq!(body[0]["title"], "Valerie (Official Video)");
    assert_eq!(body[0]["view_count"], 42);
}
