//! Router-level tests against fake collaborators.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use vocalless_api::{create_router, ApiConfig, AppState};
use vocalless_jobs::JobRegistry;
use vocalless_media::{MediaConfig, PlaylistExpander};
use vocalless_metadata::{MetadataGenerator, DEFAULT_COLLECTION_DESCRIPTION};
use vocalless_models::CollectionSummary;
use vocalless_publish::PublisherFactory;
use vocalless_worker::testing::{FakePlaylistExpander, FakePublisher, FakeStack};
use vocalless_worker::{JobDispatcher, WorkerConfig};

const PLAYLIST: &str = "https://www.youtube.com/playlist?list=PLmix";

struct TestApp {
    router: Router,
    stack: FakeStack,
    _dir: TempDir,
}

fn app_with(stack: FakeStack, dir: TempDir, publishing: bool) -> TestApp {
    let expander: Arc<dyn PlaylistExpander> = Arc::new(
        FakePlaylistExpander::default().with_playlist(
            PLAYLIST,
            &["https://example.com/p1", "https://example.com/p2"],
        ),
    );
    let mut collaborators = stack.collaborators();
    let publisher: Option<Arc<dyn PublisherFactory>> = if publishing {
        Some(stack.factory.clone())
    } else {
        None
    };
    collaborators.publisher = publisher.clone();

    let dispatcher = JobDispatcher::new(
        Arc::new(JobRegistry::new()),
        collaborators,
        &WorkerConfig::default(),
    );
    let state = AppState::new(
        ApiConfig::default(),
        MediaConfig::default(),
        dispatcher,
        expander,
        publisher,
        MetadataGenerator::canned(),
    );

    TestApp {
        router: create_router(state, None),
        stack,
        _dir: dir,
    }
}

fn app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path());
    app_with(stack, dir, true)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn wait_finished(router: &Router, job_id: &str) -> Value {
    for _ in 0..2000 {
        let (status, job) = send(router, "GET", &format!("/jobs/{job_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        if matches!(job["status"].as_str(), Some("completed" | "failed" | "cancelled")) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_id} never finished");
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_submit_without_urls_is_rejected() {
    let app = app();

    let (status, body) = send(&app.router, "POST", "/jobs", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"detail": "No URLs provided"}));

    let (status, body) = send(
        &app.router,
        "POST",
        "/jobs",
        Some(json!({"video_urls": ["  ", ""]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No URLs provided");
}

#[tokio::test]
async fn test_submit_and_poll_to_completion() {
    let app = app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/jobs",
        Some(json!({"video_urls": ["https://example.com/a", "https://example.com/b"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Processing started");
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job = wait_finished(&app.router, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"], 100);
    assert_eq!(job["total_items"], 2);
    assert_eq!(job["results"].as_array().unwrap().len(), 2);
    assert_eq!(job["results"][0]["source"], "https://example.com/a");
    assert_eq!(job["results"][0]["outcome"], "succeeded");
    let fields = job.as_object().unwrap();
    for key in ["error", "collection_id", "collection_url"] {
        assert!(fields[key].is_null(), "{key}");
    }

    let (status, list) = send(&app.router, "GET", "/jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["job_id"], job_id.as_str());
    assert_eq!(list[0]["status"], "completed");

    // Cancelling a finished job reports its final status.
    let (status, body) = send(&app.router, "POST", &format!("/jobs/{job_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn test_urls_are_normalized_and_playlist_expanded() {
    let app = app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/jobs",
        Some(json!({
            "video_urls": ["  https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLx  "],
            "playlist_url": PLAYLIST,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let job = wait_finished(&app.router, body["job_id"].as_str().unwrap()).await;
    assert_eq!(
        job["inputs"],
        json!([
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://example.com/p1",
            "https://example.com/p2",
        ])
    );
}

#[tokio::test]
async fn test_unknown_playlist_is_a_client_error() {
    let app = app();
    let (status, body) = send(
        &app.router,
        "POST",
        "/jobs",
        Some(json!({"playlist_url": "https://www.youtube.com/playlist?list=PLnope"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Failed to expand playlist"));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = app();

    let (status, body) = send(&app.router, "GET", "/jobs/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Not found: Job not found"}));

    let (status, _) = send(&app.router, "POST", "/jobs/missing/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_publish_job_uses_request_options() {
    let app = app();

    let (_, body) = send(
        &app.router,
        "POST",
        "/jobs",
        Some(json!({
            "video_urls": ["https://example.com/a"],
            "publish": true,
            "create_collection": true,
            "add_to_collection": true,
            "collection_name": "Night Drive",
            "privacy": "unlisted",
        })),
    )
    .await;

    let job = wait_finished(&app.router, body["job_id"].as_str().unwrap()).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["options"]["privacy"], "unlisted");
    assert_eq!(job["collection_url"], "https://fake.test/collections/PLfake1");
    assert_eq!(job["results"][0]["added_to_collection"], true);
    assert_eq!(app.stack.publisher.created_collections()[0].0, "Night Drive");
}

#[tokio::test]
async fn test_list_collections() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path()).with_publisher(FakePublisher::default().with_collections(
        vec![CollectionSummary {
            id: "PL1".into(),
            title: "Focus".into(),
        }],
    ));
    let app = app_with(stack, dir, true);

    let (status, body) = send(&app.router, "GET", "/collections", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": "PL1", "title": "Focus"}]));
}

#[tokio::test]
async fn test_collections_without_publisher_fail() {
    let dir = TempDir::new().unwrap();
    let stack = FakeStack::new(dir.path());
    let app = app_with(stack, dir, false);

    let (status, _) = send(&app.router, "GET", "/collections", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_create_collection() {
    let app = app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/collections",
        Some(json!({"title": "Late Night"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collection_id"], "PLfake1");
    assert_eq!(body["collection_url"], "https://fake.test/collections/PLfake1");
    assert_eq!(
        app.stack.publisher.created_collections(),
        vec![("Late Night".to_string(), DEFAULT_COLLECTION_DESCRIPTION.to_string())]
    );
}

#[tokio::test]
async fn test_create_collection_validation() {
    let app = app();

    let (status, _) = send(&app.router, "POST", "/collections", Some(json!({"title": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let long = "x".repeat(151);
    let (status, _) = send(&app.router, "POST", "/collections", Some(json!({"title": long}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.stack.publisher.created_collections().is_empty());
}

#[tokio::test]
async fn test_collection_creation_failure() {
    let dir = TempDir::new().unwrap();
    let stack =
        FakeStack::new(dir.path()).with_publisher(FakePublisher::default().fail_create_collection());
    let app = app_with(stack, dir, true);

    let (status, body) = send(
        &app.router,
        "POST",
        "/collections",
        Some(json!({"title": "Mix"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().is_some());
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("X-Request-ID", "req-123")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}
