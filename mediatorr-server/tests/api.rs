use std::path::Path;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use mediatorr_config::ConfigLoader;
use mediatorr_server::{infra::startup::build_state, routes::create_app};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_stream::StreamExt;
use tower::ServiceExt;

const BODY_LIMIT: usize = 1024 * 1024;

struct TestApp {
    dir: TempDir,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("torrent");
        for media_type in ["films", "series", "musiques"] {
            std::fs::create_dir_all(root.join(media_type)).unwrap();
        }

        let mut config = ConfigLoader::new()
            .with_default_locations(Vec::new())
            .load_with(|_| None)
            .unwrap()
            .config;
        config.library.torrent_root = root;
        config.library.tmdb_cache = dir.path().join("cache_tmdb");
        config.library.itunes_cache = dir.path().join("cache_itunes");
        config.library.status_file = dir.path().join("status.json");
        config.library.settings_file = dir.path().join("config.json");
        config.database.path = dir.path().join("mediatorr.db");
        config.scan.program = "/bin/sh".to_string();
        config.scan.args = vec!["-c".to_string(), "sleep 2".to_string()];
        config.scan.stop_grace = Duration::from_millis(500);

        let state = build_state(config).await.unwrap();
        Self {
            dir,
            router: create_app(state),
        }
    }

    fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("torrent")
    }

    fn add_item(&self, media_type: &str, name: &str, suffixes: &[&str]) {
        let item = self.root().join(media_type).join(name);
        std::fs::create_dir_all(&item).unwrap();
        for suffix in suffixes {
            std::fs::write(item.join(format!("{name}{suffix}")), name).unwrap();
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn invalid_media_type_uses_error_shape() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/media/books").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": { "message": "Invalid media type", "status": 400 } })
    );
}

#[tokio::test]
async fn lists_items_with_lenient_paging() {
    let app = TestApp::new().await;
    app.add_item("films", "Heat", &[".torrent", ".nfo"]);
    app.add_item("films", "Alien", &[]);

    let (status, body) = app.get("/api/media/films?perPage=abc&sort=bogus").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["items"][0]["name"], "Alien");
    assert_eq!(body["items"][1]["files"]["torrent"], true);
}

#[tokio::test]
async fn detail_reports_missing_and_invalid_names() {
    let app = TestApp::new().await;
    app.add_item("series", "Dark", &[".torrent", ".nfo", ".txt", ".prez.txt"]);

    let (status, body) = app.get("/api/media/series/Dark").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasAllArtifacts"], true);
    assert!(body["override"].is_null());

    let (status, body) = app.get("/api/media/series/Nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Media item not found");

    let (status, _) = app.get("/api/media/series/..").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn file_reads_stay_inside_the_item() {
    let app = TestApp::new().await;
    app.add_item("films", "Heat", &[".nfo"]);
    std::fs::write(app.dir.path().join("status.json"), "{}").unwrap();

    let (status, body) = app.get("/api/media/films/Heat/file/Heat.nfo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Heat".into()));

    let (status, _) = app
        .get("/api/media/films/Heat/file/..%2F..%2F..%2Fstatus.json")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_reports_removed_artifacts() {
    let app = TestApp::new().await;
    app.add_item("films", "Heat", &[".torrent", ".nfo", ".txt"]);

    let (status, body) = app
        .request(Method::DELETE, "/api/media/films/Heat", None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "deleted": 3 }));
    assert!(app.root().join("films/Heat").is_dir());
}

#[tokio::test]
async fn scan_control_is_single_flight() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::POST, "/api/scan", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "started" }));

    let (status, body) = app.request(Method::POST, "/api/scan", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["status"], 409);

    let (status, body) = app.get("/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], true);

    let (status, body) = app.request(Method::POST, "/api/scan/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "stopping" }));

    let (status, _) = app.request(Method::POST, "/api/scan/stop", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let status_file = read_json(&app.dir.path().join("status.json"));
    assert_eq!(status_file["state"], "idle");
    assert_eq!(status_file["stoppedManually"], true);
}

#[tokio::test]
async fn stop_without_scan_conflicts() {
    let app = TestApp::new().await;

    let (status, _) = app.request(Method::POST, "/api/scan/stop", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["running"], false);
}

#[tokio::test]
async fn overrides_are_limited_to_films_and_series() {
    let app = TestApp::new().await;
    app.add_item("films", "Heat", &[".torrent", ".nfo", ".txt", ".prez.txt"]);

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/media/musiques/Album/override",
            Some(json!({ "id": 42 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/media/films/Heat/override",
            Some(json!({ "id": 949 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["override"]["id"], 949);
    assert_eq!(body["override"]["apiType"], "movie");
    assert_eq!(body["scan"], "started");

    // Metadata artifacts are dropped so the rescan regenerates them.
    let (_, detail) = app.get("/api/media/films/Heat").await;
    assert_eq!(detail["artifacts"]["txt"], false);
    assert_eq!(detail["artifacts"]["torrent"], true);
    assert_eq!(detail["override"]["id"], 949);

    let (status, body) = app
        .request(Method::DELETE, "/api/media/films/Heat/override", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "removed": true }));
}

#[tokio::test]
async fn settings_mask_and_preserve_the_api_key() {
    let app = TestApp::new().await;
    let settings_file = app.dir.path().join("config.json");
    std::fs::write(
        &settings_file,
        json!({ "tmdbApiKey": "abcdef123456", "language": "fr-FR" }).to_string(),
    )
    .unwrap();

    let (status, body) = app.get("/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tmdbApiKey"], "********3456");

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/config",
            Some(json!({ "tmdbApiKey": "********3456", "language": "en-US" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "Config saved" }));

    let stored = read_json(&settings_file);
    assert_eq!(stored["tmdbApiKey"], "abcdef123456");
    assert_eq!(stored["language"], "en-US");

    let (status, _) = app
        .request(Method::PUT, "/api/config", Some(json!(["not", "an", "object"])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn image_proxy_rejects_parent_segments() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/images/tmdb/w500/../secret.jpg").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid image path");
}

#[tokio::test]
async fn health_and_stats_respond() {
    let app = TestApp::new().await;
    app.add_item("musiques", "Album", &[".torrent"]);

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = app.get("/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["musiques"]["count"], 1);
    assert_eq!(body["films"]["count"], 0);
}

#[tokio::test]
async fn event_stream_opens_with_status_snapshot() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/api/events")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()["x-accel-buffering"], "no");

    let mut stream = response.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("first sse chunk")
        .expect("stream open")
        .expect("chunk");
    let text = String::from_utf8_lossy(&first);
    assert!(text.contains("event: status"), "got {text}");
    assert!(text.contains("\"running\":false"), "got {text}");
}
