//! API integration tests.
//!
//! A shell script stands in for FFmpeg so jobs run without media tools.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use wmark_api::{create_router, ApiConfig, AppState};
use wmark_jobs::JobConfig;
use wmark_models::JobId;

const FAKE_FFMPEG: &str = r"
printf 'frame=  25 fps=25 time=00:00:01.00 speed=1x\r' >&2
printf 'frame=  75 fps=25 time=00:00:03.00 speed=1x\n' >&2
exit 0
";

struct TestApp {
    router: Router,
    state: AppState,
    dir: TempDir,
}

impl TestApp {
    fn new(script: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let ffmpeg = write_script(dir.path(), script);
        let config = ApiConfig {
            watermark_dir: dir.path().join("watermarks"),
            upload_dir: dir.path().join("uploads"),
            preview_dir: dir.path().join("previews"),
            ..ApiConfig::default()
        };
        let state = AppState::new(config, JobConfig::default().with_ffmpeg_path(ffmpeg));
        let router = create_router(state.clone(), None);
        Self { router, state, dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().to_string()
    }

    fn process_body(&self) -> Value {
        json!({
            "sourcePath": self.path("input.mp4"),
            "watermarkPath": self.path("logo.png"),
            "outputPath": self.path("output.mp4"),
            "position": "bottom-right",
            "scale": 25,
            "opacity": 80
        })
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const BOUNDARY: &str = "wmark-test-boundary";

fn post_multipart(uri: &str, field: &str, file_name: &str, contents: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        b = BOUNDARY,
        field = field,
        file_name = file_name,
    )
    .into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new("exit 0");

    let (status, body) = app.send_json(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["jobs"], 0);
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let app = TestApp::new("exit 0");

    let (status, _) = app.send(get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_and_poll_job() {
    let app = TestApp::new(FAKE_FFMPEG);

    let (status, body) = app
        .send_json(post_json("/api/process", &app.process_body()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    let job_id = body["data"].as_str().unwrap().to_string();

    let id = JobId::from_string(job_id.clone());
    tokio::time::timeout(Duration::from_secs(10), app.state.supervisor.wait(&id))
        .await
        .unwrap()
        .unwrap();

    let (status, body) = app
        .send_json(get(&format!("/api/process/{}", job_id)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], job_id);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["progress"], 3);
    assert_eq!(body["data"]["output"].as_array().unwrap().len(), 2);

    let (status, body) = app.send_json(get("/api/process")).await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body["data"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].get("output").is_none());
}

#[tokio::test]
async fn test_invalid_request_is_rejected() {
    let app = TestApp::new("exit 0");
    let mut request = app.process_body();
    request["opacity"] = json!(150);

    let (status, body) = app.send_json(post_json("/api/process", &request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["data"].is_null());
    assert!(app.state.supervisor.list().await.is_empty());
}

#[tokio::test]
async fn test_unknown_job_returns_404() {
    let app = TestApp::new("exit 0");

    let (status, body) = app.send_json(get("/api/process/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, _) = app
        .send_json(post_empty("/api/process/does-not-exist/stop"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(get("/api/process/does-not-exist/events")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stop_running_job() {
    let app = TestApp::new("exec sleep 30");

    let (_, body) = app
        .send_json(post_json("/api/process", &app.process_body()))
        .await;
    let job_id = body["data"].as_str().unwrap().to_string();

    let (status, body) = app
        .send_json(post_empty(&format!("/api/process/{}/stop", job_id)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "stopped");
    assert_eq!(body["data"]["status"], "failed");

    let (_, body) = app
        .send_json(get(&format!("/api/process/{}", job_id)))
        .await;
    assert_eq!(body["data"]["error"], "Task stopped by user");
}

#[tokio::test]
async fn test_events_stream_ends_with_done() {
    let app = TestApp::new(FAKE_FFMPEG);

    let (_, body) = app
        .send_json(post_json("/api/process", &app.process_body()))
        .await;
    let job_id = body["data"].as_str().unwrap().to_string();

    let (status, bytes) = tokio::time::timeout(
        Duration::from_secs(10),
        app.send(get(&format!("/api/process/{}/events", job_id))),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("event: progress"), "{}", text);
    assert!(text.contains("event: done"), "{}", text);
    assert!(text.contains("\"status\":\"completed\""), "{}", text);
}

#[tokio::test]
async fn test_generate_command() {
    let app = TestApp::new("exit 0");

    let (status, body) = app
        .send_json(post_json("/api/generate-command", &app.process_body()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let command = body["data"]["command"].as_str().unwrap();
    assert!(command.contains("-filter_complex"));
    assert!(command.contains("overlay=x=main_w-overlay_w:y=main_h-overlay_h"));
    assert!(command.contains("colorchannelmixer=aa=0.80"));
    assert!(command.ends_with(&app.path("output.mp4")));

    let args = body["data"]["args"].as_array().unwrap();
    assert_eq!(args[0], "-i");
    assert_eq!(args[1].as_str().unwrap(), app.path("input.mp4"));
}

#[tokio::test]
async fn test_save_watermark_and_list_files() {
    let app = TestApp::new("exit 0");
    let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    png.extend_from_slice(b"fake image body");
    let image_data = format!("data:image/png;base64,{}", STANDARD.encode(&png));

    let (status, body) = app
        .send_json(post_json(
            "/api/watermark",
            &json!({ "imageData": image_data }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let saved = PathBuf::from(body["data"].as_str().unwrap());
    assert_eq!(std::fs::read(&saved).unwrap(), png);

    let (status, body) = app
        .send_json(get(&format!(
            "/api/files?path={}",
            app.path("watermarks")
        )))
        .await;
    assert_eq!(status, StatusCode::OK);
    let files = body["data"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["isDir"], false);
    assert_eq!(files[0]["size"], png.len());
}

#[tokio::test]
async fn test_save_watermark_rejects_bad_data() {
    let app = TestApp::new("exit 0");

    let (status, body) = app
        .send_json(post_json(
            "/api/watermark",
            &json!({ "imageData": "%%% not base64 %%%" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_list_missing_directory_returns_404() {
    let app = TestApp::new("exit 0");

    let (status, _) = app
        .send_json(get(&format!("/api/files?path={}", app.path("nope"))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_file_keeps_only_the_file_name() {
    let app = TestApp::new("exit 0");
    let contents = b"not really a video";

    let (status, body) = app
        .send_json(post_multipart(
            "/api/files",
            "file",
            "../../clip (1).mp4",
            contents,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["name"], "clip (1).mp4");
    assert_eq!(body["data"]["size"], contents.len());

    let stored = app.dir.path().join("uploads").join("clip (1).mp4");
    assert_eq!(body["data"]["path"].as_str().unwrap(), stored.to_string_lossy());
    assert_eq!(std::fs::read(&stored).unwrap(), contents);
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let app = TestApp::new("exit 0");

    let (status, body) = app
        .send_json(post_multipart("/api/files", "other", "a.mp4", b"data"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(!app.dir.path().join("uploads").join("a.mp4").exists());
}

#[tokio::test]
async fn test_get_file_serves_contents() {
    let app = TestApp::new("exit 0");
    let file = app.dir.path().join("notes.txt");
    std::fs::write(&file, "hello watermark").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/api/files{}", file.display())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"hello watermark");

    let (status, body) = app
        .send_json(get(&format!("/api/files{}", app.path("missing.txt"))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_preview_returns_images_directly() {
    let app = TestApp::new("exit 1");
    let image = app.dir.path().join("logo.png");
    std::fs::write(&image, b"png bytes").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/api/preview?path={}", image.display())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"png bytes");
}

// Writes the seek position it was given as the "frame"
const FRAME_GRAB: &str = r#"
for last; do :; done
printf 'frame@%s' "$2" > "$last"
"#;

#[tokio::test]
async fn test_preview_grabs_video_frame() {
    let app = TestApp::new(FRAME_GRAB);
    std::fs::write(app.dir.path().join("input.mp4"), b"video").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get(&format!(
            "/api/preview?path={}&timepoint=00:00:02.5",
            app.path("input.mp4")
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"frame@2.500");

    // The scratch frame does not outlive the response
    let leftovers = std::fs::read_dir(app.dir.path().join("previews"))
        .unwrap()
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_preview_rejections() {
    let app = TestApp::new(FRAME_GRAB);
    std::fs::write(app.dir.path().join("input.mp4"), b"video").unwrap();
    std::fs::write(app.dir.path().join("notes.txt"), b"text").unwrap();

    let (status, _) = app.send_json(get("/api/preview")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send_json(get(&format!("/api/preview?path={}", app.path("gone.mp4"))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send_json(get(&format!("/api/preview?path={}", app.path("notes.txt"))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send_json(get(&format!(
            "/api/preview?path={}&timepoint=soon",
            app.path("input.mp4")
        )))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preview_frame_failure_is_server_error() {
    let app = TestApp::new("echo 'Invalid data found when processing input' >&2; exit 1");
    std::fs::write(app.dir.path().join("input.mp4"), b"video").unwrap();

    let (status, body) = app
        .send_json(get(&format!("/api/preview?path={}", app.path("input.mp4"))))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid data found when processing input"));
}
