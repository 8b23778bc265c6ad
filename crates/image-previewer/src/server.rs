//! HTTP server for the previewer
//!
//! Provides /, /health and /fill/{width}/{height}/{source} endpoints.

use crate::previewer::Previewer;
use crate::request::FillRequest;
use crate::types::HealthResponse;
use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared state for the HTTP server
pub struct ServerState {
    pub previewer: Previewer,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(previewer: Previewer) -> Self {
        Self {
            previewer,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(greeting))
        .route("/health", get(health))
        .route("/fill/{*params}", get(fill))
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Log every request with its status and latency
async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis();

    if status >= 400 {
        warn!(method = %method, path = %path, status, duration_ms, "HTTP request failed");
    } else {
        info!(method = %method, path = %path, status, duration_ms, "HTTP request served");
    }

    response
}

/// Serve until SIGINT or SIGTERM, then drain in-flight requests
pub async fn start_server(state: SharedState, addr: &str) -> std::io::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting HTTP server on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}

async fn greeting() -> &'static str {
    "This is the JPEG previewer! Try /fill/{width}/{height}/{host}/{path}"
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: state.previewer.index().stats(),
    })
}

/// Resize a source JPEG into the requested box, using the cache if possible
async fn fill(
    State(state): State<SharedState>,
    Path(params): Path<String>,
    headers: HeaderMap,
) -> Response {
    let request = match FillRequest::parse(&params) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match state.previewer.fill(&request, &headers).await {
        Ok(filled) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/jpeg"),
                (header::CACHE_CONTROL, "public, max-age=86400"),
                (X_CACHE, filled.served_from.as_header_value()),
            ],
            filled.bytes,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Origin;
    use axum::body::Body;
    use axum::http::Request;
    use file_blob_store::BlobStore;
    use lru_index::CacheIndex;
    use origin_fetcher::OriginFetcher;
    use std::io;
    use std::path::Path as FsPath;
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn create_test_state(storage: &FsPath, max_body_bytes: u64) -> SharedState {
        let previewer = Previewer::new(
            CacheIndex::new(3),
            BlobStore::new(storage),
            OriginFetcher::with_max_body_bytes(max_body_bytes).unwrap(),
        );
        Arc::new(ServerState::new(previewer))
    }

    async fn get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_greeting() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path(), 1024));

        let response = get(router, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path(), 1024));

        let response = get(router, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].as_u64().is_some());
        assert_eq!(json["cache"]["capacity"], 3);
        assert_eq!(json["cache"]["entries"], 0);
    }

    #[tokio::test]
    async fn test_fill_miss_then_hit() {
        let origin = Origin::spawn().await;
        let dir = tempdir().unwrap();
        let state = create_test_state(dir.path(), 1024 * 1024);
        let uri = format!("/fill/120/90/{}", origin.source("images/cat.jpg"));

        let first = get(create_router(Arc::clone(&state)), &uri).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(first.headers()["x-cache"], "MISS");

        let second = get(create_router(Arc::clone(&state)), &uri).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()["x-cache"], "HIT");

        let body = axum::body::to_bytes(second.into_body(), usize::MAX)
            .await
            .unwrap();
        let image = image::load_from_memory(&body).unwrap();
        assert_eq!((image.width(), image.height()), (120, 60));

        assert_eq!(origin.requests(), 1);
    }

    #[tokio::test]
    async fn test_zero_width_is_bad_request_without_fetch() {
        let origin = Origin::spawn().await;
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path(), 1024));
        let uri = format!("/fill/0/100/{}", origin.source("images/cat.jpg"));

        let response = get(router, &uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert_eq!(json["category"], "parameter");
        assert_eq!(origin.requests(), 0);
    }

    #[tokio::test]
    async fn test_not_enough_params_is_bad_request() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path(), 1024));

        let response = get(router, "/fill/100/100").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_origin_not_found() {
        let origin = Origin::spawn().await;
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path(), 1024));
        let uri = format!("/fill/100/100/{}", origin.source("images/missing.jpg"));

        let response = get(router, &uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["category"], "not_found");
    }

    #[tokio::test]
    async fn test_unsupported_media_type() {
        let origin = Origin::spawn().await;
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path(), 1024));
        let uri = format!("/fill/100/100/{}", origin.source("images/notes.txt"));

        let response = get(router, &uri).await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let origin = Origin::spawn().await;
        let dir = tempdir().unwrap();
        let storage = dir.path().join("storage");
        let state = create_test_state(&storage, 1024);
        let uri = format!("/fill/100/100/{}", origin.source("images/huge.jpg"));

        let response = get(create_router(Arc::clone(&state)), &uri).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(state.previewer.index().is_empty());
        assert!(!storage.exists());
    }

    #[tokio::test]
    async fn test_unreachable_origin_is_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path(), 1024));
        let uri = format!("/fill/100/100/{}/images/cat.jpg", addr);

        let response = get(router, &uri).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["category"], "bad_gateway");
    }

    #[tokio::test]
    async fn test_undecodable_image_is_internal_error() {
        let origin = Origin::spawn().await;
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path(), 1024));
        let uri = format!("/fill/100/100/{}", origin.source("images/garbage.jpg"));

        let response = get(router, &uri).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_requests_are_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path(), 1024));

        let ok = get(router.clone(), "/health").await;
        assert_eq!(ok.status(), StatusCode::OK);
        let bad = get(router, "/fill/100/100").await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let output = logs.contents();
        assert!(output.contains("HTTP request served"), "{}", output);
        assert!(output.contains("path=/health"), "{}", output);
        assert!(output.contains("status=200"), "{}", output);
        assert!(output.contains("HTTP request failed"), "{}", output);
        assert!(output.contains("path=/fill/100/100"), "{}", output);
        assert!(output.contains("status=400"), "{}", output);
        assert!(output.contains("duration_ms="), "{}", output);
    }

    #[test]
    fn test_server_state_new() {
        let dir = tempdir().unwrap();
        let state = create_test_state(dir.path(), 1024);

        let diff = (Utc::now() - state.started_at).num_seconds();
        assert!((0..5).contains(&diff));
    }
}
