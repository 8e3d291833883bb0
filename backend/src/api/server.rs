//! HTTP server for quote uploads.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Service and database health              |
//! | POST   | `/api/upload`     | Upload a quote CSV and load it           |
//! | GET    | `/api/logs`       | SSE stream of load progress              |
//!
//! Each upload runs its own transaction; concurrent uploads never share one.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, UploadResponse};
use crate::error::{LoadError, PipelineError};
use crate::loader::shutdown_signal;
use crate::store::QuoteStore;
use crate::transform::pipeline::ingest_bytes;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

type ApiError = (StatusCode, Json<Value>);

/// Build the router over a shared store.
pub fn router<S>(store: Arc<S>) -> Router
where
    S: QuoteStore + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health::<S>))
        .route("/health", get(health::<S>))
        .route("/api/upload", post(upload_csv::<S>))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(store)
}

/// Serve until Ctrl-C, then return.
pub async fn start_server<S>(store: Arc<S>, port: u16) -> Result<(), Box<dyn std::error::Error>>
where
    S: QuoteStore + 'static,
{
    let app = router(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Quoteload server running on http://localhost:{}", port);
    println!("   POST /api/upload - Upload quote CSV");
    println!("   GET  /api/logs   - SSE log stream");
    println!("   GET  /health     - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health<S: QuoteStore>(State(store): State<Arc<S>>) -> (StatusCode, Json<Value>) {
    let (code, database) = match store.ping().await {
        Ok(now) => (StatusCode::OK, json!({ "status": "ok", "serverTime": now })),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "unreachable", "error": e.to_string() }),
        ),
    };

    let overall = if code == StatusCode::OK { "ok" } else { "degraded" };
    (
        code,
        Json(json!({
            "status": overall,
            "service": "quoteload",
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
        })),
    )
}

async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn upload_csv<S: QuoteStore>(
    State(store): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(&format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| bad_request("No file provided"))?;
    log_info(format!(
        "Upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let report = ingest_bytes(store.as_ref(), &bytes, std::future::pending::<()>())
        .await
        .map_err(|e| {
            log_error(format!("Upload failed: {}", e));
            (status_for(&e), Json(error_response(&e.to_string())))
        })?;

    Ok(Json(UploadResponse::from(report)))
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(message)))
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Csv(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Load(LoadError::Insert { .. }) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
