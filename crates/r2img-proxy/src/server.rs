//! HTTP server for the upload and image endpoints
//!
//! Provides /health, POST /upload, and GET /i/{token}.

use crate::error::{ProxyError, Result};
use crate::ingest::{extension_of, IngestPipeline};
use crate::retrieval::RetrievalProxy;
use crate::types::HealthResponse;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared state for the HTTP server
pub struct ServerState {
    pub ingest: IngestPipeline,
    pub retrieval: RetrievalProxy,
    auth_header: String,
    quality: f32,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(
        ingest: IngestPipeline,
        retrieval: RetrievalProxy,
        auth_key: &str,
        quality: f32,
    ) -> Self {
        Self {
            ingest,
            retrieval,
            auth_header: format!("Bearer {}", auth_key),
            quality,
            started_at: Utc::now(),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<()> {
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if provided == Some(self.auth_header.as_str()) {
            Ok(())
        } else {
            Err(ProxyError::Auth)
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router. `max_upload_bytes` bounds the whole upload body.
pub fn create_router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/i/", get(empty_token))
        .route("/i/{token}", get(get_image))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(
    state: SharedState,
    port: u16,
    max_upload_bytes: usize,
) -> std::io::Result<()> {
    let router = create_router(state, max_upload_bytes);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: state.retrieval.stats(),
    })
}

/// Accept a multipart `file` upload and return the stored object name
async fn upload(
    State(state): State<SharedState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    // Checked before any of the body is read.
    state.authorize(&headers)?;

    let mut multipart = multipart.map_err(|e| ProxyError::Upload(e.body_text()))?;
    let (file_name, bytes) = read_file_field(&mut multipart).await?;

    let name = state
        .ingest
        .ingest(bytes, &extension_of(&file_name), state.quality)
        .await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        name,
    )
        .into_response())
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProxyError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ProxyError::Upload(e.to_string()))?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(ProxyError::Upload("missing file field".to_string()))
}

async fn empty_token() -> ProxyError {
    ProxyError::InvalidToken(String::new())
}

/// Serve an image, backfilling the local cache on a miss
async fn get_image(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Response> {
    let image = state.retrieval.retrieve(&token).await?;
    let cache_header = if image.from_cache { "HIT" } else { "MISS" };

    Ok((
        StatusCode::OK,
        [
            ("content-type", image.content_type),
            ("X-Cache", cache_header),
        ],
        image.data,
    )
        .into_response())
}
