//! In-process stand-in for the blob store API
//!
//! Serves `POST /upload` and `GET /i/{name}` on an ephemeral local port,
//! checks the bearer key the same way the real backend does, and records
//! every upload so tests can assert on the exact multipart request.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One multipart part received by `/upload`
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct MockBackend {
    api_key: String,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fetches: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            uploads: Arc::default(),
            objects: Arc::default(),
            fetches: Arc::default(),
        }
    }

    /// Seed an object as if it had been uploaded earlier
    pub fn insert(&self, name: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), data);
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    /// Number of `GET /i/{name}` requests received, authorized or not
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Serve on `127.0.0.1` with an OS-assigned port, returning the base URL
    pub async fn start(&self) -> std::io::Result<String> {
        let router = Router::new()
            .route("/upload", post(upload))
            .route("/i/{name}", get(fetch))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(format!("http://{}", addr))
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.api_key);
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

async fn upload(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !backend.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid API key").into_response();
    }

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut stored = false;
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let Ok(data) = field.bytes().await else {
            return StatusCode::BAD_REQUEST.into_response();
        };

        if field_name == "file" {
            if let Some(name) = &file_name {
                backend.insert(name, data.to_vec());
                stored = true;
            }
        }

        backend.uploads.lock().unwrap().push(RecordedUpload {
            field_name,
            file_name,
            content_type,
            authorization: authorization.clone(),
            data: data.to_vec(),
        });
    }

    if stored {
        StatusCode::OK.into_response()
    } else {
        (StatusCode::BAD_REQUEST, "No file uploaded").into_response()
    }
}

async fn fetch(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    backend.fetches.fetch_add(1, Ordering::SeqCst);

    if !backend.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid API key").into_response();
    }

    let object = backend.objects.lock().unwrap().get(&name).cloned();
    match object {
        Some(data) => (StatusCode::OK, data).into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}
