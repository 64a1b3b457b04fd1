use axum::{
    extract::{RawQuery, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use super::{response::media_response, AppState};
use crate::error::FetchError;
use crate::pipeline::DownloadRequest;

/// GET / and GET /api/download - fetch a URL and return the file
pub async fn download(State(state): State<AppState>, RawQuery(query): RawQuery) -> Result<Response, FetchError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("download", %request_id);

    async move {
        let (url, platform) = query_params(query.as_deref());
        let request = DownloadRequest::from_query(url.as_deref(), platform.as_deref())?;

        // Runs to completion even if the client goes away, so the workspace is always released
        let pipeline = state.pipeline.clone();
        let media = tokio::spawn(async move { pipeline.fetch(&request).await }.in_current_span())
            .await
            .map_err(|e| FetchError::extraction(format!("download task failed: {}", e)))??;

        Ok::<_, FetchError>(media_response(media))
    }
    .instrument(span)
    .await
}

/// GET /version - version of the extraction library
pub async fn version(State(state): State<AppState>) -> impl IntoResponse {
    let (name, version) = state.pipeline.library_version().await;

    let mut body = Map::new();
    body.insert(name.to_string(), Value::String(version));
    Json(Value::Object(body))
}

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn not_found() -> FetchError {
    FetchError::NotFound
}

pub async fn method_not_allowed() -> FetchError {
    FetchError::MethodNotAllowed
}

/// First `url` and `platform` values of a query string.
///
/// Decoding is lenient: a malformed escape never rejects the request.
fn query_params(query: Option<&str>) -> (Option<String>, Option<String>) {
    let mut url = None;
    let mut platform = None;

    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "url" if url.is_none() => url = Some(value.into_owned()),
            "platform" if platform.is_none() => platform = Some(value.into_owned()),
            _ => {}
        }
    }

    (url, platform)
}
