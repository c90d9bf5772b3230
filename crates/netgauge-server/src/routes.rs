use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use netgauge_core::{
    DownloadGenerator, SINK_DEPTH, SizeLimits, TransferError, TransferLogger, UploadAccountant,
    UploadReport, channel_sink,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::body;

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub limits: SizeLimits,
    pub logger: Arc<dyn TransferLogger>,
}

// ── Request/response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub size: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub bytes: u64,
    pub millis: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<u64>,
}

/// Request-boundary failure, rendered per the wire contract.
#[derive(Debug)]
pub struct ApiError(pub TransferError);

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            TransferError::Setup(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    message: "Internal server error",
                    max: None,
                }),
            )
                .into_response(),
            // Never delivered: the peer is gone.
            TransferError::PeerAbort => StatusCode::BAD_REQUEST.into_response(),
            TransferError::SizeViolation { max } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                [(header::CONNECTION, "close")],
                Json(ErrorBody {
                    message: "Payload too large",
                    max: Some(max),
                }),
            )
                .into_response(),
            TransferError::Transport(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    message: "Upload failed",
                    max: None,
                }),
            )
                .into_response(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────────

/// GET /download?size=N — N bytes of random data.
///
/// Length is declared up front; the generator runs on its own task and
/// feeds the body through a bounded channel. HEAD gets the same headers
/// and opens no session.
pub async fn download(
    State(state): State<AppState>,
    method: Method,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let requested = query.ok().and_then(|Query(q)| q.size);
    let effective = state.limits.resolve_download_size(requested.as_deref());
    let headers = download_headers(effective);

    if method == Method::HEAD {
        return Ok((StatusCode::OK, headers).into_response());
    }

    let logger = state.logger.clone();
    let generator =
        DownloadGenerator::prepare(requested.as_deref(), effective, logger).map_err(|e| {
            error!("Download setup failed: {}", e);
            ApiError(e)
        })?;

    let (sink, stream) = channel_sink(SINK_DEPTH);
    tokio::spawn(generator.run(sink));

    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}

fn download_headers(effective: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(effective));
    headers
}

/// POST /upload — count the body, reply with `{bytes, millis}`.
pub async fn upload(State(state): State<AppState>, body: Body) -> Response {
    let accountant = UploadAccountant::open(state.limits.max_upload, state.logger.clone());

    match accountant.run(body::inbound(body)).await {
        UploadReport::Completed { bytes, millis } => {
            (StatusCode::OK, Json(UploadResponse { bytes, millis })).into_response()
        }
        UploadReport::Oversized { max, .. } => {
            ApiError(TransferError::SizeViolation { max }).into_response()
        }
        UploadReport::Aborted { .. } => ApiError(TransferError::PeerAbort).into_response(),
        UploadReport::Errored { message } => {
            ApiError(TransferError::Transport(message)).into_response()
        }
    }
}

/// OPTIONS /download, /upload — pre-flight.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
}

/// GET /health — liveness check.
pub async fn health() -> &'static str {
    "ok"
}
