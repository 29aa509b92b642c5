//! Media upload service over HTTP.

use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use feedboard_core::project::ProjectDocument;
use feedboard_core::upload::{UploadError, UploadedAsset};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors returned by the HTTP endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),
    #[error("Missing Content-Type header")]
    MissingContentType,
    #[error(transparent)]
    Upload(#[from] UploadError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::ProjectNotFound(_) | ApiError::Upload(UploadError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::MissingContentType | ApiError::Upload(UploadError::UnsupportedType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ApiError::Upload(UploadError::Service(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Read a project document.
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProjectDocument>, ApiError> {
    state.read(&id).map(Json).ok_or(ApiError::ProjectNotFound(id))
}

/// Store a file. The body is the raw file; its type comes from `Content-Type`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path((project, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadedAsset>), ApiError> {
    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).to_string())
        .ok_or(ApiError::MissingContentType)?;
    let asset = state.store_media(&project, &name, &mime, body).inspect_err(|e| {
        warn!("Rejected upload {} for {}: {}", name, project, e);
    })?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// Serve a stored file.
pub async fn download(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> Result<Response, ApiError> {
    let media = state.media(&path).ok_or(UploadError::NotFound(path))?;
    Ok(([(header::CONTENT_TYPE, media.mime)], media.bytes).into_response())
}

/// Delete a stored file.
pub async fn delete(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> Result<StatusCode, ApiError> {
    state.delete_media(&path)?;
    Ok(StatusCode::NO_CONTENT)
}
