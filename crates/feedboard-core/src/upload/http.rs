//! HTTP client for the media endpoints of `feedboard-server`.
//!
//! Requests are blocking, like the socket thread of the WebSocket store, so
//! the returned futures finish on their first poll. Do not drive them from
//! inside a Tokio runtime.

use super::{MediaUploader, UploadError, UploadFile, UploadedAsset};
use crate::sync::BoxFuture;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Error body returned by the server.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Uploads media over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    base_url: Url,
    client: Client,
}

impl HttpUploader {
    /// Create an uploader for an `http://` or `https://` server base URL.
    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        let base_url = Url::parse(base_url).map_err(|e| UploadError::Service(format!("Invalid URL: {}", e)))?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(UploadError::Service(format!("Invalid upload URL scheme: {}", base_url.scheme())));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("feedboard media uploader")
            .build()
            .map_err(|e| UploadError::Service(e.to_string()))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `PUT /projects/{project}/media/{name}` with the raw bytes.
    pub fn upload_blocking(&self, file: UploadFile, project: &str) -> Result<UploadedAsset, UploadError> {
        let url = self.endpoint(["projects", project, "media", file.name.as_str()])?;
        log::debug!("Uploading {} ({} bytes) to {}", file.name, file.bytes.len(), url);
        let resp = self
            .client
            .put(url)
            .header(CONTENT_TYPE, file.mime)
            .body(file.bytes)
            .send()
            .map_err(|e| UploadError::Service(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(error_from(resp));
        }
        resp.json::<UploadedAsset>()
            .map_err(|e| UploadError::Service(format!("Invalid upload response: {}", e)))
    }

    /// `DELETE /media/{path}`.
    pub fn delete_blocking(&self, path: &str) -> Result<(), UploadError> {
        let segments = std::iter::once("media").chain(path.split('/').filter(|s| !s.is_empty()));
        let url = self.endpoint(segments)?;
        let resp = self
            .client
            .delete(url)
            .send()
            .map_err(|e| UploadError::Service(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(error_from(resp));
        }
        log::debug!("Deleted media {}", path);
        Ok(())
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, UploadError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UploadError::Service(format!("Cannot build a path on {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Map a failed response onto the upload error kinds.
fn error_from(resp: Response) -> UploadError {
    let status = resp.status();
    let message = resp
        .json::<ErrorBody>()
        .map(|b| b.error)
        .unwrap_or_else(|_| status.to_string());
    match status {
        StatusCode::NOT_FOUND => UploadError::NotFound(message),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => UploadError::UnsupportedType(message),
        _ => UploadError::Service(format!("{}: {}", status, message)),
    }
}

impl MediaUploader for HttpUploader {
    fn upload(&self, file: UploadFile, project: &str) -> BoxFuture<'_, Result<UploadedAsset, UploadError>> {
        let project = project.to_string();
        Box::pin(async move { self.upload_blocking(file, &project) })
    }

    fn delete(&self, path: &str) -> BoxFuture<'_, Result<(), UploadError>> {
        let path = path.to_string();
        Box::pin(async move { self.delete_blocking(&path) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(HttpUploader::new("ws://localhost:3030"), Err(UploadError::Service(_))));
        assert!(matches!(HttpUploader::new("not a url"), Err(UploadError::Service(_))));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let uploader = HttpUploader::new("http://localhost:3030/").unwrap();
        let url = uploader.endpoint(["projects", "p1", "media", "hero shot.png"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3030/projects/p1/media/hero%20shot.png");

        let uploader = HttpUploader::new("https://cdn.example.com/feedboard").unwrap();
        let url = uploader.endpoint(["media", "projects", "p1", "a.png"]).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/feedboard/media/projects/p1/a.png");
    }
}
