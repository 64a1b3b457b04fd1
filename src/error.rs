//! Error taxonomy for a single fetch request.
//!
//! Every variant maps to one HTTP status through [`FetchError::status_code`];
//! the `Display` text is the user-visible `detail` message.

use std::path::PathBuf;

/// Result type for the request pipeline
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Missing url parameter")]
    MissingUrl,

    #[error("Invalid url parameter")]
    InvalidUrl(String),

    #[error("Unsupported platform")]
    UnsupportedPlatform(String),

    #[error("FFmpeg binary not found at {}", .0.display())]
    DependencyMissing(PathBuf),

    #[error("Download failed: {0}")]
    Extraction(String),

    #[error("Failed to prepare scratch workspace")]
    Workspace(#[source] std::io::Error),

    #[error("{0}")]
    Upload(String),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl FetchError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::MissingUrl
            | FetchError::InvalidUrl(_)
            | FetchError::UnsupportedPlatform(_) => 400,
            FetchError::NotFound => 404,
            FetchError::MethodNotAllowed => 405,
            FetchError::DependencyMissing(_)
            | FetchError::Extraction(_)
            | FetchError::Workspace(_) => 500,
            FetchError::Upload(_) => 502,
        }
    }

    pub(crate) fn extraction(reason: impl Into<String>) -> Self {
        FetchError::Extraction(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_bad_request() {
        assert_eq!(FetchError::MissingUrl.status_code(), 400);
        assert_eq!(FetchError::InvalidUrl("x".into()).status_code(), 400);
        assert_eq!(
            FetchError::UnsupportedPlatform("spotify".into()).status_code(),
            400
        );
    }

    #[test]
    fn test_detail_messages() {
        assert_eq!(FetchError::MissingUrl.to_string(), "Missing url parameter");
        assert_eq!(
            FetchError::UnsupportedPlatform("spotify".into()).to_string(),
            "Unsupported platform"
        );
        assert_eq!(FetchError::NotFound.to_string(), "Not found");
        assert_eq!(
            FetchError::extraction("HTTP Error 404").to_string(),
            "Download failed: HTTP Error 404"
        );
    }

    #[test]
    fn test_dependency_missing_echoes_path() {
        let error = FetchError::DependencyMissing(PathBuf::from("/srv/app/bin/ffmpeg"));
        assert_eq!(error.status_code(), 500);
        assert_eq!(error.to_string(), "FFmpeg binary not found at /srv/app/bin/ffmpeg");
    }

    #[test]
    fn test_workspace_error_hides_io_detail() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/tmp denied");
        let error = FetchError::Workspace(io);
        assert_eq!(error.status_code(), 500);
        assert!(!error.to_string().contains("/tmp"));
    }
}
