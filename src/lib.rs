//! Media Fetcher - a thin HTTP service around yt-dlp and ffmpeg
//!
//! A request names a media URL; the file is downloaded and transcoded into a
//! request-scoped scratch directory, returned in the response body, and the
//! directory is removed whatever the outcome. The same pipeline can upload
//! the result to object storage through a presigned form instead.

pub mod cli;
pub mod config;
pub mod error;
pub mod extractors;
pub mod pipeline;
pub mod server;
pub mod upload;
pub mod utils;
pub mod workspace;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{FetchError, FetchResult};
pub use extractors::{ExtractedArtifact, MediaExtractor, Platform, TargetFormat};
pub use pipeline::{DownloadPipeline, DownloadRequest, FetchedMedia};
pub use workspace::ScratchWorkspace;

/// Result type used by the binary and configuration code
pub type Result<T> = anyhow::Result<T>;
