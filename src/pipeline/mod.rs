use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::extractors::{validate_url, ExtractedArtifact, ExtractionOptions, MediaExtractor, Platform};
use crate::workspace::ScratchWorkspace;

/// Version reported when the extractor cannot be queried
pub const UNKNOWN_VERSION: &str = "unknown";

/// A validated download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_url: Url,
    pub platform: Option<Platform>,
}

impl DownloadRequest {
    /// Validate raw query values: url presence, then platform, then url syntax
    pub fn from_query(url: Option<&str>, platform: Option<&str>) -> FetchResult<Self> {
        let url = url.map(str::trim).filter(|url| !url.is_empty()).ok_or(FetchError::MissingUrl)?;

        let platform = platform
            .filter(|platform| !platform.is_empty())
            .map(str::parse::<Platform>)
            .transpose()?;

        let source_url = validate_url(url)?;

        Ok(Self { source_url, platform })
    }
}

/// An artifact read into memory after its workspace was removed
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub file_name: String,
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

/// Acquire a workspace, run the extractor, hand the artifact on, clean up
pub struct DownloadPipeline {
    config: Arc<Config>,
    extractor: Arc<dyn MediaExtractor>,
    version: OnceCell<String>,
}

impl DownloadPipeline {
    pub fn new(config: Arc<Config>, extractor: Arc<dyn MediaExtractor>) -> Self {
        Self {
            config,
            extractor,
            version: OnceCell::new(),
        }
    }

    /// `(library name, version)` of the extractor; successful lookups are cached
    pub async fn library_version(&self) -> (&'static str, String) {
        let version = self
            .version
            .get_or_try_init(|| self.extractor.version())
            .await
            .cloned()
            .unwrap_or_else(|e| {
                tracing::warn!("Could not determine extractor version: {}", e);
                UNKNOWN_VERSION.to_string()
            });

        (self.extractor.library_name(), version)
    }

    /// Fetch the media and return it fully read into memory
    pub async fn fetch(&self, request: &DownloadRequest) -> FetchResult<FetchedMedia> {
        self.with_artifact(request, |artifact| async move {
            let data = tokio::fs::read(&artifact.path)
                .await
                .map_err(|e| FetchError::extraction(format!("Failed to read downloaded file: {}", e)))?;

            tracing::info!(file = %artifact.file_name, bytes = data.len(), "Fetched media");

            Ok(FetchedMedia {
                file_name: artifact.file_name,
                mime_type: artifact.mime_type,
                data,
            })
        })
        .await
    }

    /// Fetch the media and copy it into `dest_dir`, returning the final path
    pub async fn fetch_to_dir(&self, request: &DownloadRequest, dest_dir: &Path) -> FetchResult<PathBuf> {
        let dest_dir = dest_dir.to_path_buf();

        self.with_artifact(request, |artifact| async move {
            tokio::fs::create_dir_all(&dest_dir)
                .await
                .map_err(|e| FetchError::extraction(format!("Failed to create {}: {}", dest_dir.display(), e)))?;

            let destination = dest_dir.join(&artifact.file_name);
            tokio::fs::copy(&artifact.path, &destination)
                .await
                .map_err(|e| FetchError::extraction(format!("Failed to save file: {}", e)))?;

            Ok(destination)
        })
        .await
    }

    fn options_for(&self, request: &DownloadRequest) -> ExtractionOptions {
        self.config
            .extractor
            .extraction_options()
            .for_platform(request.platform)
    }

    fn check_transcoder(options: &ExtractionOptions) -> FetchResult<()> {
        if options.target.requires_transcoder() && !options.ffmpeg_path.exists() {
            return Err(FetchError::DependencyMissing(options.ffmpeg_path.clone()));
        }
        Ok(())
    }

    async fn with_artifact<T, F, Fut>(&self, request: &DownloadRequest, consume: F) -> FetchResult<T>
    where
        F: FnOnce(ExtractedArtifact) -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let options = self.options_for(request);
        Self::check_transcoder(&options)?;

        tracing::info!(
            url = %request.source_url,
            platform = request.platform.map(|p| p.as_str()).unwrap_or("auto"),
            "Starting extraction"
        );

        let workspace = ScratchWorkspace::acquire(
            self.config.workspace.root.as_deref(),
            &self.config.workspace.prefix,
        )?;

        let result = match self
            .extractor
            .extract(&request.source_url, &workspace, &options)
            .await
        {
            Ok(artifact) => consume(artifact).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::warn!(url = %request.source_url, "Extraction failed: {}", e);
        }

        workspace.release();
        result
    }
}
