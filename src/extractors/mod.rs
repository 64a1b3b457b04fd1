use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub mod platform;
pub mod ytdlp;

pub use platform::Platform;

use crate::error::{FetchError, FetchResult};
use crate::workspace::ScratchWorkspace;

/// A file produced by an extractor inside a scratch workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArtifact {
    /// Absolute path of the file, always inside the workspace
    pub path: PathBuf,

    /// Bare file name as written by the extractor
    pub file_name: String,

    /// MIME type guessed from the file extension
    pub mime_type: &'static str,
}

impl ExtractedArtifact {
    pub fn from_path(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_type_for_path(&path);

        Self {
            path,
            file_name,
            mime_type,
        }
    }
}

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Opus,
    Webm,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Opus => "opus",
            AudioFormat::Webm => "webm",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "aac" => Some(AudioFormat::M4a),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" | "oga" => Some(AudioFormat::Ogg),
            "opus" => Some(AudioFormat::Opus),
            "webm" => Some(AudioFormat::Webm),
            _ => None,
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Opus => "audio/opus",
            AudioFormat::Webm => "audio/webm",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the extractor should leave in the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TargetFormat {
    /// Keep whatever container the best audio stream came in
    Raw,

    /// Re-encode through ffmpeg; `quality` uses the yt-dlp VBR scale (0 = best)
    TranscodedAudio { codec: AudioFormat, quality: u8 },
}

impl TargetFormat {
    pub fn requires_transcoder(&self) -> bool {
        matches!(self, TargetFormat::TranscodedAudio { .. })
    }
}

impl Default for TargetFormat {
    fn default() -> Self {
        TargetFormat::TranscodedAudio {
            codec: AudioFormat::Mp3,
            quality: 0,
        }
    }
}

/// Options handed to an extractor for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOptions {
    pub target: TargetFormat,
    pub retries: u32,
    pub ignore_errors: bool,
    pub embed_thumbnail: bool,
    pub embed_metadata: bool,
    pub ffmpeg_path: PathBuf,
}

impl ExtractionOptions {
    /// Adjust the options for a platform hint; Apple Podcasts never embeds thumbnails
    pub fn for_platform(mut self, platform: Option<Platform>) -> Self {
        if platform == Some(Platform::ApplePodcasts) {
            self.embed_thumbnail = false;
        }
        self
    }
}

/// Trait for the external library that turns a URL into a local media file
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Key used in the `/version` response
    fn library_name(&self) -> &'static str;

    /// Version string reported by the underlying tool
    async fn version(&self) -> FetchResult<String>;

    /// Download `url` into `workspace` and return the resulting file
    async fn extract(
        &self,
        url: &Url,
        workspace: &ScratchWorkspace,
        options: &ExtractionOptions,
    ) -> FetchResult<ExtractedArtifact>;
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> FetchResult<Url> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }

    Ok(parsed)
}

/// Guess a MIME type from the file extension
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().map(|ext| ext.to_string_lossy().to_lowercase()) else {
        return "application/octet-stream";
    };

    if let Some(format) = AudioFormat::from_extension(&ext) {
        return format.mime_type();
    }

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "3gp" => "video/3gpp",
        _ => "application/octet-stream",
    }
}

const SIDECAR_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "part", "ytdl", "json", "vtt", "srt"];

/// Pick the artifact the extractor produced.
///
/// A path reported by the tool wins when it exists inside the workspace.
/// Otherwise the workspace is scanned: files with the target codec's
/// extension first, then (raw mode) any file that is not a sidecar.
pub fn resolve_artifact(
    workspace: &Path,
    reported: Option<&Path>,
    target: &TargetFormat,
) -> FetchResult<PathBuf> {
    if let Some(path) = reported {
        if path.starts_with(workspace) && path.is_file() {
            return Ok(path.to_path_buf());
        }
        tracing::debug!("Reported path {} not usable, scanning workspace", path.display());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(workspace)
        .map_err(|e| FetchError::extraction(format!("Cannot read workspace: {}", e)))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let found = match target {
        TargetFormat::TranscodedAudio { codec, .. } => files
            .into_iter()
            .find(|path| extension_of(path) == codec.as_str()),
        TargetFormat::Raw => files
            .into_iter()
            .find(|path| !SIDECAR_EXTENSIONS.contains(&extension_of(path).as_str())),
    };

    found.ok_or_else(|| FetchError::extraction("No file found after download"))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
