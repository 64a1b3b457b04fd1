use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use url::Url;

use crate::extractors::{ExtractionOptions, TargetFormat};
use crate::workspace::DEFAULT_PREFIX;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// yt-dlp and ffmpeg settings
    pub extractor: ExtractorConfig,

    /// Scratch directory settings
    pub workspace: WorkspaceConfig,

    /// Presigned upload settings
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_address: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// yt-dlp executable (looked up on PATH when bare)
    pub yt_dlp_path: PathBuf,

    /// ffmpeg executable; `<current dir>/bin/ffmpeg` when unset
    pub ffmpeg_path: Option<PathBuf>,

    /// Network retries performed by yt-dlp itself
    pub retries: u32,

    /// Keep going on recoverable extraction errors
    pub ignore_errors: bool,

    /// Write and embed the thumbnail into the output
    pub embed_thumbnail: bool,

    /// Embed title/artist metadata into the output
    pub embed_metadata: bool,

    /// Output format
    pub target: TargetFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Parent for scratch directories (system temp dir when unset)
    pub root: Option<PathBuf>,

    /// Scratch directory name prefix
    pub prefix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Endpoint returning `{url, fields}` for a presigned form upload
    pub presign_endpoint: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_path: None,
            retries: 3,
            ignore_errors: true,
            embed_thumbnail: true,
            embed_metadata: false,
            target: TargetFormat::default(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Effective ffmpeg location
    pub fn resolved_ffmpeg_path(&self) -> PathBuf {
        match &self.ffmpeg_path {
            Some(path) => path.clone(),
            None => std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("bin")
                .join("ffmpeg"),
        }
    }

    pub fn extraction_options(&self) -> ExtractionOptions {
        ExtractionOptions {
            target: self.target,
            retries: self.retries,
            ignore_errors: self.ignore_errors,
            embed_thumbnail: self.embed_thumbnail,
            embed_metadata: self.embed_metadata,
            ffmpeg_path: self.resolved_ffmpeg_path(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, the default locations, or built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };

        let Some(config_path) = config_path else {
            tracing::debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        let config = Self::from_file(&config_path)?;
        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// First existing config file among the default locations
    fn default_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("media-fetcher.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        let user_config = dirs::config_dir()?.join("media-fetcher").join("config.yaml");
        user_config.exists().then_some(user_config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.extractor.retries == 0 {
            anyhow::bail!("extractor.retries must be at least 1");
        }

        if let TargetFormat::TranscodedAudio { quality, .. } = self.extractor.target {
            if quality > 10 {
                anyhow::bail!("extractor.target.quality must be between 0 and 10, got {}", quality);
            }
        }

        if self.workspace.prefix.contains(std::path::is_separator) {
            anyhow::bail!("workspace.prefix must not contain path separators");
        }

        if let Some(endpoint) = &self.upload.presign_endpoint {
            Url::parse(endpoint).with_context(|| format!("Invalid upload.presign_endpoint: {}", endpoint))?;
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Bind Address: {}", self.server.bind_address);
        println!("  yt-dlp: {}", self.extractor.yt_dlp_path.display());
        println!("  FFmpeg: {}", self.extractor.resolved_ffmpeg_path().display());
        println!("  Retries: {}", self.extractor.retries);
        match self.extractor.target {
            TargetFormat::Raw => println!("  Output: best available audio, no transcoding"),
            TargetFormat::TranscodedAudio { codec, quality } => {
                println!("  Output: {} (quality {})", codec, quality)
            }
        }
        match &self.workspace.root {
            Some(root) => println!("  Workspace Root: {}", root.display()),
            None => println!("  Workspace Root: {}", std::env::temp_dir().display()),
        }
        if let Some(endpoint) = &self.upload.presign_endpoint {
            println!("  Presign Endpoint: {}", endpoint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::AudioFormat;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.extractor.retries, 3);
        assert!(config.extractor.ignore_errors);
        assert_eq!(config.workspace.prefix, "downloader-");
        assert_eq!(
            config.extractor.target,
            TargetFormat::TranscodedAudio {
                codec: AudioFormat::Mp3,
                quality: 0
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_ffmpeg_under_working_directory() {
        let config = ExtractorConfig::default();
        let expected = std::env::current_dir().unwrap().join("bin").join("ffmpeg");
        assert_eq!(config.resolved_ffmpeg_path(), expected);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "server:\n  bind_address: 0.0.0.0:9000\nextractor:\n  ffmpeg_path: /opt/ffmpeg\n  target:\n    mode: raw\n",
        )
        .unwrap();

        assert_eq!(config.server.bind_address.port(), 9000);
        assert_eq!(config.extractor.resolved_ffmpeg_path(), PathBuf::from("/opt/ffmpeg"));
        assert_eq!(config.extractor.target, TargetFormat::Raw);
        assert_eq!(config.extractor.retries, 3);
    }

    #[test]
    fn test_validation_failures() {
        assert!(Config::from_yaml("extractor:\n  retries: 0\n").is_err());
        assert!(Config::from_yaml(
            "extractor:\n  target:\n    mode: transcoded_audio\n    codec: mp3\n    quality: 11\n"
        )
        .is_err());
        assert!(Config::from_yaml("upload:\n  presign_endpoint: not a url\n").is_err());
        assert!(Config::from_yaml("workspace:\n  prefix: a/b\n").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "upload:\n  presign_endpoint: http://localhost:3000/api/presign\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.upload.presign_endpoint.as_deref(),
            Some("http://localhost:3000/api/presign")
        );
        assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn test_extraction_options_follow_config() {
        let mut config = ExtractorConfig::default();
        config.embed_metadata = true;
        config.ffmpeg_path = Some(PathBuf::from("/usr/bin/ffmpeg"));

        let options = config.extraction_options();
        assert!(options.embed_metadata);
        assert_eq!(options.retries, 3);
        assert_eq!(options.ffmpeg_path, PathBuf::from("/usr/bin/ffmpeg"));
    }
}
