use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

use super::{resolve_artifact, ExtractedArtifact, ExtractionOptions, MediaExtractor, TargetFormat};
use crate::error::{FetchError, FetchResult};
use crate::workspace::ScratchWorkspace;

/// Output template; the workspace is unique per request so titles cannot collide
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Longest stderr excerpt carried into an error message
const STDERR_TAIL: usize = 400;

/// Media extractor backed by the yt-dlp executable
pub struct YtDlpExtractor {
    yt_dlp_path: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(yt_dlp_path: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        self.version().await.is_ok()
    }

    /// Command-line arguments for one download
    pub fn build_args(url: &Url, workspace: &Path, options: &ExtractionOptions) -> Vec<String> {
        let output = workspace.join(OUTPUT_TEMPLATE);

        let mut args: Vec<String> = vec![
            "--format".into(),
            "bestaudio/best".into(),
            "--output".into(),
            output.to_string_lossy().into_owned(),
            "--retries".into(),
            options.retries.to_string(),
            "--encoding".into(),
            "utf-8".into(),
            "--no-playlist".into(),
            "--no-progress".into(),
        ];

        if options.ignore_errors {
            args.push("--ignore-errors".into());
        }

        if options.embed_thumbnail {
            args.push("--write-thumbnail".into());
            args.push("--embed-thumbnail".into());
        }

        if options.embed_metadata {
            args.push("--embed-metadata".into());
        }

        match options.target {
            TargetFormat::TranscodedAudio { codec, quality } => {
                args.extend([
                    "--extract-audio".into(),
                    "--audio-format".into(),
                    codec.as_str().into(),
                    "--audio-quality".into(),
                    quality.to_string(),
                    "--ffmpeg-location".into(),
                    options.ffmpeg_path.to_string_lossy().into_owned(),
                ]);
            }
            TargetFormat::Raw => {
                if options.ffmpeg_path.exists() {
                    args.push("--ffmpeg-location".into());
                    args.push(options.ffmpeg_path.to_string_lossy().into_owned());
                }
            }
        }

        // Report the final path after post-processing moved the file
        args.extend([
            "--no-simulate".into(),
            "--print".into(),
            "after_move:filepath".into(),
        ]);

        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn library_name(&self) -> &'static str {
        "yt_dlp"
    }

    async fn version(&self) -> FetchResult<String> {
        let output = Command::new(&self.yt_dlp_path)
            .arg("--version")
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| FetchError::extraction(format!("yt-dlp is not available: {}", e)))?;

        if !output.status.success() {
            return Err(FetchError::extraction("yt-dlp --version failed"));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn extract(
        &self,
        url: &Url,
        workspace: &ScratchWorkspace,
        options: &ExtractionOptions,
    ) -> FetchResult<ExtractedArtifact> {
        tracing::debug!("Downloading audio for: {}", url);

        let args = Self::build_args(url, workspace.path(), options);

        // A child left running after the workspace is gone would recreate it
        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .current_dir(workspace.path())
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| FetchError::extraction(format!("failed to run yt-dlp: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from);

        // With --ignore-errors yt-dlp may exit non-zero after producing a usable file
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(status = ?output.status, "yt-dlp reported errors: {}", stderr.trim());

            if reported.is_none() {
                return Err(FetchError::extraction(stderr_tail(&stderr)));
            }
        }

        let path = resolve_artifact(workspace.path(), reported.as_deref(), &options.target)?;
        tracing::debug!("Resolved artifact: {}", path.display());

        Ok(ExtractedArtifact::from_path(path))
    }
}

/// Last meaningful part of yt-dlp's stderr, usually the `ERROR:` line
fn stderr_tail(stderr: &str) -> String {
    let line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| stderr.lines().rev().map(str::trim).find(|line| !line.is_empty()))
        .unwrap_or("yt-dlp exited with an error");

    let line = line.strip_prefix("ERROR:").map(str::trim).unwrap_or(line);

    if line.chars().count() > STDERR_TAIL {
        line.chars().take(STDERR_TAIL).collect()
    } else {
        line.to_string()
    }
}


#[cfg(all(test, unix))]
mod script_tests {
    use super::*;
    use crate::pipeline::test_support::{fake_yt_dlp, raw_config};
    use crate::pipeline::{DownloadPipeline, DownloadRequest};
    use std::sync::Arc;
    use std::time::Duration;

    fn raw_options() -> ExtractionOptions {
        ExtractionOptions {
            target: TargetFormat::Raw,
            retries: 3,
            ignore_errors: true,
            embed_thumbnail: false,
            embed_metadata: false,
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg"),
        }
    }

    async fn run(body: &str) -> (tempfile::TempDir, ScratchWorkspace, FetchResult<ExtractedArtifact>) {
        let scripts = tempfile::tempdir().unwrap();
        let extractor = YtDlpExtractor::new(fake_yt_dlp(scripts.path(), body));
        let workspace = ScratchWorkspace::acquire(Some(scripts.path()), "downloader-").unwrap();
        let url = Url::parse("https://youtube.com/watch?v=abc123").unwrap();

        let result = extractor.extract(&url, &workspace, &raw_options()).await;
        (scripts, workspace, result)
    }

    #[tokio::test]
    async fn test_version_reads_stdout() {
        let scripts = tempfile::tempdir().unwrap();
        let extractor = YtDlpExtractor::new(fake_yt_dlp(scripts.path(), "echo 2024.08.06"));
        assert_eq!(extractor.version().await.unwrap(), "2024.08.06");
        assert!(extractor.check_availability().await);
    }

    #[tokio::test]
    async fn test_extract_uses_last_printed_line() {
        let (_scripts, workspace, result) = run(
            "printf webm > \"$dir/Title.webm\"\n\
             printf jpg > \"$dir/Title.jpg\"\n\
             echo \"[info] abc123: Downloading webpage\"\n\
             echo \"$dir/Title.webm\"",
        )
        .await;

        let artifact = result.unwrap();
        assert_eq!(artifact.path, workspace.path().join("Title.webm"));
        assert_eq!(artifact.file_name, "Title.webm");
        assert_eq!(artifact.mime_type, "audio/webm");
    }

    #[tokio::test]
    async fn test_nonzero_exit_with_printed_path_succeeds() {
        let (_scripts, workspace, result) = run(
            "printf webm > \"$dir/Episode.webm\"\n\
             echo \"$dir/Episode.webm\"\n\
             echo \"ERROR: Postprocessing: Error opening output files\" >&2\n\
             exit 1",
        )
        .await;

        assert_eq!(result.unwrap().path, workspace.path().join("Episode.webm"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_path_reports_error_line() {
        let (_scripts, _workspace, result) = run(
            "echo \"WARNING: [generic] Falling back on generic information extractor\" >&2\n\
             echo \"ERROR: [generic] Unable to download webpage: HTTP Error 404: Not Found\" >&2\n\
             exit 1",
        )
        .await;

        let error = result.unwrap_err();
        assert!(matches!(error, FetchError::Extraction(_)));
        assert_eq!(
            error.to_string(),
            "Download failed: [generic] Unable to download webpage: HTTP Error 404: Not Found"
        );
    }

    #[tokio::test]
    async fn test_path_outside_workspace_falls_back_to_scan() {
        let (_scripts, workspace, result) = run(
            "printf webm > \"$dir/Title.webm\"\n\
             echo /elsewhere/Title.webm",
        )
        .await;

        assert_eq!(result.unwrap().path, workspace.path().join("Title.webm"));
    }

    #[tokio::test]
    async fn test_dropped_fetch_stops_yt_dlp() {
        let scripts = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let finished = scripts.path().join("finished");
        let script = fake_yt_dlp(
            scripts.path(),
            &format!(
                "sleep 1\nmkdir -p \"$dir\"\nprintf webm > \"$dir/Title.webm\"\ntouch '{}'\necho \"$dir/Title.webm\"",
                finished.display()
            ),
        );

        let pipeline = DownloadPipeline::new(
            Arc::new(raw_config(root.path())),
            Arc::new(YtDlpExtractor::new(script)),
        );
        let request = DownloadRequest::from_query(Some("https://youtube.com/watch?v=abc123"), None).unwrap();

        let outcome = tokio::time::timeout(Duration::from_millis(300), pipeline.fetch(&request)).await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!finished.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
