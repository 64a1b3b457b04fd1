use crate::config::ExtractorConfig;
use crate::extractors::ytdlp::YtDlpExtractor;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Sanitize filename for safe use in filesystem paths and HTTP headers
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            match c {
                // Keep ASCII alphanumerics, spaces, hyphens, underscores, and dots
                c if c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
                // Replace everything else with underscore
                _ => '_',
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// File name suitable for a quoted `Content-Disposition` parameter
pub fn header_safe_filename(filename: &str) -> String {
    let sanitized = sanitize_filename(filename);
    if sanitized.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "download".to_string()
    } else {
        sanitized
    }
}

/// Check if the current environment has the external tools the extractor needs
pub async fn check_dependencies(config: &ExtractorConfig) -> Vec<String> {
    let mut missing = Vec::new();

    if !YtDlpExtractor::new(&config.yt_dlp_path).check_availability().await {
        missing.push(format!(
            "yt-dlp ({}) - required for all downloads",
            config.yt_dlp_path.display()
        ));
    }

    let ffmpeg = config.resolved_ffmpeg_path();
    if !ffmpeg.exists() {
        let need = if config.target.requires_transcoder() {
            "required for audio transcoding"
        } else {
            "recommended for thumbnail embedding"
        };
        missing.push(format!("ffmpeg ({}) - {}", ffmpeg.display(), need));
    }

    missing
}
