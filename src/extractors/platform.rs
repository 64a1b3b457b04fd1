use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

use crate::error::FetchError;

/// Platforms the service accepts as a `platform` hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    ApplePodcasts,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Youtube, Platform::ApplePodcasts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::ApplePodcasts => "apple_podcasts",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::ApplePodcasts => "Apple Podcasts",
        }
    }

    /// Guess the platform from the URL host
    pub fn detect(url: &str) -> Option<Platform> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        match host {
            "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtu.be" => {
                Some(Platform::Youtube)
            }
            "podcasts.apple.com" => Some(Platform::ApplePodcasts),
            "itunes.apple.com" if parsed.path().to_lowercase().contains("podcast") => {
                Some(Platform::ApplePodcasts)
            }
            _ => None,
        }
    }
}

impl FromStr for Platform {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|platform| platform.as_str() == s)
            .ok_or_else(|| FetchError::UnsupportedPlatform(s.to_string()))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spotify links are recognised only to reject them with a clear message
pub fn is_spotify_url(url: &str) -> bool {
    let url_lower = url.to_lowercase();
    url_lower.starts_with("spotify:") || url_lower.contains("open.spotify.com") || url_lower.contains("spotify.com/")
}
