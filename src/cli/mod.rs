use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "media-fetcher",
    about = "Media Fetcher - Download audio from YouTube, Apple Podcasts and more over HTTP",
    version,
    long_about = "A small HTTP service that hands a media URL to yt-dlp, converts the audio with ffmpeg in a scratch directory, and returns the file. The same pipeline is available from the command line."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (YAML)
    #[arg(short, long, global = true, env = "MEDIA_FETCHER_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides server.bind_address)
        #[arg(short, long, env = "MEDIA_FETCHER_BIND", value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Download a single URL from the command line
    Fetch {
        /// Media URL (YouTube or Apple Podcasts)
        #[arg(value_name = "URL")]
        url: String,

        /// Platform hint (youtube, apple_podcasts); detected from the URL when omitted
        #[arg(short, long, value_name = "PLATFORM")]
        platform: Option<String>,

        /// Directory to write the file into
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// Upload to storage through the configured presign endpoint instead of saving locally
        #[arg(long)]
        upload: bool,
    },

    /// Show the extraction library version
    Version,

    /// Show the effective configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::parse_from([
            "media-fetcher",
            "fetch",
            "https://youtu.be/abc123",
            "--platform",
            "youtube",
            "--upload",
        ]);

        match cli.command {
            Commands::Fetch {
                url,
                platform,
                output,
                upload,
            } => {
                assert_eq!(url, "https://youtu.be/abc123");
                assert_eq!(platform.as_deref(), Some("youtube"));
                assert_eq!(output, PathBuf::from("."));
                assert!(upload);
            }
            _ => panic!("expected fetch command"),
        }
    }

    #[test]
    fn test_parse_serve_bind() {
        let cli = Cli::parse_from(["media-fetcher", "serve", "--bind", "0.0.0.0:9000"]);
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind, Some("0.0.0.0:9000".parse().unwrap())),
            _ => panic!("expected serve command"),
        }
    }
}
