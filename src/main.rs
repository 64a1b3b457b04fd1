use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_fetcher::extractors::platform::is_spotify_url;
use media_fetcher::extractors::ytdlp::YtDlpExtractor;
use media_fetcher::upload::PresignedUploader;
use media_fetcher::{server, utils, Cli, Commands, Config, DownloadPipeline, DownloadRequest, Platform};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "media_fetcher=debug,tower_http=debug"
    } else {
        "media_fetcher=info,tower_http=info"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            // Missing tools are reported, not fatal: requests fail with a clear message instead
            let missing_deps = utils::check_dependencies(&config.extractor).await;
            for dep in missing_deps {
                tracing::warn!("Dependency check: {}", dep);
            }

            let bind_address = bind.unwrap_or(config.server.bind_address);
            let pipeline = build_pipeline(config);
            server::start_server(pipeline, bind_address).await?;
        }
        Commands::Fetch {
            url,
            platform,
            output,
            upload,
        } => {
            if platform.is_none() && is_spotify_url(&url) {
                anyhow::bail!("Spotify download not implemented. Please use YouTube or Apple Podcasts URLs.");
            }

            let mut request = DownloadRequest::from_query(Some(&url), platform.as_deref())?;
            if request.platform.is_none() {
                request.platform = Platform::detect(&url);
            }
            if let Some(platform) = request.platform {
                tracing::info!("Detected platform: {}", platform.display_name());
            }

            let uploader = if upload {
                let endpoint = config
                    .upload
                    .presign_endpoint
                    .as_deref()
                    .context("--upload needs upload.presign_endpoint in the configuration")?;
                Some(PresignedUploader::from_endpoint(endpoint)?)
            } else {
                None
            };

            let pipeline = build_pipeline(config);
            let progress = spinner(cli.quiet, "Downloading audio with yt-dlp...");

            match uploader {
                Some(uploader) => {
                    let media = pipeline.fetch(&request).await?;
                    let size = utils::format_file_size(media.data.len() as u64);
                    progress.set_message("Uploading to storage...");
                    let location = uploader.upload(media).await?;
                    progress.finish_with_message("Upload complete");
                    println!("Uploaded ({}) to: {}", size, location);
                }
                None => {
                    let path = pipeline.fetch_to_dir(&request, &output).await?;
                    progress.finish_with_message("Download complete");
                    let size = fs_err::metadata(&path).map(|m| m.len()).unwrap_or(0);
                    println!("Saved ({}) to: {}", utils::format_file_size(size), path.display());
                }
            }
        }
        Commands::Version => {
            let pipeline = build_pipeline(config);
            let (name, version) = pipeline.library_version().await;
            println!("{} {}", name, version);
        }
        Commands::Config { .. } => {
            config.display();
        }
    }

    Ok(())
}

fn build_pipeline(config: Config) -> Arc<DownloadPipeline> {
    let extractor = Arc::new(YtDlpExtractor::new(config.extractor.yt_dlp_path.clone()));
    Arc::new(DownloadPipeline::new(Arc::new(config), extractor))
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}
