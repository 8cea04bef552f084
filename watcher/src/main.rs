use std::sync::Arc;

use soulspot::slskd::SlskdClientBuilder;
use soulspot::spotify::{extract_playlist_id, SpotifyClient};
use soulspot::{MatchOptions, Worker, WorkerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::CONFIG;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> soulspot::Result<()> {
    let playlist_id = extract_playlist_id(&CONFIG.playlist)?;

    let spotify = SpotifyClient::new(&CONFIG.spotify_client_id, &CONFIG.spotify_client_secret);

    let mut builder = SlskdClientBuilder::new()
        .base_url(&CONFIG.slskd_url)
        .credentials(&CONFIG.slskd_username, &CONFIG.slskd_password);
    if let Some(key) = &CONFIG.slskd_api_key {
        builder = builder.api_key(key);
    }
    let slskd = builder.build()?;

    if CONFIG.slskd_api_key.is_none() {
        slskd.login().await?;
    }

    let worker = Worker::new(
        WorkerConfig {
            playlist_id,
            check_interval: CONFIG.check_interval,
            max_concurrent: CONFIG.max_concurrent_downloads,
            match_options: MatchOptions {
                threshold: CONFIG.match_threshold,
                extension: CONFIG.target_extension.clone(),
                ..MatchOptions::default()
            },
        },
        Arc::new(spotify),
        Arc::new(slskd),
    );

    tokio::select! {
        result = worker.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
