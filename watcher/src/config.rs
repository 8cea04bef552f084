//! Centralized configuration management.
//!
//! All environment variables are loaded and validated at startup through this
//! module. This prevents scattered `env::var()` calls and ensures early
//! failure on missing config.

use std::sync::LazyLock;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Spotify application client id (required)
    pub spotify_client_id: String,
    /// Spotify application client secret (required)
    pub spotify_client_secret: String,
    /// Playlist to watch: a bare id or an open.spotify.com URL (required)
    pub playlist: String,
    /// slskd API base URL (default: "http://localhost:5030")
    pub slskd_url: String,
    /// slskd API key; when unset, session login with the credentials below
    pub slskd_api_key: Option<String>,
    /// slskd session username (default: "slskd")
    pub slskd_username: String,
    /// slskd session password (default: "slskd")
    pub slskd_password: String,
    /// Seconds between playlist checks (default: 60)
    pub check_interval: Duration,
    /// Minimum match score for accepting a candidate (default: 0.15)
    pub match_threshold: f64,
    /// File extension accepted for download (default: "mp3")
    pub target_extension: String,
    /// Maximum number of tracks processed at once (default: 3)
    pub max_concurrent_downloads: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required environment variables (SPOTIFY_CLIENT_ID,
    /// SPOTIFY_CLIENT_SECRET, PLAYLIST) are missing.
    pub fn from_env() -> Self {
        Self {
            spotify_client_id: std::env::var("SPOTIFY_CLIENT_ID")
                .expect("Missing required SPOTIFY_CLIENT_ID env var"),
            spotify_client_secret: std::env::var("SPOTIFY_CLIENT_SECRET")
                .expect("Missing required SPOTIFY_CLIENT_SECRET env var"),
            playlist: std::env::var("PLAYLIST").expect("Missing required PLAYLIST env var"),
            slskd_url: std::env::var("SLSKD_URL")
                .unwrap_or_else(|_| "http://localhost:5030".to_string()),
            slskd_api_key: std::env::var("SLSKD_API_KEY").ok(),
            slskd_username: std::env::var("SLSKD_USERNAME")
                .unwrap_or_else(|_| "slskd".to_string()),
            slskd_password: std::env::var("SLSKD_PASSWORD")
                .unwrap_or_else(|_| "slskd".to_string()),
            check_interval: Duration::from_secs(
                std::env::var("CHECK_INTERVAL_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            match_threshold: std::env::var("MATCH_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.15),
            target_extension: std::env::var("TARGET_EXTENSION")
                .unwrap_or_else(|_| "mp3".to_string()),
            max_concurrent_downloads: std::env::var("MAX_CONCURRENT_DOWNLOADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        }
    }
}

/// Global application configuration singleton.
/// Loaded once at startup from environment variables.
pub static CONFIG: LazyLock<AppConfig> = LazyLock::new(AppConfig::from_env);
