use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use shared::spotify::{Artist, Playlist, Track};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, SoulspotError};
use crate::traits::PlaylistSource;

const AUTH_URL: &str = "https://accounts.spotify.com/api/token";
const BASE_URL: &str = "https://api.spotify.com/v1";
const PAGE_SIZE: usize = 50;

static RE_PLAYLIST_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());
static RE_PLAYLIST_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"playlist/([a-zA-Z0-9]+)").unwrap());

/// Accept either a bare playlist id or an open.spotify.com playlist URL.
pub fn extract_playlist_id(input: &str) -> Result<String> {
    if RE_PLAYLIST_ID.is_match(input) {
        return Ok(input.to_string());
    }
    RE_PLAYLIST_URL
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SoulspotError::InvalidPlaylist(input.to_string()))
}

#[derive(Debug, Clone)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    auth_url: String,
    base_url: String,
    token: Arc<Mutex<Option<AccessToken>>>,
    client: Client,
}

impl SpotifyClient {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_url: AUTH_URL.to_string(),
            base_url: BASE_URL.to_string(),
            token: Arc::new(Mutex::new(None)),
            client: Client::new(),
        }
    }

    #[cfg(test)]
    fn with_urls(mut self, auth_url: &str, base_url: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self.base_url = base_url.to_string();
        self
    }

    /// Client-credentials grant. The token is cached with its expiry and
    /// refreshed lazily by [`Self::ensure_auth`].
    async fn authenticate(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct AuthResponse {
            access_token: String,
            expires_in: i64,
        }

        debug!("Requesting Spotify access token");
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(SoulspotError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let auth: AuthResponse = response.json().await?;
        let expires_at = Utc::now() + Duration::seconds(auth.expires_in);
        *self.token.lock().await = Some(AccessToken {
            token: auth.access_token.clone(),
            expires_at,
        });
        Ok(auth.access_token)
    }

    async fn ensure_auth(&self) -> Result<String> {
        if let Some(token) = self.token.lock().await.as_ref() {
            if Utc::now() < token.expires_at {
                return Ok(token.token.clone());
            }
        }
        self.authenticate().await
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let token = self.ensure_auth().await?;
        let url = format!("{}{endpoint}", self.base_url);
        debug!("Request: GET {url}");
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(SoulspotError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response.json().await.map_err(Into::into)
    }

    pub async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
        #[derive(Deserialize)]
        struct PlaylistResponse {
            id: String,
            name: String,
        }

        let response: PlaylistResponse =
            self.get_json(&format!("/playlists/{playlist_id}")).await?;
        Ok(Playlist {
            id: response.id,
            name: response.name,
        })
    }

    /// Every track on the playlist, following pagination. Items without a
    /// track id (removed or local files) are skipped.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        #[derive(Deserialize)]
        struct TrackItem {
            #[serde(default)]
            id: Option<String>,
            name: String,
            artists: Vec<Artist>,
            #[serde(default)]
            duration_ms: u32,
        }
        #[derive(Deserialize)]
        struct PlaylistItem {
            added_at: DateTime<Utc>,
            track: Option<TrackItem>,
        }
        #[derive(Deserialize)]
        struct PlaylistTracksPage {
            items: Vec<PlaylistItem>,
            total: usize,
        }

        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let endpoint = format!(
                "/playlists/{playlist_id}/tracks?offset={offset}&limit={PAGE_SIZE}\
                 &fields=total,items(added_at,track(id,name,duration_ms,artists(id,name)))"
            );
            let page: PlaylistTracksPage = self.get_json(&endpoint).await?;
            let fetched = page.items.len();

            for item in page.items {
                let Some(track) = item.track else { continue };
                let Some(id) = track.id.filter(|id| !id.is_empty()) else {
                    continue;
                };
                all.push(Track {
                    id,
                    name: track.name,
                    artists: track.artists,
                    added_at: item.added_at,
                    duration_ms: track.duration_ms,
                });
            }

            offset += fetched;
            if fetched == 0 || offset >= page.total {
                break;
            }
        }
        Ok(all)
    }

    pub async fn tracks_added_since(
        &self,
        playlist_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Track>> {
        let tracks = self.playlist_tracks(playlist_id).await?;
        info!(
            "Retrieved {} tracks from playlist {}, looking for additions after {}",
            tracks.len(),
            playlist_id,
            since
        );
        let new_tracks: Vec<Track> = tracks.into_iter().filter(|t| t.added_at > since).collect();
        info!("{} tracks added since last check", new_tracks.len());
        Ok(new_tracks)
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    fn id(&self) -> &'static str {
        "spotify"
    }

    fn name(&self) -> &'static str {
        "Spotify"
    }

    async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
        SpotifyClient::playlist(self, playlist_id).await
    }

    async fn tracks_added_since(
        &self,
        playlist_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Track>> {
        SpotifyClient::tracks_added_since(self, playlist_id, since).await
    }
}
