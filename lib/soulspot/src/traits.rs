use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::slskd::SearchResult;
use shared::spotify::{Playlist, Track};

use crate::error::Result;

/// Where tracked playlists and their tracks come from.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    async fn playlist(&self, playlist_id: &str) -> Result<Playlist>;

    async fn tracks_added_since(
        &self,
        playlist_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Track>>;
}

/// Where searches run and downloads get queued.
#[async_trait]
pub trait DownloadBackend: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    /// Run a full search cycle and return every offered file.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;

    /// Queue a download for one candidate, owner/path/size unchanged.
    async fn enqueue(&self, candidate: &SearchResult) -> Result<()>;

    async fn health_check(&self) -> bool;
}
