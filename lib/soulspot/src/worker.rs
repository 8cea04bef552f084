use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use shared::spotify::Track;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::matching::{build_search_query, select_best, MatchOptions, Selection};
use crate::traits::{DownloadBackend, PlaylistSource};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub playlist_id: String,
    /// How often the playlist is re-checked.
    pub check_interval: Duration,
    /// Cap on simultaneously processed tracks.
    pub max_concurrent: usize,
    pub match_options: MatchOptions,
}

/// Watches one playlist and turns newly added tracks into downloads.
pub struct Worker {
    config: WorkerConfig,
    playlists: Arc<dyn PlaylistSource>,
    backend: Arc<dyn DownloadBackend>,
    last_check: Mutex<DateTime<Utc>>,
}

impl Worker {
    pub fn new(
        config: WorkerConfig,
        playlists: Arc<dyn PlaylistSource>,
        backend: Arc<dyn DownloadBackend>,
    ) -> Self {
        Self {
            config,
            playlists,
            backend,
            last_check: Mutex::new(Utc::now()),
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("Worker starting for playlist {}", self.config.playlist_id);
        info!("Check interval: {:?}", self.config.check_interval);

        if !self.backend.health_check().await {
            warn!(
                "{} is not reachable yet, continuing anyway",
                self.backend.name()
            );
        }

        match self.playlists.playlist(&self.config.playlist_id).await {
            Ok(playlist) => info!("Watching playlist '{}' ({})", playlist.name, playlist.id),
            Err(e) => warn!("Could not fetch playlist metadata: {e}"),
        }

        // Tracks already on the playlist are not backfilled; only additions
        // from this point on are processed.
        *self.last_check.lock().await = Utc::now();
        info!("Worker ready, starting monitoring loop");

        let mut ticker = tokio::time::interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.check_for_new_tracks().await {
                error!("Check failed: {e}");
            }
        }
    }

    async fn check_for_new_tracks(&self) -> Result<()> {
        let since = *self.last_check.lock().await;
        info!("Checking for tracks added since {since}");

        let new_tracks = self
            .playlists
            .tracks_added_since(&self.config.playlist_id, since)
            .await?;

        if new_tracks.is_empty() {
            info!("No new tracks found");
            return Ok(());
        }

        info!("Found {} new tracks", new_tracks.len());
        *self.last_check.lock().await = Utc::now();

        let total = new_tracks.len();
        stream::iter(new_tracks)
            .for_each_concurrent(self.config.max_concurrent, |track| async move {
                if let Err(e) = self.process_track(&track).await {
                    error!(
                        "Failed to process track {} by {}: {e}",
                        track.name,
                        format_artists(&track)
                    );
                }
            })
            .await;

        info!("Finished processing {} new tracks", total);
        Ok(())
    }

    async fn process_track(&self, track: &Track) -> Result<()> {
        info!(
            "Processing track: {} by {}",
            track.name,
            format_artists(track)
        );

        let query = build_search_query(&track.name, track.artist_names());
        info!("Search query: {query}");

        let results = self.backend.search(&query).await?;
        let decision = select_best(&query, &results, &self.config.match_options);
        decision.log_decision(&query);

        match &decision.selection {
            Selection::Winner(candidate) => {
                self.backend.enqueue(candidate).await?;
                info!(
                    "Queued download for: {} by {}",
                    track.name,
                    format_artists(track)
                );
            }
            Selection::NoMatch { best_score } => {
                let closest = best_score
                    .map(|s| format!("{s:.3}"))
                    .unwrap_or_else(|| "none".to_string());
                warn!(
                    "No suitable match for '{query}' (closest score: {closest}, threshold: {:.2})",
                    self.config.match_options.threshold
                );
            }
        }
        Ok(())
    }
}

fn format_artists(track: &Track) -> String {
    let names: Vec<&str> = track.artist_names().collect();
    match names.len() {
        0 => "Unknown Artist".to_string(),
        1 => names[0].to_string(),
        2 => format!("{} & {}", names[0], names[1]),
        _ => format!("{} & others", names.iter().take(2).join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use shared::slskd::SearchResult;
    use shared::spotify::{Artist, Playlist};
    use std::sync::Mutex as StdMutex;

    fn track(name: &str, artists: &[&str], added_at: DateTime<Utc>) -> Track {
        Track {
            id: format!("id-{name}"),
            name: name.to_string(),
            artists: artists
                .iter()
                .map(|a| Artist {
                    id: format!("artist-{a}"),
                    name: a.to_string(),
                })
                .collect(),
            added_at,
            duration_ms: 240_000,
        }
    }

    struct FakePlaylist {
        tracks: Vec<Track>,
    }

    #[async_trait]
    impl PlaylistSource for FakePlaylist {
        fn id(&self) -> &'static str {
            "fake"
        }

        fn name(&self) -> &'static str {
            "Fake"
        }

        async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
            Ok(Playlist {
                id: playlist_id.to_string(),
                name: "Test Playlist".to_string(),
            })
        }

        async fn tracks_added_since(
            &self,
            _playlist_id: &str,
            since: DateTime<Utc>,
        ) -> Result<Vec<Track>> {
            Ok(self
                .tracks
                .iter()
                .filter(|t| t.added_at > since)
                .cloned()
                .collect())
        }
    }

    struct FakeBackend {
        results: Vec<SearchResult>,
        enqueued: StdMutex<Vec<SearchResult>>,
    }

    impl FakeBackend {
        fn offering(results: Vec<SearchResult>) -> Self {
            Self {
                results,
                enqueued: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DownloadBackend for FakeBackend {
        fn id(&self) -> &'static str {
            "fake"
        }

        fn name(&self) -> &'static str {
            "Fake"
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
            Ok(self.results.clone())
        }

        async fn enqueue(&self, candidate: &SearchResult) -> Result<()> {
            self.enqueued.lock().unwrap().push(candidate.clone());
            Ok(())
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn offer(filename: &str) -> SearchResult {
        SearchResult {
            username: "peer".to_string(),
            filename: filename.to_string(),
            size: 9_000_000,
            upload_speed: 100,
            locked: false,
        }
    }

    fn worker_with(tracks: Vec<Track>, backend: Arc<FakeBackend>) -> Worker {
        Worker::new(
            WorkerConfig {
                playlist_id: "pl1".to_string(),
                check_interval: Duration::from_secs(60),
                max_concurrent: 3,
                match_options: MatchOptions::default(),
            },
            Arc::new(FakePlaylist { tracks }),
            backend,
        )
    }

    #[tokio::test]
    async fn new_tracks_end_up_queued() {
        let added = Utc::now() + ChronoDuration::hours(1);
        let backend = Arc::new(FakeBackend::offering(vec![
            offer("Bastinov - Devine (Club Edit).wav"),
            offer("01 - Bastinov - Devine (Original Mix) [LABEL001].mp3"),
        ]));
        let worker = worker_with(vec![track("Devine", &["Bastinov"], added)], backend.clone());

        worker.check_for_new_tracks().await.unwrap();

        let enqueued = backend.enqueued.lock().unwrap();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(
            enqueued[0].filename,
            "01 - Bastinov - Devine (Original Mix) [LABEL001].mp3"
        );
    }

    #[tokio::test]
    async fn poor_matches_are_not_queued() {
        let added = Utc::now() + ChronoDuration::hours(1);
        let backend = Arc::new(FakeBackend::offering(vec![offer(
            "Random Artist - Unrelated Song.mp3",
        )]));
        let worker = worker_with(
            vec![track("Sabe", &["Intelectual", "To El Barrio"], added)],
            backend.clone(),
        );

        worker.check_for_new_tracks().await.unwrap();

        assert!(backend.enqueued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn old_tracks_are_left_alone() {
        let added = Utc::now() - ChronoDuration::hours(1);
        let backend = Arc::new(FakeBackend::offering(vec![offer("Bastinov - Devine.mp3")]));
        let worker = worker_with(vec![track("Devine", &["Bastinov"], added)], backend.clone());

        worker.check_for_new_tracks().await.unwrap();

        assert!(backend.enqueued.lock().unwrap().is_empty());
    }

    #[test]
    fn artist_formatting_matches_log_conventions() {
        let now = Utc::now();
        assert_eq!(format_artists(&track("T", &[], now)), "Unknown Artist");
        assert_eq!(format_artists(&track("T", &["A"], now)), "A");
        assert_eq!(format_artists(&track("T", &["A", "B"], now)), "A & B");
        assert_eq!(
            format_artists(&track("T", &["A", "B", "C"], now)),
            "A, B & others"
        );
    }
}
