pub mod error;
pub mod matching;
pub mod slskd;
pub mod spotify;
pub mod traits;
pub mod worker;

pub use error::{Result, SoulspotError};
pub use matching::{select_best, MatchOptions, Selection, SelectionResult};
pub use traits::{DownloadBackend, PlaylistSource};
pub use worker::{Worker, WorkerConfig};
