use thiserror::Error;

pub type Result<T> = std::result::Result<T, SoulspotError>;

#[derive(Debug, Error)]
pub enum SoulspotError {
    #[error("client is not configured")]
    NotConfigured,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error("invalid playlist id or URL: {0}")]
    InvalidPlaylist(String),

    #[error("search {0} was cancelled")]
    SearchCancelled(String),

    #[error("search {0} did not complete within {1}s")]
    SearchTimedOut(String, i64),
}
