use serde::{Deserialize, Serialize};

/// One remote file offer returned by a soulseek search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub username: String,
    pub filename: String,
    pub size: i64,
    #[serde(default)]
    pub upload_speed: i32,
    #[serde(default)]
    pub locked: bool,
}
