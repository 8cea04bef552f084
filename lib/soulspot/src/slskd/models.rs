use serde::{Deserialize, Serialize};

// Internal structs for the raw slskd API payloads

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponseFile {
    pub filename: String,
    pub size: i64,
    #[serde(default)]
    pub is_locked: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponse {
    pub username: String,
    pub files: Vec<SearchResponseFile>,
    #[serde(default)]
    pub upload_speed: i32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchStatusResponse {
    pub state: String,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub file_count: i32,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DownloadRequestFile {
    pub filename: String,
    pub size: i64,
}
