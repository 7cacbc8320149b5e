use serde::Serialize;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
}

/// One listing entry, built fresh per request. Both URLs share the same stem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Video {
    #[serde(rename = "videoLocation")]
    pub video_location: String,
    #[serde(rename = "thumbnailLocation")]
    pub thumbnail_location: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct VideosResponse {
    pub message: String,
    pub videos: Vec<Video>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
