use std::sync::Arc;

use axum::{
    extract::{Host, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use multer::{Constraints, Multipart, SizeLimit};
use tracing::{error, info};

use crate::config::Environment;
use crate::models::{AppState, ErrorResponse, UploadResponse, Video, VideosResponse};
use crate::storage::{self, StorageError, VIDEO_EXTENSION};

/// Public URL path the uploaded videos are served under.
pub const VIDEO_URL_PATH: &str = "/resources/uploaded/";

/// Public URL path the thumbnails are served under. Thumbnails are generated
/// out of band; the listing only advertises where they would live.
pub const THUMBNAIL_URL_PATH: &str = "/resources/thumbnails/";

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Every storage error kind maps to exactly one HTTP status.
fn storage_error_response(err: StorageError) -> ApiError {
    let status = match &err {
        StorageError::MissingFile | StorageError::InvalidRange(_) => StatusCode::BAD_REQUEST,
        StorageError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn multipart_error_response(err: multer::Error) -> ApiError {
    match err {
        multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
            error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Upload too large: {}", err),
            )
        }
        _ => error_response(
            StatusCode::BAD_REQUEST,
            format!("Error parsing multipart request: {}", err),
        ),
    }
}

fn parse_offset(name: &str, value: &str) -> Result<u64, ApiError> {
    value.trim().parse().map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid {} offset: {:?}", name, value),
        )
    })
}

/// Accept a multipart video upload and persist it to the uploads directory.
///
/// The form must carry a `file` part; optional `start`/`end` parts trim the
/// persisted bytes to that range. The body is rejected before anything is
/// written if it exceeds the configured ceiling.
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<UploadResponse>, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Missing Content-Type header"))?;

    let boundary = multer::parse_boundary(content_type).map_err(|e| {
        error!("[POST /upload] failed to parse multipart boundary: {}", e);
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid multipart request: {}", e),
        )
    })?;

    let max_size = state.config.max_upload_size;
    let body_bytes = Limited::new(request.into_body(), max_size as usize)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                error!("[POST /upload] body exceeds {} byte limit", max_size);
                storage_error_response(StorageError::TooLarge { max: max_size })
            } else {
                error!("[POST /upload] failed to read request body: {}", e);
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read request: {}", e),
                )
            }
        })?
        .to_bytes();

    let constraints =
        Constraints::new().size_limit(SizeLimit::new().whole_stream(max_size));
    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body_bytes) });
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    let mut file_part: Option<(String, Bytes)> = None;
    let mut start_param: Option<u64> = None;
    let mut end_param: Option<u64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error_response)?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let part_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(multipart_error_response)?;
                file_part = Some((part_type, data));
            }
            Some("start") => {
                let text = field.text().await.map_err(multipart_error_response)?;
                if !text.trim().is_empty() {
                    start_param = Some(parse_offset("start", &text)?);
                }
            }
            Some("end") => {
                let text = field.text().await.map_err(multipart_error_response)?;
                if !text.trim().is_empty() {
                    end_param = Some(parse_offset("end", &text)?);
                }
            }
            _ => {
                // Drain and ignore unknown fields
                field.bytes().await.map_err(multipart_error_response)?;
            }
        }
    }

    let (part_type, data) = file_part.ok_or_else(|| {
        error!("[POST /upload] no file part in form");
        storage_error_response(StorageError::MissingFile)
    })?;

    let data = storage::trim_range(data, start_param, end_param).map_err(|e| {
        error!("[POST /upload] {}", e);
        storage_error_response(e)
    })?;

    let file_name = storage::save_upload(&state.config.upload_dir, &part_type, &data)
        .await
        .map_err(|e| {
            error!("[POST /upload] failed to save file: {}", e);
            storage_error_response(e)
        })?;

    info!(
        "[POST /upload] stored {} ({} bytes, {})",
        file_name,
        data.len(),
        part_type
    );

    Ok(Json(UploadResponse {
        message: "Successfully Uploaded File".to_string(),
    }))
}

/// List uploaded videos with their derived thumbnail URLs.
pub async fn list_videos_handler(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
) -> Result<Json<VideosResponse>, ApiError> {
    let files = storage::list_videos(&state.config.upload_dir)
        .await
        .map_err(|e| {
            error!("[GET /videos] failed to list uploads: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load videos: {}", e),
            )
        })?;

    let videos = build_video_listing(&files, state.config.environment, &host);
    info!("[GET /videos] returning {} videos", videos.len());

    Ok(Json(VideosResponse {
        message: "Successfully Loaded Files".to_string(),
        videos,
    }))
}

/// Respond to health and readiness probes.
pub async fn health_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Build one listing entry per file. Pure and deterministic given the
/// environment, host and file list; video and thumbnail URLs share the stem.
pub fn build_video_listing(files: &[String], environment: Environment, host: &str) -> Vec<Video> {
    let scheme = environment.scheme();
    files
        .iter()
        .map(|name| {
            let stem = name.strip_suffix(VIDEO_EXTENSION).unwrap_or(name);
            Video {
                video_location: format!(
                    "{}{}{}{}{}",
                    scheme, host, VIDEO_URL_PATH, stem, VIDEO_EXTENSION
                ),
                thumbnail_location: format!(
                    "{}{}{}{}.jpg",
                    scheme, host, THUMBNAIL_URL_PATH, stem
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_urls_share_the_stem() {
        let files = vec!["upload-abc123.mp4".to_string()];
        let videos = build_video_listing(&files, Environment::Production, "example.com");

        assert_eq!(
            videos,
            vec![Video {
                video_location: "https://example.com/resources/uploaded/upload-abc123.mp4"
                    .to_string(),
                thumbnail_location: "https://example.com/resources/thumbnails/upload-abc123.jpg"
                    .to_string(),
            }]
        );
    }

    #[test]
    fn local_environment_uses_insecure_scheme() {
        let files = vec!["upload-xyz.mp4".to_string()];
        let videos = build_video_listing(&files, Environment::Local, "localhost:8080");

        assert_eq!(
            videos[0].video_location,
            "http://localhost:8080/resources/uploaded/upload-xyz.mp4"
        );
        assert_eq!(
            videos[0].thumbnail_location,
            "http://localhost:8080/resources/thumbnails/upload-xyz.jpg"
        );
    }

    #[test]
    fn empty_file_list_yields_empty_listing() {
        let videos = build_video_listing(&[], Environment::Production, "example.com");
        assert!(videos.is_empty());
    }
}
