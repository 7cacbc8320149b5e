use std::io::ErrorKind;
use std::path::Path;

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// Extension uploads must carry to show up in listings.
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Extension for uploads with a content type we don't recognize. Such files
/// are persisted but never listed.
pub const FALLBACK_EXTENSION: &str = ".bin";

/// Suffix of in-flight writes; anything still carrying it is an interrupted
/// upload.
pub const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Invalid byte range: {0}")]
    InvalidRange(String),
    #[error("Upload exceeds the {max} byte limit")]
    TooLarge { max: u64 },
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map a MIME content type to the on-disk extension.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "video/mp4" => ".mp4",
        "video/quicktime" => ".mov",
        "video/webm" => ".webm",
        "video/x-matroska" => ".mkv",
        "video/x-msvideo" => ".avi",
        "video/mpeg" => ".mpg",
        "video/ogg" => ".ogv",
        _ => FALLBACK_EXTENSION,
    }
}

/// Apply the optional `start`/`end` byte-range trim to an upload body.
/// `end` is exclusive and clamped to the body length.
pub fn trim_range(
    data: Bytes,
    start: Option<u64>,
    end: Option<u64>,
) -> Result<Bytes, StorageError> {
    let len = data.len() as u64;
    let start = start.unwrap_or(0);
    let end = end.unwrap_or(len).min(len);

    if start > end {
        return Err(StorageError::InvalidRange(format!(
            "start {} is past end {} ({} byte body)",
            start, end, len
        )));
    }

    Ok(data.slice(start as usize..end as usize))
}

/// Persist an upload body under a unique generated name, returning the file
/// name. The bytes land in a `.part` file first and are renamed into place,
/// so a crash mid-write never leaves a truncated video behind.
pub async fn save_upload(
    dir: &Path,
    content_type: &str,
    data: &[u8],
) -> Result<String, StorageError> {
    let file_name = format!(
        "upload-{}{}",
        Uuid::new_v4().simple(),
        extension_for(content_type)
    );
    let partial_path = dir.join(format!("{}{}", file_name, PARTIAL_SUFFIX));
    let final_path = dir.join(&file_name);

    fs::write(&partial_path, data).await?;

    if let Err(e) = fs::rename(&partial_path, &final_path).await {
        let _ = fs::remove_file(&partial_path).await;
        return Err(e.into());
    }

    Ok(file_name)
}

/// List video files in the uploads directory. Flat, files only, no ordering
/// guarantee. Only names bearing the video extension are returned, so stray
/// files never turn into listing entries. A missing directory reads as empty:
/// the directory is created at startup, and a vanished one is
/// indistinguishable from "nothing uploaded yet" to the client.
pub async fn list_videos(dir: &Path) -> Result<Vec<String>, StorageError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            if name.ends_with(VIDEO_EXTENSION) {
                names.push(name);
            }
        }
    }

    Ok(names)
}
