use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::storage::PARTIAL_SUFFIX;

/// Remove stale `.part` files from the uploads directory.
///
/// Uploads are written to a partial name and renamed into place on
/// completion, so a `.part` file older than `max_age` can only be the
/// leftover of a crashed or disconnected upload. Completed files are never
/// touched.
pub async fn sweep_partial_uploads(dir: &Path, max_age: Duration) -> anyhow::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        let is_partial = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(PARTIAL_SUFFIX))
            .unwrap_or(false);
        if !is_partial {
            continue;
        }

        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => {
                warn!("[cleanup] failed to stat {:?}: {}", path, e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(e) => {
                warn!("[cleanup] failed to get modification time for {:?}: {}", path, e);
                continue;
            }
        };

        // File mtime in the future: leave it alone
        let age = match now.duration_since(modified) {
            Ok(d) => d,
            Err(_) => continue,
        };

        if age > max_age {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    removed += 1;
                    info!(
                        "[cleanup] removed stale partial upload {:?} (age: {:.1} min)",
                        path,
                        age.as_secs_f64() / 60.0
                    );
                }
                Err(e) => {
                    error!("[cleanup] failed to remove {:?}: {}", path, e);
                }
            }
        }
    }

    Ok(removed)
}

/// Start a background task that periodically sweeps the uploads directory.
pub fn start_cleanup_task(config: Arc<Config>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.cleanup_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            "[cleanup] sweeping {:?} every {:.1} min for partial uploads older than {:.1} min",
            config.upload_dir,
            config.cleanup_interval.as_secs_f64() / 60.0,
            config.partial_max_age.as_secs_f64() / 60.0
        );

        loop {
            interval.tick().await;

            if let Err(e) = sweep_partial_uploads(&config.upload_dir, config.partial_max_age).await
            {
                error!("[cleanup] sweep error: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sweep_removes_old_partials_and_keeps_videos() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("upload-abc.mp4.part"), b"half an upload")
            .await
            .unwrap();
        fs::write(dir.path().join("upload-def.mp4"), b"a complete upload")
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        let removed = sweep_partial_uploads(dir.path(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.path().join("upload-abc.mp4.part").exists());
        assert!(dir.path().join("upload-def.mp4").exists());
    }

    #[tokio::test]
    async fn sweep_leaves_fresh_partials_alone() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("upload-abc.mp4.part"), b"in flight")
            .await
            .unwrap();

        let removed = sweep_partial_uploads(dir.path(), Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(dir.path().join("upload-abc.mp4.part").exists());
    }

    #[tokio::test]
    async fn sweep_of_missing_directory_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let removed = sweep_partial_uploads(&missing, Duration::ZERO).await.unwrap();
        assert_eq!(removed, 0);
    }
}
