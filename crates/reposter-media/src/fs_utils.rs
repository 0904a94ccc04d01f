//! Filesystem helpers for per-video work directories.

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Extensions of the statistics files a two-pass x264 encode leaves behind.
const TRANSCODER_ARTIFACT_EXTENSIONS: &[&str] = &["log", "mbtree", "temp"];

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// This function first attempts a fast rename. If that fails with EXDEV
/// (cross-device link error), it falls back to copy-and-delete.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename detected, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    // EXDEV is error code 18 on Linux/macOS
    e.raw_os_error() == Some(18)
}

/// Copy file to destination (via temp file) then delete source.
async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    // Temp file next to dst keeps the final rename on one filesystem
    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst).await?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source file after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

/// Remove two-pass log and macroblock-tree files from `dir`.
///
/// Returns how many files were removed.
pub async fn remove_transcoder_artifacts(dir: impl AsRef<Path>) -> MediaResult<usize> {
    let mut removed = 0;
    let mut entries = match fs::read_dir(dir.as_ref()).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_artifact = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TRANSCODER_ARTIFACT_EXTENSIONS.contains(&ext));

        if is_artifact && entry.file_type().await?.is_file() {
            fs::remove_file(&path).await?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Delete a work directory and everything in it. Missing directories are fine.
pub async fn remove_work_dir(dir: impl AsRef<Path>) -> MediaResult<()> {
    match fs::remove_dir_all(dir.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
