use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tokio::fs;

/// Best-effort removal of a job's artifacts. Never fails: a job's outcome must
/// not depend on whether its leftovers could be deleted.
#[tracing::instrument(skip_all, fields(count = paths.len()))]
pub async fn release(paths: &[PathBuf]) {
    for path in paths.iter().unique() {
        if let Err(e) = remove(path).await {
            if e.kind() == ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), "Artifact already gone");
            } else {
                tracing::warn!(path = %path.display(), "Failed to remove artifact: {}", e);
            }
        }
    }
}

async fn remove(path: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(path).await?.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    }
}
