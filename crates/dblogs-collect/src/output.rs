//! Output directory management

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::CollectError;

/// Permissions for every directory we create
const DIR_MODE: u32 = 0o755;

/// Make `root` an empty directory, deleting whatever was there before.
pub async fn prepare(root: &Path) -> Result<(), CollectError> {
    let directory_error = |source| CollectError::Directory {
        path: root.to_path_buf(),
        source,
    };

    match fs::symlink_metadata(root).await {
        Ok(meta) if meta.is_dir() => {
            debug!(path = %root.display(), "removing existing output directory");
            fs::remove_dir_all(root).await.map_err(directory_error)?;
        }
        Ok(_) => {
            debug!(path = %root.display(), "removing existing file at output path");
            fs::remove_file(root).await.map_err(directory_error)?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(directory_error(e)),
    }

    create_dir(root).await.map_err(directory_error)
}

/// Create `root/<pod>` if missing and return it
pub async fn ensure_pod_subdir(root: &Path, pod: &str) -> io::Result<PathBuf> {
    let dir = root.join(pod);
    create_dir(&dir).await?;
    Ok(dir)
}

async fn create_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(path).await
}
