use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::core::traits::executor::ExecuteError;

/// A uniquely named scratch directory owned by exactly one execution.
///
/// Dropping the guard deletes the directory, so every exit path cleans up.
/// Prefer [`Workspace::remove`] on the normal path to avoid blocking the
/// runtime on a synchronous delete.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    removed: bool,
}

impl Workspace {
    pub async fn create(scratch_root: &Path) -> Result<Self, ExecuteError> {
        let dir = scratch_root.join(Uuid::new_v4().to_string());

        fs::create_dir_all(&dir)
            .await
            .map_err(|source| ExecuteError::Workspace {
                path: dir.clone(),
                source,
            })?;
        tracing::debug!("Created workspace {}", dir.display());

        Ok(Self {
            dir,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Writes `contents` to `relative` inside the workspace, creating parent
    /// directories as needed.
    pub async fn write_file(&self, relative: &Path, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, contents).await?;
        Ok(path)
    }

    pub async fn remove(mut self) {
        self.removed = true;
        if let Err(e) = fs::remove_dir_all(&self.dir).await {
            tracing::warn!("Failed to clean up workspace {}: {}", self.dir.display(), e);
        } else {
            tracing::debug!("Removed workspace {}", self.dir.display());
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            tracing::warn!("Failed to clean up workspace {}: {}", self.dir.display(), e);
        }
    }
}
