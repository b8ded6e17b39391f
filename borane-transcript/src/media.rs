use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

/// Frees the backing storage of a [`MediaHandle`].
pub trait MediaRelease: Send + Sync {
    fn release(&self, path: &Path) -> std::io::Result<()>;
}

/// A locally addressable copy of fetched binary content.
///
/// A handle is released exactly once: either explicitly through
/// [`MediaHandle::release`] or, failing that, when it is dropped. It cannot be
/// cloned, so the message that carries it is its single owner.
pub struct MediaHandle {
    path: PathBuf,
    len: u64,
    releaser: Option<Arc<dyn MediaRelease>>,
}

impl MediaHandle {
    pub fn new(path: impl Into<PathBuf>, len: u64, releaser: Arc<dyn MediaRelease>) -> Self {
        Self {
            path: path.into(),
            len,
            releaser: Some(releaser),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Releases the backing storage now.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        let Some(releaser) = self.releaser.take() else {
            return;
        };
        match releaser.release(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "released media handle"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to release media handle"),
        }
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandle")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("released", &self.releaser.is_none())
            .finish()
    }
}
