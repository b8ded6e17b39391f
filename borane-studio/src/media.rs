use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use borane_transcript::{MediaHandle, MediaRelease};
use tracing::{debug, warn};

use crate::error::StudioError;

/// Turns fetched bytes into a locally addressable [`MediaHandle`].
pub trait MediaSink: Send + Sync {
    fn materialize(&self, bytes: &[u8], mime_type: &str) -> Result<MediaHandle, StudioError>;
}

/// File extension for a media type, `bin` when unknown.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "bin",
    }
}

struct MediaDirInner {
    root: PathBuf,
    next: AtomicU64,
}

impl MediaRelease for MediaDirInner {
    fn release(&self, path: &Path) -> std::io::Result<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Writes media into a per-session directory; releasing a handle deletes its file.
#[derive(Clone)]
pub struct MediaDir {
    inner: Arc<MediaDirInner>,
}

impl MediaDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(MediaDirInner {
                root: root.into(),
                next: AtomicU64::new(1),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Removes the session directory if nothing is left in it.
    pub fn cleanup(&self) {
        match std::fs::remove_dir(&self.inner.root) {
            Ok(()) => debug!(dir = %self.inner.root.display(), "removed media dir"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.inner.root.display(), error = %e, "media dir not removed"),
        }
    }
}

impl MediaSink for MediaDir {
    fn materialize(&self, bytes: &[u8], mime_type: &str) -> Result<MediaHandle, StudioError> {
        std::fs::create_dir_all(&self.inner.root)?;
        let n = self.inner.next.fetch_add(1, Ordering::Relaxed);
        let path = self
            .inner
            .root
            .join(format!("video-{n}.{}", extension_for(mime_type)));
        std::fs::write(&path, bytes)?;
        debug!(path = %path.display(), len = bytes.len(), "materialized media");

        let releaser: Arc<dyn MediaRelease> = self.inner.clone();
        Ok(MediaHandle::new(path, bytes.len() as u64, releaser))
    }
}

/// Keeps a handle's file on disk past the end of the session.
///
/// Copies the file to `dest`, leaving the handle itself to be released as usual.
pub fn keep_copy(handle: &MediaHandle, dest: &Path) -> Result<(), StudioError> {
    std::fs::copy(handle.path(), dest)?;
    Ok(())
}
