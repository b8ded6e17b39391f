use std::path::{Path, PathBuf};

use base64::Engine;
use borane_gemini::{Blob, InlineImage};
use tracing::debug;

/// Most reference images that can accompany one image prompt.
pub const MAX_REFERENCE_IMAGES: usize = 3;

const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
];

/// Guesses an accepted image MIME type from a file extension.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// An image attached to the next prompt. Lives only until submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// Base64-encoded bytes.
    pub data: String,
    /// Local file the image was read from, shown as its preview.
    pub preview: PathBuf,
    pub mime_type: String,
    pub file_name: String,
}

impl ReferenceImage {
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
        preview: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            preview: preview.into(),
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }

    pub fn to_blob(&self) -> Blob {
        Blob {
            mime_type: self.mime_type.clone(),
            data: self.data.clone(),
        }
    }

    pub fn to_inline_image(&self) -> InlineImage {
        InlineImage {
            bytes_base64_encoded: self.data.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Result of an attach attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachOutcome {
    pub accepted: usize,
    /// Why some files were not attached, if any were rejected.
    pub notice: Option<String>,
}

/// Pending reference images with a fixed capacity.
#[derive(Debug, Clone)]
pub struct AttachmentTray {
    images: Vec<ReferenceImage>,
    capacity: usize,
}

impl AttachmentTray {
    pub fn new(capacity: usize) -> Self {
        Self {
            images: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn images(&self) -> &[ReferenceImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.images.len())
    }

    /// Reads and attaches image files in order.
    ///
    /// Files beyond the remaining capacity, files of the wrong type and
    /// unreadable files are all rejected and named in the notice.
    pub fn attach<P: AsRef<Path>>(&mut self, paths: &[P]) -> AttachOutcome {
        let mut accepted = 0;
        let mut over_limit = Vec::new();
        let mut wrong_type = Vec::new();
        let mut unreadable = Vec::new();

        for path in paths.iter().map(AsRef::as_ref) {
            let name = display_name(path);

            let Some(mime) = image_mime_type(path) else {
                wrong_type.push(name);
                continue;
            };
            if self.remaining() == 0 {
                over_limit.push(name);
                continue;
            }

            match std::fs::read(path) {
                Ok(bytes) => {
                    debug!(file = %name, len = bytes.len(), "attached reference image");
                    self.images
                        .push(ReferenceImage::from_bytes(name, mime, &bytes, path));
                    accepted += 1;
                }
                Err(e) => unreadable.push(format!("{name} ({e})")),
            }
        }

        let mut notices = Vec::new();
        if !over_limit.is_empty() {
            notices.push(format!(
                "Only {} reference image{} allowed; skipped {}",
                self.capacity,
                if self.capacity == 1 { "" } else { "s" },
                over_limit.join(", ")
            ));
        }
        if !wrong_type.is_empty() {
            notices.push(format!("Not a supported image: {}", wrong_type.join(", ")));
        }
        if !unreadable.is_empty() {
            notices.push(format!("Could not read {}", unreadable.join(", ")));
        }

        AttachOutcome {
            accepted,
            notice: (!notices.is_empty()).then(|| notices.join("; ")),
        }
    }

    /// Adds an already loaded image, if there is room.
    pub fn push(&mut self, image: ReferenceImage) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.images.push(image);
        true
    }

    /// Drains the tray.
    pub fn take(&mut self) -> Vec<ReferenceImage> {
        std::mem::take(&mut self.images)
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_images(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn over_capacity_is_rejected_with_notice() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_images(dir.path(), &["1.png", "2.png", "3.png", "4.png", "5.png"]);

        let mut tray = AttachmentTray::new(MAX_REFERENCE_IMAGES);
        let outcome = tray.attach(&paths);

        assert_eq!(outcome.accepted, 3);
        assert_eq!(tray.len(), 3);
        let notice = outcome.notice.unwrap();
        assert!(notice.contains("4.png"));
        assert!(notice.contains("5.png"));
        assert_eq!(tray.images()[0].file_name, "1.png");
        assert_eq!(tray.images()[0].data, "iVBORw==");
    }

    #[test]
    fn capacity_counts_existing_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_images(dir.path(), &["a.jpg", "b.jpeg", "c.webp"]);

        let mut tray = AttachmentTray::new(MAX_REFERENCE_IMAGES);
        assert_eq!(tray.attach(&paths[..2]).accepted, 2);

        let outcome = tray.attach(&paths);
        assert_eq!(outcome.accepted, 1);
        assert_eq!(tray.len(), 3);
        assert!(outcome.notice.is_some());
        assert_eq!(tray.images()[1].mime_type, "image/jpeg");
    }

    #[test]
    fn wrong_type_and_missing_files_are_named() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = write_images(dir.path(), &["ok.png", "notes.txt"]);
        paths.push(dir.path().join("missing.png"));

        let mut tray = AttachmentTray::new(MAX_REFERENCE_IMAGES);
        let outcome = tray.attach(&paths);

        assert_eq!(outcome.accepted, 1);
        let notice = outcome.notice.unwrap();
        assert!(notice.contains("Not a supported image: notes.txt"));
        assert!(notice.contains("missing.png"));
    }

    #[test]
    fn clean_attach_has_no_notice_and_take_drains() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_images(dir.path(), &["only.PNG"]);

        let mut tray = AttachmentTray::new(1);
        let outcome = tray.attach(&paths);
        assert_eq!(outcome, AttachOutcome { accepted: 1, notice: None });

        let taken = tray.take();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].to_blob().mime_type, "image/png");
        assert!(tray.is_empty());
        assert_eq!(tray.remaining(), 1);
    }
}
