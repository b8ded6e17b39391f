//! Chat transcripts for generated media.
//!
//! A [`Transcript`] is an ordered, append-only list of [`Message`]s, each made
//! of typed [`Part`]s (text, image or video). Video parts own a
//! [`MediaHandle`], a local copy of fetched bytes that must be released
//! exactly once. Clearing a transcript releases every handle it owns; a handle
//! that escapes that path is released when dropped.

mod content;
mod media;
mod message;
mod transcript;

pub use content::{ImagePart, ImageSource, Part, VideoMetadata, VideoPart};
pub use media::{MediaHandle, MediaRelease};
pub use message::{Message, MessageId, Role};
pub use transcript::Transcript;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        released: Mutex<Vec<PathBuf>>,
    }

    impl MediaRelease for Recorder {
        fn release(&self, path: &Path) -> std::io::Result<()> {
            self.released.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    fn video(recorder: &Arc<Recorder>, name: &str) -> Part {
        Part::Video(VideoPart {
            mime_type: "video/mp4".to_string(),
            handle: MediaHandle::new(name, 16, recorder.clone()),
            remote_uri: format!("https://example.com/{name}"),
            alt_text: None,
            metadata: VideoMetadata {
                resolution: "720p".to_string(),
                aspect_ratio: "16:9".to_string(),
                duration_seconds: Some(5),
            },
        })
    }

    #[test]
    fn append_preserves_order_and_assigns_ids() {
        let mut transcript = Transcript::new();
        let a = transcript.append(Role::User, vec![Part::text("first")]);
        let b = transcript.append(Role::Model, vec![Part::text("second")]);

        assert!(a < b);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].text(), "first");
        assert_eq!(transcript.messages()[1].role, Role::Model);
        assert_eq!(transcript.get(b).map(|m| m.text()), Some("second".to_string()));
        assert!(transcript.messages()[0].created_at_ms > 0);
    }

    #[test]
    fn ids_stay_unique_across_clear() {
        let mut transcript = Transcript::new();
        let before = transcript.append(Role::User, vec![Part::text("a")]);
        transcript.clear();
        let after = transcript.append(Role::User, vec![Part::text("b")]);
        assert_ne!(before, after);
        assert!(transcript.get(before).is_none());
    }

    #[test]
    fn clear_releases_each_handle_once() {
        let recorder = Arc::new(Recorder::default());
        let mut transcript = Transcript::new();
        transcript.append(Role::User, vec![Part::text("make a video")]);
        transcript.append(Role::Model, vec![video(&recorder, "one.mp4")]);
        transcript.append(Role::Model, vec![video(&recorder, "two.mp4")]);

        assert_eq!(transcript.handle_count(), 2);
        assert!(recorder.released.lock().unwrap().is_empty());

        assert_eq!(transcript.clear(), 2);
        assert!(transcript.is_empty());
        assert_eq!(
            recorder.released.lock().unwrap().as_slice(),
            &[PathBuf::from("one.mp4"), PathBuf::from("two.mp4")]
        );

        // A second clear has nothing left to release.
        assert_eq!(transcript.clear(), 0);
        assert_eq!(recorder.released.lock().unwrap().len(), 2);
    }

    #[test]
    fn dropping_transcript_releases_handles() {
        let recorder = Arc::new(Recorder::default());
        {
            let mut transcript = Transcript::new();
            transcript.append(Role::Model, vec![video(&recorder, "dropped.mp4")]);
        }
        assert_eq!(recorder.released.lock().unwrap().len(), 1);
    }

    #[test]
    fn message_text_skips_media() {
        let mut transcript = Transcript::new();
        transcript.append(
            Role::Model,
            vec![
                Part::Image(ImagePart::inline("image/png", "AAAA")),
                Part::text("a caption"),
                Part::text("more"),
            ],
        );
        let message = transcript.last().unwrap();
        assert_eq!(message.text(), "a caption\nmore");
        assert!(message.parts[0].is_image());
    }
}
