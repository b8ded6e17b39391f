use crate::media::MediaHandle;

/// Where the bytes of an image live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Base64-encoded bytes carried with the message.
    Inline { data: String },
    /// Only a remote locator was returned; the bytes were never fetched.
    Reference { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    pub source: ImageSource,
    pub alt_text: Option<String>,
}

impl ImagePart {
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            source: ImageSource::Inline { data: data.into() },
            alt_text: None,
        }
    }

    pub fn reference(mime_type: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            source: ImageSource::Reference { uri: uri.into() },
            alt_text: None,
        }
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }
}

/// Generation settings recorded alongside a video.
///
/// Captured when the job is submitted, not when it completes, so a settings
/// change while a job is polling does not leak into the finished message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub resolution: String,
    pub aspect_ratio: String,
    pub duration_seconds: Option<u32>,
}

#[derive(Debug)]
pub struct VideoPart {
    pub mime_type: String,
    /// Local copy of the fetched bytes. Owned by the message carrying this part.
    pub handle: MediaHandle,
    pub remote_uri: String,
    pub alt_text: Option<String>,
    pub metadata: VideoMetadata,
}

/// A single typed unit of content within a message.
#[derive(Debug)]
pub enum Part {
    Text(String),
    Image(ImagePart),
    Video(VideoPart),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Part::Image(_))
    }
}
