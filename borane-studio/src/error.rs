use thiserror::Error;

use borane_gemini::GeminiError;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("API key not set. Press F2 to enter one, or set GEMINI_API_KEY")]
    MissingCredential,

    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Attachment rejected: {0}")]
    AttachmentRejected(String),

    #[error("No content returned")]
    NoContentReturned,

    #[error("Video generation timed out after {attempts} status checks")]
    JobTimeout { attempts: u32 },

    #[error("Video generation incomplete: {0}")]
    JobIncomplete(String),

    #[error("Failed to fetch video: HTTP {0}")]
    FetchFailed(u16),

    #[error("Credential storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Gemini error: {0}")]
    Gemini(GeminiError),
}

impl From<GeminiError> for StudioError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Fetch { status } => StudioError::FetchFailed(status),
            GeminiError::NoVideos | GeminiError::MissingLocator => {
                StudioError::JobIncomplete(err.to_string())
            }
            other => StudioError::Gemini(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_errors_map_to_flow_kinds() {
        assert!(matches!(
            StudioError::from(GeminiError::Fetch { status: 404 }),
            StudioError::FetchFailed(404)
        ));
        let incomplete = StudioError::from(GeminiError::NoVideos);
        assert_eq!(
            incomplete.to_string(),
            "Video generation incomplete: No videos were generated"
        );
        assert!(matches!(
            StudioError::from(GeminiError::Api {
                status: 500,
                message: "boom".to_string()
            }),
            StudioError::Gemini(_)
        ));
    }
}
