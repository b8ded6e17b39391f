use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Failed to fetch video: HTTP {status}")]
    Fetch { status: u16 },

    #[error("No videos were generated")]
    NoVideos,

    #[error("Generated video is missing a locator")]
    MissingLocator,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
