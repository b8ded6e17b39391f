//! Gemini API client for borane transcripts.
//!
//! This crate talks to the Gemini REST API: synchronous content generation
//! (text and images), long-running video jobs, and authenticated downloads of
//! generated files. It also converts between `borane-transcript` history and
//! the wire format.
//!
//! # Example
//!
//! ```ignore
//! use borane_gemini::{build_image_request, response_to_parts, GeminiClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = GeminiClient::new("your-api-key");
//!     let request = build_image_request(vec![], "A red balloon", &[]);
//!     let response = client
//!         .generate_content("gemini-2.5-flash-image-preview", &request)
//!         .await
//!         .unwrap();
//!     let parts = response_to_parts(&response);
//! }
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{DEFAULT_BASE_URL, GeminiClient};
pub use convert::{
    GeneratedVideo, build_image_request, build_video_request, generated_video,
    history_to_contents, response_to_parts,
};
pub use error::GeminiError;
pub use types::{
    Blob, Candidate, Content, ContentPart, Download, FileData, GenerateContentRequest,
    GenerateContentResponse, GenerateVideoResponse, GenerateVideosRequest, GeneratedSample,
    GenerationConfig, InlineImage, Operation, OperationResponse, PromptFeedback, Status,
    VideoConfig, VideoInstance, VideoParameters, VideoRef,
};
