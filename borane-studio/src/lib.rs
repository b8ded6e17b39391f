//! Image and video generation sessions on top of the Gemini API.
//!
//! A [`Studio`] holds two independent flows that share one API key:
//!
//! - [`ImageFlow`]: one request per prompt, replaying the conversation so far.
//! - [`VideoFlow`]: submits a long-running job, polls it on a fixed interval
//!   up to a ceiling, then downloads the result into a local file.
//!
//! Remote work is handed out as [`ImageWork`] / [`VideoWork`] values that can
//! run on any task; their results are applied back through tokens that go
//! stale when a flow is reset or the key changes.

pub mod attachments;
pub mod backend;
pub mod config;
pub mod credential;
mod error;
pub mod flows;
pub mod media;
mod session;

pub use attachments::{AttachOutcome, AttachmentTray, MAX_REFERENCE_IMAGES, ReferenceImage};
pub use backend::{Connector, GeminiBackend, GeminiConnector, ImageBackend, VideoBackend};
pub use config::Config;
pub use credential::{CredentialHolder, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::StudioError;
pub use flows::{
    Completion, FlowToken, ImageFlow, JobState, PollTiming, VideoFlow, VideoOutcome,
    VideoSettings, clamp_duration,
};
pub use media::{MediaDir, MediaSink, extension_for, keep_copy};
pub use session::{ImageWork, Studio, VideoWork};
