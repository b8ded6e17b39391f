//! The two conversation flows and the video job state machine.

mod image;
mod job;
mod video;

pub use image::{ImageFlow, PendingImage, run_image};
pub use job::{JobEvent, JobState, PollTiming, VideoOutcome, run_video_job};
pub use video::{
    ASPECT_RATIOS, MAX_DURATION_SECONDS, MIN_DURATION_SECONDS, PendingVideo, RESOLUTIONS,
    VideoFlow, VideoSettings, clamp_duration,
};

use borane_transcript::MessageId;

/// Identifies one submission of a flow.
///
/// A result is applied only while its token is the flow's current one, so a
/// job that finishes after a reset cannot touch the new transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowToken(u64);

#[derive(Debug, Default)]
struct TokenSource {
    next: u64,
}

impl TokenSource {
    fn issue(&mut self) -> FlowToken {
        self.next += 1;
        FlowToken(self.next)
    }
}

/// What happened when a result came back to its flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A model message was appended.
    Appended(MessageId),
    /// The flow recorded an error; nothing was appended.
    Failed(String),
    /// The token no longer matches; the result was dropped.
    Stale,
}
