use std::path::Path;

use borane_gemini::{GenerateVideosRequest, VideoConfig, build_video_request};
use borane_transcript::{ImagePart, Part, Role, Transcript, VideoMetadata, VideoPart};
use tracing::{debug, info, warn};

use super::job::{JobState, VideoOutcome};
use super::{Completion, FlowToken, TokenSource};
use crate::attachments::{AttachOutcome, AttachmentTray};
use crate::error::StudioError;

pub const MIN_DURATION_SECONDS: u32 = 5;
pub const MAX_DURATION_SECONDS: u32 = 8;
pub const RESOLUTIONS: &[&str] = &["720p", "1080p"];
pub const ASPECT_RATIOS: &[&str] = &["16:9", "9:16"];

/// Forces a requested duration into the range the service accepts.
pub fn clamp_duration(seconds: u32) -> u32 {
    seconds.clamp(MIN_DURATION_SECONDS, MAX_DURATION_SECONDS)
}

/// User-chosen settings for the next video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSettings {
    pub resolution: String,
    pub aspect_ratio: String,
    pub duration_seconds: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            resolution: RESOLUTIONS[0].to_string(),
            aspect_ratio: ASPECT_RATIOS[0].to_string(),
            duration_seconds: MIN_DURATION_SECONDS,
        }
    }
}

fn cycle(options: &[&str], current: &str) -> String {
    let idx = options.iter().position(|o| *o == current).unwrap_or(0);
    options[(idx + 1) % options.len()].to_string()
}

impl VideoSettings {
    pub fn to_config(&self) -> VideoConfig {
        VideoConfig {
            resolution: self.resolution.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
            duration_seconds: clamp_duration(self.duration_seconds),
            number_of_videos: 1,
        }
    }

    pub fn cycle_resolution(&mut self) {
        self.resolution = cycle(RESOLUTIONS, &self.resolution);
    }

    pub fn cycle_aspect_ratio(&mut self) {
        self.aspect_ratio = cycle(ASPECT_RATIOS, &self.aspect_ratio);
    }

    /// Steps through the accepted durations, wrapping at the top.
    pub fn cycle_duration(&mut self) {
        let current = clamp_duration(self.duration_seconds);
        self.duration_seconds = if current >= MAX_DURATION_SECONDS {
            MIN_DURATION_SECONDS
        } else {
            current + 1
        };
    }
}

/// A submitted video prompt waiting to be driven to completion.
#[derive(Debug, Clone)]
pub struct PendingVideo {
    pub token: FlowToken,
    pub request: GenerateVideosRequest,
}

#[derive(Debug)]
struct ActiveJob {
    token: FlowToken,
    metadata: VideoMetadata,
    state: JobState,
}

/// Conversation producing videos through long-running jobs.
///
/// At most one job runs at a time. Results carry the [`FlowToken`] they were
/// issued with; a result whose token is no longer active is dropped, and the
/// video file it carries is released with it.
#[derive(Debug)]
pub struct VideoFlow {
    transcript: Transcript,
    tray: AttachmentTray,
    settings: VideoSettings,
    active: Option<ActiveJob>,
    tokens: TokenSource,
    status: Option<String>,
    error: Option<String>,
}

impl Default for VideoFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoFlow {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            tray: AttachmentTray::new(1),
            settings: VideoSettings::default(),
            active: None,
            tokens: TokenSource::default(),
            status: None,
            error: None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn tray(&self) -> &AttachmentTray {
        &self.tray
    }

    pub fn settings(&self) -> &VideoSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut VideoSettings {
        &mut self.settings
    }

    pub fn is_generating(&self) -> bool {
        self.active.is_some()
    }

    pub fn job_state(&self) -> Option<&JobState> {
        self.active.as_ref().map(|a| &a.state)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Attaches the optional starting frame for the next video.
    pub fn attach<P: AsRef<Path>>(&mut self, paths: &[P]) -> AttachOutcome {
        let outcome = self.tray.attach(paths);
        if let Some(notice) = &outcome.notice {
            self.error = Some(StudioError::AttachmentRejected(notice.clone()).to_string());
        }
        outcome
    }

    /// Starts a job.
    ///
    /// Returns `Ok(None)` for a blank prompt or while a job is in flight.
    /// Fails with [`StudioError::MissingCredential`] without touching any
    /// state when no key is available.
    pub fn begin(
        &mut self,
        prompt: &str,
        credential: Option<&str>,
    ) -> Result<Option<PendingVideo>, StudioError> {
        let prompt = prompt.trim();
        if prompt.is_empty() || self.is_generating() {
            return Ok(None);
        }
        if credential.is_none() {
            return Err(StudioError::MissingCredential);
        }

        let config = self.settings.to_config();
        let metadata = VideoMetadata {
            resolution: config.resolution.clone(),
            aspect_ratio: config.aspect_ratio.clone(),
            duration_seconds: Some(config.duration_seconds),
        };

        let reference = self.tray.take().into_iter().next();
        let request = build_video_request(
            prompt,
            &config,
            reference.as_ref().map(|r| r.to_inline_image()),
        );

        let mut parts = vec![Part::text(prompt)];
        if let Some(r) = reference {
            parts.push(Part::Image(
                ImagePart::inline(r.mime_type, r.data).with_alt_text(r.file_name),
            ));
        }
        self.transcript.append(Role::User, parts);

        let token = self.tokens.issue();
        let state = JobState::Submitting;
        self.status = state.status_line(0);
        self.active = Some(ActiveJob {
            token,
            metadata,
            state,
        });
        self.error = None;
        debug!(?token, duration = config.duration_seconds, "video job started");

        Ok(Some(PendingVideo { token, request }))
    }

    /// Records job progress reported by the driver.
    pub fn progress(&mut self, token: FlowToken, state: JobState, max_attempts: u32) {
        let Some(active) = self.active.as_mut().filter(|a| a.token == token) else {
            return;
        };
        self.status = state.status_line(max_attempts);
        active.state = state;
    }

    /// Applies the outcome of a job.
    pub fn complete(
        &mut self,
        token: FlowToken,
        result: Result<VideoOutcome, StudioError>,
    ) -> Completion {
        let Some(active) = self.active.take_if(|a| a.token == token) else {
            debug!(?token, "dropping stale video result");
            return Completion::Stale;
        };
        self.status = None;
        self.tray.clear();

        match result {
            Ok(outcome) => {
                let part = VideoPart {
                    mime_type: outcome.mime_type,
                    handle: outcome.handle,
                    remote_uri: outcome.remote_uri,
                    alt_text: None,
                    metadata: active.metadata,
                };
                let id = self.transcript.append(Role::Model, vec![Part::Video(part)]);
                info!(%id, "video appended");
                Completion::Appended(id)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "video job failed");
                self.error = Some(message.clone());
                Completion::Failed(message)
            }
        }
    }

    /// Releases every video and forgets the conversation. A job still running
    /// keeps running, but its result will be dropped.
    pub fn reset(&mut self) -> usize {
        let released = self.transcript.clear();
        self.tray.clear();
        self.active = None;
        self.status = None;
        self.error = None;
        released
    }
}
