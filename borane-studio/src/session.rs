use std::sync::Arc;

use borane_gemini::{GeminiError, GenerateContentResponse};
use tracing::{info, warn};

use crate::backend::{Connector, ImageBackend, VideoBackend};
use crate::credential::CredentialHolder;
use crate::error::StudioError;
use crate::flows::{
    Completion, FlowToken, ImageFlow, JobState, PendingImage, PendingVideo, PollTiming,
    VideoFlow, VideoOutcome, run_image, run_video_job,
};
use crate::media::MediaSink;

/// An image request ready to run off the UI thread.
pub struct ImageWork<B> {
    pub pending: PendingImage,
    backend: Arc<B>,
}

impl<B: ImageBackend> ImageWork<B> {
    pub fn token(&self) -> FlowToken {
        self.pending.token
    }

    pub async fn run(self) -> (FlowToken, Result<GenerateContentResponse, GeminiError>) {
        let result = run_image(self.backend.as_ref(), &self.pending).await;
        (self.pending.token, result)
    }
}

/// A video job ready to run off the UI thread.
pub struct VideoWork<B> {
    pub pending: PendingVideo,
    backend: Arc<B>,
    media: Arc<dyn MediaSink>,
    timing: PollTiming,
}

impl<B: VideoBackend> VideoWork<B> {
    pub fn token(&self) -> FlowToken {
        self.pending.token
    }

    pub fn timing(&self) -> PollTiming {
        self.timing
    }

    pub async fn run(
        self,
        on_progress: impl FnMut(&JobState) + Send,
    ) -> (FlowToken, Result<VideoOutcome, StudioError>) {
        let result = run_video_job(
            self.backend.as_ref(),
            self.media.as_ref(),
            &self.pending.request,
            self.timing,
            on_progress,
        )
        .await;
        (self.pending.token, result)
    }
}

/// Both flows plus the credential that authenticates them.
///
/// Conversation context belongs to one key: changing or clearing the key
/// discards both transcripts and every pending result.
pub struct Studio<C: Connector> {
    connector: C,
    backend: Option<Arc<C::Backend>>,
    credential: CredentialHolder,
    media: Arc<dyn MediaSink>,
    timing: PollTiming,
    image: ImageFlow,
    video: VideoFlow,
    needs_credential: bool,
}

impl<C: Connector> Studio<C> {
    pub fn new(
        connector: C,
        credential: CredentialHolder,
        media: Arc<dyn MediaSink>,
        timing: PollTiming,
    ) -> Self {
        let backend = credential
            .current()
            .map(|key| Arc::new(connector.connect(key)));
        Self {
            connector,
            backend,
            credential,
            media,
            timing,
            image: ImageFlow::new(),
            video: VideoFlow::new(),
            needs_credential: false,
        }
    }

    pub fn image(&self) -> &ImageFlow {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut ImageFlow {
        &mut self.image
    }

    pub fn video(&self) -> &VideoFlow {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut VideoFlow {
        &mut self.video
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.current()
    }

    pub fn timing(&self) -> PollTiming {
        self.timing
    }

    /// Set when a submission was refused for lack of a key. The UI should
    /// prompt for one.
    pub fn needs_credential(&self) -> bool {
        self.needs_credential
    }

    pub fn dismiss_credential_request(&mut self) {
        self.needs_credential = false;
    }

    /// The key, but only while a backend is connected with it.
    fn usable_credential(&self) -> Option<&str> {
        self.backend.as_ref().and(self.credential.current())
    }

    fn refused(&mut self, err: StudioError) {
        match err {
            StudioError::MissingCredential => self.needs_credential = true,
            other => warn!(error = %other, "submission refused"),
        }
    }

    /// Starts an image request. `None` if nothing was started.
    pub fn submit_image(&mut self, prompt: &str) -> Option<ImageWork<C::Backend>> {
        let credential = self.usable_credential().map(String::from);
        match self.image.begin(prompt, credential.as_deref()) {
            Ok(pending) => {
                let backend = Arc::clone(self.backend.as_ref()?);
                pending.map(|pending| ImageWork { pending, backend })
            }
            Err(e) => {
                self.refused(e);
                None
            }
        }
    }

    /// Starts a video job. `None` if nothing was started.
    pub fn submit_video(&mut self, prompt: &str) -> Option<VideoWork<C::Backend>> {
        let credential = self.usable_credential().map(String::from);
        match self.video.begin(prompt, credential.as_deref()) {
            Ok(pending) => {
                let backend = Arc::clone(self.backend.as_ref()?);
                pending.map(|pending| VideoWork {
                    pending,
                    backend,
                    media: Arc::clone(&self.media),
                    timing: self.timing,
                })
            }
            Err(e) => {
                self.refused(e);
                None
            }
        }
    }

    pub fn complete_image(
        &mut self,
        token: FlowToken,
        result: Result<GenerateContentResponse, GeminiError>,
    ) -> Completion {
        self.image.complete(token, result)
    }

    pub fn video_progress(&mut self, token: FlowToken, state: JobState) {
        self.video.progress(token, state, self.timing.max_attempts);
    }

    pub fn complete_video(
        &mut self,
        token: FlowToken,
        result: Result<VideoOutcome, StudioError>,
    ) -> Completion {
        self.video.complete(token, result)
    }

    /// Runs an image prompt to completion.
    pub async fn generate_image(&mut self, prompt: &str) -> Option<Completion> {
        let work = self.submit_image(prompt)?;
        let (token, result) = work.run().await;
        Some(self.complete_image(token, result))
    }

    /// Runs a video prompt to completion, reporting each state change.
    pub async fn generate_video(
        &mut self,
        prompt: &str,
        mut on_progress: impl FnMut(&JobState) + Send,
    ) -> Option<Completion> {
        let work = self.submit_video(prompt)?;
        let (token, result) = work.run(&mut on_progress).await;
        Some(self.complete_video(token, result))
    }

    /// Replaces the API key, discarding all conversation state.
    pub fn set_credential(&mut self, key: &str) {
        self.credential.set(key);
        self.backend = self
            .credential
            .current()
            .map(|k| Arc::new(self.connector.connect(k)));
        self.reset_all();
    }

    /// Forgets the API key, discarding all conversation state.
    pub fn clear_credential(&mut self) {
        self.credential.clear();
        self.backend = None;
        self.reset_all();
    }

    pub fn reset_image(&mut self) {
        self.image.reset();
    }

    pub fn reset_video(&mut self) -> usize {
        self.video.reset()
    }

    fn reset_all(&mut self) {
        self.image.reset();
        let released = self.video.reset();
        self.needs_credential = false;
        info!(released, "session reset");
    }
}
