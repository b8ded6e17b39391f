use std::path::Path;

use borane_gemini::{
    GeminiError, GenerateContentRequest, GenerateContentResponse, build_image_request,
    history_to_contents, response_to_parts,
};
use borane_transcript::{ImagePart, Part, Role, Transcript};
use tracing::{debug, info, warn};

use super::{Completion, FlowToken, TokenSource};
use crate::attachments::{AttachOutcome, AttachmentTray, MAX_REFERENCE_IMAGES};
use crate::backend::ImageBackend;
use crate::error::StudioError;

/// A submitted image prompt waiting for the service.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub token: FlowToken,
    pub request: GenerateContentRequest,
}

/// Request/response conversation producing images.
#[derive(Debug)]
pub struct ImageFlow {
    transcript: Transcript,
    tray: AttachmentTray,
    pending: Option<FlowToken>,
    tokens: TokenSource,
    error: Option<String>,
}

impl Default for ImageFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFlow {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            tray: AttachmentTray::new(MAX_REFERENCE_IMAGES),
            pending: None,
            tokens: TokenSource::default(),
            error: None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn tray(&self) -> &AttachmentTray {
        &self.tray
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Attaches reference images for the next prompt. Rejections become the
    /// flow's error.
    pub fn attach<P: AsRef<Path>>(&mut self, paths: &[P]) -> AttachOutcome {
        let outcome = self.tray.attach(paths);
        if let Some(notice) = &outcome.notice {
            self.error = Some(StudioError::AttachmentRejected(notice.clone()).to_string());
        }
        outcome
    }

    /// Starts a submission.
    ///
    /// Returns `Ok(None)` for a blank prompt or while a request is already
    /// running. Fails with [`StudioError::MissingCredential`] before touching
    /// any state when no key is available.
    pub fn begin(
        &mut self,
        prompt: &str,
        credential: Option<&str>,
    ) -> Result<Option<PendingImage>, StudioError> {
        let prompt = prompt.trim();
        if prompt.is_empty() || self.is_loading() {
            return Ok(None);
        }
        if credential.is_none() {
            return Err(StudioError::MissingCredential);
        }

        // History is taken before the new turn so the prompt is sent once.
        let history = history_to_contents(self.transcript.messages());
        let references = self.tray.take();
        let blobs: Vec<_> = references.iter().map(|r| r.to_blob()).collect();
        let request = build_image_request(history, prompt, &blobs);

        let mut parts = vec![Part::text(prompt)];
        parts.extend(references.into_iter().map(|r| {
            Part::Image(ImagePart::inline(r.mime_type, r.data).with_alt_text(r.file_name))
        }));
        self.transcript.append(Role::User, parts);

        let token = self.tokens.issue();
        self.pending = Some(token);
        self.error = None;
        debug!(references = blobs.len(), "image request started");

        Ok(Some(PendingImage { token, request }))
    }

    /// Applies the service's answer to a submission.
    pub fn complete(
        &mut self,
        token: FlowToken,
        result: Result<GenerateContentResponse, GeminiError>,
    ) -> Completion {
        if self.pending != Some(token) {
            debug!(?token, "dropping stale image result");
            return Completion::Stale;
        }
        self.pending = None;
        self.tray.clear();

        let failure = match result {
            Ok(response) => {
                let parts = response_to_parts(&response);
                if !parts.is_empty() {
                    let id = self.transcript.append(Role::Model, parts);
                    info!(%id, "image response appended");
                    return Completion::Appended(id);
                }
                if let Some(reason) = response
                    .prompt_feedback
                    .as_ref()
                    .and_then(|f| f.block_reason.as_deref())
                {
                    warn!(reason, "prompt was blocked");
                }
                StudioError::NoContentReturned
            }
            Err(e) => StudioError::from(e),
        };

        let message = failure.to_string();
        warn!(error = %message, "image request failed");
        self.error = Some(message.clone());
        Completion::Failed(message)
    }

    /// Begins, runs and completes a submission in one go.
    pub async fn submit<B: ImageBackend>(
        &mut self,
        backend: &B,
        prompt: &str,
        credential: Option<&str>,
    ) -> Result<Option<Completion>, StudioError> {
        let Some(pending) = self.begin(prompt, credential)? else {
            return Ok(None);
        };
        let result = run_image(backend, &pending).await;
        Ok(Some(self.complete(pending.token, result)))
    }

    /// Forgets the conversation and any pending submission.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.tray.clear();
        self.pending = None;
        self.error = None;
    }
}

/// Sends a pending image request.
pub async fn run_image<B: ImageBackend>(
    backend: &B,
    pending: &PendingImage,
) -> Result<GenerateContentResponse, GeminiError> {
    backend.generate_content(&pending.request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use borane_gemini::{Candidate, Content, ContentPart};

    fn answer(parts: Vec<ContentPart>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content::model(parts)),
                finish_reason: None,
            }],
            prompt_feedback: None,
        }
    }

    #[test]
    fn blank_prompt_is_ignored() {
        let mut flow = ImageFlow::new();
        assert!(flow.begin("   ", Some("key")).unwrap().is_none());
        assert!(flow.transcript().is_empty());
        assert!(!flow.is_loading());
    }

    #[test]
    fn missing_credential_leaves_flow_untouched() {
        let mut flow = ImageFlow::new();
        let err = flow.begin("A red balloon", None).unwrap_err();
        assert!(matches!(err, StudioError::MissingCredential));
        assert!(flow.transcript().is_empty());
        assert!(!flow.is_loading());
    }

    #[test]
    fn second_submission_while_loading_is_dropped() {
        let mut flow = ImageFlow::new();
        let first = flow.begin("one", Some("key")).unwrap();
        assert!(first.is_some());
        assert!(flow.begin("two", Some("key")).unwrap().is_none());
        assert_eq!(flow.transcript().len(), 1);
    }

    #[test]
    fn success_appends_model_message() {
        let mut flow = ImageFlow::new();
        let pending = flow.begin("A red balloon", Some("key")).unwrap().unwrap();
        assert_eq!(
            pending.request.contents.last().unwrap().parts[0].text.as_deref(),
            Some("A red balloon")
        );

        let completion = flow.complete(
            pending.token,
            Ok(answer(vec![
                ContentPart::text("Here it is"),
                ContentPart::inline("image/png", "IMG"),
            ])),
        );
        assert!(matches!(completion, Completion::Appended(_)));
        assert_eq!(flow.transcript().len(), 2);
        let model = flow.transcript().last().unwrap();
        assert_eq!(model.role, Role::Model);
        assert!(model.parts[0].is_image());
        assert_eq!(model.parts[1].as_text(), Some("Here it is"));
        assert!(!flow.is_loading());
        assert!(flow.error().is_none());
    }

    #[test]
    fn empty_response_is_an_error_not_a_message() {
        let mut flow = ImageFlow::new();
        let pending = flow.begin("nothing please", Some("key")).unwrap().unwrap();

        let completion = flow.complete(pending.token, Ok(GenerateContentResponse::default()));
        assert_eq!(completion, Completion::Failed("No content returned".to_string()));
        assert_eq!(flow.transcript().len(), 1);
        assert_eq!(flow.error(), Some("No content returned"));
        assert!(!flow.is_loading());
    }

    #[test]
    fn remote_error_becomes_flow_error() {
        let mut flow = ImageFlow::new();
        let pending = flow.begin("x", Some("key")).unwrap().unwrap();
        let completion = flow.complete(
            pending.token,
            Err(GeminiError::Api {
                status: 429,
                message: "quota".to_string(),
            }),
        );
        assert!(matches!(completion, Completion::Failed(ref m) if m.contains("quota")));

        // The flow is retryable.
        assert!(flow.begin("x again", Some("key")).unwrap().is_some());
    }

    #[test]
    fn result_after_reset_is_dropped() {
        let mut flow = ImageFlow::new();
        let pending = flow.begin("old", Some("key")).unwrap().unwrap();
        flow.reset();

        let completion = flow.complete(pending.token, Ok(answer(vec![ContentPart::text("late")])));
        assert_eq!(completion, Completion::Stale);
        assert!(flow.transcript().is_empty());
    }

    #[test]
    fn attachments_ride_along_and_are_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.png");
        std::fs::write(&path, b"png").unwrap();

        let mut flow = ImageFlow::new();
        assert_eq!(flow.attach(&[&path]).accepted, 1);

        let pending = flow.begin("use this", Some("key")).unwrap().unwrap();
        assert!(flow.tray().is_empty());

        let last = pending.request.contents.last().unwrap();
        assert_eq!(last.parts.len(), 2);
        assert_eq!(last.parts[1].inline_data.as_ref().unwrap().mime_type, "image/png");

        let user = flow.transcript().last().unwrap();
        assert_eq!(user.parts.len(), 2);
        assert!(user.parts[1].is_image());
    }
}
