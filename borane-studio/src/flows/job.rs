use std::time::Duration;

use borane_gemini::{GenerateVideosRequest, generated_video};
use borane_transcript::MediaHandle;
use tracing::{debug, info, instrument, warn};

use crate::backend::VideoBackend;
use crate::error::StudioError;
use crate::media::MediaSink;

const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// How often and how many times a video job is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(8000),
            max_attempts: 45,
        }
    }
}

/// Lifecycle of one video job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Submitting,
    /// Waiting on the service; `attempt` status checks have been made so far.
    Polling { attempt: u32 },
    Fetching,
    Complete,
    Failed { reason: String },
}

/// Something observed while driving a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Start,
    Submitted,
    /// The latest job status was inspected.
    Checked { done: bool },
    /// One more status check was made.
    Polled,
    Fetched,
    Failed(String),
}

impl JobState {
    /// Applies an event. Terminal states absorb everything; an event that
    /// makes no sense in the current state fails the job.
    pub fn next(self, event: JobEvent, max_attempts: u32) -> JobState {
        use JobState::*;

        match (self, event) {
            (state @ (Complete | Failed { .. }), _) => state,
            (_, JobEvent::Failed(reason)) => Failed { reason },
            (Idle, JobEvent::Start) => Submitting,
            (Submitting, JobEvent::Submitted) => Polling { attempt: 0 },
            (Polling { .. }, JobEvent::Checked { done: true }) => Fetching,
            (Polling { attempt }, JobEvent::Checked { done: false }) if attempt >= max_attempts => {
                Failed {
                    reason: StudioError::JobTimeout { attempts: attempt }.to_string(),
                }
            }
            (Polling { attempt }, JobEvent::Checked { done: false }) => Polling { attempt },
            (Polling { attempt }, JobEvent::Polled) => Polling {
                attempt: attempt + 1,
            },
            (Fetching, JobEvent::Fetched) => Complete,
            (state, event) => Failed {
                reason: format!("unexpected {event:?} while {state:?}"),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed { .. })
    }

    /// Human-readable progress, for states that have any.
    pub fn status_line(&self, max_attempts: u32) -> Option<String> {
        match self {
            JobState::Submitting => Some("Submitting video request...".to_string()),
            JobState::Polling { attempt: 0 } => {
                Some("Video job started, waiting for the first status check...".to_string())
            }
            JobState::Polling { attempt } => Some(format!(
                "Generating video... (check {attempt}/{max_attempts})"
            )),
            JobState::Fetching => Some("Downloading video...".to_string()),
            JobState::Idle | JobState::Complete | JobState::Failed { .. } => None,
        }
    }
}

/// A finished video, stored locally.
#[derive(Debug)]
pub struct VideoOutcome {
    pub handle: MediaHandle,
    pub remote_uri: String,
    pub mime_type: String,
}

/// Drives a video job from submission to a local file.
///
/// Waits between status checks with `tokio::time::sleep`, so other tasks
/// keep running. Gives up once `timing.max_attempts` checks have reported the
/// job unfinished; no further check is made after that.
#[instrument(skip_all)]
pub async fn run_video_job<B, M>(
    backend: &B,
    media: &M,
    request: &GenerateVideosRequest,
    timing: PollTiming,
    mut on_progress: impl FnMut(&JobState) + Send,
) -> Result<VideoOutcome, StudioError>
where
    B: VideoBackend,
    M: MediaSink + ?Sized,
{
    let max = timing.max_attempts;

    let mut state = JobState::Idle.next(JobEvent::Start, max);
    on_progress(&state);

    let mut job = backend.submit(request).await?;
    info!(operation = %job.name, "video job submitted");
    state = state.next(JobEvent::Submitted, max);
    on_progress(&state);

    loop {
        state = state.next(JobEvent::Checked { done: job.done }, max);
        match &state {
            JobState::Polling { .. } => {}
            JobState::Fetching => break,
            JobState::Failed { reason } => {
                warn!(operation = %job.name, %reason, "video job abandoned");
                return Err(StudioError::JobTimeout { attempts: max });
            }
            other => {
                return Err(StudioError::JobIncomplete(format!(
                    "unexpected job state {other:?}"
                )));
            }
        }

        tokio::time::sleep(timing.interval).await;
        job = backend.poll(&job).await?;
        state = state.next(JobEvent::Polled, max);
        debug!(?state, done = job.done, "checked video job");
        on_progress(&state);
    }
    on_progress(&state);

    let video = generated_video(&job)?;
    let remote_uri = video.uri.to_string();
    let listed_mime = video.mime_type.map(String::from);

    let download = backend.fetch(&remote_uri).await?;
    let mime_type = download
        .content_type
        .filter(|c| c.starts_with("video/"))
        .or(listed_mime)
        .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string());
    let handle = media.materialize(&download.bytes, &mime_type)?;

    state = state.next(JobEvent::Fetched, max);
    info!(path = %handle.path().display(), len = handle.len(), "video job complete");
    on_progress(&state);

    Ok(VideoOutcome {
        handle,
        remote_uri,
        mime_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use borane_gemini::{
        Download, GeminiError, GenerateVideoResponse, GeneratedSample, Operation,
        OperationResponse, VideoParameters, VideoRef,
    };
    use borane_transcript::MediaRelease;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    const MAX: u32 = 45;

    #[test]
    fn happy_path_transitions() {
        let s = JobState::Idle.next(JobEvent::Start, MAX);
        assert_eq!(s, JobState::Submitting);
        let s = s.next(JobEvent::Submitted, MAX);
        assert_eq!(s, JobState::Polling { attempt: 0 });
        let s = s.next(JobEvent::Checked { done: false }, MAX);
        assert_eq!(s, JobState::Polling { attempt: 0 });
        let s = s.next(JobEvent::Polled, MAX);
        assert_eq!(s, JobState::Polling { attempt: 1 });
        let s = s.next(JobEvent::Checked { done: true }, MAX);
        assert_eq!(s, JobState::Fetching);
        let s = s.next(JobEvent::Fetched, MAX);
        assert_eq!(s, JobState::Complete);
        assert!(s.is_terminal());
    }

    #[test]
    fn ceiling_fails_unfinished_job() {
        let s = JobState::Polling { attempt: MAX }.next(JobEvent::Checked { done: false }, MAX);
        match s {
            JobState::Failed { reason } => assert!(reason.contains("timed out")),
            other => panic!("Expected failure, got {:?}", other),
        }

        // A finished job at the ceiling still completes.
        let s = JobState::Polling { attempt: MAX }.next(JobEvent::Checked { done: true }, MAX);
        assert_eq!(s, JobState::Fetching);
    }

    #[test]
    fn terminal_states_absorb_and_illegal_events_fail() {
        let done = JobState::Complete.next(JobEvent::Failed("late".to_string()), MAX);
        assert_eq!(done, JobState::Complete);

        let failed = JobState::Failed {
            reason: "x".to_string(),
        }
        .next(JobEvent::Fetched, MAX);
        assert_eq!(failed, JobState::Failed { reason: "x".to_string() });

        let illegal = JobState::Idle.next(JobEvent::Fetched, MAX);
        assert!(matches!(illegal, JobState::Failed { .. }));

        let failed = JobState::Fetching.next(JobEvent::Failed("HTTP 500".to_string()), MAX);
        assert_eq!(failed, JobState::Failed { reason: "HTTP 500".to_string() });
    }

    #[test]
    fn status_lines() {
        assert_eq!(
            JobState::Polling { attempt: 3 }.status_line(MAX).as_deref(),
            Some("Generating video... (check 3/45)")
        );
        assert!(JobState::Complete.status_line(MAX).is_none());
        assert!(JobState::Submitting.status_line(MAX).is_some());
    }

    struct FakeJobs {
        finish_after: Option<u32>,
        polls: AtomicU32,
        fetch_status: Option<u16>,
        with_uri: bool,
    }

    impl FakeJobs {
        fn new(finish_after: Option<u32>) -> Self {
            Self {
                finish_after,
                polls: AtomicU32::new(0),
                fetch_status: None,
                with_uri: true,
            }
        }

        fn operation(&self, polls: u32) -> Operation {
            let done = self.finish_after.is_some_and(|n| polls >= n);
            Operation {
                name: "operations/test".to_string(),
                done,
                response: done.then(|| OperationResponse {
                    generate_video_response: Some(GenerateVideoResponse {
                        generated_samples: vec![GeneratedSample {
                            video: Some(VideoRef {
                                uri: self.with_uri.then(|| "https://files.test/v".to_string()),
                                mime_type: None,
                            }),
                        }],
                    }),
                }),
                error: None,
            }
        }
    }

    impl VideoBackend for FakeJobs {
        async fn submit(&self, _request: &GenerateVideosRequest) -> Result<Operation, GeminiError> {
            Ok(self.operation(0))
        }

        async fn poll(&self, _job: &Operation) -> Result<Operation, GeminiError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(self.operation(n))
        }

        async fn fetch(&self, _uri: &str) -> Result<Download, GeminiError> {
            match self.fetch_status {
                Some(status) => Err(GeminiError::Fetch { status }),
                None => Ok(Download {
                    bytes: b"mp4".to_vec(),
                    content_type: Some("video/mp4".to_string()),
                }),
            }
        }
    }

    #[derive(Default)]
    struct CountingMedia {
        released: Arc<AtomicU32>,
    }

    struct CountRelease(Arc<AtomicU32>);

    impl MediaRelease for CountRelease {
        fn release(&self, _path: &Path) -> std::io::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl MediaSink for CountingMedia {
        fn materialize(&self, bytes: &[u8], _mime: &str) -> Result<MediaHandle, StudioError> {
            Ok(MediaHandle::new(
                "/virtual/video.mp4",
                bytes.len() as u64,
                Arc::new(CountRelease(self.released.clone())),
            ))
        }
    }

    fn request() -> GenerateVideosRequest {
        GenerateVideosRequest {
            instances: vec![],
            parameters: VideoParameters {
                aspect_ratio: "16:9".to_string(),
                resolution: "720p".to_string(),
                duration_seconds: 5,
                number_of_videos: 1,
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn never_done_job_stops_after_ceiling() {
        let jobs = FakeJobs::new(None);
        let media = CountingMedia::default();
        let started = tokio::time::Instant::now();

        let result = run_video_job(&jobs, &media, &request(), PollTiming::default(), |_| {}).await;

        assert!(matches!(result, Err(StudioError::JobTimeout { attempts: 45 })));
        assert_eq!(jobs.polls.load(Ordering::SeqCst), 45);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(45 * 8000));
        assert!(elapsed < Duration::from_millis(46 * 8000));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_job_is_downloaded() {
        let jobs = FakeJobs::new(Some(3));
        let media = CountingMedia::default();
        let statuses = Mutex::new(Vec::new());

        let outcome = run_video_job(&jobs, &media, &request(), PollTiming::default(), |s| {
            statuses.lock().unwrap().push(s.clone())
        })
        .await
        .unwrap();

        assert_eq!(jobs.polls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.remote_uri, "https://files.test/v");
        assert_eq!(outcome.mime_type, "video/mp4");
        assert_eq!(outcome.handle.len(), 3);

        let statuses = statuses.into_inner().unwrap();
        assert_eq!(statuses.first(), Some(&JobState::Submitting));
        assert!(statuses.contains(&JobState::Polling { attempt: 3 }));
        assert!(statuses.contains(&JobState::Fetching));
        assert_eq!(statuses.last(), Some(&JobState::Complete));

        assert_eq!(media.released.load(Ordering::SeqCst), 0);
        drop(outcome);
        assert_eq!(media.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_reports_status() {
        let mut jobs = FakeJobs::new(Some(1));
        jobs.fetch_status = Some(404);
        let media = CountingMedia::default();

        let result = run_video_job(&jobs, &media, &request(), PollTiming::default(), |_| {}).await;
        assert!(matches!(result, Err(StudioError::FetchFailed(404))));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_locator_is_incomplete() {
        let mut jobs = FakeJobs::new(Some(0));
        jobs.with_uri = false;
        let media = CountingMedia::default();

        let result = run_video_job(&jobs, &media, &request(), PollTiming::default(), |_| {}).await;
        match result {
            Err(StudioError::JobIncomplete(reason)) => assert!(reason.contains("locator")),
            other => panic!("Expected incomplete job, got {:?}", other.map(|o| o.remote_uri)),
        }
        assert_eq!(jobs.polls.load(Ordering::SeqCst), 0);
    }
}
