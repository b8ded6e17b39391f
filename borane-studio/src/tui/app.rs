use borane_gemini::{GeminiError, GenerateContentResponse};
use borane_studio::credential::mask_key;
use borane_studio::{
    AttachOutcome, Completion, FlowToken, GeminiConnector, JobState, Studio, StudioError,
    VideoOutcome,
};
use borane_transcript::Transcript;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Image,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Compose,
    KeyEntry,
    AttachPath,
}

/// Results coming back from spawned work.
pub enum AppEvent {
    ImageDone {
        token: FlowToken,
        result: Result<GenerateContentResponse, GeminiError>,
    },
    VideoProgress {
        token: FlowToken,
        state: JobState,
    },
    VideoDone {
        token: FlowToken,
        result: Result<VideoOutcome, StudioError>,
    },
}

pub struct StudioApp {
    pub studio: Studio<GeminiConnector>,
    pub tab: Tab,
    pub mode: AppMode,
    pub should_quit: bool,
    pub input: String,
    pub cursor_pos: usize,
    pub popup_input: String,
    pub messages_scroll: u16,
    pub notice: Option<String>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl StudioApp {
    pub fn new(studio: Studio<GeminiConnector>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut app = Self {
            studio,
            tab: Tab::Image,
            mode: AppMode::Compose,
            should_quit: false,
            input: String::new(),
            cursor_pos: 0,
            popup_input: String::new(),
            messages_scroll: 0,
            notice: None,
            events_tx,
            events_rx,
        };
        if app.studio.credential().is_none() {
            app.open_key_entry();
        }
        app
    }

    pub fn transcript(&self) -> &Transcript {
        match self.tab {
            Tab::Image => self.studio.image().transcript(),
            Tab::Video => self.studio.video().transcript(),
        }
    }

    pub fn is_busy(&self) -> bool {
        match self.tab {
            Tab::Image => self.studio.image().is_loading(),
            Tab::Video => self.studio.video().is_generating(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self.tab {
            Tab::Image => self.studio.image().error(),
            Tab::Video => self.studio.video().error(),
        }
    }

    pub fn attached_names(&self) -> Vec<&str> {
        let tray = match self.tab {
            Tab::Image => self.studio.image().tray(),
            Tab::Video => self.studio.video().tray(),
        };
        tray.images().iter().map(|i| i.file_name.as_str()).collect()
    }

    pub fn masked_key(&self) -> Option<String> {
        self.studio.credential().map(mask_key)
    }

    pub fn switch_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Image => Tab::Video,
            Tab::Video => Tab::Image,
        };
        self.messages_scroll = 0;
        self.notice = None;
    }

    pub fn submit(&mut self) {
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() {
            return;
        }

        let started = match self.tab {
            Tab::Image => self.spawn_image(&prompt),
            Tab::Video => self.spawn_video(&prompt),
        };

        if started {
            self.input.clear();
            self.cursor_pos = 0;
            self.messages_scroll = 0;
            self.notice = None;
        } else if self.studio.needs_credential() {
            self.open_key_entry();
        }
    }

    fn spawn_image(&mut self, prompt: &str) -> bool {
        let Some(work) = self.studio.submit_image(prompt) else {
            return false;
        };
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let (token, result) = work.run().await;
            let _ = tx.send(AppEvent::ImageDone { token, result });
        });
        true
    }

    fn spawn_video(&mut self, prompt: &str) -> bool {
        let Some(work) = self.studio.submit_video(prompt) else {
            return false;
        };
        let job = work.token();
        let tx = self.events_tx.clone();
        let progress = self.events_tx.clone();
        tokio::spawn(async move {
            let (token, result) = work
                .run(move |state: &JobState| {
                    let _ = progress.send(AppEvent::VideoProgress {
                        token: job,
                        state: state.clone(),
                    });
                })
                .await;
            let _ = tx.send(AppEvent::VideoDone { token, result });
        });
        true
    }

    /// Applies everything spawned work has reported since the last tick.
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            let completion = match event {
                AppEvent::ImageDone { token, result } => self.studio.complete_image(token, result),
                AppEvent::VideoProgress { token, state } => {
                    self.studio.video_progress(token, state);
                    continue;
                }
                AppEvent::VideoDone { token, result } => self.studio.complete_video(token, result),
            };
            match completion {
                Completion::Appended(id) => {
                    debug!(%id, "appended");
                    self.messages_scroll = 0;
                }
                Completion::Failed(_) => {}
                Completion::Stale => debug!("ignored late result"),
            }
        }
    }

    pub fn reset_tab(&mut self) {
        match self.tab {
            Tab::Image => self.studio.reset_image(),
            Tab::Video => {
                self.studio.reset_video();
            }
        }
        self.messages_scroll = 0;
        self.notice = Some("Conversation cleared".to_string());
    }

    pub fn open_key_entry(&mut self) {
        self.popup_input.clear();
        self.mode = AppMode::KeyEntry;
    }

    pub fn open_attach(&mut self) {
        self.popup_input.clear();
        self.mode = AppMode::AttachPath;
    }

    pub fn close_popup(&mut self) {
        if self.mode == AppMode::KeyEntry {
            self.studio.dismiss_credential_request();
        }
        self.popup_input.clear();
        self.mode = AppMode::Compose;
    }

    pub fn confirm_popup(&mut self) {
        let value = std::mem::take(&mut self.popup_input);
        match self.mode {
            AppMode::KeyEntry => {
                if value.trim().is_empty() {
                    self.studio.clear_credential();
                    self.notice = Some("API key cleared".to_string());
                } else {
                    self.studio.set_credential(&value);
                    self.notice = Some("API key saved".to_string());
                }
                self.messages_scroll = 0;
            }
            AppMode::AttachPath => {
                let paths: Vec<&str> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                let AttachOutcome { accepted, notice } = match self.tab {
                    Tab::Image => self.studio.image_mut().attach(&paths),
                    Tab::Video => self.studio.video_mut().attach(&paths),
                };
                if notice.is_none() {
                    self.notice = Some(format!("Attached {accepted} image(s)"));
                }
            }
            AppMode::Compose => {}
        }
        self.mode = AppMode::Compose;
    }

    pub fn popup_char(&mut self, c: char) {
        self.popup_input.push(c);
    }

    pub fn popup_backspace(&mut self) {
        self.popup_input.pop();
    }

    pub fn cycle_resolution(&mut self) {
        if self.tab == Tab::Video {
            self.studio.video_mut().settings_mut().cycle_resolution();
        }
    }

    pub fn cycle_aspect_ratio(&mut self) {
        if self.tab == Tab::Video {
            self.studio.video_mut().settings_mut().cycle_aspect_ratio();
        }
    }

    pub fn cycle_duration(&mut self) {
        if self.tab == Tab::Video {
            self.studio.video_mut().settings_mut().cycle_duration();
        }
    }

    pub fn scroll_up(&mut self) {
        self.messages_scroll = self.messages_scroll.saturating_add(1);
    }

    pub fn scroll_down(&mut self) {
        self.messages_scroll = self.messages_scroll.saturating_sub(1);
    }

    pub fn input_char(&mut self, c: char) {
        self.input.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
    }

    pub fn input_backspace(&mut self) {
        if self.cursor_pos > 0 {
            let prev = self.input[..self.cursor_pos]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.input.remove(prev);
            self.cursor_pos = prev;
        }
    }

    pub fn input_delete(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.input.remove(self.cursor_pos);
        }
    }

    pub fn input_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos = self.input[..self.cursor_pos]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub fn input_right(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.cursor_pos = self.input[self.cursor_pos..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor_pos + i)
                .unwrap_or(self.input.len());
        }
    }

    pub fn input_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn input_end(&mut self) {
        self.cursor_pos = self.input.len();
    }
}
