use std::path::{Path, PathBuf};
use std::time::Duration;

use borane_gemini::DEFAULT_BASE_URL;
use serde::Deserialize;
use tracing::warn;

use crate::error::StudioError;
use crate::flows::PollTiming;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub image_model: String,
    pub video_model: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub media_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let timing = PollTiming::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            poll_interval_ms: timing.interval.as_millis() as u64,
            max_poll_attempts: timing.max_attempts,
            media_dir: None,
        }
    }
}

impl Config {
    pub fn poll_timing(&self) -> PollTiming {
        PollTiming {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }

    /// Directory for this session's downloaded videos.
    pub fn media_dir(&self) -> PathBuf {
        let root = self.media_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("borane")
                .join("media")
        });
        root.join(format!("session-{}", std::process::id()))
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("borane"))
}

pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("borane")
}

pub fn load_config_from(path: &Path) -> Result<Config, StudioError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

pub fn load_config() -> Config {
    let Some(path) = config_dir().map(|d| d.join("config.toml")) else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }

    match load_config_from(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            Config::default()
        }
    }
}

/// API key from the environment, which takes precedence over the stored one.
pub fn api_key_override() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
