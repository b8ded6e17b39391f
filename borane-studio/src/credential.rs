use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StudioError;

/// Durable storage for a single API key.
pub trait CredentialStore: Send {
    fn load(&self) -> Result<Option<String>, StudioError>;
    fn save(&self, key: &str) -> Result<(), StudioError>;
    fn delete(&self) -> Result<(), StudioError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    api_key: Option<String>,
}

/// Stores the key in a small TOML file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `credentials.toml` in the user's config directory.
    pub fn default_location() -> Option<Self> {
        crate::config::config_dir().map(|d| Self::new(d.join("credentials.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn unavailable(e: impl std::fmt::Display) -> StudioError {
    StudioError::StorageUnavailable(e.to_string())
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>, StudioError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(e)),
        };
        let file: CredentialFile = toml::from_str(&content).map_err(unavailable)?;
        Ok(file.api_key.filter(|k| !k.is_empty()))
    }

    fn save(&self, key: &str) -> Result<(), StudioError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(unavailable)?;
        }
        let file = CredentialFile {
            api_key: Some(key.to_string()),
        };
        let content = toml::to_string(&file).map_err(unavailable)?;
        std::fs::write(&self.path, content).map_err(unavailable)
    }

    fn delete(&self) -> Result<(), StudioError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable(e)),
        }
    }
}

/// Keeps the key in memory only.
#[derive(Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(key.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>, StudioError> {
        let value = self.value.lock().map_err(unavailable)?;
        Ok(value.clone())
    }

    fn save(&self, key: &str) -> Result<(), StudioError> {
        *self.value.lock().map_err(unavailable)? = Some(key.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<(), StudioError> {
        *self.value.lock().map_err(unavailable)? = None;
        Ok(())
    }
}

/// The API key used for every remote call.
///
/// Storage failures never surface as errors here: they are logged and the
/// holder behaves as if no key were stored.
pub struct CredentialHolder {
    current: Option<String>,
    store: Box<dyn CredentialStore>,
}

impl CredentialHolder {
    /// Loads the stored key, if any.
    pub fn load(store: Box<dyn CredentialStore>) -> Self {
        let current = match store.load() {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "could not read stored API key");
                None
            }
        };
        debug!(present = current.is_some(), "loaded credential");
        Self { current, store }
    }

    /// Uses `key` for this session without persisting it.
    pub fn with_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key {
            self.current = Some(key);
        }
        self
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_set(&self) -> bool {
        self.current.is_some()
    }

    /// Replaces the key and persists it. A blank key clears instead.
    pub fn set(&mut self, key: &str) {
        let key = key.trim();
        if key.is_empty() {
            self.clear();
            return;
        }

        self.current = Some(key.to_string());
        match self.store.save(key) {
            Ok(()) => info!("API key saved"),
            Err(e) => warn!(error = %e, "could not persist API key"),
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
        match self.store.delete() {
            Ok(()) => info!("API key cleared"),
            Err(e) => warn!(error = %e, "could not delete stored API key"),
        }
    }
}

/// Obscures all but the last four characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}
