//! Settings store adapter
//!
//! The switcher keeps three preferences in an external key-value store:
//! per-platform "show info" flags (written by the companion settings
//! surface) and the audio-only mode flag (written on every toggle). All
//! values travel as strings; the mode flag reads as audio-only unless the
//! stored string is literally "false".

use crate::page::Platform;
use serde::{Deserialize, Serialize};

/// Show-info preference key for YouTube pages
pub const YOUTUBE_SHOW_INFO_KEY: &str = "youtube-show-info";
/// Show-info preference key for YouTube Music pages
pub const YTMUSIC_SHOW_INFO_KEY: &str = "ytmusic-show-info";
/// Audio-only mode flag, stored as a string
pub const AUDIO_ONLY_KEY: &str = "ytmusic-audio-only";

/// String key-value surface the host environment provides
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore {
    /// Read a stored value
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: std::collections::HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Video hidden, thumbnail overlay shown
    AudioOnly,
    /// Native video presentation
    Video,
}

impl Mode {
    /// The opposite mode
    pub fn toggled(self) -> Mode {
        match self {
            Mode::AudioOnly => Mode::Video,
            Mode::Video => Mode::AudioOnly,
        }
    }

    /// Whether the video stream should be hidden
    pub fn is_audio_only(self) -> bool {
        matches!(self, Mode::AudioOnly)
    }

    /// Read the persisted mode; anything but "false" means audio-only
    pub fn load(store: &dyn SettingsStore) -> Mode {
        match store.get(AUDIO_ONLY_KEY).as_deref() {
            Some("false") => Mode::Video,
            _ => Mode::AudioOnly,
        }
    }

    /// Persist the mode as its string flag
    pub fn persist(self, store: &mut dyn SettingsStore) {
        let value = if self.is_audio_only() { "true" } else { "false" };
        store.set(AUDIO_ONLY_KEY, value);
    }
}

/// Per-platform overlay info preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub youtube_show_info: bool,
    pub ytmusic_show_info: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            youtube_show_info: true,
            ytmusic_show_info: true,
        }
    }
}

impl Settings {
    /// Read both flags, defaulting to enabled
    pub fn load(store: &dyn SettingsStore) -> Settings {
        let flag = |key: &str| store.get(key).map(|v| v != "false").unwrap_or(true);
        Settings {
            youtube_show_info: flag(YOUTUBE_SHOW_INFO_KEY),
            ytmusic_show_info: flag(YTMUSIC_SHOW_INFO_KEY),
        }
    }

    /// Write both flags (the companion settings surface path)
    pub fn persist(&self, store: &mut dyn SettingsStore) {
        store.set(YOUTUBE_SHOW_INFO_KEY, if self.youtube_show_info { "true" } else { "false" });
        store.set(YTMUSIC_SHOW_INFO_KEY, if self.ytmusic_show_info { "true" } else { "false" });
    }

    /// Flag for a platform
    pub fn show_info_for(&self, platform: Platform) -> bool {
        match platform {
            Platform::Youtube => self.youtube_show_info,
            Platform::Ytmusic => self.ytmusic_show_info,
        }
    }

    /// Update the flag for a platform
    pub fn set_show_info(&mut self, platform: Platform, show_info: bool) {
        match platform {
            Platform::Youtube => self.youtube_show_info = show_info,
            Platform::Ytmusic => self.ytmusic_show_info = show_info,
        }
    }
}
