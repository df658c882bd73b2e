//! Configuration loading for the pacer.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Any missing or invalid entries fall back to
//! sensible defaults so pacing can still start.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{
    AppConfig, HighlightColor, LogLevel, PacingSettings, clamp_chunk_size, clamp_wpm,
};

use std::sync::{Arc, RwLock};

/// Limits for the live pacing controls.
pub const MIN_WPM: u32 = 100;
pub const MAX_WPM: u32 = 1000;
pub const MIN_CHUNK_SIZE: usize = 1;
pub const MAX_CHUNK_SIZE: usize = 12;

/// Read access to the live pacing configuration.
///
/// The scheduler calls `current()` on every tick rather than capturing values
/// when playback starts, so rate and chunk-size changes apply mid-playback.
pub trait SettingsSource {
    fn current(&self) -> PacingSettings;
    fn set_wpm(&self, wpm: u32);
    fn set_chunk_size(&self, size: usize);
}

/// Cloneable handle onto one shared `PacingSettings` value.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<PacingSettings>>,
}

impl SharedSettings {
    pub fn new(settings: PacingSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn update(&self, apply: impl FnOnce(&mut PacingSettings)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply(&mut guard);
    }
}

impl From<&AppConfig> for SharedSettings {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.pacing_settings())
    }
}

impl SettingsSource for SharedSettings {
    fn current(&self) -> PacingSettings {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_wpm(&self, wpm: u32) {
        self.update(|settings| settings.wpm = clamp_wpm(wpm));
    }

    fn set_chunk_size(&self, size: usize) {
        self.update(|settings| settings.chunk_size = clamp_chunk_size(size));
    }
}
