use serde::Deserialize;
use std::time::Duration;

/// High-level pacer configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_wpm")]
    pub wpm: u32,
    #[serde(default = "crate::config::defaults::default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "crate::config::defaults::default_wide_chunk_size")]
    pub wide_chunk_size: usize,
    #[serde(default = "crate::config::defaults::default_wide_script_threshold")]
    pub wide_script_threshold: f32,
    #[serde(default = "crate::config::defaults::default_script_sample_chars")]
    pub script_sample_chars: usize,
    #[serde(default = "crate::config::defaults::default_wide_script_weight")]
    pub wide_script_weight: f32,
    #[serde(default = "crate::config::defaults::default_min_dwell_ms")]
    pub min_dwell_ms: u64,
    #[serde(default = "crate::config::defaults::default_line_tolerance_px")]
    pub line_tolerance_px: f32,
    #[serde(default = "crate::config::defaults::default_edge_tolerance_px")]
    pub edge_tolerance_px: f32,
    #[serde(default = "crate::config::defaults::default_end_grace_ms")]
    pub end_grace_ms: u64,
    #[serde(default = "crate::config::defaults::default_empty_page_grace_ms")]
    pub empty_page_grace_ms: u64,
    #[serde(default = "crate::config::defaults::default_start_delay_ms")]
    pub start_delay_ms: u64,
    #[serde(default = "crate::config::defaults::default_highlight")]
    pub highlight: HighlightColor,
    #[serde(default = "crate::config::defaults::default_viewport_width")]
    pub viewport_width: f32,
    #[serde(default = "crate::config::defaults::default_viewport_height")]
    pub viewport_height: f32,
    #[serde(default = "crate::config::defaults::default_font_size")]
    pub font_size: f32,
    #[serde(default = "crate::config::defaults::default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default = "crate::config::defaults::default_margin_horizontal")]
    pub margin_horizontal: f32,
    #[serde(default = "crate::config::defaults::default_margin_vertical")]
    pub margin_vertical: f32,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        use crate::config::defaults::*;
        AppConfig {
            wpm: default_wpm(),
            chunk_size: default_chunk_size(),
            wide_chunk_size: default_wide_chunk_size(),
            wide_script_threshold: default_wide_script_threshold(),
            script_sample_chars: default_script_sample_chars(),
            wide_script_weight: default_wide_script_weight(),
            min_dwell_ms: default_min_dwell_ms(),
            line_tolerance_px: default_line_tolerance_px(),
            edge_tolerance_px: default_edge_tolerance_px(),
            end_grace_ms: default_end_grace_ms(),
            empty_page_grace_ms: default_empty_page_grace_ms(),
            start_delay_ms: default_start_delay_ms(),
            highlight: default_highlight(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            font_size: default_font_size(),
            line_spacing: default_line_spacing(),
            margin_horizontal: default_margin_horizontal(),
            margin_vertical: default_margin_vertical(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// The subset of the configuration the scheduler re-reads on every tick.
    pub fn pacing_settings(&self) -> PacingSettings {
        PacingSettings {
            wpm: clamp_wpm(self.wpm),
            chunk_size: clamp_chunk_size(self.chunk_size),
            wide_chunk_size: self.wide_chunk_size.max(1),
            wide_script_threshold: self.wide_script_threshold.clamp(0.0, 1.0),
            script_sample_chars: self.script_sample_chars.max(1),
            wide_script_weight: if self.wide_script_weight > 0.0 {
                self.wide_script_weight
            } else {
                crate::config::defaults::default_wide_script_weight()
            },
            min_dwell: Duration::from_millis(self.min_dwell_ms),
            line_tolerance_px: self.line_tolerance_px.max(0.0),
            edge_tolerance_px: self.edge_tolerance_px.max(0.0),
            end_grace: Duration::from_millis(self.end_grace_ms),
            empty_page_grace: Duration::from_millis(self.empty_page_grace_ms),
            start_delay: Duration::from_millis(self.start_delay_ms),
            highlight: self.highlight,
        }
    }
}

pub fn clamp_wpm(wpm: u32) -> u32 {
    wpm.clamp(super::MIN_WPM, super::MAX_WPM)
}

pub fn clamp_chunk_size(size: usize) -> usize {
    size.clamp(super::MIN_CHUNK_SIZE, super::MAX_CHUNK_SIZE)
}

/// Live pacing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingSettings {
    pub wpm: u32,
    pub chunk_size: usize,
    pub wide_chunk_size: usize,
    pub wide_script_threshold: f32,
    pub script_sample_chars: usize,
    pub wide_script_weight: f32,
    pub min_dwell: Duration,
    pub line_tolerance_px: f32,
    pub edge_tolerance_px: f32,
    pub end_grace: Duration,
    pub empty_page_grace: Duration,
    pub start_delay: Duration,
    pub highlight: HighlightColor,
}

impl Default for PacingSettings {
    fn default() -> Self {
        AppConfig::default().pacing_settings()
    }
}

impl PacingSettings {
    /// Chunk size in effect for the given script class.
    pub fn effective_chunk_size(&self, wide_script: bool) -> usize {
        if wide_script {
            self.wide_chunk_size
        } else {
            self.chunk_size
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HighlightColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl HighlightColor {
    /// CSS `rgba()` form with 0-255 channels.
    pub fn to_css(self) -> String {
        let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "rgba({},{},{},{})",
            channel(self.r),
            channel(self.g),
            channel(self.b),
            self.a.clamp(0.0, 1.0)
        )
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
