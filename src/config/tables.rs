use super::defaults;
use super::models::{AppConfig, HighlightColor, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    pacing: PacingConfig,
    #[serde(default)]
    timing: TimingConfig,
    #[serde(default)]
    layout: LayoutConfig,
    #[serde(default)]
    appearance: AppearanceConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            wpm: tables.pacing.wpm,
            chunk_size: tables.pacing.chunk_size,
            wide_chunk_size: tables.pacing.wide_chunk_size,
            wide_script_threshold: tables.pacing.wide_script_threshold,
            script_sample_chars: tables.pacing.script_sample_chars,
            wide_script_weight: tables.pacing.wide_script_weight,
            min_dwell_ms: tables.timing.min_dwell_ms,
            end_grace_ms: tables.timing.end_grace_ms,
            empty_page_grace_ms: tables.timing.empty_page_grace_ms,
            start_delay_ms: tables.timing.start_delay_ms,
            line_tolerance_px: tables.layout.line_tolerance_px,
            edge_tolerance_px: tables.layout.edge_tolerance_px,
            viewport_width: tables.layout.viewport_width,
            viewport_height: tables.layout.viewport_height,
            font_size: tables.appearance.font_size,
            line_spacing: tables.appearance.line_spacing,
            margin_horizontal: tables.appearance.margin_horizontal,
            margin_vertical: tables.appearance.margin_vertical,
            highlight: tables.appearance.highlight,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            pacing: PacingConfig {
                wpm: config.wpm,
                chunk_size: config.chunk_size,
                wide_chunk_size: config.wide_chunk_size,
                wide_script_threshold: config.wide_script_threshold,
                script_sample_chars: config.script_sample_chars,
                wide_script_weight: config.wide_script_weight,
            },
            timing: TimingConfig {
                min_dwell_ms: config.min_dwell_ms,
                end_grace_ms: config.end_grace_ms,
                empty_page_grace_ms: config.empty_page_grace_ms,
                start_delay_ms: config.start_delay_ms,
            },
            layout: LayoutConfig {
                line_tolerance_px: config.line_tolerance_px,
                edge_tolerance_px: config.edge_tolerance_px,
                viewport_width: config.viewport_width,
                viewport_height: config.viewport_height,
            },
            appearance: AppearanceConfig {
                font_size: config.font_size,
                line_spacing: config.line_spacing,
                margin_horizontal: config.margin_horizontal,
                margin_vertical: config.margin_vertical,
                highlight: config.highlight,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PacingConfig {
    #[serde(default = "defaults::default_wpm")]
    wpm: u32,
    #[serde(default = "defaults::default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "defaults::default_wide_chunk_size")]
    wide_chunk_size: usize,
    #[serde(default = "defaults::default_wide_script_threshold")]
    wide_script_threshold: f32,
    #[serde(default = "defaults::default_script_sample_chars")]
    script_sample_chars: usize,
    #[serde(default = "defaults::default_wide_script_weight")]
    wide_script_weight: f32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            wpm: defaults::default_wpm(),
            chunk_size: defaults::default_chunk_size(),
            wide_chunk_size: defaults::default_wide_chunk_size(),
            wide_script_threshold: defaults::default_wide_script_threshold(),
            script_sample_chars: defaults::default_script_sample_chars(),
            wide_script_weight: defaults::default_wide_script_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct TimingConfig {
    #[serde(default = "defaults::default_min_dwell_ms")]
    min_dwell_ms: u64,
    #[serde(default = "defaults::default_end_grace_ms")]
    end_grace_ms: u64,
    #[serde(default = "defaults::default_empty_page_grace_ms")]
    empty_page_grace_ms: u64,
    #[serde(default = "defaults::default_start_delay_ms")]
    start_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            min_dwell_ms: defaults::default_min_dwell_ms(),
            end_grace_ms: defaults::default_end_grace_ms(),
            empty_page_grace_ms: defaults::default_empty_page_grace_ms(),
            start_delay_ms: defaults::default_start_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LayoutConfig {
    #[serde(default = "defaults::default_line_tolerance_px")]
    line_tolerance_px: f32,
    #[serde(default = "defaults::default_edge_tolerance_px")]
    edge_tolerance_px: f32,
    #[serde(default = "defaults::default_viewport_width")]
    viewport_width: f32,
    #[serde(default = "defaults::default_viewport_height")]
    viewport_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            line_tolerance_px: defaults::default_line_tolerance_px(),
            edge_tolerance_px: defaults::default_edge_tolerance_px(),
            viewport_width: defaults::default_viewport_width(),
            viewport_height: defaults::default_viewport_height(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct AppearanceConfig {
    #[serde(default = "defaults::default_font_size")]
    font_size: f32,
    #[serde(default = "defaults::default_line_spacing")]
    line_spacing: f32,
    #[serde(default = "defaults::default_margin_horizontal")]
    margin_horizontal: f32,
    #[serde(default = "defaults::default_margin_vertical")]
    margin_vertical: f32,
    #[serde(default = "defaults::default_highlight")]
    highlight: HighlightColor,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        AppearanceConfig {
            font_size: defaults::default_font_size(),
            line_spacing: defaults::default_line_spacing(),
            margin_horizontal: defaults::default_margin_horizontal(),
            margin_vertical: defaults::default_margin_vertical(),
            highlight: defaults::default_highlight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
