pub(crate) fn default_wpm() -> u32 {
    250
}

pub(crate) fn default_chunk_size() -> usize {
    3
}

pub(crate) fn default_wide_chunk_size() -> usize {
    8
}

pub(crate) fn default_wide_script_threshold() -> f32 {
    0.3
}

pub(crate) fn default_script_sample_chars() -> usize {
    500
}

pub(crate) fn default_wide_script_weight() -> f32 {
    0.5
}

pub(crate) fn default_min_dwell_ms() -> u64 {
    160
}

pub(crate) fn default_line_tolerance_px() -> f32 {
    5.0
}

pub(crate) fn default_edge_tolerance_px() -> f32 {
    15.0
}

pub(crate) fn default_end_grace_ms() -> u64 {
    300
}

pub(crate) fn default_empty_page_grace_ms() -> u64 {
    500
}

pub(crate) fn default_start_delay_ms() -> u64 {
    350
}

pub(crate) fn default_highlight() -> crate::config::HighlightColor {
    crate::config::HighlightColor {
        r: 1.0,
        g: 0.0,
        b: 0.0,
        a: 0.1,
    }
}

pub(crate) fn default_viewport_width() -> f32 {
    800.0
}

pub(crate) fn default_viewport_height() -> f32 {
    600.0
}

pub(crate) fn default_font_size() -> f32 {
    16.0
}

pub(crate) fn default_line_spacing() -> f32 {
    1.5
}

pub(crate) fn default_margin_horizontal() -> f32 {
    40.0
}

pub(crate) fn default_margin_vertical() -> f32 {
    24.0
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
