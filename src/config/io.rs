use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

/// Parse either the sectioned layout (`[pacing]`, `[timing]`, ...) or a flat
/// table of `AppConfig` fields.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let value: toml::Table = toml::from_str(contents).context("config is not valid TOML")?;
    let sectioned = ["pacing", "timing", "layout", "appearance", "logging"]
        .iter()
        .any(|key| value.get(*key).is_some_and(toml::Value::is_table));
    if sectioned {
        let tables: ConfigTables =
            toml::from_str(contents).context("failed to parse sectioned config")?;
        Ok(tables.into())
    } else {
        toml::from_str(contents).context("failed to parse flat config")
    }
}

/// Serialize using the sectioned layout.
pub fn serialize_config(config: &AppConfig) -> Result<String> {
    let tables = ConfigTables::from(config);
    toml::to_string_pretty(&tables).context("failed to serialize config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn flat_config_fills_missing_fields_with_defaults() {
        let cfg = parse_config("wpm = 400\nlog_level = \"info\"\n").expect("flat config parses");
        assert_eq!(cfg.wpm, 400);
        assert_eq!(cfg.chunk_size, 3);
        assert_eq!(cfg.min_dwell_ms, 160);
        assert_eq!(cfg.log_level, LogLevel::Info);
    }

    #[test]
    fn sectioned_config_maps_into_app_config() {
        let cfg = parse_config(
            "[pacing]\nchunk_size = 5\n\n[timing]\nend_grace_ms = 120\n\n[logging]\nlog_level = \"warn\"\n",
        )
        .expect("sectioned config parses");
        assert_eq!(cfg.chunk_size, 5);
        assert_eq!(cfg.end_grace_ms, 120);
        assert_eq!(cfg.wpm, 250);
        assert_eq!(cfg.log_level, LogLevel::Warn);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut cfg = AppConfig::default();
        cfg.wpm = 320;
        cfg.edge_tolerance_px = 10.0;
        let text = serialize_config(&cfg).expect("serialize");
        assert!(text.contains("[pacing]"));
        let parsed = parse_config(&text).expect("parse");
        assert_eq!(parsed.wpm, 320);
        assert!((parsed.edge_tolerance_px - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_config(Path::new("/nonexistent/lanternleaf-pacer.toml"));
        assert_eq!(cfg.wpm, 250);
    }
}
