//! Entry point for the terminal pacer.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments (one XHTML file per section).
//! - Load user configuration from `conf/config.toml`.
//! - Drive the pacing engine against the built-in paged renderer, printing
//!   each highlighted chunk as a JSON line.

use anyhow::{Context, Result, anyhow};
use lanternleaf_pacer::cache::{Bookmark, load_bookmark, save_bookmark};
use lanternleaf_pacer::config::load_config;
use lanternleaf_pacer::{FlowMetrics, PacerEvent, PacingEngine, PagedFlowRenderer, SharedSettings};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const MAX_IDLE: Duration = Duration::from_millis(50);

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let paths = parse_args()?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        sections = paths.len(),
        wpm = config.wpm,
        chunk_size = config.chunk_size,
        level = %config.log_level,
        "Starting pacer"
    );

    let sections = paths
        .iter()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read section {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let document = paths[0].clone();
    let bookmark = load_bookmark(&document).unwrap_or_default();
    if bookmark != Bookmark::default() {
        info!(
            section = bookmark.section,
            token_offset = bookmark.token_offset,
            "Resuming from bookmark"
        );
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    ctrlc::set_handler(move || stop_flag.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    let mut renderer =
        PagedFlowRenderer::new(sections, FlowMetrics::from(&config), bookmark.section);
    if bookmark.token_offset > 0 {
        renderer.seek_to_token(bookmark.token_offset, &config.pacing_settings());
    }
    let mut engine = PacingEngine::new(renderer, SharedSettings::from(&config));
    engine.set_resume_offset(bookmark.token_offset);
    engine.set_playing(true, Instant::now());

    let mut last = bookmark;
    let result = drive(&mut engine, &stop, &mut last);

    save_bookmark(&document, last);
    engine.shutdown();
    info!(
        section = last.section,
        token_offset = last.token_offset,
        "Pacer stopped"
    );
    result
}

fn drive(
    engine: &mut PacingEngine<PagedFlowRenderer, SharedSettings>,
    stop: &AtomicBool,
    last: &mut Bookmark,
) -> Result<()> {
    let stdout = io::stdout();
    while !stop.load(Ordering::SeqCst) {
        engine.renderer_mut().pump();
        let now = Instant::now();
        engine.poll(now);

        let events = engine.take_events();
        if !events.is_empty() {
            let mut out = stdout.lock();
            for event in &events {
                if matches!(event, PacerEvent::Highlighted { .. }) {
                    let line = serde_json::to_string(event)
                        .context("Failed to encode highlight event")?;
                    writeln!(out, "{line}").context("Failed to write to stdout")?;
                }
            }
            out.flush().context("Failed to flush stdout")?;
        }
        if let Some(token_offset) = engine.resume_token_offset() {
            *last = Bookmark {
                section: engine.renderer().section(),
                token_offset,
            };
        }

        if engine.renderer().is_at_end() {
            info!("End of document");
            *last = Bookmark::default();
            break;
        }

        let wait = engine
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(MAX_IDLE)
            .min(MAX_IDLE);
        std::thread::sleep(wait);
    }
    Ok(())
}

fn parse_args() -> Result<Vec<PathBuf>> {
    let paths: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        return Err(anyhow!(
            "Usage: lanternleaf-pacer <section.xhtml> [<section.xhtml>...]"
        ));
    }
    if let Some(missing) = paths.iter().find(|path| !path.exists()) {
        return Err(anyhow!("File not found: {}", missing.display()));
    }
    Ok(paths)
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
