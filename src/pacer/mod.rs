//! Timed pacing loop and page-turn coordination.

mod engine;
mod state;
mod timer;


pub use engine::PacingEngine;
pub use state::{PacerPhase, PacerState, TurnLock};
pub use timer::{TimerKind, TimerQueue};

use crate::config::PacingSettings;
use serde::Serialize;
use std::time::Duration;

/// Notifications for a reading UI, drained with `PacingEngine::take_events`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum PacerEvent {
    /// A chunk was highlighted; `cursor` is the next chunk to show.
    Advanced {
        index: usize,
        cursor: usize,
        total: usize,
    },
    Highlighted {
        index: usize,
        text: String,
    },
    PageTurnRequested {
        grace_ms: u64,
    },
    PhaseChanged {
        phase: PacerPhase,
    },
}

/// Dwell time for a chunk of `token_count` tokens:
/// `max(token_count * weight / wpm * 60s, min_dwell)`, where the weight is the
/// wide-script weight for character-paced chunks and 1 otherwise.
pub fn dwell_time(token_count: usize, wide_script: bool, settings: &PacingSettings) -> Duration {
    let weight = if wide_script {
        f64::from(settings.wide_script_weight)
    } else {
        1.0
    };
    let wpm = f64::from(settings.wpm.max(1));
    let millis = token_count as f64 * weight * 60_000.0 / wpm;
    Duration::from_millis(millis.round() as u64).max(settings.min_dwell)
}
