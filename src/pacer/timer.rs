use std::time::Instant;

/// What a pending timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Advance to the next chunk.
    Tick,
    /// Hand a requested page turn to the renderer after the grace delay.
    TurnPage,
}

#[derive(Debug)]
struct PendingTimer {
    deadline: Instant,
    seq: u64,
    kind: TimerKind,
}

/// One-shot timers driven by an externally supplied clock.
/// At most one timer of each kind is pending; scheduling replaces it.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<PendingTimer>,
    seq: u64,
}

impl TimerQueue {
    pub fn schedule(&mut self, kind: TimerKind, deadline: Instant) {
        self.cancel(kind);
        self.seq += 1;
        self.timers.push(PendingTimer {
            deadline,
            seq: self.seq,
            kind,
        });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.timers.retain(|timer| timer.kind != kind);
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|timer| timer.deadline).min()
    }

    /// Remove and return the earliest timer due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKind> {
        let (position, _) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.deadline <= now)
            .min_by_key(|(_, timer)| (timer.deadline, timer.seq))?;
        Some(self.timers.remove(position).kind)
    }
}
