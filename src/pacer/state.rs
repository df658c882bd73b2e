use serde::Serialize;

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacerPhase {
    #[default]
    Idle,
    /// Playing and waiting for the next tick.
    Armed,
    /// Computing and highlighting the next visible chunk.
    Advancing,
    /// A page turn is in flight; the turn lock is held.
    PageTurning,
}

/// Session-scoped cursor state. Rate and chunk size are not stored here:
/// they are read from the settings source on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PacerState {
    pub is_playing: bool,
    /// Next chunk to show on the current page. May equal the chunk count,
    /// meaning the page is finished.
    pub active_chunk_index: usize,
    /// Token offset that overrides the cursor once at the next arming.
    pub resume_offset: usize,
    /// Chunk currently carrying the highlight mark.
    pub highlighted: Option<usize>,
}

impl PacerState {
    /// Consume the resume offset, if any.
    pub(crate) fn take_resume_offset(&mut self) -> Option<usize> {
        let offset = std::mem::take(&mut self.resume_offset);
        (offset > 0).then_some(offset)
    }
}

/// Latch held from the moment a page turn is requested until the renderer
/// confirms the new page. While held, no chunk or token data may be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnLock {
    turning: bool,
}

impl TurnLock {
    pub fn acquire(&mut self) {
        self.turning = true;
    }

    /// Clear the latch, returning whether it was held.
    pub fn release(&mut self) -> bool {
        std::mem::take(&mut self.turning)
    }

    pub fn is_held(&self) -> bool {
        self.turning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_offset_is_consumed_once() {
        let mut state = PacerState {
            resume_offset: 7,
            ..PacerState::default()
        };
        assert_eq!(state.take_resume_offset(), Some(7));
        assert_eq!(state.take_resume_offset(), None);
        assert_eq!(state.resume_offset, 0);
    }

    #[test]
    fn turn_lock_release_reports_previous_state() {
        let mut lock = TurnLock::default();
        assert!(!lock.release());
        lock.acquire();
        assert!(lock.is_held());
        assert!(lock.release());
        assert!(!lock.is_held());
    }
}
