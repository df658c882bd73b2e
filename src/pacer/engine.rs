use super::state::{PacerPhase, PacerState, TurnLock};
use super::timer::{TimerKind, TimerQueue};
use super::{PacerEvent, dwell_time};
use crate::chunker::{Chunk, PageChunks, build_chunks, measure_tokens};
use crate::config::{PacingSettings, SettingsSource};
use crate::markup::NodeId;
use crate::renderer::{DocumentRenderer, LifecycleEvent, ListenerId};
use crate::script::is_wide_script;
use crate::segmenter::{ACTIVE_CLASS, TARGET_CLASS, segment};
use crate::visibility::{Resolution, VisibleWindow, resolve};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Paces a highlight through the renderer's current page and turns pages
/// when the visible content is exhausted.
///
/// The engine is single-threaded and driven from outside: `poll` drains the
/// renderer's lifecycle events and fires due timers. All chunk and token data
/// is page-scoped and discarded on every lifecycle event; while a page turn
/// is in flight nothing reads it.
pub struct PacingEngine<R: DocumentRenderer, S: SettingsSource> {
    renderer: R,
    settings: S,
    state: PacerState,
    phase: PacerPhase,
    lock: TurnLock,
    page: Option<PageChunks>,
    force_segment: bool,
    pending_jump: Option<usize>,
    timers: TimerQueue,
    lifecycle: Receiver<LifecycleEvent>,
    listener: Option<ListenerId>,
    events: Vec<PacerEvent>,
}

impl<R: DocumentRenderer, S: SettingsSource> PacingEngine<R, S> {
    pub fn new(mut renderer: R, settings: S) -> Self {
        let (sink, lifecycle) = mpsc::channel();
        let listener = renderer.subscribe(sink);
        Self {
            renderer,
            settings,
            state: PacerState::default(),
            phase: PacerPhase::Idle,
            lock: TurnLock::default(),
            page: None,
            force_segment: false,
            pending_jump: None,
            timers: TimerQueue::default(),
            lifecycle,
            listener: Some(listener),
            events: Vec::new(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn state(&self) -> PacerState {
        self.state
    }

    pub fn phase(&self) -> PacerPhase {
        self.phase
    }

    pub fn is_turning(&self) -> bool {
        self.lock.is_held()
    }

    /// Chunks of the current page; empty while none are built.
    pub fn chunks(&self) -> &[Chunk] {
        self.page.as_ref().map(PageChunks::chunks).unwrap_or(&[])
    }

    pub fn page(&self) -> Option<&PageChunks> {
        self.page.as_ref()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn take_events(&mut self) -> Vec<PacerEvent> {
        std::mem::take(&mut self.events)
    }

    fn is_shut_down(&self) -> bool {
        self.listener.is_none()
    }

    pub fn set_playing(&mut self, playing: bool, now: Instant) {
        if self.is_shut_down() || playing == self.state.is_playing {
            return;
        }
        self.state.is_playing = playing;
        if playing {
            info!(cursor = self.state.active_chunk_index, "Pacer playing");
            if self.lock.is_held() {
                debug!("Play requested during page turn; arming once the renderer confirms");
                return;
            }
            self.arm(now);
        } else {
            info!(cursor = self.state.active_chunk_index, "Pacer paused");
            self.timers.cancel(TimerKind::Tick);
            if !self.lock.is_held() {
                self.set_phase(PacerPhase::Idle);
            }
        }
    }

    pub fn set_rate(&mut self, wpm: u32) {
        self.settings.set_wpm(wpm);
        info!(wpm = self.settings.current().wpm, "Adjusted pacing rate");
    }

    pub fn set_chunk_size(&mut self, size: usize) {
        self.settings.set_chunk_size(size);
        info!(
            chunk_size = self.settings.current().chunk_size,
            "Adjusted chunk size"
        );
    }

    /// Token offset to resume from the next time the page is paced.
    pub fn set_resume_offset(&mut self, token_offset: usize) {
        self.state.resume_offset = token_offset;
    }

    /// Token offset of the chunk on screen (or next up), for persistence.
    pub fn resume_token_offset(&self) -> Option<usize> {
        if self.state.resume_offset > 0 {
            return Some(self.state.resume_offset);
        }
        let page = self.page.as_ref()?;
        let idx = self
            .state
            .highlighted
            .unwrap_or(self.state.active_chunk_index);
        page.get(idx).map(Chunk::first_ordinal)
    }

    pub fn jump_to(&mut self, index: usize, now: Instant) {
        if self.lock.is_held() {
            debug!(index, "Deferring jump until the page turn completes");
            self.pending_jump = Some(index);
            return;
        }
        info!(index, "Jumping to chunk");
        self.state.active_chunk_index = index;
        self.state.resume_offset = 0;
        if self.state.is_playing && !self.is_shut_down() {
            self.timers.cancel(TimerKind::Tick);
            self.tick(now);
        }
    }

    pub fn reset_to_start(&mut self) {
        info!("Resetting pacer to page start");
        self.clear_highlight();
        self.state.active_chunk_index = 0;
        self.state.resume_offset = 0;
        self.pending_jump = None;
    }

    /// Jump to the chunk holding the clicked node (a target or anything
    /// inside one).
    pub fn click(&mut self, node: NodeId, now: Instant) {
        if self.lock.is_held() {
            debug!(%node, "Ignoring click while a page turn is in flight");
            return;
        }
        let target = self
            .renderer
            .content_root()
            .and_then(|tree| tree.closest_with_class(node, TARGET_CLASS));
        let Some(target) = target else {
            trace!(%node, "Click outside any highlight target");
            return;
        };
        if !self.prepare_page() {
            return;
        }
        let Some(idx) = self
            .page
            .as_ref()
            .and_then(|page| page.chunk_containing(target))
        else {
            debug!(%target, "Clicked target is not part of any chunk");
            return;
        };
        info!(chunk_idx = idx, "Jumping to clicked chunk");
        self.state.active_chunk_index = idx;
        self.state.resume_offset = 0;
        if self.state.is_playing {
            self.timers.cancel(TimerKind::Tick);
            self.tick(now);
        } else {
            self.highlight(idx);
        }
    }

    /// Drain lifecycle events, then fire every timer due at `now`.
    pub fn poll(&mut self, now: Instant) {
        if self.is_shut_down() {
            return;
        }
        let pending: Vec<LifecycleEvent> = self.lifecycle.try_iter().collect();
        for event in pending {
            self.handle_lifecycle(event, now);
        }
        while let Some(kind) = self.timers.pop_due(now) {
            match kind {
                TimerKind::Tick => self.tick(now),
                TimerKind::TurnPage => {
                    if self.lock.is_held() {
                        debug!("Grace delay elapsed; requesting next page");
                        self.renderer.advance_next_page();
                    }
                }
            }
        }
    }

    /// Cancel every timer and detach from the renderer.
    pub fn shutdown(&mut self) {
        self.timers.cancel_all();
        if let Some(listener) = self.listener.take() {
            self.renderer.unsubscribe(listener);
            info!("Pacer shut down");
        }
        self.state.is_playing = false;
        self.phase = PacerPhase::Idle;
    }

    fn handle_lifecycle(&mut self, event: LifecycleEvent, now: Instant) {
        match event {
            LifecycleEvent::PageRendered { generation } => {
                let was_turning = self.lock.release();
                self.invalidate_page();
                debug!(generation, was_turning, "Renderer rendered content");
                if was_turning {
                    self.resume_after_turn(now);
                }
            }
            LifecycleEvent::LocationChanged { generation } => {
                let was_turning = self.lock.release();
                self.invalidate_page();
                debug!(generation, was_turning, "Renderer location changed");
                self.resume_after_turn(now);
            }
        }
    }

    /// Drop page-scoped data. Marks left on a tree that survives the event
    /// are cleared so they match `state.highlighted`.
    fn invalidate_page(&mut self) {
        self.page = None;
        self.force_segment = true;
        self.clear_highlight();
    }

    fn resume_after_turn(&mut self, now: Instant) {
        self.state.active_chunk_index = 0;
        if self.state.is_playing {
            self.arm(now);
        } else {
            self.timers.cancel(TimerKind::Tick);
            self.set_phase(PacerPhase::Idle);
        }
    }

    fn arm(&mut self, now: Instant) {
        self.timers.cancel(TimerKind::Tick);
        if !self.prepare_page() {
            debug!("Renderer has no content yet; waiting for a lifecycle event");
            self.set_phase(PacerPhase::Armed);
            return;
        }
        let delay = self.settings.current().start_delay;
        self.timers.schedule(TimerKind::Tick, now + delay);
        self.set_phase(PacerPhase::Armed);
    }

    /// Segment and chunk the current page. Returns false if the renderer has
    /// no content yet.
    fn prepare_page(&mut self) -> bool {
        let settings = self.settings.current();
        let force = std::mem::take(&mut self.force_segment);
        let Some(tree) = self.renderer.content_root_mut() else {
            self.force_segment |= force;
            return false;
        };
        let sample = tree.text_content(tree.root());
        let wide_script = is_wide_script(
            &sample,
            settings.script_sample_chars,
            settings.wide_script_threshold,
        );
        let report = segment(tree, wide_script, force);

        let Some(tree) = self.renderer.content_root() else {
            return false;
        };
        let tokens = measure_tokens(tree, &report.targets, |node| self.renderer.measure(node));
        let chunk_size = settings.effective_chunk_size(wide_script);
        let chunks = build_chunks(tokens, chunk_size, settings.line_tolerance_px);
        let page = PageChunks::new(
            tree.generation(),
            tree.revision(),
            wide_script,
            chunk_size,
            chunks,
        );
        debug!(
            generation = page.generation,
            chunks = page.len(),
            tokens = page.token_count(),
            wide_script,
            chunk_size,
            "Prepared page"
        );
        self.state.active_chunk_index = self.state.active_chunk_index.min(page.len());
        self.page = Some(page);
        self.register_highlight_style(&settings);
        true
    }

    /// Make sure the chunk list matches the live tree and chunk size.
    fn ensure_page(&mut self, settings: &PacingSettings) -> bool {
        let current = match (self.renderer.content_root(), self.page.as_ref()) {
            (None, _) => return false,
            (Some(tree), Some(page)) => page.is_current_for(tree) && !self.force_segment,
            (Some(_), None) => false,
        };
        if !current {
            return self.prepare_page();
        }
        let Some(page) = self.page.as_mut() else {
            return false;
        };
        let wanted = settings.effective_chunk_size(page.wide_script);
        if wanted != page.chunk_size {
            let highlighted_first = self
                .state
                .highlighted
                .and_then(|idx| page.get(idx))
                .map(Chunk::first_ordinal);
            self.state.active_chunk_index =
                page.rechunk(wanted, settings.line_tolerance_px, self.state.active_chunk_index);
            self.state.highlighted = highlighted_first.and_then(|ord| page.chunk_for_token(ord));
        }
        true
    }

    fn register_highlight_style(&mut self, settings: &PacingSettings) {
        let background = settings.highlight.to_css();
        self.renderer.register_stylesheet_rule(
            &format!(".{ACTIVE_CLASS}"),
            &[
                ("border-bottom", "3px solid currentColor"),
                ("background-color", background.as_str()),
                ("text-decoration", "none"),
            ],
        );
        self.renderer
            .register_stylesheet_rule(&format!(".{TARGET_CLASS}"), &[("cursor", "pointer")]);
    }

    fn tick(&mut self, now: Instant) {
        if !self.state.is_playing {
            trace!("Tick while paused");
            return;
        }
        if self.lock.is_held() {
            trace!("Tick ignored while a page turn is in flight");
            return;
        }
        self.set_phase(PacerPhase::Advancing);
        let settings = self.settings.current();
        if !self.ensure_page(&settings) {
            debug!("No content to pace yet; waiting for a lifecycle event");
            self.set_phase(PacerPhase::Armed);
            return;
        }
        self.apply_pending_position();
        let Some(page) = self.page.as_ref() else {
            return;
        };

        let total = page.len();
        let cursor = self.state.active_chunk_index;
        if total == 0 || cursor >= total {
            let grace = if total == 0 {
                settings.empty_page_grace
            } else {
                settings.end_grace
            };
            info!(chunks = total, cursor, "End of page content; turning page");
            self.begin_turn(now, grace);
            return;
        }

        let window = VisibleWindow::from_geometry(&self.renderer.viewport_geometry());
        let mut cursor = cursor;
        let resolution = resolve(
            page.chunks(),
            &mut cursor,
            window,
            settings.edge_tolerance_px,
        );
        let wide_script = page.wide_script;
        self.state.active_chunk_index = cursor;

        match resolution {
            Resolution::Visible(idx) => {
                let token_count = page.get(idx).map(Chunk::len).unwrap_or(0);
                self.highlight(idx);
                self.state.active_chunk_index = idx + 1;
                let delay = dwell_time(token_count, wide_script, &settings);
                trace!(
                    chunk_idx = idx,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduled next chunk"
                );
                self.events.push(PacerEvent::Advanced {
                    index: idx,
                    cursor: idx + 1,
                    total,
                });
                self.timers.schedule(TimerKind::Tick, now + delay);
                self.set_phase(PacerPhase::Armed);
            }
            Resolution::TurnForward(idx) => {
                info!(chunk_idx = idx, "Next chunk is past the right edge; turning page");
                self.begin_turn(now, Duration::ZERO);
            }
            Resolution::Exhausted => {
                info!(cursor, "No visible chunk left; turning page");
                self.begin_turn(now, Duration::ZERO);
            }
        }
    }

    /// Apply a saved token offset, else a jump deferred during a turn.
    fn apply_pending_position(&mut self) {
        let Some(page) = self.page.as_ref() else {
            return;
        };
        if let Some(offset) = self.state.take_resume_offset() {
            if let Some(idx) = page.chunk_for_token(offset) {
                info!(token_offset = offset, chunk_idx = idx, "Resuming mid-page");
                self.state.active_chunk_index = idx;
            }
            self.pending_jump = None;
        } else if let Some(jump) = self.pending_jump.take() {
            debug!(index = jump, "Applying deferred jump");
            self.state.active_chunk_index = jump;
        }
    }

    fn begin_turn(&mut self, now: Instant, grace: Duration) {
        self.timers.cancel(TimerKind::Tick);
        self.lock.acquire();
        self.set_phase(PacerPhase::PageTurning);
        self.events.push(PacerEvent::PageTurnRequested {
            grace_ms: grace.as_millis() as u64,
        });
        if grace.is_zero() {
            self.renderer.advance_next_page();
        } else {
            self.timers.schedule(TimerKind::TurnPage, now + grace);
        }
    }

    fn highlight(&mut self, idx: usize) {
        self.clear_highlight();
        let Some(chunk) = self.page.as_ref().and_then(|page| page.get(idx)) else {
            return;
        };
        let Some(tree) = self.renderer.content_root_mut() else {
            return;
        };
        for token in chunk.tokens() {
            tree.add_class(token.node, ACTIVE_CLASS);
        }
        self.state.highlighted = Some(idx);
        self.events.push(PacerEvent::Highlighted {
            index: idx,
            text: chunk.text(),
        });
    }

    fn clear_highlight(&mut self) {
        if let Some(tree) = self.renderer.content_root_mut() {
            for node in tree.find_by_class(ACTIVE_CLASS) {
                tree.remove_class(node, ACTIVE_CLASS);
            }
        }
        self.state.highlighted = None;
    }

    fn set_phase(&mut self, phase: PacerPhase) {
        if self.phase != phase {
            trace!(from = ?self.phase, to = ?phase, "Pacer phase change");
            self.phase = phase;
            self.events.push(PacerEvent::PhaseChanged { phase });
        }
    }
}

impl<R: DocumentRenderer, S: SettingsSource> Drop for PacingEngine<R, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
