//! Decides which chunk is inside a horizontally paginated viewport.
//!
//! There is no single authoritative scroll offset: depending on how the
//! renderer paginates, the offset shows up on the container, the body, the
//! document element, or the view. Sources are consulted in that order and a
//! zero value counts as absent.

use crate::chunker::Chunk;
use crate::renderer::{ScrollCandidate, ViewportGeometry};
use tracing::{debug, trace};

/// First non-zero candidate in priority order, else zero.
pub fn effective_scroll_offset(candidates: &[ScrollCandidate]) -> f32 {
    let mut ordered: Vec<&ScrollCandidate> = candidates.iter().collect();
    ordered.sort_by_key(|candidate| candidate.source);
    ordered
        .into_iter()
        .map(|candidate| candidate.offset)
        .find(|offset| offset.is_finite() && *offset != 0.0)
        .unwrap_or(0.0)
}

/// Visible horizontal range in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleWindow {
    pub left: f32,
    pub right: f32,
}

impl VisibleWindow {
    pub fn from_geometry(geometry: &ViewportGeometry) -> Self {
        let left = effective_scroll_offset(&geometry.candidates);
        Self {
            left,
            right: left + geometry.width.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    Visible,
    After,
}

/// Classify a chunk spanning `[left, right)` against `window`.
pub fn classify(left: f32, right: f32, window: VisibleWindow, edge_tolerance: f32) -> Placement {
    if right < window.left {
        Placement::Before
    } else if left >= window.right - edge_tolerance {
        Placement::After
    } else {
        Placement::Visible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The chunk at this index is on screen.
    Visible(usize),
    /// The chunk at this index lies past the right edge; turn forward.
    TurnForward(usize),
    /// Every remaining chunk was before the window or unmeasurable.
    Exhausted,
}

/// Scan forward from `*cursor` for the first chunk not before the window.
///
/// Chunks before the window and chunks that cannot be measured are skipped by
/// advancing `*cursor`, so repeated calls never rescan them. The cursor never
/// moves backward.
pub fn resolve(
    chunks: &[Chunk],
    cursor: &mut usize,
    window: VisibleWindow,
    edge_tolerance: f32,
) -> Resolution {
    while let Some(chunk) = chunks.get(*cursor) {
        let Some((left, right)) = chunk.extent() else {
            debug!(chunk_idx = *cursor, "Skipping chunk without measurable geometry");
            *cursor += 1;
            continue;
        };
        let placement = classify(left, right, window, edge_tolerance);
        trace!(
            chunk_idx = *cursor,
            left,
            right,
            visible_left = window.left,
            visible_right = window.right,
            ?placement,
            "Visibility check"
        );
        match placement {
            Placement::Before => *cursor += 1,
            Placement::After => return Resolution::TurnForward(*cursor),
            Placement::Visible => return Resolution::Visible(*cursor),
        }
    }
    Resolution::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{AtomicToken, build_chunks};
    use crate::markup::MarkupTree;
    use crate::renderer::OffsetSource;

    fn candidate(source: OffsetSource, offset: f32) -> ScrollCandidate {
        ScrollCandidate { source, offset }
    }

    /// One chunk per entry, at the given left offset (`None` = unmeasured).
    fn chunks_at(lefts: &[Option<f32>]) -> Vec<Chunk> {
        let node = MarkupTree::new(0).root();
        let tokens = lefts
            .iter()
            .enumerate()
            .map(|(ordinal, left)| AtomicToken {
                node,
                text: format!("w{ordinal}"),
                ordinal,
                line_top: None,
                left: *left,
                width: 40.0,
            })
            .collect();
        build_chunks(tokens, 1, 5.0)
    }

    #[test]
    fn effective_offset_takes_first_nonzero_in_priority_order() {
        let candidates = vec![
            candidate(OffsetSource::View, 300.0),
            candidate(OffsetSource::Body, 0.0),
            candidate(OffsetSource::DocumentElement, 200.0),
            candidate(OffsetSource::Container, 0.0),
        ];
        assert_eq!(effective_scroll_offset(&candidates), 200.0);
        assert_eq!(effective_scroll_offset(&[]), 0.0);
        assert_eq!(
            effective_scroll_offset(&[candidate(OffsetSource::Container, f32::NAN)]),
            0.0
        );
    }

    #[test]
    fn classify_uses_edge_tolerance() {
        let window = VisibleWindow {
            left: 800.0,
            right: 1600.0,
        };
        assert_eq!(classify(700.0, 790.0, window, 15.0), Placement::Before);
        assert_eq!(classify(760.0, 810.0, window, 15.0), Placement::Visible);
        assert_eq!(classify(1584.0, 1600.0, window, 15.0), Placement::Visible);
        assert_eq!(classify(1585.0, 1600.0, window, 15.0), Placement::After);
    }

    #[test]
    fn skips_chunks_before_window_and_advances_cursor() {
        let chunks = chunks_at(&[Some(40.0), Some(400.0), Some(840.0), Some(1200.0)]);
        let window = VisibleWindow {
            left: 800.0,
            right: 1600.0,
        };
        let mut cursor = 0;
        assert_eq!(resolve(&chunks, &mut cursor, window, 15.0), Resolution::Visible(2));
        assert_eq!(cursor, 2);
    }

    #[test]
    fn chunk_past_right_edge_requests_turn() {
        let chunks = chunks_at(&[Some(40.0), Some(820.0)]);
        let window = VisibleWindow {
            left: 0.0,
            right: 800.0,
        };
        let mut cursor = 1;
        assert_eq!(
            resolve(&chunks, &mut cursor, window, 15.0),
            Resolution::TurnForward(1)
        );
        assert_eq!(cursor, 1);
    }

    #[test]
    fn unmeasurable_chunks_are_skipped_and_exhaustion_reported() {
        let chunks = chunks_at(&[None, Some(100.0), None]);
        let window = VisibleWindow {
            left: 0.0,
            right: 800.0,
        };
        let mut cursor = 0;
        assert_eq!(resolve(&chunks, &mut cursor, window, 15.0), Resolution::Visible(1));
        cursor = 2;
        assert_eq!(resolve(&chunks, &mut cursor, window, 15.0), Resolution::Exhausted);
        assert_eq!(cursor, 3);
    }

    #[test]
    fn repeated_resolution_is_monotonic() {
        let chunks = chunks_at(&[Some(10.0), Some(820.0), Some(900.0), Some(1700.0)]);
        let window = VisibleWindow {
            left: 800.0,
            right: 1600.0,
        };
        let mut cursor = 0;
        let mut last = 0;
        for _ in 0..6 {
            let index = match resolve(&chunks, &mut cursor, window, 15.0) {
                Resolution::Visible(idx) => {
                    cursor = idx + 1;
                    idx
                }
                Resolution::TurnForward(idx) => idx,
                Resolution::Exhausted => cursor,
            };
            assert!(index >= last);
            last = index;
        }
        assert_eq!(last, 3);
    }
}
