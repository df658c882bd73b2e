//! Line-aware grouping of atomic tokens into fixation chunks.

use crate::markup::{MarkupTree, NodeId};
use crate::renderer::{LayoutBox, absolute_position};
use tracing::debug;

/// One highlight-addressable unit on the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicToken {
    pub node: NodeId,
    pub text: String,
    /// Position of the token among all tokens on the page.
    pub ordinal: usize,
    /// Absolute top of the token's line, `None` if it could not be measured.
    pub line_top: Option<f32>,
    /// Absolute horizontal offset within the content.
    pub left: Option<f32>,
    pub width: f32,
}

impl AtomicToken {
    pub fn is_measured(&self) -> bool {
        self.left.is_some()
    }
}

/// Non-empty run of tokens on one visual line.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    tokens: Vec<AtomicToken>,
}

impl Chunk {
    pub fn tokens(&self) -> &[AtomicToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.tokens.iter().any(|token| token.node == node)
    }

    pub fn first_ordinal(&self) -> usize {
        self.tokens.first().map(|token| token.ordinal).unwrap_or(0)
    }

    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Horizontal extent `(left, right)` of the measurable tokens.
    pub fn extent(&self) -> Option<(f32, f32)> {
        let mut measured = self
            .tokens
            .iter()
            .filter_map(|token| token.left.map(|left| (left, left + token.width)));
        let (left, mut right) = measured.next()?;
        for (_, token_right) in measured {
            right = right.max(token_right);
        }
        Some((left, right))
    }
}

/// Measure every target in document order.
pub fn measure_tokens(
    tree: &MarkupTree,
    targets: &[NodeId],
    measure: impl Fn(NodeId) -> Option<LayoutBox>,
) -> Vec<AtomicToken> {
    targets
        .iter()
        .enumerate()
        .map(|(ordinal, node)| {
            let layout = if tree.is_attached(*node) {
                measure(*node)
            } else {
                None
            };
            let position = layout.and_then(|_| absolute_position(&measure, *node));
            AtomicToken {
                node: *node,
                text: tree.text_content(*node),
                ordinal,
                line_top: position.map(|(_, top)| top),
                left: position.map(|(left, _)| left),
                width: layout.map(|l| l.width).unwrap_or(0.0),
            }
        })
        .collect()
}

/// Group tokens into chunks of at most `chunk_size`, breaking early whenever
/// the rounded line top moves by more than `line_tolerance` pixels.
/// Unmeasured tokens join the running chunk without affecting line tracking.
pub fn build_chunks(tokens: Vec<AtomicToken>, chunk_size: usize, line_tolerance: f32) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<AtomicToken> = Vec::new();
    let mut last_top: Option<f32> = None;

    for token in tokens {
        let top = token.line_top.map(f32::round);
        let is_new_line = match (last_top, top) {
            (Some(last), Some(top)) => (top - last).abs() > line_tolerance,
            _ => false,
        };
        if (current.len() >= chunk_size || is_new_line) && !current.is_empty() {
            chunks.push(Chunk {
                tokens: std::mem::take(&mut current),
            });
        }
        if top.is_some() {
            last_top = top;
        }
        current.push(token);
    }

    if !current.is_empty() {
        chunks.push(Chunk { tokens: current });
    }

    chunks
}

/// The chunk list of one rendered page.
#[derive(Debug, Clone)]
pub struct PageChunks {
    pub generation: u64,
    pub revision: u64,
    pub wide_script: bool,
    pub chunk_size: usize,
    chunks: Vec<Chunk>,
    token_count: usize,
}

impl PageChunks {
    pub fn new(
        generation: u64,
        revision: u64,
        wide_script: bool,
        chunk_size: usize,
        chunks: Vec<Chunk>,
    ) -> Self {
        let token_count = chunks.iter().map(Chunk::len).sum();
        Self {
            generation,
            revision,
            wide_script,
            chunk_size,
            chunks,
            token_count,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn get(&self, idx: usize) -> Option<&Chunk> {
        self.chunks.get(idx)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn is_current_for(&self, tree: &MarkupTree) -> bool {
        self.generation == tree.generation() && self.revision == tree.revision()
    }

    /// Index of the chunk holding the target `node`.
    pub fn chunk_containing(&self, node: NodeId) -> Option<usize> {
        self.chunks.iter().position(|chunk| chunk.contains(node))
    }

    /// Index of the chunk holding the token at `ordinal`; past-the-end
    /// ordinals map to the last chunk.
    pub fn chunk_for_token(&self, ordinal: usize) -> Option<usize> {
        if self.chunks.is_empty() {
            return None;
        }
        let found = self.chunks.iter().position(|chunk| {
            let first = chunk.first_ordinal();
            ordinal >= first && ordinal < first + chunk.len()
        });
        Some(found.unwrap_or(self.chunks.len() - 1))
    }

    /// Regroup the same tokens with a new chunk size. Returns the index of the
    /// chunk that now holds the first token of `previous_idx`.
    pub fn rechunk(&mut self, chunk_size: usize, line_tolerance: f32, previous_idx: usize) -> usize {
        let anchor = self.chunks.get(previous_idx).map(Chunk::first_ordinal);
        let tokens: Vec<AtomicToken> = std::mem::take(&mut self.chunks)
            .into_iter()
            .flat_map(|chunk| chunk.tokens)
            .collect();
        self.chunks = build_chunks(tokens, chunk_size, line_tolerance);
        self.chunk_size = chunk_size;
        let remapped = match anchor {
            Some(ordinal) => self.chunk_for_token(ordinal).unwrap_or(0),
            None => self.chunks.len(),
        };
        debug!(
            chunk_size,
            chunks = self.chunks.len(),
            previous_idx,
            remapped,
            "Rechunked page"
        );
        remapped
    }
}
