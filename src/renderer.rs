//! Interface to the external document renderer.
//!
//! The renderer owns the content tree of the page it currently displays and
//! reports completion of every asynchronous page transition only through
//! lifecycle events.

use crate::markup::{MarkupTree, NodeId};
use serde::Serialize;
use std::sync::mpsc::Sender;
use tracing::trace;

/// Lifecycle notifications emitted by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum LifecycleEvent {
    /// A content tree was (re)rendered; previously handed out node ids are stale.
    PageRendered { generation: u64 },
    /// The visible location changed.
    LocationChanged { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Candidate sources for the viewport's horizontal scroll offset, in
/// priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetSource {
    Container,
    Body,
    DocumentElement,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollCandidate {
    pub source: OffsetSource,
    pub offset: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewportGeometry {
    pub width: f32,
    pub height: f32,
    pub candidates: Vec<ScrollCandidate>,
}

/// Offset-box geometry of one node, relative to its offset parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutBox {
    pub offset_left: f32,
    pub offset_top: f32,
    pub width: f32,
    pub height: f32,
    pub offset_parent: Option<NodeId>,
}

pub trait DocumentRenderer {
    /// The current page's content tree, or `None` before the first render.
    fn content_root(&self) -> Option<&MarkupTree>;
    fn content_root_mut(&mut self) -> Option<&mut MarkupTree>;
    /// Layout of `node` in the current tree, `None` if it cannot be measured.
    fn measure(&self, node: NodeId) -> Option<LayoutBox>;
    fn viewport_geometry(&self) -> ViewportGeometry;
    /// Request forward pagination. Completion is signalled by lifecycle events.
    fn advance_next_page(&mut self);
    fn advance_previous_page(&mut self);
    fn resize(&mut self, width: f32, height: f32);
    fn register_stylesheet_rule(&mut self, selector: &str, declarations: &[(&str, &str)]);
    fn subscribe(&mut self, sink: Sender<LifecycleEvent>) -> ListenerId;
    fn unsubscribe(&mut self, id: ListenerId);
}

/// Listener bookkeeping shared by renderer implementations.
#[derive(Debug, Default)]
pub struct ListenerSet {
    next_id: u64,
    listeners: Vec<(ListenerId, Sender<LifecycleEvent>)>,
}

impl ListenerSet {
    pub fn add(&mut self, sink: Sender<LifecycleEvent>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, sink));
        id
    }

    pub fn remove(&mut self, id: ListenerId) {
        self.listeners.retain(|(existing, _)| *existing != id);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener, dropping those whose receiver is gone.
    pub fn emit(&mut self, event: LifecycleEvent) {
        trace!(?event, listeners = self.listeners.len(), "Emitting lifecycle event");
        self.listeners.retain(|(_, sink)| sink.send(event).is_ok());
    }
}

const MAX_OFFSET_CHAIN: usize = 256;

/// Absolute (left, top) of `node` within the content, summing offsets along
/// the offset-parent chain. Viewport-relative coordinates are meaningless
/// under paginated transforms, so this is the only position the pacer uses.
pub fn absolute_position(
    measure: impl Fn(NodeId) -> Option<LayoutBox>,
    node: NodeId,
) -> Option<(f32, f32)> {
    let mut left = 0.0;
    let mut top = 0.0;
    let mut current = Some(node);
    let mut depth = 0;
    while let Some(id) = current {
        let layout = measure(id)?;
        left += layout.offset_left;
        top += layout.offset_top;
        current = layout.offset_parent;
        depth += 1;
        if depth > MAX_OFFSET_CHAIN {
            return None;
        }
    }
    Some((left, top))
}
