//! Paginated renderer over a sequence of XHTML sections.
//!
//! Text is laid out on a fixed glyph grid and flowed into viewport-wide
//! columns placed side by side; each column is one page. Turning a page moves
//! the horizontal scroll offset by one viewport width, and running off the
//! last column loads the next section as a fresh content tree.
//!
//! Page transitions are queued and only take effect on `pump`, which is when
//! lifecycle events go out. Callers never observe a turn completing inside
//! `advance_next_page`.

use crate::config::{AppConfig, PacingSettings};
use crate::markup::{MarkupTree, NodeId, NodeKind};
use crate::renderer::{
    DocumentRenderer, LayoutBox, LifecycleEvent, ListenerId, ListenerSet, OffsetSource,
    ScrollCandidate, ViewportGeometry,
};
use crate::script::{is_wide_char, is_wide_script};
use crate::segmenter::{TARGET_CLASS, segment};
use crate::text_utils::{TextPiece, split_atomic};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

const BLOCK_TAGS: [&str; 16] = [
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "blockquote", "section",
    "article", "pre", "figure",
];
const HIDDEN_TAGS: [&str; 8] = [
    "script", "style", "title", "head", "noscript", "template", "rt", "rp",
];

/// Page geometry and type metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowMetrics {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub font_size: f32,
    pub line_spacing: f32,
    pub margin_horizontal: f32,
    pub margin_vertical: f32,
}

impl From<&AppConfig> for FlowMetrics {
    fn from(config: &AppConfig) -> Self {
        Self {
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            font_size: config.font_size,
            line_spacing: config.line_spacing,
            margin_horizontal: config.margin_horizontal,
            margin_vertical: config.margin_vertical,
        }
    }
}

impl FlowMetrics {
    fn line_height(&self) -> f32 {
        (self.font_size * self.line_spacing).max(1.0)
    }

    fn text_width(&self) -> f32 {
        (self.viewport_width - 2.0 * self.margin_horizontal).max(self.font_size)
    }

    fn lines_per_column(&self) -> usize {
        let usable = self.viewport_height - 2.0 * self.margin_vertical;
        ((usable / self.line_height()).floor() as usize).max(1)
    }

    fn glyph_width(&self, ch: char) -> f32 {
        if is_wide_char(ch) {
            self.font_size
        } else {
            self.font_size * 0.5
        }
    }

    fn run_width(&self, text: &str) -> f32 {
        text.chars().map(|ch| self.glyph_width(ch)).sum()
    }

    /// Absolute content position of `x` on grid line `line`.
    fn position(&self, line: usize, x: f32) -> (f32, f32) {
        let per_column = self.lines_per_column();
        let column = line / per_column;
        let left = column as f32 * self.viewport_width + self.margin_horizontal + x;
        let top = self.margin_vertical + (line % per_column) as f32 * self.line_height();
        (left, top)
    }

    fn column_of(&self, left: f32) -> usize {
        if self.viewport_width <= 0.0 {
            return 0;
        }
        (left / self.viewport_width).floor().max(0.0) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GlyphBox {
    left: f32,
    top: f32,
    width: f32,
}

#[derive(Debug, Default)]
struct FlowLayout {
    generation: u64,
    revision: u64,
    columns: usize,
    blocks: HashMap<NodeId, GlyphBox>,
    targets: HashMap<NodeId, GlyphBox>,
    owners: HashMap<NodeId, NodeId>,
}

impl FlowLayout {
    fn matches(&self, tree: &MarkupTree) -> bool {
        self.generation == tree.generation() && self.revision == tree.revision()
    }
}

struct LayoutPass<'a> {
    tree: &'a MarkupTree,
    metrics: &'a FlowMetrics,
    line: usize,
    x: f32,
    layout: FlowLayout,
}

impl<'a> LayoutPass<'a> {
    fn run(tree: &'a MarkupTree, metrics: &'a FlowMetrics) -> FlowLayout {
        let mut pass = LayoutPass {
            tree,
            metrics,
            line: 0,
            x: 0.0,
            layout: FlowLayout {
                generation: tree.generation(),
                revision: tree.revision(),
                ..FlowLayout::default()
            },
        };
        for child in tree.children(tree.root()) {
            pass.walk(*child, None);
        }
        let lines = if pass.x > 0.0 { pass.line + 1 } else { pass.line };
        pass.layout.columns = lines.div_ceil(metrics.lines_per_column()).max(1);
        pass.layout
    }

    fn walk(&mut self, node: NodeId, block: Option<NodeId>) {
        let tree = self.tree;
        match tree.kind(node) {
            Some(NodeKind::Text(text)) => self.flow_text(text),
            Some(NodeKind::Element(data)) => {
                let tag = data.tag.as_str();
                if HIDDEN_TAGS.contains(&tag) {
                    return;
                }
                if tag == "br" {
                    self.break_line();
                    return;
                }
                if tree.has_class(node, TARGET_CLASS) {
                    self.place_target(node, block);
                    return;
                }
                if BLOCK_TAGS.contains(&tag) {
                    self.break_line();
                    let (left, top) = self.metrics.position(self.line, 0.0);
                    self.layout.blocks.insert(
                        node,
                        GlyphBox {
                            left,
                            top,
                            width: self.metrics.text_width(),
                        },
                    );
                    for child in tree.children(node) {
                        self.walk(*child, Some(node));
                    }
                    self.break_line();
                } else {
                    for child in tree.children(node) {
                        self.walk(*child, block);
                    }
                }
            }
            None => {}
        }
    }

    fn break_line(&mut self) {
        if self.x > 0.0 {
            self.line += 1;
            self.x = 0.0;
        }
    }

    /// Reserve `width` on the current line, wrapping first if it does not fit.
    fn advance(&mut self, width: f32) -> (usize, f32) {
        if self.x > 0.0 && self.x + width > self.metrics.text_width() {
            self.line += 1;
            self.x = 0.0;
        }
        let start = (self.line, self.x);
        self.x += width;
        start
    }

    fn flow_text(&mut self, text: &str) {
        for piece in split_atomic(text, false) {
            match piece {
                TextPiece::Space(_) => {
                    if self.x > 0.0 {
                        self.x += self.metrics.glyph_width(' ');
                    }
                }
                TextPiece::Token(word) if word.chars().any(is_wide_char) => {
                    for ch in word.chars() {
                        self.advance(self.metrics.glyph_width(ch));
                    }
                }
                TextPiece::Token(word) => {
                    self.advance(self.metrics.run_width(&word));
                }
            }
        }
    }

    fn place_target(&mut self, node: NodeId, block: Option<NodeId>) {
        let width = self.metrics.run_width(&self.tree.text_content(node));
        let (line, x) = self.advance(width);
        let (left, top) = self.metrics.position(line, x);
        self.layout.targets.insert(node, GlyphBox { left, top, width });
        if let Some(block) = block {
            self.layout.owners.insert(node, block);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Transition {
    Next,
    Previous,
    Resize { width: f32, height: f32 },
}

/// One rule registered through `register_stylesheet_rule`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: String,
    pub declarations: Vec<(String, String)>,
}

impl StyleRule {
    pub fn to_css(&self) -> String {
        let body: Vec<String> = self
            .declarations
            .iter()
            .map(|(property, value)| format!("{property}: {value};"))
            .collect();
        format!("{} {{ {} }}", self.selector, body.join(" "))
    }
}

pub struct PagedFlowRenderer {
    sections: Vec<String>,
    section: usize,
    page: usize,
    generation: u64,
    tree: Option<MarkupTree>,
    metrics: FlowMetrics,
    layout: RefCell<Option<FlowLayout>>,
    pending: VecDeque<Transition>,
    listeners: ListenerSet,
    rules: Vec<StyleRule>,
    scroll_source: OffsetSource,
    at_end: bool,
}

impl PagedFlowRenderer {
    /// Open `sections` (HTML documents) at `start_section`. An empty list
    /// yields a renderer with no content.
    pub fn new(sections: Vec<String>, metrics: FlowMetrics, start_section: usize) -> Self {
        let mut renderer = Self {
            sections,
            section: 0,
            page: 0,
            generation: 0,
            tree: None,
            metrics,
            layout: RefCell::new(None),
            pending: VecDeque::new(),
            listeners: ListenerSet::default(),
            rules: Vec::new(),
            scroll_source: OffsetSource::Container,
            at_end: false,
        };
        if !renderer.sections.is_empty() {
            let start = start_section.min(renderer.sections.len() - 1);
            renderer.load_section(start);
        }
        renderer
    }

    /// Report the scroll offset under `source` instead of the container.
    pub fn with_scroll_source(mut self, source: OffsetSource) -> Self {
        self.scroll_source = source;
        self
    }

    pub fn section(&self) -> usize {
        self.section
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.with_layout(|layout, _| layout.columns).unwrap_or(0)
    }

    /// True once a forward turn was requested on the last page of the last
    /// section.
    pub fn is_at_end(&self) -> bool {
        self.at_end
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn stylesheet(&self) -> &[StyleRule] {
        &self.rules
    }

    /// Show the page holding the `ordinal`-th highlight target, segmenting
    /// the current tree first. Past-the-end ordinals go to the last target.
    pub fn seek_to_token(&mut self, ordinal: usize, settings: &PacingSettings) {
        let Some(tree) = self.tree.as_mut() else {
            return;
        };
        let sample = tree.text_content(tree.root());
        let wide_script = is_wide_script(
            &sample,
            settings.script_sample_chars,
            settings.wide_script_threshold,
        );
        let targets = segment(tree, wide_script, false).targets;
        let Some(node) = targets.get(ordinal).or(targets.last()).copied() else {
            return;
        };
        let page = self
            .with_layout(|layout, _| {
                layout
                    .targets
                    .get(&node)
                    .map(|glyph| self.metrics.column_of(glyph.left))
            })
            .flatten();
        if let Some(page) = page {
            debug!(ordinal, page, "Opened page holding bookmarked token");
            self.page = page;
        }
    }

    /// Apply queued transitions and emit their lifecycle events.
    pub fn pump(&mut self) {
        while let Some(transition) = self.pending.pop_front() {
            match transition {
                Transition::Next => self.turn_forward(),
                Transition::Previous => self.turn_back(),
                Transition::Resize { width, height } => self.apply_resize(width, height),
            }
        }
    }

    fn load_section(&mut self, index: usize) {
        self.generation += 1;
        let tree = MarkupTree::parse_html(&self.sections[index], self.generation);
        debug!(
            section = index,
            generation = self.generation,
            nodes = tree.len(),
            "Loaded section"
        );
        self.tree = Some(tree);
        self.section = index;
        self.page = 0;
        *self.layout.borrow_mut() = None;
    }

    fn emit_rendered(&mut self) {
        self.listeners.emit(LifecycleEvent::PageRendered {
            generation: self.generation,
        });
        self.emit_location();
    }

    fn emit_location(&mut self) {
        self.listeners.emit(LifecycleEvent::LocationChanged {
            generation: self.generation,
        });
    }

    fn turn_forward(&mut self) {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            info!(section = self.section, page = self.page, "Turned page");
            self.emit_location();
        } else if self.section + 1 < self.sections.len() {
            self.load_section(self.section + 1);
            info!(section = self.section, "Opened next section");
            self.emit_rendered();
        } else if !self.at_end {
            self.at_end = true;
            info!(section = self.section, page = self.page, "Reached end of book");
        }
    }

    fn turn_back(&mut self) {
        self.at_end = false;
        if self.page > 0 {
            self.page -= 1;
            info!(section = self.section, page = self.page, "Turned page back");
            self.emit_location();
        } else if self.section > 0 {
            self.load_section(self.section - 1);
            self.page = self.page_count().saturating_sub(1);
            info!(
                section = self.section,
                page = self.page,
                "Opened previous section"
            );
            self.emit_rendered();
        } else {
            debug!("Already at start of book");
        }
    }

    fn apply_resize(&mut self, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            warn!(width, height, "Ignoring resize to empty viewport");
            return;
        }
        let anchor = self.first_visible_target();
        self.metrics.viewport_width = width;
        self.metrics.viewport_height = height;
        *self.layout.borrow_mut() = None;
        let columns = self.page_count().max(1);
        let page = anchor
            .and_then(|node| {
                self.with_layout(|layout, _| {
                    layout
                        .targets
                        .get(&node)
                        .map(|glyph| self.metrics.column_of(glyph.left))
                })
                .flatten()
            })
            .unwrap_or(self.page);
        self.page = page.min(columns - 1);
        info!(width, height, page = self.page, "Reflowed after resize");
        self.emit_rendered();
    }

    fn first_visible_target(&self) -> Option<NodeId> {
        let tree = self.tree.as_ref()?;
        let targets = tree.find_by_class(TARGET_CLASS);
        self.with_layout(|layout, _| {
            targets.into_iter().find(|node| {
                layout
                    .targets
                    .get(node)
                    .is_some_and(|glyph| self.metrics.column_of(glyph.left) == self.page)
            })
        })
        .flatten()
    }

    fn with_layout<T>(&self, read: impl FnOnce(&FlowLayout, &MarkupTree) -> T) -> Option<T> {
        let tree = self.tree.as_ref()?;
        let mut cache = self.layout.borrow_mut();
        if cache.as_ref().is_none_or(|layout| !layout.matches(tree)) {
            *cache = Some(LayoutPass::run(tree, &self.metrics));
        }
        cache.as_ref().map(|layout| read(layout, tree))
    }
}

impl DocumentRenderer for PagedFlowRenderer {
    fn content_root(&self) -> Option<&MarkupTree> {
        self.tree.as_ref()
    }

    fn content_root_mut(&mut self) -> Option<&mut MarkupTree> {
        self.tree.as_mut()
    }

    fn measure(&self, node: NodeId) -> Option<LayoutBox> {
        let line_height = self.metrics.line_height();
        self.with_layout(|layout, tree| {
            let root = tree.root();
            if node == root {
                return Some(LayoutBox {
                    offset_left: 0.0,
                    offset_top: 0.0,
                    width: layout.columns as f32 * self.metrics.viewport_width,
                    height: self.metrics.viewport_height,
                    offset_parent: None,
                });
            }
            if let Some(block) = layout.blocks.get(&node) {
                return Some(LayoutBox {
                    offset_left: block.left,
                    offset_top: block.top,
                    width: block.width,
                    height: line_height,
                    offset_parent: Some(root),
                });
            }
            let glyph = layout.targets.get(&node)?;
            let (origin, parent) = layout
                .owners
                .get(&node)
                .and_then(|owner| layout.blocks.get(owner).map(|block| (*block, *owner)))
                .map(|(block, owner)| ((block.left, block.top), owner))
                .unwrap_or(((0.0, 0.0), root));
            Some(LayoutBox {
                offset_left: glyph.left - origin.0,
                offset_top: glyph.top - origin.1,
                width: glyph.width,
                height: line_height,
                offset_parent: Some(parent),
            })
        })
        .flatten()
    }

    fn viewport_geometry(&self) -> ViewportGeometry {
        let scroll = self.page as f32 * self.metrics.viewport_width;
        let candidates = [
            OffsetSource::Container,
            OffsetSource::Body,
            OffsetSource::DocumentElement,
            OffsetSource::View,
        ]
        .into_iter()
        .map(|source| ScrollCandidate {
            source,
            offset: if source == self.scroll_source {
                scroll
            } else {
                0.0
            },
        })
        .collect();
        ViewportGeometry {
            width: self.metrics.viewport_width,
            height: self.metrics.viewport_height,
            candidates,
        }
    }

    fn advance_next_page(&mut self) {
        self.pending.push_back(Transition::Next);
    }

    fn advance_previous_page(&mut self) {
        self.pending.push_back(Transition::Previous);
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.pending.push_back(Transition::Resize { width, height });
    }

    fn register_stylesheet_rule(&mut self, selector: &str, declarations: &[(&str, &str)]) {
        let rule = StyleRule {
            selector: selector.to_string(),
            declarations: declarations
                .iter()
                .map(|(property, value)| (property.to_string(), value.to_string()))
                .collect(),
        };
        match self.rules.iter_mut().find(|existing| existing.selector == selector) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    fn subscribe(&mut self, sink: Sender<LifecycleEvent>) -> ListenerId {
        self.listeners.add(sink)
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.remove(id);
    }
}
