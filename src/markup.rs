//! Generic markup tree for one rendered page.
//!
//! Nodes live in an arena and are addressed by `NodeId`. Replaced nodes stay
//! in the arena but are detached, so a stale id can be detected instead of
//! silently pointing at new content. Every tree carries the render
//! `generation` it was produced for and a `revision` that changes whenever its
//! structure is mutated (class changes do not count).

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use thiserror::Error;

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("node {0} does not exist in this tree")]
    UnknownNode(NodeId),
    #[error("node {0} is detached from the tree")]
    Detached(NodeId),
    #[error("node {0} is not a text node")]
    NotText(NodeId),
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

/// Replacement content for a text node.
#[derive(Debug, Clone)]
pub enum Fragment {
    /// An element with a single text child.
    Element {
        tag: String,
        classes: Vec<String>,
        text: String,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeEntry {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct MarkupTree {
    nodes: Vec<NodeEntry>,
    root: NodeId,
    generation: u64,
    revision: u64,
}

impl MarkupTree {
    /// Empty tree with a `body` root.
    pub fn new(generation: u64) -> Self {
        Self {
            nodes: vec![NodeEntry {
                kind: NodeKind::Element(ElementData {
                    tag: "body".to_string(),
                    classes: Vec::new(),
                }),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            generation,
            revision: 0,
        }
    }

    /// Import the `<body>` of an HTML/XHTML document.
    pub fn parse_html(source: &str, generation: u64) -> Self {
        let document = Html::parse_document(source);
        let mut tree = Self::new(generation);
        let body = document
            .select(&BODY_SELECTOR)
            .next()
            .unwrap_or_else(|| document.root_element());
        let root = tree.root;
        tree.import(root, body);
        tree
    }

    fn import(&mut self, parent: NodeId, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                let value = child_element.value();
                let classes = value.classes().map(str::to_string).collect();
                let id = self.append_element(parent, value.name(), classes);
                self.import(id, child_element);
            } else if let scraper::Node::Text(text) = child.value() {
                self.append_text(parent, &**text);
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[self.root.0].children.is_empty()
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str, classes: Vec<String>) -> NodeId {
        self.push_child(
            parent,
            NodeKind::Element(ElementData {
                tag: tag.to_ascii_lowercase(),
                classes,
            }),
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push_child(parent, NodeKind::Text(text.to_string()))
    }

    fn push_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(entry) = self.nodes.get_mut(parent.0) {
            entry.children.push(id);
        }
        self.revision += 1;
        id
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|entry| &entry.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|entry| entry.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element(data) => Some(data.tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element(_) => None,
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        matches!(
            self.kind(id),
            Some(NodeKind::Element(data)) if data.classes.iter().any(|c| c == class)
        )
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(NodeKind::Element(data)) = self.nodes.get_mut(id.0).map(|e| &mut e.kind) {
            if !data.classes.iter().any(|c| c == class) {
                data.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(NodeKind::Element(data)) = self.nodes.get_mut(id.0).map(|e| &mut e.kind) {
            data.classes.retain(|c| c != class);
        }
    }

    /// True when the node can still be reached from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if id.0 >= self.nodes.len() {
            return false;
        }
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Attached ancestors of `id`, nearest first (excluding `id`).
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Nearest element at or above `id` carrying `class`.
    pub fn closest_with_class(&self, id: NodeId, class: &str) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|candidate| self.has_class(*candidate, class))
    }

    /// All attached nodes under `id` in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Elements carrying `class`, in document order.
    pub fn find_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// Replace a text node with `fragments`, in place. Returns the ids of the
    /// elements created, in order. The replaced node becomes detached.
    pub fn replace_text(
        &mut self,
        id: NodeId,
        fragments: Vec<Fragment>,
    ) -> Result<Vec<NodeId>, MarkupError> {
        let entry = self.nodes.get(id.0).ok_or(MarkupError::UnknownNode(id))?;
        if !matches!(entry.kind, NodeKind::Text(_)) {
            return Err(MarkupError::NotText(id));
        }
        let parent = entry.parent.ok_or(MarkupError::Detached(id))?;
        let position = self
            .children(parent)
            .iter()
            .position(|child| *child == id)
            .ok_or(MarkupError::Detached(id))?;

        let mut replacement = Vec::with_capacity(fragments.len());
        let mut elements = Vec::new();
        for fragment in fragments {
            let new_id = NodeId(self.nodes.len());
            match fragment {
                Fragment::Text(text) => {
                    self.nodes.push(NodeEntry {
                        kind: NodeKind::Text(text),
                        parent: Some(parent),
                        children: Vec::new(),
                    });
                }
                Fragment::Element { tag, classes, text } => {
                    let text_id = NodeId(new_id.0 + 1);
                    self.nodes.push(NodeEntry {
                        kind: NodeKind::Element(ElementData { tag, classes }),
                        parent: Some(parent),
                        children: vec![text_id],
                    });
                    self.nodes.push(NodeEntry {
                        kind: NodeKind::Text(text),
                        parent: Some(new_id),
                        children: Vec::new(),
                    });
                    elements.push(new_id);
                }
            }
            replacement.push(new_id);
        }

        self.nodes[parent.0]
            .children
            .splice(position..=position, replacement);
        self.nodes[id.0].parent = None;
        self.revision += 1;
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_body_children_in_document_order() {
        let tree = MarkupTree::parse_html(
            "<html><head><title>T</title></head><body><p class=\"a b\">Hello <em>big</em> world</p></body></html>",
            1,
        );
        assert_eq!(tree.generation(), 1);
        let p = tree.children(tree.root())[0];
        assert_eq!(tree.tag(p), Some("p"));
        assert!(tree.has_class(p, "b"));
        assert_eq!(tree.text_content(tree.root()), "Hello big world");
    }

    #[test]
    fn replace_text_splices_fragments_and_detaches_original() {
        let mut tree = MarkupTree::new(0);
        let p = tree.append_element(tree.root(), "p", Vec::new());
        let text = tree.append_text(p, "one two");
        let before = tree.revision();

        let spans = tree
            .replace_text(
                text,
                vec![
                    Fragment::Element {
                        tag: "span".to_string(),
                        classes: vec!["w".to_string()],
                        text: "one".to_string(),
                    },
                    Fragment::Text(" ".to_string()),
                    Fragment::Element {
                        tag: "span".to_string(),
                        classes: vec!["w".to_string()],
                        text: "two".to_string(),
                    },
                ],
            )
            .expect("text node replaced");

        assert_eq!(spans.len(), 2);
        assert!(!tree.is_attached(text));
        assert!(tree.is_attached(spans[1]));
        assert_eq!(tree.children(p).len(), 3);
        assert_eq!(tree.text_content(p), "one two");
        assert_eq!(tree.find_by_class("w"), spans);
        assert!(tree.revision() > before);
        assert_eq!(
            tree.replace_text(text, Vec::new()),
            Err(MarkupError::Detached(text))
        );
    }

    #[test]
    fn closest_with_class_walks_ancestors() {
        let mut tree = MarkupTree::new(0);
        let span = tree.append_element(tree.root(), "span", vec!["pick".to_string()]);
        let text = tree.append_text(span, "x");
        assert_eq!(tree.closest_with_class(text, "pick"), Some(span));
        assert_eq!(tree.closest_with_class(text, "other"), None);
    }
}
