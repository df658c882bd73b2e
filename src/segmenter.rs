//! Wraps the rendered page's words in addressable highlight targets.
//!
//! Every eligible text node is replaced in place by one `span.pacer-word` per
//! atomic token, with the original whitespace kept as inert text between
//! them. Text inside ruby annotations, inside non-renderable elements, or
//! already inside a target is left alone, which also makes a second pass over
//! the same tree a no-op.

use crate::markup::{Fragment, MarkupError, MarkupTree, NodeId};
use crate::text_utils::{TextPiece, split_atomic};
use thiserror::Error;
use tracing::{debug, warn};

/// Class carried by every highlight target.
pub const TARGET_CLASS: &str = "pacer-word";
/// Class carried by the targets of the active chunk.
pub const ACTIVE_CLASS: &str = "pacer-active";
const TARGET_TAG: &str = "span";

const ANNOTATION_TAGS: [&str; 2] = ["rt", "rp"];
const NON_RENDERABLE_TAGS: [&str; 6] = ["script", "style", "title", "head", "noscript", "template"];

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("failed to wrap text node {node}: {source}")]
    Wrap {
        node: NodeId,
        #[source]
        source: MarkupError,
    },
}

/// Outcome of one segmentation pass.
#[derive(Debug, Clone, Default)]
pub struct SegmentReport {
    /// All targets on the page, in document order.
    pub targets: Vec<NodeId>,
    pub wrapped_nodes: usize,
    pub failed_nodes: usize,
    /// True when existing targets were reused without walking the tree.
    pub reused: bool,
}

/// Segment `tree`. Unless `force` is set, a tree that already has targets is
/// returned as-is.
pub fn segment(tree: &mut MarkupTree, wide_script: bool, force: bool) -> SegmentReport {
    segment_with(tree, wide_script, force, wrap_text_node)
}

/// Segmentation pass with the per-node wrap step supplied by the caller. A
/// node whose wrap fails is logged and left as plain text.
fn segment_with<W>(
    tree: &mut MarkupTree,
    wide_script: bool,
    force: bool,
    mut wrap: W,
) -> SegmentReport
where
    W: FnMut(&mut MarkupTree, NodeId, bool) -> Result<Vec<NodeId>, SegmentError>,
{
    if !force {
        let existing = tree.find_by_class(TARGET_CLASS);
        if !existing.is_empty() {
            debug!(
                generation = tree.generation(),
                targets = existing.len(),
                "Reusing existing highlight targets"
            );
            return SegmentReport {
                targets: existing,
                reused: true,
                ..SegmentReport::default()
            };
        }
    }

    let candidates: Vec<NodeId> = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|id| is_eligible(tree, *id))
        .collect();

    let mut report = SegmentReport::default();
    for node in candidates {
        match wrap(tree, node, wide_script) {
            Ok(_) => report.wrapped_nodes += 1,
            Err(err) => {
                report.failed_nodes += 1;
                warn!("Skipping text node during segmentation: {err}");
            }
        }
    }
    report.targets = tree.find_by_class(TARGET_CLASS);
    debug!(
        generation = tree.generation(),
        wrapped = report.wrapped_nodes,
        failed = report.failed_nodes,
        targets = report.targets.len(),
        wide_script,
        "Segmented page"
    );
    report
}

fn is_eligible(tree: &MarkupTree, node: NodeId) -> bool {
    let Some(text) = tree.text(node) else {
        return false;
    };
    if text.trim().is_empty() {
        return false;
    }
    !tree.ancestors(node).any(|ancestor| {
        tree.has_class(ancestor, TARGET_CLASS)
            || tree.tag(ancestor).is_some_and(|tag| {
                ANNOTATION_TAGS.contains(&tag) || NON_RENDERABLE_TAGS.contains(&tag)
            })
    })
}

fn wrap_text_node(
    tree: &mut MarkupTree,
    node: NodeId,
    wide_script: bool,
) -> Result<Vec<NodeId>, SegmentError> {
    let text = tree
        .text(node)
        .ok_or(SegmentError::Wrap {
            node,
            source: MarkupError::NotText(node),
        })?
        .to_string();
    let fragments = split_atomic(&text, wide_script)
        .into_iter()
        .map(|piece| match piece {
            TextPiece::Token(token) => Fragment::Element {
                tag: TARGET_TAG.to_string(),
                classes: vec![TARGET_CLASS.to_string()],
                text: token,
            },
            TextPiece::Space(space) => Fragment::Text(space),
        })
        .collect();
    tree.replace_text(node, fragments)
        .map_err(|source| SegmentError::Wrap { node, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_text(tree: &MarkupTree, targets: &[NodeId]) -> String {
        targets.iter().map(|id| tree.text_content(*id)).collect()
    }

    fn non_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn wraps_words_and_preserves_page_text() {
        let mut tree = MarkupTree::parse_html(
            "<body><p>The quick  brown fox.</p><p>It <em>jumped</em> over.</p></body>",
            1,
        );
        let original = tree.text_content(tree.root());

        let report = segment(&mut tree, false, false);

        assert_eq!(report.targets.len(), 7);
        assert_eq!(report.failed_nodes, 0);
        assert_eq!(tree.text_content(tree.root()), original);
        assert_eq!(
            tokens_text(&tree, &report.targets),
            non_whitespace(&original)
        );
        assert_eq!(tree.text_content(report.targets[3]), "fox.");
    }

    #[test]
    fn wide_script_wraps_each_character() {
        let mut tree = MarkupTree::parse_html("<body><p>吾輩は 猫</p></body>", 1);
        let report = segment(&mut tree, true, false);
        let texts: Vec<String> = report
            .targets
            .iter()
            .map(|id| tree.text_content(*id))
            .collect();
        assert_eq!(texts, vec!["吾", "輩", "は", "猫"]);
    }

    #[test]
    fn skips_ruby_annotations_and_non_renderable_elements() {
        let mut tree = MarkupTree::parse_html(
            "<body><p><ruby>漢<rt>kan</rt></ruby> word</p><style>p { x: y }</style><script>var a;</script></body>",
            1,
        );
        let report = segment(&mut tree, false, false);
        let texts: Vec<String> = report
            .targets
            .iter()
            .map(|id| tree.text_content(*id))
            .collect();
        assert_eq!(texts, vec!["漢", "word"]);
    }

    #[test]
    fn second_pass_reuses_targets_and_forced_pass_is_stable() {
        let mut tree = MarkupTree::parse_html("<body><p>one two three</p></body>", 1);
        let first = segment(&mut tree, false, false);
        let revision = tree.revision();

        let second = segment(&mut tree, false, false);
        assert!(second.reused);
        assert_eq!(second.targets, first.targets);
        assert_eq!(tree.revision(), revision);

        let forced = segment(&mut tree, false, true);
        assert!(!forced.reused);
        assert_eq!(forced.wrapped_nodes, 0);
        assert_eq!(forced.targets, first.targets);
    }

    #[test]
    fn failed_node_is_skipped_and_others_still_wrap() {
        let mut tree =
            MarkupTree::parse_html("<body><p>alpha beta</p><p>gamma</p><p>delta</p></body>", 1);
        let original = tree.text_content(tree.root());
        let failing = tree
            .descendants(tree.root())
            .into_iter()
            .find(|id| tree.text(*id) == Some("gamma"))
            .expect("gamma text node");

        let report = segment_with(&mut tree, false, false, |tree, node, wide_script| {
            if node == failing {
                return Err(SegmentError::Wrap {
                    node,
                    source: MarkupError::NotText(node),
                });
            }
            wrap_text_node(tree, node, wide_script)
        });

        assert_eq!(report.failed_nodes, 1);
        assert_eq!(report.wrapped_nodes, 2);
        assert_eq!(tokens_text(&tree, &report.targets), "alphabetadelta");
        assert_eq!(tree.text_content(tree.root()), original);
    }

    #[test]
    fn whitespace_only_page_yields_no_targets() {
        let mut tree = MarkupTree::parse_html("<body><p>   </p>\n</body>", 1);
        let report = segment(&mut tree, false, false);
        assert!(report.targets.is_empty());
    }
}
