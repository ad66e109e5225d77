//! Node locator
//!
//! For one rendered block and the section it came from, find the annotation that belongs to
//! it. What "belongs" means depends on the kind of block:
//!
//! | Kind          | Where the annotation is                                        | Form       |
//! |---------------|----------------------------------------------------------------|------------|
//! | Preformatted  | the opening fence line (first line of the section)             | inline     |
//! | Table         | the block's last line if it was absorbed, else the line after  | standalone |
//! | MathBlock     | same as Table                                                  | standalone |
//! | Callout       | the block's last line                                          | standalone |
//! | Paragraph     | its whole text, when that is nothing but an annotation         | standalone |
//! | Generic       | anywhere in its own text (handled by the applier)              | inline     |
//!
//! GFM keeps reading a table or a paragraph until a blank line, so `{.striped}` written right
//! under a table ends up as an extra row, and `{.x}` right under display math ends up as a
//! lazy line of the same paragraph. In those cases the annotation is also removed from the
//! block's interior, together with the row or text it left empty.
//!
//! Code blocks are opaque to section reporting past the fence, so only the info string of an
//! opening ```` ``` ```` or `~~~` fence is read. Indented code blocks have no fence and never
//! carry an annotation. Edits to the fence line are picked up on the next full render, not
//! incrementally.
//!
//! Block containers (lists, list items, plain blockquotes) are not located themselves; their
//! child blocks are, one by one. See [`is_container`].

use crate::apply::{apply_annotations, inject_leading, ApplyReport};
use crate::dom;
use crate::grammar::{self, AnnotationText};
use crate::section::SectionInfo;
use markup5ever_rcdom::Handle;
use serde::Serialize;
use std::collections::HashMap;

/// Elements that are content even with no text inside.
const VOID_TAGS: &[&str] = &[
    "img", "br", "hr", "input", "video", "audio", "iframe", "embed", "source",
];

/// Blocks that hold other blocks.
const CONTAINER_TAGS: &[&str] = &["blockquote", "ul", "ol", "li", "div", "section", "details"];

/// The block kinds the locator distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Preformatted,
    Table,
    MathBlock,
    Callout,
    Paragraph,
    Generic,
}

impl NodeKind {
    pub fn classify(node: &Handle) -> Self {
        let Some(tag) = dom::tag_name(node) else {
            return NodeKind::Generic;
        };
        match &*tag {
            "pre" => NodeKind::Preformatted,
            "table" => NodeKind::Table,
            _ if is_display_math(node) || display_math_child(node).is_some() => {
                NodeKind::MathBlock
            }
            "blockquote" if is_callout_quote(node) => NodeKind::Callout,
            "div" if is_callout_div(node) => NodeKind::Callout,
            "p" => NodeKind::Paragraph,
            _ => NodeKind::Generic,
        }
    }
}

fn is_display_math(node: &Handle) -> bool {
    dom::get_attr(node, "data-math-style").as_deref() == Some("display")
        || dom::classes(node).iter().any(|c| c == "math-display")
}

/// A paragraph whose only element is a display math span.
fn display_math_child(node: &Handle) -> Option<Handle> {
    if !dom::is_tag(node, "p") {
        return None;
    }
    match dom::element_children(node).as_slice() {
        [only] if is_display_math(only) => Some(only.clone()),
        _ => None,
    }
}

/// Whether `node` is a generic block whose child blocks are located on their own.
///
/// Callouts are located as a whole and are never containers.
pub fn is_container(node: &Handle) -> bool {
    NodeKind::classify(node) == NodeKind::Generic
        && dom::tag_name(node).is_some_and(|tag| CONTAINER_TAGS.contains(&&*tag))
}

/// `> [!note] Title` style callouts.
fn is_callout_quote(node: &Handle) -> bool {
    dom::text_content(node).trim_start().starts_with("[!")
}

fn is_callout_div(node: &Handle) -> bool {
    dom::classes(node)
        .iter()
        .any(|c| c == "callout" || c == "markdown-alert")
}

/// Source lines already claimed in one render cycle, with the annotation text that claimed them.
///
/// Created once per document render and handed to every locate call, so a line bound to one
/// block is never applied to another in the same cycle.
#[derive(Debug, Clone, Default)]
pub struct AnnotationCache {
    claimed: HashMap<usize, String>,
}

impl AnnotationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `line` for `text`. Returns false if the same annotation already claimed it.
    pub fn claim(&mut self, line: usize, text: &str) -> bool {
        match self.claimed.get(&line) {
            Some(previous) if previous == text => false,
            _ => {
                self.claimed.insert(line, text.to_string());
                true
            }
        }
    }

    pub fn is_claimed(&self, line: usize) -> bool {
        self.claimed.contains_key(&line)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

/// What the locator found for a block.
#[derive(Debug, Clone)]
pub enum Located {
    /// Nothing to do; the caller must leave the node alone.
    NotFound,
    /// No line annotation, but the node's own text has inline annotations for the applier.
    Inline,
    /// The node was a bare annotation paragraph and has been detached from its parent.
    Detached { annotation: AnnotationText },
    /// The line's annotation was already consumed by another block in this cycle. A bare
    /// annotation paragraph on such a line is still detached.
    Duplicate { line: usize },
    /// An annotation for `target`, read from source `line`. The caller injects it as a
    /// leading fragment of `target` and runs the applier.
    Found {
        annotation: AnnotationText,
        target: Handle,
        line: usize,
    },
}

impl Located {
    /// Run the applier for what was found. Detached and duplicate blocks have nothing left
    /// to apply.
    pub fn apply(self, node: &Handle) -> ApplyReport {
        match self {
            Located::Inline => apply_annotations(node),
            Located::Found {
                annotation, target, ..
            } => {
                inject_leading(&target, &annotation);
                apply_annotations(node)
            }
            Located::NotFound | Located::Detached { .. } | Located::Duplicate { .. } => {
                ApplyReport::default()
            }
        }
    }
}

/// Find the annotation belonging to `node`, a direct child of `parent`.
pub fn locate(
    parent: &Handle,
    node: &Handle,
    section: &SectionInfo<'_>,
    cache: &mut AnnotationCache,
) -> Located {
    let kind = NodeKind::classify(node);
    tracing::trace!(?kind, line_start = section.line_start, line_end = section.line_end, "locating");

    match kind {
        NodeKind::Preformatted => locate_fence(node, section, cache),
        NodeKind::Table | NodeKind::MathBlock | NodeKind::Callout => {
            match locate_trailing(node, kind, section, cache) {
                Located::NotFound => inline_or_nothing(node),
                located => located,
            }
        }
        NodeKind::Paragraph => locate_paragraph(parent, node, section, cache),
        NodeKind::Generic => inline_or_nothing(node),
    }
}

fn inline_or_nothing(node: &Handle) -> Located {
    if grammar::is_inline(&dom::text_content(node)) {
        Located::Inline
    } else {
        Located::NotFound
    }
}

fn found(
    annotation: AnnotationText,
    target: Handle,
    line: usize,
    cache: &mut AnnotationCache,
) -> Located {
    if !cache.claim(line, annotation.as_str()) {
        return Located::Duplicate { line };
    }
    Located::Found {
        annotation,
        target,
        line,
    }
}

fn locate_fence(node: &Handle, section: &SectionInfo<'_>, cache: &mut AnnotationCache) -> Located {
    let Some(info) = section.first_line().and_then(fence_info) else {
        return Located::NotFound;
    };
    let Some(annotation) = grammar::find_inline(info) else {
        return Located::NotFound;
    };
    found(annotation, node.clone(), section.line_start, cache)
}

/// The info string of a line opening a code fence.
fn fence_info(line: &str) -> Option<&str> {
    let trimmed = strip_quote_markers(line);
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let info = trimmed.trim_start_matches(marker);
    (trimmed.len() - info.len() >= 3).then_some(info)
}

fn locate_trailing(
    node: &Handle,
    kind: NodeKind,
    section: &SectionInfo<'_>,
    cache: &mut AnnotationCache,
) -> Located {
    let target = match kind {
        NodeKind::MathBlock => display_math_child(node).unwrap_or_else(|| node.clone()),
        _ => node.clone(),
    };

    let absorbed = section
        .end_line()
        .map(strip_quote_markers)
        .and_then(grammar::find_standalone);
    if let Some(annotation) = absorbed {
        if section.line_end > section.line_start || kind == NodeKind::Callout {
            let located = found(annotation.clone(), target, section.line_end, cache);
            if matches!(located, Located::Found { .. }) {
                strip_trailing(node, annotation.as_str());
            }
            return located;
        }
    }

    if kind == NodeKind::Callout {
        return Located::NotFound;
    }

    match section.line_after().and_then(grammar::find_standalone) {
        Some(annotation) => found(annotation, target, section.line_end + 1, cache),
        None => Located::NotFound,
    }
}

fn locate_paragraph(
    parent: &Handle,
    node: &Handle,
    section: &SectionInfo<'_>,
    cache: &mut AnnotationCache,
) -> Located {
    if dom::has_element_children(node) {
        return inline_or_nothing(node);
    }
    let text = dom::text_content(node);
    let Some(annotation) = grammar::find_standalone(&text) else {
        return inline_or_nothing(node);
    };

    dom::remove_descendant(parent, node);
    if cache.is_claimed(section.line_start) {
        tracing::debug!(line = section.line_start, %annotation, "annotation paragraph already claimed");
        return Located::Duplicate {
            line: section.line_start,
        };
    }
    cache.claim(section.line_start, annotation.as_str());
    Located::Detached { annotation }
}

fn strip_quote_markers(line: &str) -> &str {
    line.trim_start_matches(|c: char| c == '>' || c.is_whitespace())
}

/// Remove `annotation` from the end of the last text in `node`, detaching whatever it leaves
/// empty. Returns whether the annotation was found.
fn strip_trailing(node: &Handle, annotation: &str) -> bool {
    let children: Vec<Handle> = node.children.borrow().clone();
    for child in children.iter().rev() {
        if let Some(text) = dom::text_of(child) {
            let trimmed = text.trim_end();
            if let Some(rest) = trimmed.strip_suffix(annotation) {
                let rest = rest.trim_end();
                if rest.is_empty() {
                    dom::remove_child(node, child);
                } else {
                    dom::set_text(child, rest);
                }
                return true;
            }
            if !trimmed.is_empty() {
                return false;
            }
        } else if dom::is_element(child) {
            if strip_trailing(child, annotation) {
                if is_blank(child) {
                    dom::remove_child(node, child);
                }
                return true;
            }
            if !is_blank(child) {
                return false;
            }
        }
    }
    false
}

/// An element with no visible content: only whitespace text and other blank elements.
fn is_blank(node: &Handle) -> bool {
    if let Some(text) = dom::text_of(node) {
        return text.trim().is_empty();
    }
    match dom::tag_name(node) {
        Some(tag) if VOID_TAGS.contains(&&*tag) => false,
        Some(_) => node.children.borrow().iter().all(is_blank),
        None => true,
    }
}
