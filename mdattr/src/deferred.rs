//! Deferred block reconciler
//!
//! A fenced block tagged with the deferred language (` ```mdattr ` by default) holds a whole
//! Markdown sub-document. Instead of locating annotations block by block, the sub-document
//! goes through three stages:
//!
//! 1. Parse: every line carrying annotations becomes a [`ParsedItem`], keyed by the literal
//!    line. No rendered tree is involved.
//! 2. Render: the raw sub-document is rendered into a detached container, and every element
//!    with a source position is tagged with a marker attribute holding its source lines.
//! 3. Reconcile: each item is matched against the innermost tagged elements whose marker
//!    contains its literal line. Tables, math blocks, callouts and code blocks match as a
//!    whole, never through their rows or spans. Each match then goes through the same
//!    per-kind locator as a top-level block, so absorbed rows are stripped and math
//!    annotations land on the math span.
//!
//! The result is wrapped in a container element and grafted in place of the fenced block.
//! Items that match nothing are dropped and counted in the [`DeferredReport`]. A renderer that
//! writes no source positions simply produces no matches.

use crate::apply::{apply_annotations, inject_leading};
use crate::dom;
use crate::error::RenderError;
use crate::grammar::{self, AnnotationText};
use crate::locate::{locate, AnnotationCache, Located, NodeKind};
use crate::parser::{parse_annotation, AttributeList};
use crate::render::Renderer;
use crate::section::{parse_sourcepos, SectionInfo, SOURCEPOS_ATTR};
use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

pub const DEFAULT_FENCE_LANGUAGE: &str = "mdattr";
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "data-mdattr-source";
pub const DEFAULT_WRAPPER_CLASS: &str = "mdattr-deferred";

/// How a marker line is compared with a parsed item's literal line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    #[default]
    Exact,
    /// Runs of whitespace compare equal, leading and trailing whitespace is ignored
    NormalizedWhitespace,
}

impl MatchMode {
    pub fn matches(self, candidate: &str, literal: &str) -> bool {
        match self {
            MatchMode::Exact => candidate == literal,
            MatchMode::NormalizedWhitespace => candidate
                .split_whitespace()
                .eq(literal.split_whitespace()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredOptions {
    /// Fence info string that selects the deferred path
    pub fence_language: String,
    /// Attribute carrying the original source lines during reconciliation
    pub marker_attribute: String,
    pub match_mode: MatchMode,
    /// Leave marker attributes in the output
    pub keep_markers: bool,
    /// Class of the element wrapping the grafted subtree
    pub wrapper_class: String,
}

impl Default for DeferredOptions {
    fn default() -> Self {
        Self {
            fence_language: DEFAULT_FENCE_LANGUAGE.to_string(),
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
            match_mode: MatchMode::default(),
            keep_markers: false,
            wrapper_class: DEFAULT_WRAPPER_CLASS.to_string(),
        }
    }
}

/// One annotated line of a deferred sub-document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    /// The line exactly as written, annotations included
    pub literal: String,
    pub annotations: Vec<AnnotationText>,
    /// Attributes of all annotations on the line, in order
    pub attributes: AttributeList,
    /// 0-based line inside the sub-document
    pub line: usize,
}

/// What one deferred block reconciliation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeferredReport {
    pub parsed: usize,
    pub matched: usize,
    pub dropped: usize,
}

/// Whether `node` is a fenced block tagged for the deferred path.
pub fn is_deferred_block(node: &Handle, options: &DeferredOptions) -> bool {
    if !dom::is_tag(node, "pre") {
        return false;
    }
    let language = format!("language-{}", options.fence_language);
    dom::element_children(node)
        .iter()
        .any(|child| dom::is_tag(child, "code") && dom::classes(child).contains(&language))
}

/// Collect every annotated line of a sub-document.
///
/// Lines inside nested fenced code blocks are skipped; the opening fence line itself is kept,
/// since that is where a code block's annotation goes.
pub fn parse_sub_document(source: &str) -> Vec<ParsedItem> {
    let mut items = Vec::new();
    let mut open_fence: Option<Fence> = None;

    for (line, text) in source.lines().enumerate() {
        if let Some(fence) = open_fence {
            if fence.is_closed_by(text) {
                open_fence = None;
            }
            continue;
        }

        let annotations = grammar::find_all(text);
        if !annotations.is_empty() {
            let mut attributes = AttributeList::new();
            for annotation in &annotations {
                let parsed = parse_annotation(annotation.as_str());
                attributes.extend(parsed.attributes);
            }
            items.push(ParsedItem {
                literal: text.to_string(),
                annotations,
                attributes,
                line,
            });
        }

        open_fence = Fence::opened_by(text);
    }

    items
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn opened_by(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        (len >= 3).then_some(Fence { marker, len })
    }

    fn is_closed_by(self, line: &str) -> bool {
        let trimmed = line.trim();
        let len = trimmed.chars().take_while(|c| *c == self.marker).count();
        len >= self.len && trimmed.chars().all(|c| c == self.marker)
    }
}

/// Render `source`, reconcile its annotations, and return the wrapper to graft in place of
/// the deferred block.
pub fn reconcile(
    source: &str,
    renderer: &dyn Renderer,
    options: &DeferredOptions,
    context_path: &str,
) -> Result<(Handle, DeferredReport), RenderError> {
    let items = parse_sub_document(source);

    let wrapper = dom::create_element("div", vec![("class", options.wrapper_class.as_str())]);
    renderer.render(source, &wrapper, context_path)?;
    tag_source_lines(&wrapper, source, &options.marker_attribute);

    let mut report = DeferredReport {
        parsed: items.len(),
        ..DeferredReport::default()
    };
    let mut cache = AnnotationCache::new();

    for item in &items {
        let targets = matching_nodes(&wrapper, item, options);
        if targets.is_empty() {
            tracing::debug!(line = item.line, literal = %item.literal, "deferred annotation matched nothing");
            report.dropped += 1;
            continue;
        }
        report.matched += 1;
        for (parent, target) in &targets {
            apply_item(parent, target, item, source, &mut cache);
        }
    }

    if !options.keep_markers {
        dom::for_each_element(&wrapper, &mut |node| {
            dom::remove_attr(node, &options.marker_attribute)
        });
    }

    tracing::debug!(
        parsed = report.parsed,
        matched = report.matched,
        dropped = report.dropped,
        context_path,
        "reconciled deferred block"
    );
    Ok((wrapper, report))
}

/// Write each positioned element's source lines into `marker`, one per line.
fn tag_source_lines(root: &Handle, source: &str, marker: &str) {
    dom::for_each_element(root, &mut |node| {
        let Some((start, end)) = dom::get_attr(node, SOURCEPOS_ATTR)
            .as_deref()
            .and_then(parse_sourcepos)
        else {
            return;
        };
        let lines = SectionInfo::new(start, end, source).lines().join("\n");
        dom::set_attr(node, marker, &lines);
    });
}

/// Innermost tagged elements whose marker holds the item's literal line, with their parents.
fn matching_nodes(
    root: &Handle,
    item: &ParsedItem,
    options: &DeferredOptions,
) -> Vec<(Handle, Handle)> {
    let mut candidates = Vec::new();
    collect_matches(root, item, options, &mut candidates);

    candidates
        .iter()
        .filter(|(_, node)| {
            !candidates
                .iter()
                .any(|(_, other)| !Rc::ptr_eq(node, other) && contains(node, other))
        })
        .cloned()
        .collect()
}

fn collect_matches(
    parent: &Handle,
    item: &ParsedItem,
    options: &DeferredOptions,
    out: &mut Vec<(Handle, Handle)>,
) {
    for child in dom::element_children(parent) {
        let matched = dom::get_attr(&child, &options.marker_attribute).is_some_and(|marker| {
            marker
                .split('\n')
                .any(|line| options.match_mode.matches(line, &item.literal))
        });
        if matched {
            out.push((parent.clone(), child.clone()));
        }
        if matches!(
            NodeKind::classify(&child),
            NodeKind::Generic | NodeKind::Paragraph
        ) {
            collect_matches(&child, item, options, out);
        }
    }
}

fn contains(ancestor: &Handle, node: &Handle) -> bool {
    ancestor
        .children
        .borrow()
        .iter()
        .any(|child| Rc::ptr_eq(child, node) || contains(child, node))
}

fn section_of<'a>(node: &Handle, source: &'a str) -> Option<SectionInfo<'a>> {
    let (start, end) = dom::get_attr(node, SOURCEPOS_ATTR)
        .as_deref()
        .and_then(parse_sourcepos)?;
    Some(SectionInfo::new(start, end, source))
}

fn apply_item(
    parent: &Handle,
    target: &Handle,
    item: &ParsedItem,
    source: &str,
    cache: &mut AnnotationCache,
) {
    let Some(section) = section_of(target, source) else {
        return;
    };
    let kind = NodeKind::classify(target);
    if kind == NodeKind::Paragraph {
        annotate_block_above(parent, target, &section, cache);
    }

    let applied = match locate(parent, target, &section, cache) {
        // The rendered text lost the annotation (a repeated line already applied it).
        Located::NotFound if matches!(kind, NodeKind::Generic | NodeKind::Paragraph) => {
            for annotation in item.annotations.iter().rev() {
                inject_leading(target, annotation);
            }
            apply_annotations(target)
        }
        located => located.apply(target),
    };
    if !applied.skipped.is_empty() {
        tracing::warn!(line = item.line, skipped = ?applied.skipped, "dropped malformed annotation tokens");
    }
}

/// A paragraph on the line right under a table or math block that was not absorbed into it:
/// locate that block first, so it claims the line and the paragraph is detached as a
/// duplicate.
fn annotate_block_above(
    parent: &Handle,
    paragraph: &Handle,
    section: &SectionInfo<'_>,
    cache: &mut AnnotationCache,
) {
    let Some(previous) = dom::previous_element_sibling(parent, paragraph) else {
        return;
    };
    if !matches!(
        NodeKind::classify(&previous),
        NodeKind::Table | NodeKind::MathBlock
    ) {
        return;
    }
    let Some(above) = section_of(&previous, section.source()) else {
        return;
    };
    if above.line_end + 1 == section.line_start {
        locate(parent, &previous, &above, cache).apply(&previous);
    }
}
