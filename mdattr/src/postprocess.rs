//! Document postprocessor
//!
//! Drives one render cycle: render the document, then visit each top-level block once, the
//! way a host's postprocessing callback would. A block either goes through the locator and
//! applier, or, when it is a deferred fence, through the deferred reconciler and gets replaced
//! by the reconciled subtree. Lists and plain blockquotes are walked down to their child
//! blocks, which are located one by one and reported under the top-level block. A fresh
//! [`AnnotationCache`] is created for every cycle.
//!
//! Nothing here fails on user input. Per-block results are reported as [`Outcome`]s; only
//! renderer and serialization failures are errors.

use crate::apply::{apply_annotations, ApplyReport};
use crate::deferred::{self, DeferredOptions, DeferredReport};
use crate::dom;
use crate::error::RenderError;
use crate::locate::{is_container, locate, AnnotationCache, Located, NodeKind};
use crate::render::{ComrakRenderer, Renderer};
use crate::section::{parse_sourcepos, SectionSource, SourcePosSections, SOURCEPOS_ATTR};
use markup5ever_rcdom::Handle;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostprocessOptions {
    /// Leave `data-sourcepos` attributes in the output
    pub keep_sourcepos: bool,
    pub deferred: DeferredOptions,
}

/// What happened to one top-level block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    /// Annotations were applied to the block or its descendants
    Applied {
        annotations: usize,
        skipped: Vec<String>,
    },
    /// The block was a bare annotation and has been removed
    Detached,
    NoMatch,
    /// The block had no source section; it was left untouched
    MissingContext,
    /// The annotation's line was already claimed by another block
    Duplicate,
    /// The block was a deferred fence and has been replaced
    Deferred(DeferredReport),
}

impl Outcome {
    fn from_apply(report: ApplyReport) -> Self {
        if report.annotations == 0 {
            Outcome::NoMatch
        } else {
            Outcome::Applied {
                annotations: report.annotations,
                skipped: report.skipped,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub tag: String,
    pub kind: NodeKind,
    /// 0-based inclusive source lines, when known
    pub lines: Option<(usize, usize)>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    pub sections: Vec<SectionReport>,
}

impl RenderReport {
    pub fn applied(&self) -> usize {
        self.sections
            .iter()
            .map(|section| match &section.outcome {
                Outcome::Applied { annotations, .. } => *annotations,
                _ => 0,
            })
            .sum()
    }

    pub fn deferred(&self) -> Vec<DeferredReport> {
        self.sections
            .iter()
            .filter_map(|section| match section.outcome {
                Outcome::Deferred(report) => Some(report),
                _ => None,
            })
            .collect()
    }
}

/// Rendered HTML fragment plus what happened along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub report: RenderReport,
}

/// Renders Markdown and reconciles attribute annotations.
pub struct Postprocessor<R: Renderer = ComrakRenderer> {
    renderer: R,
    options: PostprocessOptions,
}

impl Default for Postprocessor<ComrakRenderer> {
    fn default() -> Self {
        Self::new(ComrakRenderer::default(), PostprocessOptions::default())
    }
}

impl<R: Renderer> Postprocessor<R> {
    pub fn new(renderer: R, options: PostprocessOptions) -> Self {
        Self { renderer, options }
    }

    pub fn options(&self) -> &PostprocessOptions {
        &self.options
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Render `source` to an annotated HTML fragment.
    pub fn render(&self, source: &str, context_path: &str) -> Result<Rendered, RenderError> {
        let container = dom::create_element("div", vec![]);
        self.renderer.render(source, &container, context_path)?;

        let sections = SourcePosSections::new(source);
        let report = self.postprocess(&container, &sections, context_path)?;

        if !self.options.keep_sourcepos {
            dom::for_each_element(&container, &mut |node| {
                dom::remove_attr(node, SOURCEPOS_ATTR)
            });
        }

        let html = dom::serialize_children(&container)?;
        tracing::debug!(
            context_path,
            sections = report.sections.len(),
            applied = report.applied(),
            "rendered document"
        );
        Ok(Rendered { html, report })
    }

    /// Reconcile every top-level block of an already rendered `container`.
    pub fn postprocess(
        &self,
        container: &Handle,
        sections: &dyn SectionSource,
        context_path: &str,
    ) -> Result<RenderReport, RenderError> {
        let mut cache = AnnotationCache::new();
        let mut report = RenderReport::default();

        for node in dom::element_children(container) {
            let section = self.process_block(container, &node, sections, &mut cache, context_path)?;
            tracing::debug!(
                tag = %section.tag,
                kind = ?section.kind,
                lines = ?section.lines,
                outcome = ?section.outcome,
                "processed block"
            );
            report.sections.push(section);
        }
        Ok(report)
    }

    fn process_block(
        &self,
        container: &Handle,
        node: &Handle,
        sections: &dyn SectionSource,
        cache: &mut AnnotationCache,
        context_path: &str,
    ) -> Result<SectionReport, RenderError> {
        let tag = dom::tag_name(node)
            .map(|name| name.to_string())
            .unwrap_or_default();
        let kind = NodeKind::classify(node);
        let lines = dom::get_attr(node, SOURCEPOS_ATTR)
            .as_deref()
            .and_then(parse_sourcepos);
        let report = |outcome| SectionReport {
            tag: tag.clone(),
            kind,
            lines,
            outcome,
        };

        if deferred::is_deferred_block(node, &self.options.deferred) {
            let source = dom::text_content(node);
            let (wrapper, deferred_report) =
                deferred::reconcile(&source, &self.renderer, &self.options.deferred, context_path)?;
            dom::replace_child(container, node, wrapper);
            return Ok(report(Outcome::Deferred(deferred_report)));
        }

        let Some(section) = sections.section_info(node) else {
            return Ok(report(Outcome::MissingContext));
        };

        let outcome = if is_container(node) {
            let mut nested = NestedReport::default();
            process_container(node, sections, cache, &mut nested);
            nested.into_outcome()
        } else {
            match locate(container, node, &section, cache) {
                Located::NotFound => Outcome::NoMatch,
                Located::Detached { .. } => Outcome::Detached,
                Located::Duplicate { .. } => Outcome::Duplicate,
                located => Outcome::from_apply(located.apply(node)),
            }
        };
        if let Outcome::Applied { skipped, .. } = &outcome {
            if !skipped.is_empty() {
                tracing::warn!(?lines, ?skipped, "dropped malformed annotation tokens");
            }
        }
        Ok(report(outcome))
    }
}

#[derive(Debug, Default)]
struct NestedReport {
    applied: ApplyReport,
    detached: bool,
}

impl NestedReport {
    fn into_outcome(self) -> Outcome {
        if self.applied.annotations == 0 && self.detached {
            Outcome::Detached
        } else {
            Outcome::from_apply(self.applied)
        }
    }
}

/// Locate each child block of a container, then apply what is left in the container's own
/// text (tight list items keep their text directly).
fn process_container(
    node: &Handle,
    sections: &dyn SectionSource,
    cache: &mut AnnotationCache,
    nested: &mut NestedReport,
) {
    for child in dom::element_children(node) {
        if is_container(&child) {
            process_container(&child, sections, cache, nested);
            continue;
        }
        let Some(section) = sections.section_info(&child) else {
            continue;
        };
        match locate(node, &child, &section, cache) {
            Located::Detached { .. } => nested.detached = true,
            located => nested.applied.merge(located.apply(&child)),
        }
    }
    nested.applied.merge(apply_annotations(node));
}

/// Wrap an HTML fragment in a complete document.
pub fn wrap_in_document(body_html: &str, title: &str) -> String {
    let baseline_css = include_str!("../css/baseline.css");
    let escaped_title = html_escape(title);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <meta name="generator" content="mdattr">
  <title>{escaped_title}</title>
  <style>
{baseline_css}
  </style>
</head>
<body>
{body_html}
</body>
</html>
"#
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
