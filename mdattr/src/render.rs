//! Markdown renderer
//!
//! The renderer is an external, opaque stage: it takes raw markdown and fills a container
//! node with the rendered tree. It knows nothing about annotations and leaves `{...}` text
//! wherever the markdown put it (or drops it, as comrak does for the rest of a fence info
//! string).
//!
//! # Library Choice
//!
//! We use `comrak` for rendering: CommonMark compliant, GFM extensions (tables,
//! strikethrough, task lists, autolinks), dollar math, and it can annotate every block with
//! `data-sourcepos`, which is what section reporting is built on. The HTML it produces is
//! parsed into an rcdom tree (see [`crate::dom`]).

use crate::dom;
use crate::error::RenderError;
use comrak::{markdown_to_html, ComrakOptions};
use markup5ever_rcdom::Handle;

/// Renders markdown source into a container node.
///
/// `context_path` names the document being rendered (a file path for the CLI). Renderers may
/// use it to resolve relative links; comrak ignores it.
pub trait Renderer {
    /// The name of this renderer, used in logs
    fn name(&self) -> &str;

    /// Append the rendered tree for `source` to `container`.
    fn render(&self, source: &str, container: &Handle, context_path: &str)
        -> Result<(), RenderError>;
}

/// Knobs for the comrak renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub table: bool,
    pub strikethrough: bool,
    pub autolink: bool,
    pub tasklist: bool,
    pub math_dollars: bool,
    /// Pass raw HTML in the markdown through instead of escaping it
    pub unsafe_html: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            table: true,
            strikethrough: true,
            autolink: true,
            tasklist: true,
            math_dollars: true,
            unsafe_html: false,
        }
    }
}

/// Renderer backed by comrak, always emitting source positions.
#[derive(Debug, Clone, Default)]
pub struct ComrakRenderer {
    options: RenderOptions,
}

impl ComrakRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn comrak_options(&self) -> ComrakOptions<'static> {
        let mut options = ComrakOptions::default();
        options.extension.table = self.options.table;
        options.extension.strikethrough = self.options.strikethrough;
        options.extension.autolink = self.options.autolink;
        options.extension.tasklist = self.options.tasklist;
        options.extension.math_dollars = self.options.math_dollars;
        options.render.unsafe_ = self.options.unsafe_html;
        options.render.sourcepos = true;
        options
    }
}

impl Renderer for ComrakRenderer {
    fn name(&self) -> &str {
        "comrak"
    }

    fn render(
        &self,
        source: &str,
        container: &Handle,
        context_path: &str,
    ) -> Result<(), RenderError> {
        if !dom::is_element(container) {
            return Err(RenderError::Render(format!(
                "cannot render '{context_path}' into a non-element container"
            )));
        }

        let html = markdown_to_html(source, &self.comrak_options());
        let nodes = dom::parse_fragment(&html);
        tracing::trace!(
            renderer = self.name(),
            context_path,
            nodes = nodes.len(),
            "rendered markdown"
        );

        for node in nodes {
            dom::append_child(container, node);
        }
        Ok(())
    }
}
