//! Section context: missing sections, claimed lines, and custom hosts.

use mdattr::dom;
use mdattr::section::SOURCEPOS_ATTR;
use mdattr::{
    ComrakRenderer, Outcome, PostprocessOptions, Postprocessor, RenderError, Renderer,
    SectionInfo, SectionSource, SourcePosSections,
};
use markup5ever_rcdom::Handle;

/// A host that cannot tell where anything came from.
struct NoSections;

impl SectionSource for NoSections {
    fn section_info(&self, _node: &Handle) -> Option<SectionInfo<'_>> {
        None
    }
}

fn rendered_container(source: &str) -> Handle {
    let container = dom::create_element("div", vec![]);
    ComrakRenderer::default()
        .render(source, &container, "test.md")
        .unwrap();
    container
}

#[test]
fn missing_context_leaves_nodes_untouched() {
    let source = "# Title {#intro}\n\n{.x}\n";
    let container = rendered_container(source);
    let before = dom::serialize_children(&container).unwrap();

    let report = Postprocessor::default()
        .postprocess(&container, &NoSections, "test.md")
        .unwrap();

    assert!(report
        .sections
        .iter()
        .all(|section| section.outcome == Outcome::MissingContext));
    assert_eq!(dom::serialize_children(&container).unwrap(), before);
}

#[test]
fn raw_html_blocks_have_no_context() {
    let renderer = ComrakRenderer::new(mdattr::RenderOptions {
        unsafe_html: true,
        ..Default::default()
    });
    let rendered = Postprocessor::new(renderer, PostprocessOptions::default())
        .render("<div>raw {.x}</div>\n", "test.md")
        .unwrap();
    assert!(rendered.html.contains("raw {.x}"));
    assert_eq!(rendered.report.sections[0].outcome, Outcome::MissingContext);
}

#[test]
fn claimed_line_is_not_applied_twice() {
    // Two renders of the same table into one container share a cycle when postprocessed
    // together; the second table finds its line already claimed.
    let source = "| a |\n| - |\n| 1 |\n{.striped}\n";
    let container = rendered_container(source);
    let again = rendered_container(source);
    for node in dom::element_children(&again) {
        dom::append_child(&container, node);
    }

    let report = Postprocessor::default()
        .postprocess(&container, &SourcePosSections::new(source), "test.md")
        .unwrap();

    let outcomes: Vec<&Outcome> = report.sections.iter().map(|s| &s.outcome).collect();
    assert!(matches!(outcomes[0], Outcome::Applied { .. }));
    assert_eq!(outcomes[1], &Outcome::Duplicate);

    let tables = dom::element_children(&container);
    assert_eq!(dom::classes(&tables[0]), vec!["striped"]);
    assert!(dom::classes(&tables[1]).is_empty());
}

#[test]
fn each_render_starts_a_fresh_cycle() {
    let postprocessor = Postprocessor::default();
    let source = "| a |\n| - |\n| 1 |\n{.striped}\n";
    for _ in 0..2 {
        let rendered = postprocessor.render(source, "test.md").unwrap();
        assert!(rendered.html.contains(r#"<table class="striped">"#));
    }
}

/// Wraps comrak and records every context path it is asked to render.
struct Recording {
    inner: ComrakRenderer,
    seen: std::cell::RefCell<Vec<String>>,
}

impl Renderer for Recording {
    fn name(&self) -> &str {
        "recording"
    }

    fn render(&self, source: &str, container: &Handle, context_path: &str) -> Result<(), RenderError> {
        self.seen.borrow_mut().push(context_path.to_string());
        self.inner.render(source, container, context_path)
    }
}

#[test]
fn custom_renderer_is_used_for_deferred_blocks_too() {
    let renderer = Recording {
        inner: ComrakRenderer::default(),
        seen: Default::default(),
    };
    let postprocessor = Postprocessor::new(renderer, PostprocessOptions::default());
    let rendered = postprocessor
        .render("intro\n\n```mdattr\n- a {#x}\n```\n", "doc.md")
        .unwrap();
    assert!(rendered.html.contains(r#"<li id="x">a</li>"#));
    assert!(!rendered.html.contains(SOURCEPOS_ATTR));
    assert_eq!(
        *postprocessor.renderer().seen.borrow(),
        vec!["doc.md".to_string(), "doc.md".to_string()]
    );
}

struct Failing;

impl Renderer for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn render(&self, _source: &str, _container: &Handle, context_path: &str) -> Result<(), RenderError> {
        Err(RenderError::Render(format!("cannot render {context_path}")))
    }
}

#[test]
fn renderer_failure_is_an_error() {
    let result = Postprocessor::new(Failing, PostprocessOptions::default()).render("x", "doc.md");
    assert_eq!(
        result.unwrap_err(),
        RenderError::Render("cannot render doc.md".to_string())
    );
}
