//! Deferred blocks through a full document render.

use insta::assert_snapshot;
use mdattr::{
    ComrakRenderer, DeferredOptions, DeferredReport, MatchMode, Outcome, PostprocessOptions,
    Postprocessor,
};

fn render_with(options: DeferredOptions, source: &str) -> mdattr::Rendered {
    Postprocessor::new(
        ComrakRenderer::default(),
        PostprocessOptions {
            deferred: options,
            ..PostprocessOptions::default()
        },
    )
    .render(source, "doc.md")
    .expect("render to succeed")
}

fn render(source: &str) -> mdattr::Rendered {
    render_with(DeferredOptions::default(), source)
}

#[test]
fn list_items_keep_their_own_ids() {
    let rendered = render("```mdattr\n- item {#x}\n- item {#y}\n```\n");
    assert_snapshot!(rendered.html.trim(), @r#"
    <div class="mdattr-deferred"><ul>
    <li id="x">item</li>
    <li id="y">item</li>
    </ul>
    </div>
    "#);
}

#[test]
fn repeated_lines_annotate_every_repeat() {
    let rendered = render("```mdattr\n- same {.r}\n- same {.r}\n```\n");
    assert_eq!(rendered.html.matches(r#"<li class="r">same</li>"#).count(), 2);
    assert_eq!(
        rendered.report.deferred(),
        vec![DeferredReport {
            parsed: 2,
            matched: 2,
            dropped: 0
        }]
    );
}

#[test]
fn lines_without_rendered_nodes_are_dropped() {
    let rendered = render("```mdattr\n<!-- hidden {.y} -->\n\nshown {.z}\n```\n");
    assert!(rendered.html.contains(r#"<p class="z">shown</p>"#));
    assert_eq!(
        rendered.report.sections[0].outcome,
        Outcome::Deferred(DeferredReport {
            parsed: 2,
            matched: 1,
            dropped: 1
        })
    );
}

#[test]
fn nested_code_fences_are_annotated_but_not_scanned() {
    let rendered = render("````mdattr\n```js {.run}\nconst o = {a: 1};\n```\n````\n");
    assert!(rendered.html.contains(r#"<pre class="run">"#));
    assert!(rendered.html.contains("const o = {a: 1};"));
    assert_eq!(rendered.report.deferred()[0].parsed, 1);
}

#[test]
fn fence_language_is_configurable() {
    let options = DeferredOptions {
        fence_language: "attrs".to_string(),
        wrapper_class: "attributed".to_string(),
        ..DeferredOptions::default()
    };
    let rendered = render_with(
        options,
        "```attrs\ntext {.a}\n```\n\n```mdattr\ntext {.b}\n```\n",
    );
    assert!(rendered.html.contains(r#"<div class="attributed"><p class="a">text</p>"#));
    assert!(rendered.html.contains("language-mdattr"));
    assert!(rendered.html.contains("text {.b}"));
}

#[test]
fn markers_can_be_kept_for_debugging() {
    let options = DeferredOptions {
        keep_markers: true,
        marker_attribute: "data-src".to_string(),
        match_mode: MatchMode::NormalizedWhitespace,
        ..DeferredOptions::default()
    };
    let rendered = render_with(options, "```mdattr\ntext {.a}\n```\n");
    assert!(rendered
        .html
        .contains(r#"<p data-src="text {.a}" class="a">text</p>"#));
}

#[test]
fn regular_blocks_around_deferred_block_still_work() {
    let rendered = render("# Before {#b}\n\n```mdattr\ninside {.i}\n```\n\nAfter {#a}\n");
    let outcomes: Vec<&Outcome> = rendered
        .report
        .sections
        .iter()
        .map(|section| &section.outcome)
        .collect();
    assert!(matches!(outcomes[0], Outcome::Applied { .. }));
    assert!(matches!(outcomes[1], Outcome::Deferred(_)));
    assert!(matches!(outcomes[2], Outcome::Applied { .. }));
    assert!(rendered.html.contains(r#"<p class="i">inside</p>"#));
}

#[test]
fn table_inside_deferred_block_is_annotated_as_a_whole() {
    let rendered = render("```mdattr\n| a | b |\n| - | - |\n| 1 | 2 |\n{.striped}\n```\n");
    assert!(rendered.html.contains(r#"<table class="striped">"#));
    assert!(!rendered.html.contains("<td class"));
    assert!(!rendered.html.contains("{.striped}"));
    assert_eq!(rendered.html.matches("<tr>").count(), 2);
}
