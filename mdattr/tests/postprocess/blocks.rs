//! Block-level behavior of a full render: one test per kind of annotated block.

use super::render;
use insta::assert_snapshot;
use mdattr::{parse_annotation, Outcome};

#[test]
fn parses_shorthand_and_pairs() {
    let parsed = parse_annotation("{.a #b c=1}");
    let pairs: Vec<(&str, &str)> = parsed.attributes.iter().collect();
    assert_eq!(pairs, vec![("class", "a"), ("id", "b"), ("c", "1")]);
}

#[test]
fn heading_and_paragraph() {
    let rendered = render("# Title {#intro .lead}\n\nSome *emphasis*{.em} here {data-x=\"1 2\"}\n");
    assert_snapshot!(rendered.html.trim(), @r#"
    <h1 id="intro" class="lead">Title</h1>
    <p data-x="1 2">Some <em class="em">emphasis</em> here</p>
    "#);
}

#[test]
fn bare_annotation_paragraph_is_removed() {
    let rendered = render("before\n\n{.x}\n\nafter\n");
    assert_eq!(rendered.html.matches("<p>").count(), 2);
    assert!(!rendered.html.contains("{.x}"));
    assert!(!rendered.html.contains("class"));
    assert_eq!(rendered.report.sections[1].outcome, Outcome::Detached);
}

#[test]
fn code_fence_annotation() {
    let rendered = render("```js {data-line=3}\nlet x = 1;\n```\n");
    assert!(rendered.html.contains(r#"<pre data-line="3">"#));
    assert!(!rendered.html.contains("{data-line=3}"));
    assert!(rendered.html.contains("let x = 1;"));
}

#[test]
fn code_content_is_left_alone() {
    let rendered = render("```\nlet o = {a};\n```\n");
    assert!(rendered.html.contains("let o = {a};"));
    assert_eq!(rendered.report.sections[0].outcome, Outcome::NoMatch);
}

#[test]
fn table_followed_by_annotation_line() {
    let rendered = render("| a | b |\n| - | - |\n| 1 | 2 |\n{.striped}\n");
    assert!(rendered.html.contains(r#"<table class="striped">"#));
    assert!(!rendered.html.contains("{.striped}"));
    assert!(!rendered.html.contains("<p>"));
}

#[test]
fn table_annotation_after_blank_line_is_not_attached() {
    let rendered = render("| a |\n| - |\n| 1 |\n\n{.striped}\n");
    assert!(!rendered.html.contains("striped"));
    assert!(rendered.html.contains("<table>"));
}

#[test]
fn classes_accumulate() {
    let rendered = render("text {.a} {.b}\n");
    assert_eq!(rendered.html.trim(), r#"<p class="a b">text</p>"#);
}

#[test]
fn bareword_becomes_true() {
    let rendered = render("Draft notes {draft}\n");
    assert_eq!(rendered.html.trim(), r#"<p draft="true">Draft notes</p>"#);
}

#[test]
fn list_items_take_their_own_annotations() {
    let rendered = render("- one {#x}\n- two {#y}\n");
    assert!(rendered.html.contains(r#"<li id="x">one</li>"#));
    assert!(rendered.html.contains(r#"<li id="y">two</li>"#));
}

#[test]
fn display_math_line_after() {
    let rendered = render("$$x^2$$\n{.big}\n");
    assert!(rendered.html.contains(r#"class="big""#));
    assert!(!rendered.html.contains("{.big}"));
}

#[test]
fn callout_end_line() {
    let rendered = render("> [!note] Heads up\n> body\n{.wide}\n");
    assert!(rendered.html.contains(r#"class="wide""#));
    assert!(!rendered.html.contains("{.wide}"));
}

#[test]
fn malformed_tokens_are_skipped_not_fatal() {
    let rendered = render("text {.ok = #}\n");
    assert!(rendered.html.contains(r#"class="ok""#));
    match &rendered.report.sections[0].outcome {
        Outcome::Applied { skipped, .. } => assert!(!skipped.is_empty()),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn indented_code_is_not_a_fence() {
    let rendered = render("para\n\n    if x {y}\n");
    assert!(rendered.html.contains("<pre><code>"));
    assert!(rendered.html.contains("if x {y}"));
    assert!(!rendered.html.contains(r#"y="true""#));
    assert_eq!(rendered.report.sections[1].outcome, Outcome::NoMatch);
}

#[test]
fn tilde_fence_annotation() {
    let rendered = render("~~~python {.run}\nprint({1})\n~~~\n");
    assert!(rendered.html.contains(r#"<pre class="run">"#));
    assert!(rendered.html.contains("print({1})"));
}

#[test]
fn bare_annotation_inside_blockquote_is_removed() {
    let rendered = render("> text\n>\n> {.x}\n");
    assert!(!rendered.html.contains("{.x}"));
    assert!(!rendered.html.contains("class"));
    assert_eq!(rendered.html.matches("<p>").count(), 1);
    assert_eq!(rendered.report.sections[0].outcome, Outcome::Detached);
}

#[test]
fn code_fence_inside_list_item_keeps_its_annotation() {
    let rendered = render("- item\n\n  ```js {data-line=3}\n  x\n  ```\n");
    assert!(rendered.html.contains(r#"<pre data-line="3">"#));
    assert!(!rendered.html.contains("{data-line=3}"));
}

#[test]
fn nested_lists_keep_their_own_annotations() {
    let rendered = render("- outer {#o}\n  - inner {#i}\n");
    assert!(rendered.html.contains(r#"<li id="o">"#));
    assert!(rendered.html.contains(r#"<li id="i">inner</li>"#));
}
