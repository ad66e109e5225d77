//! One document exercising every block kind at once.

use super::render;
use mdattr::dom;
use mdattr::{DeferredReport, Outcome};
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("postprocess")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

fn body(html: &str) -> markup5ever_rcdom::Handle {
    let root = dom::create_element("div", vec![]);
    for node in dom::parse_fragment(html) {
        dom::append_child(&root, node);
    }
    root
}

#[test]
fn kitchensink_renders_every_annotation() {
    let rendered = render(&fixture("kitchensink.md"));
    let root = body(&rendered.html);

    let h1 = dom::find_first(&root, "h1").unwrap();
    assert_eq!(dom::get_attr(&h1, "id").as_deref(), Some("notes"));
    assert_eq!(dom::classes(&h1), vec!["wide"]);

    let em = dom::find_first(&root, "em").unwrap();
    assert!(dom::classes(&em).is_empty());
    // Not directly after the <em>, so it binds to the paragraph.
    assert!(rendered
        .html
        .contains(r#"<p class="highlight" data-version="2">The <em>new</em> parser handles annotations</p>"#));

    let pre = dom::find_first(&root, "pre").unwrap();
    assert_eq!(dom::classes(&pre), vec!["numbered"]);
    assert_eq!(dom::get_attr(&pre, "data-line").as_deref(), Some("2"));
    assert!(dom::text_content(&pre).contains("let config = {};"));

    let table = dom::find_first(&root, "table").unwrap();
    assert_eq!(dom::classes(&table), vec!["striped"]);

    for id in ["fast", "slow", "deferred-title", "first", "second"] {
        assert!(
            rendered.html.contains(&format!(r#"id="{id}""#)),
            "missing id {id}"
        );
    }
    assert!(rendered.html.contains(r#"class="callout-tip""#));
    assert!(rendered.html.contains(r#"<div class="mdattr-deferred">"#));

    assert!(!rendered.html.contains("stray"));
    assert!(!rendered.html.contains("dropped-paragraph"));
    assert!(!rendered.html.contains("{."));
    assert!(!rendered.html.contains("{#"));
    assert!(rendered.html.contains("Plain closing paragraph."));
}

#[test]
fn kitchensink_report() {
    let rendered = render(&fixture("kitchensink.md"));
    let sections = &rendered.report.sections;

    assert_eq!(sections.first().map(|s| s.tag.as_str()), Some("h1"));
    assert!(sections.iter().any(|s| s.outcome == Outcome::Detached));
    assert_eq!(sections.last().map(|s| &s.outcome), Some(&Outcome::NoMatch));

    assert_eq!(
        rendered.report.deferred(),
        vec![DeferredReport {
            parsed: 4,
            matched: 4,
            dropped: 0,
        }]
    );
}
