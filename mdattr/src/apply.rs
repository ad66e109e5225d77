//! Attribute applier
//!
//! Finds every annotation in a node's text, strips it from the visible content and applies
//! the parsed attributes:
//!
//! - `class` values accumulate (deduplicated), never overwritten
//! - other keys with a value set or overwrite the attribute
//! - keys without a value become `"true"`
//!
//! An annotation binds to the element right before it when it directly follows one
//! (`**bold**{.red}` annotates the `<strong>`), otherwise to the element holding the text
//! (`# Title {#intro}` annotates the `<h1>`). The walk is depth first, so nested spans each
//! resolve on their own. Code and preformatted content is never scanned, except for a
//! fragment the locator placed directly inside a `<pre>`.

use crate::dom;
use crate::grammar::{self, AnnotationText};
use crate::parser::{parse_annotation, AttributeList};
use markup5ever_rcdom::Handle;
use serde::Serialize;
use std::rc::Rc;

/// Elements whose text is never scanned.
const OPAQUE_TAGS: &[&str] = &["code", "script", "style"];

/// What one applier run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Annotations found, stripped and applied
    pub annotations: usize,
    /// Tokens dropped while parsing those annotations
    pub skipped: Vec<String>,
}

impl ApplyReport {
    pub fn merge(&mut self, other: ApplyReport) {
        self.annotations += other.annotations;
        self.skipped.extend(other.skipped);
    }
}

/// Merge an attribute list onto an element.
pub fn apply_attributes(target: &Handle, attributes: &AttributeList) {
    for (key, value) in attributes.iter() {
        if key == "class" {
            dom::add_classes(target, value.split_whitespace());
        } else if value.is_empty() {
            dom::set_attr(target, key, "true");
        } else {
            dom::set_attr(target, key, value);
        }
    }
}

/// Put an annotation in front of a node's content so [`apply_annotations`] picks it up.
pub fn inject_leading(node: &Handle, annotation: &AnnotationText) {
    dom::prepend_child(node, dom::create_text(annotation.as_str()));
}

/// Strip and apply every annotation found in `node`'s content.
pub fn apply_annotations(node: &Handle) -> ApplyReport {
    let mut report = ApplyReport::default();
    walk(node, &mut report);
    report
}

fn walk(node: &Handle, report: &mut ApplyReport) {
    let Some(tag) = dom::tag_name(node) else {
        return;
    };
    if OPAQUE_TAGS.contains(&&*tag) {
        return;
    }
    let descend = &*tag != "pre";

    let children: Vec<Handle> = node.children.borrow().clone();
    for child in &children {
        if dom::is_element(child) {
            if descend {
                walk(child, report);
            }
        } else if dom::is_text(child) {
            apply_in_text(node, child, report);
        }
    }
}

fn apply_in_text(parent: &Handle, text_node: &Handle, report: &mut ApplyReport) {
    while let Some(text) = dom::text_of(text_node) {
        let Some(found) = grammar::find_inline(&text) else {
            return;
        };
        let range = found.range();
        let before = &text[..range.start];
        let after = &text[range.end..];

        let target = if before.is_empty() {
            previous_element(parent, text_node).unwrap_or_else(|| parent.clone())
        } else {
            parent.clone()
        };

        let parsed = parse_annotation(found.as_str());
        tracing::trace!(
            annotation = %found,
            target = ?dom::tag_name(&target),
            attributes = parsed.attributes.len(),
            "applying annotation"
        );
        apply_attributes(&target, &parsed.attributes);
        report.annotations += 1;
        report.skipped.extend(parsed.skipped);

        let before = if after.is_empty() || after.starts_with(char::is_whitespace) {
            before.trim_end()
        } else {
            before
        };
        let remaining = format!("{before}{after}");

        if remaining.is_empty() {
            dom::remove_child(parent, text_node);
            return;
        }
        dom::set_text(text_node, &remaining);
    }
}

fn previous_element(parent: &Handle, node: &Handle) -> Option<Handle> {
    let children = parent.children.borrow();
    let index = children.iter().position(|c| Rc::ptr_eq(c, node))?;
    let previous = children.get(index.checked_sub(1)?)?;
    dom::is_element(previous).then(|| previous.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::find_standalone;

    fn fragment(html: &str) -> Handle {
        let root = dom::create_element("div", vec![]);
        for node in dom::parse_fragment(html) {
            dom::append_child(&root, node);
        }
        root
    }

    fn html(root: &Handle) -> String {
        dom::serialize_children(root).unwrap()
    }

    #[test]
    fn trailing_annotation_goes_to_container() {
        let root = fragment("<h1>Title {#intro .lead}</h1>");
        let report = apply_annotations(&root);
        assert_eq!(report.annotations, 1);
        assert_eq!(html(&root), r#"<h1 id="intro" class="lead">Title</h1>"#);
    }

    #[test]
    fn annotation_directly_after_span_goes_to_span() {
        let root = fragment("<p><strong>bold</strong>{.red} rest</p>");
        apply_annotations(&root);
        assert_eq!(
            html(&root),
            r#"<p><strong class="red">bold</strong> rest</p>"#
        );
    }

    #[test]
    fn nested_spans_resolve_independently() {
        let root = fragment("<p><em>a</em>{.x} and <strong>b</strong>{.y} {#para}</p>");
        let report = apply_annotations(&root);
        assert_eq!(report.annotations, 3);
        let p = dom::find_first(&root, "p").unwrap();
        assert_eq!(dom::get_attr(&p, "id").as_deref(), Some("para"));
        let em = dom::find_first(&root, "em").unwrap();
        assert_eq!(dom::classes(&em), vec!["x"]);
        let strong = dom::find_first(&root, "strong").unwrap();
        assert_eq!(dom::classes(&strong), vec!["y"]);
        assert_eq!(dom::text_content(&p), "a and b");
    }

    #[test]
    fn classes_accumulate_across_annotations() {
        let root = fragment("<p>text {.a} more {.b .a}</p>");
        apply_annotations(&root);
        let p = dom::find_first(&root, "p").unwrap();
        assert_eq!(dom::get_attr(&p, "class").as_deref(), Some("a b"));
        assert_eq!(dom::text_content(&p), "text more");
    }

    #[test]
    fn later_values_win_for_other_keys() {
        let root = fragment("<p>x {#one title=a} {#two}</p>");
        apply_annotations(&root);
        let p = dom::find_first(&root, "p").unwrap();
        assert_eq!(dom::get_attr(&p, "id").as_deref(), Some("two"));
        assert_eq!(dom::get_attr(&p, "title").as_deref(), Some("a"));
    }

    #[test]
    fn bare_word_becomes_true() {
        let root = fragment("<p>x {draft}</p>");
        apply_annotations(&root);
        let p = dom::find_first(&root, "p").unwrap();
        assert_eq!(dom::get_attr(&p, "draft").as_deref(), Some("true"));
    }

    #[test]
    fn code_content_is_never_scanned() {
        let root = fragment("<p>use <code>{.not}</code> here</p><pre><code>fn f() {x}</code></pre>");
        let report = apply_annotations(&root);
        assert_eq!(report.annotations, 0);
        assert!(html(&root).contains("<code>{.not}</code>"));
        assert!(html(&root).contains("fn f() {x}"));
    }

    #[test]
    fn injected_fragment_on_pre_is_applied() {
        let root = fragment("<pre><code>let a = {b};</code></pre>");
        let pre = dom::find_first(&root, "pre").unwrap();
        inject_leading(&pre, &find_standalone("{data-line=3}").unwrap());

        let report = apply_annotations(&root);
        assert_eq!(report.annotations, 1);
        assert_eq!(
            html(&root),
            r#"<pre data-line="3"><code>let a = {b};</code></pre>"#
        );
    }

    #[test]
    fn malformed_tokens_are_reported() {
        let root = fragment("<p>x {.ok =bad}</p>");
        let report = apply_annotations(&root);
        assert_eq!(report.skipped, vec!["=bad"]);
        let p = dom::find_first(&root, "p").unwrap();
        assert_eq!(dom::classes(&p), vec!["ok"]);
    }

    #[test]
    fn node_identity_is_preserved() {
        let root = fragment("<li>item {#x}</li>");
        let before = dom::element_children(&root);
        apply_annotations(&root);
        let after = dom::element_children(&root);
        assert_eq!(before.len(), after.len());
        assert!(Rc::ptr_eq(&before[0], &after[0]));
        assert!(dom::is_tag(&after[0], "li"));
    }
}
