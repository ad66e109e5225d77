//! Annotation grammar and matcher
//!
//! Two forms share one delimiter grammar:
//!
//! - inline (`BASE`): a `{...}` run anywhere in a string, e.g. `Title {#intro}`
//! - standalone (`ONLY`): a `{...}` run that is the whole string once trimmed, e.g. `  {.note}  `
//!
//! A run is `{`, an optional `:` (kramdown style `{: .x}`), optional spaces, at least one
//! character that is not `}`, newline or space, then anything but `}` or newline up to the
//! closing `}`. So `{}` and `{ }` never match, and an annotation never spans lines.
//!
//! The scanner works on bytes: every delimiter it looks for is ASCII, so every index it
//! returns is a char boundary.

use std::fmt;
use std::ops::Range;

/// A substring of source text that matched the annotation grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationText {
    text: String,
    range: Range<usize>,
}

impl AnnotationText {
    /// The matched run, delimiters included.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Byte range of the match inside the string it was found in.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// The text between the delimiters, without the optional `:` and surrounding spaces.
    pub fn inner(&self) -> &str {
        let inner = self
            .text
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or("");
        inner.strip_prefix(':').unwrap_or(inner).trim()
    }
}

impl fmt::Display for AnnotationText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Try to match one annotation run starting exactly at `start`.
///
/// Returns the exclusive end offset of the run.
fn match_at(s: &str, start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut pos = start + 1;
    if bytes.get(pos) == Some(&b':') {
        pos += 1;
    }
    while bytes.get(pos) == Some(&b' ') {
        pos += 1;
    }

    match bytes.get(pos) {
        None | Some(b'}') | Some(b'\n') | Some(b' ') => return None,
        Some(_) => pos += 1,
    }

    while let Some(&byte) = bytes.get(pos) {
        match byte {
            b'}' => return Some(pos + 1),
            b'\n' => return None,
            _ => pos += 1,
        }
    }

    None
}

fn annotation(s: &str, range: Range<usize>) -> Option<AnnotationText> {
    s.get(range.clone()).map(|text| AnnotationText {
        text: text.to_string(),
        range,
    })
}

/// Find the first inline-form annotation in `s`.
pub fn find_inline(s: &str) -> Option<AnnotationText> {
    s.match_indices('{')
        .find_map(|(start, _)| match_at(s, start).map(|end| start..end))
        .and_then(|range| annotation(s, range))
}

/// Whether `s` contains an inline-form annotation anywhere.
pub fn is_inline(s: &str) -> bool {
    find_inline(s).is_some()
}

/// Every non-overlapping inline-form annotation in `s`, in source order.
pub fn find_all(s: &str) -> Vec<AnnotationText> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = s.get(cursor..).and_then(|rest| rest.find('{')) {
        let start = cursor + offset;
        match match_at(s, start) {
            Some(end) => {
                if let Some(text) = annotation(s, start..end) {
                    found.push(text);
                }
                cursor = end;
            }
            None => cursor = start + 1,
        }
    }

    found
}

/// Match `s` as a standalone annotation: the trimmed string must be exactly one run.
pub fn find_standalone(s: &str) -> Option<AnnotationText> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = s.len() - s.trim_start().len();
    let end = start + trimmed.len();

    match match_at(s, start) {
        Some(matched_end) if matched_end == end => annotation(s, start..end),
        _ => None,
    }
}

/// Whether the whole of `s` (trimmed) is a single annotation.
pub fn is_standalone(s: &str) -> bool {
    find_standalone(s).is_some()
}
