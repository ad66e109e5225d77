//! Annotation parser
//!
//! Turns one [`AnnotationText`](crate::grammar::AnnotationText) (delimiters included) into
//! an ordered [`AttributeList`]:
//!
//! | Token            | Pair                |
//! |------------------|---------------------|
//! | `.name`          | `("class", "name")` |
//! | `#name`          | `("id", "name")`    |
//! | `key=value`      | `("key", "value")`  |
//! | `key="a value"`  | `("key", "a value")`|
//! | `bare`           | `("bare", "")`      |
//!
//! Tokens are separated by whitespace outside quotes. A token that cannot be read is dropped
//! and recorded in [`ParsedAnnotation::skipped`]; the rest of the annotation still applies.
//! Text that is not an annotation at all parses to an empty list.

use crate::grammar;
use serde::Serialize;
use std::fmt;

/// Ordered `(key, value)` pairs read from one annotation.
///
/// Keys may repeat. An empty value marks a boolean attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeList {
    pairs: Vec<(String, String)>,
}

impl AttributeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn extend(&mut self, other: AttributeList) {
        self.pairs.extend(other.pairs);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The value a key ends up with once later assignments win.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All class names, in order of appearance.
    pub fn classes(&self) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == "class")
            .flat_map(|(_, v)| v.split_whitespace())
            .collect()
    }
}

impl From<Vec<(String, String)>> for AttributeList {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }
}

impl fmt::Display for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.pairs.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            if value.is_empty() {
                f.write_str(key)?;
            } else {
                write!(f, "{key}=\"{}\"", value.replace('"', "&quot;"))?;
            }
        }
        Ok(())
    }
}

/// Result of parsing one annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedAnnotation {
    pub attributes: AttributeList,
    /// Tokens that were dropped because they could not be read.
    pub skipped: Vec<String>,
}

impl ParsedAnnotation {
    pub fn is_malformed(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Parse an annotation such as `{.note #intro data-x="1"}`.
pub fn parse_annotation(text: &str) -> ParsedAnnotation {
    let mut parsed = ParsedAnnotation::default();

    let Some(annotation) = grammar::find_standalone(text) else {
        tracing::debug!(text, "not an annotation, nothing to parse");
        return parsed;
    };

    for token in tokenize(annotation.inner()) {
        match read_token(&token) {
            Some((key, value)) => parsed.attributes.push(key, value),
            None => {
                tracing::warn!(token = %token.text, annotation = %annotation, "skipping malformed attribute token");
                parsed.skipped.push(token.text);
            }
        }
    }

    parsed
}

struct Token {
    text: String,
    /// False when a quote opened in this token never closed.
    closed: bool,
}

fn tokenize(inner: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in inner.chars() {
        match quote {
            Some(open) if ch == open => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        closed: true,
                    });
                }
            }
            None => current.push(ch),
        }
    }

    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            closed: quote.is_none(),
        });
    }

    tokens
}

fn read_token(token: &Token) -> Option<(String, String)> {
    if !token.closed {
        return None;
    }
    let text = token.text.as_str();

    if let Some(name) = text.strip_prefix('.') {
        return is_shorthand_name(name).then(|| ("class".to_string(), name.to_string()));
    }
    if let Some(name) = text.strip_prefix('#') {
        return is_shorthand_name(name).then(|| ("id".to_string(), name.to_string()));
    }
    if let Some((key, value)) = text.split_once('=') {
        if !is_attr_name(key) {
            return None;
        }
        return unquote(value).map(|value| (key.to_string(), value.to_string()));
    }

    is_attr_name(text).then(|| (text.to_string(), String::new()))
}

fn unquote(value: &str) -> Option<&str> {
    match value.chars().next() {
        Some(open @ ('"' | '\'')) => value
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(open)),
        _ if value.contains(['"', '\'']) => None,
        _ => Some(value),
    }
}

fn is_shorthand_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['=', '"', '\'', '#', '{', '}'])
}

fn is_attr_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b':' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'.' | b'-'))
}
