//! Section boundaries: which source lines a rendered block came from.
//!
//! The renderer is opaque, so the correspondence between output nodes and source lines is
//! reported by a [`SectionSource`]. The bundled [`SourcePosSections`] reads the
//! `data-sourcepos="l:c-l:c"` attribute comrak writes on block elements.

use crate::dom;
use markup5ever_rcdom::Handle;

/// Attribute comrak writes when `render.sourcepos` is on.
pub const SOURCEPOS_ATTR: &str = "data-sourcepos";

/// A rendered region's position in the source.
///
/// Lines are 0-based and inclusive. `text` is the whole document the region belongs to, so
/// lines outside the region (such as the one right after it) can be read too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo<'a> {
    pub line_start: usize,
    pub line_end: usize,
    text: &'a str,
}

impl<'a> SectionInfo<'a> {
    pub fn new(line_start: usize, line_end: usize, text: &'a str) -> Self {
        Self {
            line_start,
            line_end,
            text,
        }
    }

    /// Any line of the document; `None` past the end.
    pub fn line(&self, index: usize) -> Option<&'a str> {
        self.text.lines().nth(index)
    }

    pub fn first_line(&self) -> Option<&'a str> {
        self.line(self.line_start)
    }

    pub fn end_line(&self) -> Option<&'a str> {
        self.line(self.line_end)
    }

    /// The line immediately following the region.
    pub fn line_after(&self) -> Option<&'a str> {
        self.line(self.line_end + 1)
    }

    /// The region's own lines.
    pub fn lines(&self) -> Vec<&'a str> {
        self.text
            .lines()
            .skip(self.line_start)
            .take(self.line_end.saturating_sub(self.line_start) + 1)
            .collect()
    }

    pub fn source(&self) -> &'a str {
        self.text
    }
}

/// Host facility that reports where a rendered node came from.
///
/// Returning `None` means the section is unknown or no longer valid; callers must then leave
/// the node untouched.
pub trait SectionSource {
    fn section_info(&self, node: &Handle) -> Option<SectionInfo<'_>>;
}

/// Section source backed by `data-sourcepos` attributes.
#[derive(Debug, Clone, Copy)]
pub struct SourcePosSections<'a> {
    source: &'a str,
}

impl<'a> SourcePosSections<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }
}

impl SectionSource for SourcePosSections<'_> {
    fn section_info(&self, node: &Handle) -> Option<SectionInfo<'_>> {
        let raw = dom::get_attr(node, SOURCEPOS_ATTR)?;
        let (start, end) = parse_sourcepos(&raw)?;
        Some(SectionInfo::new(start, end, self.source))
    }
}

/// Parse `"3:1-5:12"` into 0-based `(start_line, end_line)`.
pub fn parse_sourcepos(raw: &str) -> Option<(usize, usize)> {
    let (start, end) = raw.split_once('-')?;
    let line = |pos: &str| -> Option<usize> {
        let (line, _column) = pos.split_once(':')?;
        line.trim().parse::<usize>().ok()?.checked_sub(1)
    };
    let (start, end) = (line(start)?, line(end)?);
    (start <= end).then_some((start, end))
}
