//! Error types for rendering operations
//!
//! Only genuine failures live here. Annotations that cannot be found, parsed or matched are
//! not errors: they surface as [`crate::postprocess::Outcome`] values and
//! [`crate::parser::ParsedAnnotation::skipped`] entries instead.

use thiserror::Error;

/// Errors that can occur while rendering or serializing a document
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The markdown renderer could not produce a tree
    #[error("Render error: {0}")]
    Render(String),
    /// The rendered tree could not be written out as HTML
    #[error("Serialization error: {0}")]
    Serialization(String),
}
