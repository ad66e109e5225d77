mod blocks;
mod context;
mod kitchensink;

use mdattr::{Postprocessor, Rendered};

/// Render with the default comrak host.
pub fn render(source: &str) -> Rendered {
    Postprocessor::default()
        .render(source, "test.md")
        .expect("render to succeed")
}
