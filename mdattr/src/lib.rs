//! Attribute annotations for rendered Markdown
//!
//!     Authors write `{.class #id key=value}` next to Markdown content and the rendered HTML
//!     element gets those attributes. The Markdown renderer knows nothing about this syntax: it
//!     renders the raw source and leaves the annotations as text (or drops them, for fence info
//!     strings). This crate reconciles the rendered tree with the source after the fact.
//!
//!     TLDR:
//!         - The renderer is opaque. We only get its tree plus, per block, the source lines it
//!           came from. Lists and plain blockquotes are walked down to their child blocks.
//!         - Where the annotation sits depends on the kind of block (see ./locate.rs).
//!         - Applying is always the same path: put the annotation text in front of the target's
//!           content, then strip-and-apply every annotation found there (see ./apply.rs).
//!         - This is a pure lib, it powers mdattr-cli but never reads files, env vars or prints.
//!
//! Architecture
//!
//!     .
//!     ├── error.rs            # RenderError
//!     ├── grammar.rs          # inline / standalone annotation matcher
//!     ├── parser.rs           # annotation text -> AttributeList
//!     ├── dom.rs              # rcdom helpers: parse, mutate, serialize
//!     ├── section.rs          # SectionInfo and the data-sourcepos section source
//!     ├── render.rs           # Renderer trait and the comrak renderer
//!     ├── locate.rs           # per node-kind locator, AnnotationCache
//!     ├── apply.rs            # attribute applier
//!     ├── deferred.rs         # deferred block reconciler
//!     ├── postprocess.rs      # per-document driver and reports
//!     └── lib.rs
//!
//!     Data flow for a regular block:
//!
//!         source + section -> locate -> AnnotationText -> inject_leading -> apply_annotations
//!
//!     The deferred path is a separate pipeline: a ```mdattr fence is parsed for annotated
//!     lines first, rendered on its own, tagged with source-line markers, reconciled, and
//!     grafted in place of the fence.
//!
//! Testing
//!
//!     tests
//!     ├── lib.rs
//!     ├── postprocess
//!     └── deferred
//!
//!     Note that rust does not by default discover tests in subdirectories, so we need to
//!     include these in the mod.
//!
//! Usage
//!
//!     let rendered = Postprocessor::default().render("# Title {#intro}\n", "doc.md")?;
//!     assert_eq!(rendered.html.trim(), r#"<h1 id="intro">Title</h1>"#);

pub mod apply;
pub mod deferred;
pub mod dom;
pub mod error;
pub mod grammar;
pub mod locate;
pub mod parser;
pub mod postprocess;
pub mod render;
pub mod section;

pub use apply::{apply_annotations, apply_attributes, inject_leading, ApplyReport};
pub use deferred::{DeferredOptions, DeferredReport, MatchMode, ParsedItem};
pub use error::RenderError;
pub use grammar::AnnotationText;
pub use locate::{locate, AnnotationCache, Located, NodeKind};
pub use parser::{parse_annotation, AttributeList, ParsedAnnotation};
pub use postprocess::{
    wrap_in_document, Outcome, PostprocessOptions, Postprocessor, RenderReport, Rendered,
    SectionReport,
};
pub use render::{ComrakRenderer, RenderOptions, Renderer};
pub use section::{SectionInfo, SectionSource, SourcePosSections};
