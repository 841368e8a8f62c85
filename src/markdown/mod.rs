// src/markdown/mod.rs
// =============================================================================
// Everything that reads Markdown text.
//
// Submodules:
// - extract: link-like references with line numbers
// - anchors: headings, slugs and the per-document anchor set
// - slug: the pinned heading-slug algorithm
// - html: raw HTML chunks (links and explicit anchors)
// - lines: byte offset to line/column mapping
// =============================================================================

mod anchors;
mod extract;
mod html;
mod lines;
mod slug;

pub use anchors::{build_anchor_index, AnchorIndex};
pub use extract::extract_references;

use crate::docs::Corpus;
use crate::model::Reference;
use pulldown_cmark::Options;

// Both passes must parse with the same options or headings and links drift
fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// References of every loaded document, in document order.
pub fn extract_all(corpus: &Corpus) -> Vec<Reference> {
    corpus
        .documents
        .iter()
        .flat_map(|doc| extract_references(&doc.path, &doc.body()))
        .collect()
}
