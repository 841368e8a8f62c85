// src/markdown/anchors.rs
// =============================================================================
// Anchor index of one document: its headings (with slugs) and the full set
// of addressable anchors.
//
// Anchors come from:
// - headings, slugified with the Slugger (duplicates suffixed)
// - `{#custom-id}` heading attributes, which replace the generated slug and
//   are reserved before any slug is generated
// - id / name attributes in raw HTML
//
// Headings inside code blocks are not headings: pulldown-cmark already
// reports code block content as Text, so they never reach us as Heading tags.
// =============================================================================

use super::html::explicit_anchors;
use super::parser_options;
use super::slug::Slugger;
use crate::model::Heading;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct AnchorIndex {
    pub headings: Vec<Heading>,
    pub anchors: BTreeSet<String>,
}

// Heading being collected between its Start and End events
struct OpenHeading {
    level: u8,
    explicit_id: Option<String>,
    text: String,
}

pub fn build_anchor_index(body: &str) -> AnchorIndex {
    let mut index = AnchorIndex::default();
    let mut collected: Vec<OpenHeading> = Vec::new();
    let mut open: Option<OpenHeading> = None;

    for event in Parser::new_ext(body, parser_options()) {
        match event {
            Event::Start(Tag::Heading(level, id, _classes)) => {
                open = Some(OpenHeading {
                    level: heading_level(level),
                    explicit_id: id.map(str::to_string),
                    text: String::new(),
                });
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = open.as_mut() {
                    heading.text.push_str(&text);
                }
            }
            // Multi-line setext headings
            Event::SoftBreak | Event::HardBreak => {
                if let Some(heading) = open.as_mut() {
                    heading.text.push(' ');
                }
            }
            Event::End(Tag::Heading(..)) => {
                collected.extend(open.take());
            }
            Event::Html(html) => {
                index.anchors.extend(explicit_anchors(&html));
            }
            _ => {}
        }
    }

    let mut slugger = Slugger::default();
    for id in collected.iter().filter_map(|h| h.explicit_id.as_deref()) {
        slugger.reserve(&id.to_lowercase());
    }
    for heading in collected {
        let slug = match heading.explicit_id {
            Some(id) => Some(id.to_lowercase()),
            None => slugger.next_slug(&heading.text),
        };
        if let Some(slug) = &slug {
            index.anchors.insert(slug.clone());
        }
        index.headings.push(Heading {
            level: heading.level,
            text: heading.text.trim().to_string(),
            slug,
        });
    }

    index
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
