// src/markdown/extract.rs
// =============================================================================
// Reference extraction: every link-like target in a document, with its line.
//
// We walk pulldown-cmark's offset iterator so each event carries the byte
// range it came from. Shapes we pick up:
//   - inline links and images         [text](target)  ![alt](target)
//   - autolinks                       <https://example.com>
//   - reference-style definitions     [id]: target
//   - bare URLs in prose              see https://example.com.
//   - href/src inside raw HTML        <a href="target">
//
// What we deliberately skip:
//   - anything inside fenced/indented code blocks or inline code spans
//     (guides are full of example links that are not meant to resolve)
//   - uses of reference-style links ([text][id]); the definition line is
//     extracted once instead, so each target is reported where it is written
//   - targets we cannot make sense of (best effort, no error)
// =============================================================================

use super::html::extract_html_links;
use super::lines::LineIndex;
use super::parser_options;
use crate::model::{LinkOrigin, PathProblem, Reference, SkipReason, Target};
use percent_encoding::percent_decode_str;
use pulldown_cmark::{Event, LinkType, Parser, RefDefs, Tag};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use url::Url;

fn bare_url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"https?://[^\s<>"'()\[\]]+"#).ok())
        .as_ref()
}

// A target found in the text, before it becomes a Reference
struct Found {
    raw: String,
    // where the target (or, for empty targets, the whole link) starts
    offset: usize,
    // the whole construct, used as target_raw when the target is empty
    span: Range<usize>,
    origin: LinkOrigin,
}

/// Extracts all references of one document.
///
/// `body` must already have its front matter masked (same length as the
/// raw text, so offsets still map to the right lines).
pub fn extract_references(source: &str, body: &str) -> Vec<Reference> {
    let mut found = Vec::new();
    let parser = Parser::new_ext(body, parser_options()).into_offset_iter();
    // Definitions are collected up front, before the first event
    scan_definitions(body, parser.reference_definitions(), &mut found);
    scan_events(body, parser, &mut found);

    let lines = LineIndex::new(body);
    let mut references: Vec<Reference> = found
        .into_iter()
        .filter_map(|f| {
            let target = classify(&f.raw)?;
            let target_raw = if f.raw.trim().is_empty() {
                body.get(f.span.clone()).unwrap_or("[]()").trim().to_string()
            } else {
                f.raw
            };
            let (line, column) = lines.locate(body, f.offset);
            Some(Reference {
                source: source.to_string(),
                target_raw,
                target,
                line,
                column,
                origin: f.origin,
            })
        })
        .collect();

    references.sort_by_key(|r| (r.line, r.column));
    references
}

fn scan_events<'a>(body: &str, events: impl Iterator<Item = (Event<'a>, Range<usize>)>, found: &mut Vec<Found>) {
    let mut in_code_block = false;
    // Nesting depth of links/images; their text is not prose
    let mut link_depth = 0usize;
    // Contiguous prose not yet scanned for bare URLs
    let mut prose: Option<Range<usize>> = None;

    for (event, range) in events {
        if let Event::Text(_) = &event {
            if !in_code_block && link_depth == 0 {
                prose = match prose.take() {
                    Some(run) if run.end == range.start => Some(run.start..range.end),
                    Some(run) => {
                        scan_bare_urls(body, run, found);
                        Some(range)
                    }
                    None => Some(range),
                };
            }
            continue;
        }
        if let Some(run) = prose.take() {
            scan_bare_urls(body, run, found);
        }

        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(Tag::CodeBlock(_)) => in_code_block = false,
            Event::Start(Tag::Link(link_type, dest, _)) => {
                link_depth += 1;
                if let Some(origin) = origin_of(link_type, LinkOrigin::Inline) {
                    found.push(link_target(body, range, &dest, origin, link_type));
                }
            }
            Event::Start(Tag::Image(link_type, dest, _)) => {
                link_depth += 1;
                if let Some(origin) = origin_of(link_type, LinkOrigin::Image) {
                    found.push(link_target(body, range, &dest, origin, link_type));
                }
            }
            Event::End(Tag::Link(..)) | Event::End(Tag::Image(..)) => {
                link_depth = link_depth.saturating_sub(1);
            }
            Event::Html(html) => {
                let chunk = body.get(range.clone()).unwrap_or_default();
                for target in extract_html_links(&html) {
                    let offset = chunk.find(target.as_str()).map_or(range.start, |i| range.start + i);
                    found.push(Found {
                        raw: target,
                        offset,
                        span: range.clone(),
                        origin: LinkOrigin::Html,
                    });
                }
            }
            _ => {}
        }
    }
    if let Some(run) = prose.take() {
        scan_bare_urls(body, run, found);
    }
}

// Reference-style uses are covered by their definition line
fn origin_of(link_type: LinkType, inline_origin: LinkOrigin) -> Option<LinkOrigin> {
    match link_type {
        LinkType::Inline => Some(inline_origin),
        LinkType::Autolink | LinkType::Email => Some(LinkOrigin::Autolink),
        _ => None,
    }
}

fn link_target(body: &str, range: Range<usize>, dest: &str, origin: LinkOrigin, link_type: LinkType) -> Found {
    // pulldown-cmark drops the scheme of email autolinks
    let raw = if link_type == LinkType::Email {
        format!("mailto:{dest}")
    } else {
        dest.to_string()
    };
    // Point at the destination when we can find it, else at the link itself
    let chunk = body.get(range.clone()).unwrap_or_default();
    let offset = if dest.trim().is_empty() {
        range.start
    } else {
        chunk.rfind(dest).map_or(range.start, |i| range.start + i)
    };
    Found {
        raw,
        offset,
        span: range,
        origin,
    }
}

fn scan_bare_urls(body: &str, run: Range<usize>, found: &mut Vec<Found>) {
    let Some(text) = body.get(run.clone()) else {
        return;
    };
    if !text.contains("http") {
        return;
    }
    let Some(pattern) = bare_url_pattern() else {
        return;
    };
    for m in pattern.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if url.len() <= "https://".len() {
            continue;
        }
        found.push(Found {
            raw: url.to_string(),
            offset: run.start + m.start(),
            span: run.start + m.start()..run.start + m.end(),
            origin: LinkOrigin::Bare,
        });
    }
}

// `[id]: target` definitions as the parser recognized them, wherever they
// sit (block quotes and list items included). Footnotes (`[^1]:`) are not links.
fn scan_definitions(body: &str, definitions: &RefDefs<'_>, found: &mut Vec<Found>) {
    for (label, definition) in definitions.iter() {
        if label.starts_with('^') {
            continue;
        }
        let span = definition.span.clone();
        let dest: &str = &definition.dest;
        let chunk = body.get(span.clone()).unwrap_or_default();
        // The span starts at the label; point at the destination when it is
        // written verbatim after the colon
        let offset = match chunk.find("]:") {
            Some(colon) if !dest.trim().is_empty() => chunk[colon..]
                .find(dest)
                .map_or(span.start, |i| span.start + colon + i),
            _ => span.start,
        };
        found.push(Found {
            raw: dest.to_string(),
            offset,
            span,
            origin: LinkOrigin::Definition,
        });
    }
}

/// Classifies a raw target. None means "not a reference we understand";
/// such targets are silently dropped.
pub fn classify(raw: &str) -> Option<Target> {
    let target = raw.trim();
    if target.is_empty() {
        return Some(Target::Invalid(PathProblem::EmptyTarget));
    }

    if let Some(fragment) = target.strip_prefix('#') {
        return Some(Target::Fragment(decode(fragment)));
    }

    if target.starts_with("//") {
        return Url::parse(&format!("https:{target}")).ok().map(Target::Url);
    }

    if is_windows_absolute(target) {
        return Some(Target::Invalid(PathProblem::AbsoluteFilesystemPath));
    }

    if let Some(scheme) = uri_scheme(target) {
        return match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Url::parse(target).ok().map(Target::Url),
            "mailto" | "tel" => Some(Target::Skipped(SkipReason::MailOrPhone)),
            "file" => Some(Target::Invalid(PathProblem::AbsoluteFilesystemPath)),
            other => Some(Target::Skipped(SkipReason::UnsupportedScheme {
                scheme: other.to_string(),
            })),
        };
    }

    let (path, fragment) = match target.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (target, None),
    };
    // Query strings mean nothing for files on disk
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    let fragment = fragment.filter(|f| !f.is_empty()).map(decode);

    match (path.is_empty(), fragment) {
        (true, Some(fragment)) => Some(Target::Fragment(fragment)),
        (true, None) => None,
        (false, fragment) => Some(Target::Path {
            path: decode(path),
            fragment,
        }),
    }
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

// RFC 3986 scheme: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) followed by ':'
fn uri_scheme(target: &str) -> Option<&str> {
    let (scheme, _) = target.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    chars
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        .then_some(scheme)
}

// C:\docs\a.md, C:/docs/a.md
fn is_windows_absolute(target: &str) -> bool {
    let bytes = target.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}
