// src/docs/frontmatter.rs
// =============================================================================
// YAML front matter: the `---` block at the very top of a document.
//
// Two jobs:
// - read the markers that exempt a document from orphan detection
// - blank the block out before Markdown parsing, so its lines are neither
//   scanned for links nor mistaken for a setext heading (`---` underlines)
//
// Blanking keeps every newline, so byte offsets and line numbers of the rest
// of the document are unchanged.
// =============================================================================

use serde::Deserialize;
use std::borrow::Cow;
use std::ops::Range;

#[derive(Debug, Default, Deserialize)]
struct Markers {
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    template: bool,
    orphan_check: Option<bool>,
}

/// What the loader needs to know from the front matter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrontMatter {
    /// `draft: true`, `template: true` or `orphan_check: false`
    pub orphan_exempt: bool,
}

// Byte range of the whole block (delimiters included) and of the YAML inside.
fn locate(text: &str) -> Option<(Range<usize>, Range<usize>)> {
    let text_start = if text.starts_with('\u{feff}') { '\u{feff}'.len_utf8() } else { 0 };
    let rest = &text[text_start..];
    let first_line_len = rest.find('\n').map_or(rest.len(), |i| i + 1);
    if rest[..first_line_len].trim_end() != "---" {
        return None;
    }

    let yaml_start = text_start + first_line_len;
    let mut offset = yaml_start;
    for line in text[yaml_start..].split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some((text_start..offset + line.len(), yaml_start..offset));
        }
        offset += line.len();
    }
    None
}

/// Parse the front matter markers. Malformed YAML counts as no front matter.
pub fn parse(text: &str) -> FrontMatter {
    let Some((_, yaml)) = locate(text) else {
        return FrontMatter::default();
    };
    let yaml = &text[yaml];
    if yaml.trim().is_empty() {
        return FrontMatter::default();
    }
    match serde_yaml::from_str::<Markers>(yaml) {
        Ok(markers) => FrontMatter {
            orphan_exempt: markers.draft || markers.template || markers.orphan_check == Some(false),
        },
        Err(e) => {
            tracing::debug!("ignoring malformed front matter: {e}");
            FrontMatter::default()
        }
    }
}

/// The document text with the front matter replaced by blank lines.
pub fn mask(text: &str) -> Cow<'_, str> {
    let Some((block, _)) = locate(text) else {
        return Cow::Borrowed(text);
    };
    let mut masked = String::with_capacity(text.len());
    masked.push_str(&text[..block.start]);
    for ch in text[block.clone()].chars() {
        // Keep byte length identical so offsets stay valid
        match ch {
            '\n' | '\r' => masked.push(ch),
            _ => masked.extend(std::iter::repeat(' ').take(ch.len_utf8())),
        }
    }
    masked.push_str(&text[block.end..]);
    Cow::Owned(masked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_marker_exempts() {
        let text = "---\ntitle: Notes\ndraft: true\n---\n# Notes\n";
        assert!(parse(text).orphan_exempt);
    }

    #[test]
    fn test_orphan_check_false_exempts() {
        let text = "---\norphan_check: false\n---\n";
        assert!(parse(text).orphan_exempt);
        assert!(!parse("---\norphan_check: true\n---\n").orphan_exempt);
    }

    #[test]
    fn test_no_front_matter() {
        assert_eq!(parse("# Title\n---\n"), FrontMatter::default());
        assert!(matches!(mask("# Title\n"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_malformed_yaml_is_ignored() {
        let text = "---\ndraft: [unclosed\n---\n";
        assert!(!parse(text).orphan_exempt);
    }

    #[test]
    fn test_mask_keeps_offsets_and_lines() {
        let text = "---\nlink: \"[x](nope.md)\"\n---\n# Title\n";
        let masked = mask(text);
        assert_eq!(masked.len(), text.len());
        assert_eq!(masked.lines().count(), text.lines().count());
        assert!(!masked.contains("nope.md"));
        assert!(masked.ends_with("# Title\n"));
    }

    #[test]
    fn test_unterminated_block_is_not_front_matter() {
        let text = "---\ntitle: x\n# Title\n";
        assert!(matches!(mask(text), Cow::Borrowed(_)));
    }
}
