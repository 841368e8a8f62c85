// src/markdown/slug.rs
// =============================================================================
// Heading slugs, GitHub style.
//
//   1. trim and lowercase the rendered heading text
//   2. each run of whitespace becomes one `-`
//   3. drop everything that is not alphanumeric, `-` or `_`
//   4. repeated slugs get `-1`, `-2`, ... in document order
//
// Hyphens are never collapsed: "A - B" is "a---b", as on GitHub.
// =============================================================================

use std::collections::{HashMap, HashSet};

pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut in_whitespace = false;

    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            slug.push(ch);
        }
    }

    slug
}

/// Hands out unique slugs for the headings of one document.
#[derive(Debug, Default)]
pub struct Slugger {
    // base slug -> next suffix to try
    counts: HashMap<String, usize>,
    taken: HashSet<String>,
}

impl Slugger {
    /// Marks a slug as used without generating it (explicit heading ids).
    pub fn reserve(&mut self, slug: &str) {
        self.taken.insert(slug.to_string());
    }

    /// Slug for the next heading, or None when the text has no sluggable
    /// characters at all.
    pub fn next_slug(&mut self, heading_text: &str) -> Option<String> {
        let base = slugify(heading_text);
        if base.is_empty() {
            return None;
        }

        let count = self.counts.entry(base.clone()).or_insert(0);
        let mut candidate = if *count == 0 {
            base.clone()
        } else {
            format!("{base}-{count}")
        };
        // "Foo", "Foo", "Foo 1" must not produce "foo-1" twice
        while self.taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{base}-{count}");
        }
        *count += 1;

        self.taken.insert(candidate.clone());
        Some(candidate)
    }
}
