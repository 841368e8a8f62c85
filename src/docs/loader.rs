// src/docs/loader.rs
// =============================================================================
// Document Loader
//
// Walks every root, keeps Markdown files that are not ignored, and reads each
// one into a Document. A file that cannot be read (I/O error, not UTF-8)
// becomes a LoadFailure and the run goes on without it.
//
// NOTES:
// - Walk order is sorted by file name and the final set is keyed by path, so
//   overlapping roots and repeated runs give the same corpus
// - `.git` directories are never entered
// - Symlinks are not followed
// =============================================================================

use super::{frontmatter, repo_key, Corpus};
use crate::config::Config;
use crate::markdown::build_anchor_index;
use crate::model::{Document, LoadFailure};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

pub fn load_corpus(config: &Config) -> Corpus {
    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut failures = Vec::new();

    for root in &config.roots {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_git_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| repo_key(&config.base_dir, p))
                        .unwrap_or_else(|| repo_key(&config.base_dir, root));
                    warn!("Cannot walk {}: {}", path, err);
                    failures.push(LoadFailure {
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                continue;
            }
            let key = repo_key(&config.base_dir, entry.path());
            if config.is_ignored(&key) {
                debug!("Ignoring {}", key);
                continue;
            }
            found.insert(key, entry.into_path());
        }
    }

    let mut documents = Vec::with_capacity(found.len());
    for (key, path) in found {
        match read_document(&key, &path) {
            Ok(doc) => documents.push(doc),
            Err(reason) => {
                warn!("Cannot load {}: {}", key, reason);
                failures.push(LoadFailure { path: key, reason });
            }
        }
    }

    info!(
        "Loaded {} documents ({} failed)",
        documents.len(),
        failures.len()
    );
    Corpus::new(documents, failures)
}

fn read_document(key: &str, path: &Path) -> Result<Document, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read file: {e}"))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| format!("not valid UTF-8: {}", e.utf8_error()))?;
    let doc = parse_document(key, text);
    debug!(
        "{}: {} headings, {} anchors",
        doc.path,
        doc.headings.len(),
        doc.anchors.len()
    );
    for heading in &doc.headings {
        trace!("{}: h{} {:?} -> {:?}", doc.path, heading.level, heading.text, heading.slug);
    }
    Ok(doc)
}

/// Build a Document from its text: headings, anchors and front matter.
pub fn parse_document(path: &str, raw_text: String) -> Document {
    let front = frontmatter::parse(&raw_text);
    let index = build_anchor_index(&frontmatter::mask(&raw_text));
    Document {
        path: path.to_string(),
        raw_text,
        headings: index.headings,
        anchors: index.anchors,
        orphan_exempt: front.orphan_exempt,
    }
}

fn is_git_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == ".git"
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|m| ext.eq_ignore_ascii_case(m))
        })
}
