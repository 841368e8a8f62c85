// src/docs/mod.rs
// =============================================================================
// The document set of one run.
//
// Submodules:
// - loader: finds and reads Markdown files under the configured roots
// - frontmatter: YAML front matter markers and masking
//
// A Corpus is built once by the loader and only read afterwards.
// =============================================================================

pub mod frontmatter;
mod loader;

pub use loader::{load_corpus, parse_document};

use crate::model::{Document, LoadFailure};
use std::collections::HashMap;
use std::path::{Component, Path};

#[derive(Debug, Default)]
pub struct Corpus {
    /// Sorted by path.
    pub documents: Vec<Document>,
    /// Sorted by path.
    pub failures: Vec<LoadFailure>,
    index: HashMap<String, usize>,
}

impl Corpus {
    pub fn new(mut documents: Vec<Document>, mut failures: Vec<LoadFailure>) -> Self {
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        let index = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (doc.path.clone(), i))
            .collect();
        Self {
            documents,
            failures,
            index,
        }
    }

    /// Index of the document with this repository-relative path.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    pub fn document(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }
}

/// `/`-separated key for a relative path; `.` components are dropped.
pub fn path_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Key of `path` relative to the repository root.
pub fn repo_key(base_dir: &Path, path: &Path) -> String {
    path_key(path.strip_prefix(base_dir).unwrap_or(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_key() {
        assert_eq!(path_key(Path::new("./docs/guide.md")), "docs/guide.md");
        assert_eq!(path_key(Path::new("README.md")), "README.md");
        assert_eq!(repo_key(Path::new("/repo"), Path::new("/repo/docs/a.md")), "docs/a.md");
    }

    #[test]
    fn test_corpus_is_sorted_and_indexed() {
        let corpus = Corpus::new(
            vec![parse_document("z.md", String::new()), parse_document("a.md", String::new())],
            Vec::new(),
        );
        assert_eq!(corpus.documents[0].path, "a.md");
        assert_eq!(corpus.position("z.md"), Some(1));
        assert_eq!(corpus.position("missing.md"), None);
    }
}
