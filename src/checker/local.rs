// src/checker/local.rs
// =============================================================================
// Verdicts for local references: files, directories and anchors.
//
// All the filesystem work already happened while building the graph; here we
// only read the node an edge points at.
// =============================================================================

use crate::docs::Corpus;
use crate::graph::{Node, ReferenceGraph};
use crate::model::{Document, PathProblem, Reference, Target, Verdict};
use tracing::debug;

/// Verdict of a reference that needs no network. `index` is the reference's
/// position, which is also its edge in the graph. None for `http(s)` URLs.
pub fn local_verdict(corpus: &Corpus, graph: &ReferenceGraph, index: usize, reference: &Reference) -> Option<Verdict> {
    let target_node = graph.edge(index).and_then(|edge| graph.node(edge.to));

    let verdict = match &reference.target {
        Target::Invalid(problem) => Verdict::BrokenLocalPath {
            reason: problem.clone(),
        },
        Target::Fragment(fragment) => match target_node {
            Some(Node::Document { doc }) => anchor_verdict(corpus.document(*doc), fragment),
            _ => broken_anchor(fragment, &reference.source),
        },
        Target::Path { fragment, .. } => match target_node {
            Some(Node::Missing { problem, .. }) => Verdict::BrokenLocalPath {
                reason: problem.clone(),
            },
            Some(Node::Document { doc }) => match fragment {
                Some(fragment) => anchor_verdict(corpus.document(*doc), fragment),
                None => Verdict::Valid,
            },
            // Exists, but not a Markdown document we loaded: the anchor
            // cannot be checked, the file itself is fine
            Some(Node::Asset { path }) => {
                if fragment.is_some() {
                    debug!("{}: anchor into {} not checked", reference.source, path);
                }
                Verdict::Valid
            }
            Some(Node::External { .. } | Node::Unchecked) | None => Verdict::BrokenLocalPath {
                reason: PathProblem::NotFound {
                    resolved: reference.target_raw.clone(),
                },
            },
        },
        Target::Skipped(reason) => Verdict::SkippedByConfig {
            reason: reason.clone(),
        },
        Target::Url(_) => return None,
    };
    Some(verdict)
}

fn anchor_verdict(document: Option<&Document>, fragment: &str) -> Verdict {
    match document {
        Some(doc) if !fragment.is_empty() && doc.has_anchor(fragment) => Verdict::Valid,
        Some(doc) => broken_anchor(fragment, &doc.path),
        None => broken_anchor(fragment, ""),
    }
}

fn broken_anchor(fragment: &str, document: &str) -> Verdict {
    Verdict::BrokenAnchor {
        anchor: fragment.to_string(),
        document: document.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::parse_document;
    use crate::markdown::extract_references;
    use std::fs;

    fn verdicts(files: &[(&str, &str)]) -> Vec<(String, Verdict)> {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let mut documents = Vec::new();
        for (path, text) in files {
            let full = base.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, text).unwrap();
            if path.ends_with(".md") {
                documents.push(parse_document(path, text.to_string()));
            }
        }
        let corpus = Corpus::new(documents, Vec::new());
        let references: Vec<Reference> = corpus
            .documents
            .iter()
            .flat_map(|d| extract_references(&d.path, &d.body()))
            .collect();
        let graph = ReferenceGraph::build(&corpus, &references, &base);
        references
            .iter()
            .enumerate()
            .filter_map(|(i, r)| Some((r.target_raw.clone(), local_verdict(&corpus, &graph, i, r)?)))
            .collect()
    }

    #[test]
    fn test_cross_file_anchor_present_and_missing() {
        let results = verdicts(&[
            ("docs/a.md", "[ok](./b.md#setup) [bad](./b.md#install)\n"),
            ("docs/b.md", "# Guide\n\n## Setup\n"),
        ]);
        assert_eq!(results[0].1, Verdict::Valid);
        assert_eq!(
            results[1].1,
            Verdict::BrokenAnchor {
                anchor: "install".to_string(),
                document: "docs/b.md".to_string()
            }
        );
    }

    #[test]
    fn test_missing_file_reports_the_raw_target() {
        let results = verdicts(&[("README.md", "[c](./docs/c.md)\n")]);
        assert_eq!(results[0].0, "./docs/c.md");
        assert_eq!(
            results[0].1,
            Verdict::BrokenLocalPath {
                reason: PathProblem::NotFound { resolved: "docs/c.md".to_string() }
            }
        );
    }

    #[test]
    fn test_local_anchor_case_insensitive_and_empty() {
        let results = verdicts(&[("a.md", "## Usage Notes\n\n[x](#Usage-Notes) [y](#) [z](#nope)\n")]);
        assert_eq!(results[0].1, Verdict::Valid);
        assert!(matches!(&results[1].1, Verdict::BrokenAnchor { anchor, .. } if anchor.is_empty()));
        assert!(matches!(&results[2].1, Verdict::BrokenAnchor { anchor, .. } if anchor == "nope"));
    }

    #[test]
    fn test_anchor_into_non_markdown_file_is_not_checked() {
        let results = verdicts(&[
            ("a.md", "[src](src/main.rs#L10) [dir](src/)\n"),
            ("src/main.rs", "fn main() {}\n"),
        ]);
        assert_eq!(results[0].1, Verdict::Valid);
        assert_eq!(results[1].1, Verdict::Valid);
    }

    #[test]
    fn test_empty_and_escaping_targets() {
        let results = verdicts(&[("a.md", "[gone]() [up](../outside.md)\n")]);
        assert_eq!(results[0].1, Verdict::BrokenLocalPath { reason: PathProblem::EmptyTarget });
        assert_eq!(results[1].1, Verdict::BrokenLocalPath { reason: PathProblem::OutsideRepository });
    }
}
