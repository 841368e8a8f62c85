// src/graph/orphans.rs
// =============================================================================
// Orphan Detector: documents that cannot be reached from any entry point.
//
// Breadth-first walk over the reference graph:
// 1. Mark front-matter exempt documents as reachable up front
// 2. Queue the entry points
// 3. Pop a document, follow its file links (LocalFile / CrossFileAnchor) to
//    other documents, queue the ones not seen yet
// 4. Whatever is still unvisited at the end is an orphan
//
// NOTES:
// - External edges never make a document reachable
// - Exempt documents are not expanded: their links do not rescue anything.
//   An exempt document that is also an entry point is expanded.
// - States only move forward (Unvisited -> Reachable)
// =============================================================================

use super::ReferenceGraph;
use crate::docs::Corpus;
use crate::error::Error;
use crate::model::ReferenceKind;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Unvisited,
    Reachable,
}

/// Paths of orphaned documents, sorted.
///
/// `entries` are repository-relative document paths. When empty, every
/// `README.md` / `index.md` (any case) is an entry point. A configured
/// entry that is not a loaded document is an error.
pub fn find_orphans(graph: &ReferenceGraph, corpus: &Corpus, entries: &[String]) -> Result<Vec<String>, Error> {
    let entry_docs = entry_points(corpus, entries)?;
    if entry_docs.is_empty() {
        warn!("No entry points (README.md or index.md) found; skipping orphan detection");
        return Ok(Vec::new());
    }

    let mut state = vec![NodeState::Unvisited; corpus.documents.len()];
    for (i, doc) in corpus.documents.iter().enumerate() {
        if doc.orphan_exempt {
            debug!("{} is exempt from orphan detection", doc.path);
            state[i] = NodeState::Reachable;
        }
    }

    let mut queue: VecDeque<usize> = VecDeque::new();
    for &doc in &entry_docs {
        state[doc] = NodeState::Reachable;
        queue.push_back(doc);
    }

    while let Some(doc) = queue.pop_front() {
        for edge in graph.outgoing(doc) {
            if !matches!(edge.kind, ReferenceKind::LocalFile | ReferenceKind::CrossFileAnchor) {
                continue;
            }
            let Some(next) = graph.document_of(edge.to) else {
                continue;
            };
            if state[next] == NodeState::Unvisited {
                state[next] = NodeState::Reachable;
                queue.push_back(next);
            }
        }
    }

    let orphans: Vec<String> = corpus
        .documents
        .iter()
        .zip(&state)
        .filter(|(_, s)| **s == NodeState::Unvisited)
        .map(|(doc, _)| doc.path.clone())
        .collect();
    info!(
        "{} entry point(s), {} orphan(s)",
        entry_docs.len(),
        orphans.len()
    );
    Ok(orphans)
}

fn entry_points(corpus: &Corpus, entries: &[String]) -> Result<Vec<usize>, Error> {
    if entries.is_empty() {
        return Ok(corpus
            .documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| is_default_entry(&doc.path))
            .map(|(i, _)| i)
            .collect());
    }
    entries
        .iter()
        .map(|entry| {
            corpus
                .position(entry)
                .ok_or_else(|| Error::EntryNotFound { path: entry.clone() })
        })
        .collect()
}

fn is_default_entry(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.eq_ignore_ascii_case("README.md") || name.eq_ignore_ascii_case("index.md")
}
