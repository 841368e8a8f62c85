// src/graph/mod.rs
// =============================================================================
// Reference Graph: documents and link targets as nodes, references as edges.
//
// Node ids:
// - 0..n are the loaded documents, in corpus order (node id == document index)
// - n is the single Unchecked sink (skipped schemes, malformed targets)
// - everything after is created on demand: assets, missing paths and one
//   External node per distinct URL
//
// Edge i belongs to reference i, so every reference owns exactly one edge.
// Several edges may join the same pair of nodes.
//
// Local targets are resolved while building (the filesystem is consulted
// once per edge); the resolver and the orphan detector only read the result.
// =============================================================================

mod orphans;

pub use orphans::find_orphans;

use crate::docs::Corpus;
use crate::model::{PathProblem, Reference, ReferenceKind, Target};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use url::Url;

pub type NodeId = usize;

// Tried in order when a link points at a directory
const DIRECTORY_INDEXES: &[&str] = &["README.md", "readme.md", "index.md"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Document { doc: usize },
    /// An existing file or directory that is not a loaded document.
    Asset { path: String },
    Missing { path: String, problem: PathProblem },
    External { url: Url },
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: ReferenceKind,
}

// Dedup key for nodes created on demand
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Asset(String),
    Missing(String),
    External(String),
}

#[derive(Debug, Default)]
pub struct ReferenceGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<usize>>,
    keys: HashMap<NodeKey, NodeId>,
    unchecked: NodeId,
}

impl ReferenceGraph {
    /// Build the graph. `references` must come from documents of `corpus`;
    /// `base_dir` is the repository root used for filesystem lookups.
    pub fn build(corpus: &Corpus, references: &[Reference], base_dir: &Path) -> Self {
        let mut graph = Self::default();
        for doc in 0..corpus.documents.len() {
            graph.push_node(Node::Document { doc });
        }
        graph.unchecked = graph.push_node(Node::Unchecked);

        for reference in references {
            let from = match corpus.position(&reference.source) {
                Some(doc) => doc,
                None => {
                    debug!("Reference from unknown document {}", reference.source);
                    graph.unchecked
                }
            };
            let to = match &reference.target {
                Target::Fragment(_) => from,
                Target::Path { path, .. } => graph.local_node(corpus, base_dir, &reference.source, path),
                Target::Url(url) => graph.external_node(url),
                Target::Skipped(_) | Target::Invalid(_) => graph.unchecked,
            };
            graph.push_edge(Edge {
                from,
                to,
                kind: reference.kind(),
            });
        }

        debug!(
            "Reference graph: {} nodes, {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );
        graph
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// The edge of reference `index`.
    pub fn edge(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|&e| self.edges.get(e))
    }

    /// Document index behind a node, if the node is a document.
    pub fn document_of(&self, id: NodeId) -> Option<usize> {
        match self.nodes.get(id) {
            Some(Node::Document { doc }) => Some(*doc),
            _ => None,
        }
    }

    /// Every distinct external URL, in node order.
    pub fn external_urls(&self) -> impl Iterator<Item = (NodeId, &Url)> {
        self.nodes.iter().enumerate().filter_map(|(id, node)| match node {
            Node::External { url } => Some((id, url)),
            _ => None,
        })
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.nodes.len() - 1
    }

    fn push_edge(&mut self, edge: Edge) {
        if let Some(out) = self.outgoing.get_mut(edge.from) {
            out.push(self.edges.len());
        }
        self.edges.push(edge);
    }

    fn keyed_node(&mut self, key: NodeKey, node: impl FnOnce() -> Node) -> NodeId {
        if let Some(&id) = self.keys.get(&key) {
            return id;
        }
        let id = self.push_node(node());
        self.keys.insert(key, id);
        id
    }

    fn external_node(&mut self, url: &Url) -> NodeId {
        let normalized = normalize_url(url);
        let key = NodeKey::External(normalized.to_string());
        self.keyed_node(key, || Node::External { url: normalized })
    }

    fn local_node(&mut self, corpus: &Corpus, base_dir: &Path, source: &str, target: &str) -> NodeId {
        match resolve_local(corpus, base_dir, source, target) {
            LocalTarget::Document(doc) => doc,
            LocalTarget::Asset(path) => {
                self.keyed_node(NodeKey::Asset(path.clone()), || Node::Asset { path })
            }
            LocalTarget::Missing(path, problem) => {
                self.keyed_node(NodeKey::Missing(path.clone()), || Node::Missing { path, problem })
            }
        }
    }
}

/// The form used for dedup and caching: no fragment, everything else kept.
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized
}

enum LocalTarget {
    Document(usize),
    Asset(String),
    Missing(String, PathProblem),
}

fn resolve_local(corpus: &Corpus, base_dir: &Path, source: &str, target: &str) -> LocalTarget {
    let key = match join_key(source, target) {
        Ok(key) => key,
        Err(problem) => return LocalTarget::Missing(target.to_string(), problem),
    };

    if let Some(doc) = corpus.position(&key) {
        return LocalTarget::Document(doc);
    }

    let on_disk = base_dir.join(&key);
    if on_disk.is_dir() {
        let index = DIRECTORY_INDEXES
            .iter()
            .find_map(|name| corpus.position(&join_segments(&key, name)));
        return match index {
            Some(doc) => LocalTarget::Document(doc),
            None => LocalTarget::Asset(key),
        };
    }
    if on_disk.exists() {
        return LocalTarget::Asset(key);
    }

    // `guide` for `guide.md`
    if Path::new(&key).extension().is_none() {
        if let Some(doc) = corpus.position(&format!("{key}.md")) {
            return LocalTarget::Document(doc);
        }
    }

    // A real absolute path on this machine leaked into the document
    if target.starts_with('/') && Path::new(target).exists() {
        return LocalTarget::Missing(target.to_string(), PathProblem::AbsoluteFilesystemPath);
    }

    LocalTarget::Missing(key.clone(), PathProblem::NotFound { resolved: key })
}

/// Resolve `target` against the directory of `source` (or against the
/// repository root when it starts with `/`), purely lexically.
pub fn join_key(source: &str, target: &str) -> Result<String, PathProblem> {
    let mut parts: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        let mut dir: Vec<&str> = source.split('/').collect();
        dir.pop();
        dir
    };

    for segment in target.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(PathProblem::OutsideRepository);
                }
            }
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}

fn join_segments(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
