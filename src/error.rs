// src/error.rs
// =============================================================================
// Fatal errors: anything that stops a run before a report can exist.
//
// Per-document and per-reference problems never show up here; they are
// collected into the report instead. Every variant names the file or value
// involved so the message is enough to fix the problem by hand.
// =============================================================================

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A root given on the command line does not exist.
    #[error("root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    /// A configured entry point is not one of the loaded documents.
    #[error("entry point is not a loaded Markdown document: {path}")]
    EntryNotFound { path: String },

    #[error("invalid glob `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot read allow-list {}: {source}", path.display())]
    AllowListRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read cache {}: {source}", path.display())]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache exists but cannot be parsed. Delete it to start fresh.
    #[error("corrupt cache {}: {source}", path.display())]
    CacheCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write cache {}: {reason}", path.display())]
    CacheWrite { path: PathBuf, reason: String },

    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
