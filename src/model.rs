// src/model.rs
// =============================================================================
// Core data types shared by every stage of a run.
//
// Lifecycle:
// - Documents are created once by the loader and never change afterwards
// - References are created by the extractor and never change either; the
//   resolver produces one Verdict per reference, stored by reference index
// - Nothing here is persisted except Verdicts, through the URL cache
// =============================================================================

use crate::docs::frontmatter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// One heading of a document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    /// Disambiguated slug, unique within the document. Empty slugs are
    /// never stored (the heading simply has no anchor).
    pub slug: Option<String>,
}

/// A successfully loaded Markdown file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the repository root, `/`-separated. Identity.
    pub path: String,
    pub raw_text: String,
    pub headings: Vec<Heading>,
    /// Lowercase anchors: heading slugs plus explicit HTML/attribute ids.
    pub anchors: BTreeSet<String>,
    /// Excluded from orphan detection via front matter.
    pub orphan_exempt: bool,
}

impl Document {
    // Anchors are stored lowercase, lookups fold case.
    pub fn has_anchor(&self, fragment: &str) -> bool {
        self.anchors.contains(&fragment.to_lowercase())
    }

    /// Text to parse: the raw text with its front matter blanked out.
    pub fn body(&self) -> Cow<'_, str> {
        frontmatter::mask(&self.raw_text)
    }
}

/// A file that was discovered but could not be turned into a Document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    LocalFile,
    LocalAnchor,
    CrossFileAnchor,
    ExternalUrl,
}

/// Which Markdown construct a reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOrigin {
    Inline,
    Image,
    Autolink,
    Definition,
    Bare,
    Html,
}

/// The parsed meaning of a link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `#fragment` within the same document.
    Fragment(String),
    /// A local path, relative to the source document or (leading `/`) to
    /// the repository root. Both parts are percent-decoded.
    Path {
        path: String,
        fragment: Option<String>,
    },
    /// `http(s)://` (or protocol-relative) URL.
    Url(url::Url),
    /// Never checked; the verdict is already known.
    Skipped(SkipReason),
    /// Can never resolve; the verdict is already known.
    Invalid(PathProblem),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Path of the owning Document.
    pub source: String,
    /// The target exactly as written. Never empty: an empty target is
    /// recorded as the whole link markup instead.
    pub target_raw: String,
    pub target: Target,
    pub line: usize,
    pub column: usize,
    pub origin: LinkOrigin,
}

impl Reference {
    pub fn kind(&self) -> ReferenceKind {
        match &self.target {
            Target::Fragment(_) => ReferenceKind::LocalAnchor,
            Target::Path {
                fragment: Some(_), ..
            } => ReferenceKind::CrossFileAnchor,
            Target::Path { fragment: None, .. } | Target::Invalid(_) => ReferenceKind::LocalFile,
            Target::Url(_) | Target::Skipped(_) => ReferenceKind::ExternalUrl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum PathProblem {
    EmptyTarget,
    NotFound { resolved: String },
    AbsoluteFilesystemPath,
    OutsideRepository,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum UrlFailure {
    HttpStatus { status: u16 },
    Timeout,
    Connection { message: String },
    TooManyRedirects,
    Tls,
    Other { message: String },
    /// The global deadline fired before this check finished.
    DeadlineNotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "skip", rename_all = "snake_case")]
pub enum SkipReason {
    MailOrPhone,
    UnsupportedScheme { scheme: String },
    AllowListed,
    Offline,
}

/// Outcome of resolving one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    BrokenLocalPath { reason: PathProblem },
    BrokenAnchor { anchor: String, document: String },
    UnreachableUrl { reason: UrlFailure },
    SkippedByConfig { reason: SkipReason },
}

impl Verdict {
    /// Does this verdict belong in the report?
    pub fn is_issue(&self) -> bool {
        !matches!(self, Verdict::Valid | Verdict::SkippedByConfig { .. })
    }
}

impl fmt::Display for PathProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathProblem::EmptyTarget => write!(f, "empty link target"),
            PathProblem::NotFound { resolved } => write!(f, "no such file `{resolved}`"),
            PathProblem::AbsoluteFilesystemPath => write!(f, "absolute filesystem path"),
            PathProblem::OutsideRepository => write!(f, "path escapes the repository root"),
        }
    }
}

impl fmt::Display for UrlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlFailure::HttpStatus { status } => write!(f, "HTTP {status}"),
            UrlFailure::Timeout => write!(f, "request timed out"),
            UrlFailure::Connection { message } => write!(f, "connection failed: {message}"),
            UrlFailure::TooManyRedirects => write!(f, "too many redirects"),
            UrlFailure::Tls => write!(f, "TLS certificate error"),
            UrlFailure::Other { message } => write!(f, "{message}"),
            UrlFailure::DeadlineNotAttempted => write!(f, "timed out, not attempted"),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MailOrPhone => write!(f, "mailto/tel link"),
            SkipReason::UnsupportedScheme { scheme } => write!(f, "unsupported scheme `{scheme}:`"),
            SkipReason::AllowListed => write!(f, "allow-listed"),
            SkipReason::Offline => write!(f, "offline mode"),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Valid => write!(f, "ok"),
            Verdict::BrokenLocalPath { reason } => write!(f, "broken local path: {reason}"),
            Verdict::BrokenAnchor { anchor, document } => {
                if anchor.is_empty() {
                    write!(f, "broken anchor: empty fragment")
                } else {
                    write!(f, "broken anchor: no `#{anchor}` in {document}")
                }
            }
            Verdict::UnreachableUrl { reason } => write!(f, "unreachable URL: {reason}"),
            Verdict::SkippedByConfig { reason } => write!(f, "skipped: {reason}"),
        }
    }
}
