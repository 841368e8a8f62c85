// src/report.rs
// =============================================================================
// Reporter: turns verdicts and orphans into the final output and exit code.
//
// Ordering is total and independent of how the external checks interleaved:
// issues sort by (document, line, column, target), orphans by path. Two runs
// over the same tree print the same bytes.
//
// Output shapes:
// - text: issues grouped by document, then orphans, then a summary
// - JSON Lines: one object per issue / orphan / load failure
// =============================================================================

use crate::docs::Corpus;
use crate::model::{LinkOrigin, LoadFailure, Reference, ReferenceKind, Verdict};
use serde::Serialize;
use std::collections::BTreeMap;

/// A reference whose verdict belongs in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub document: String,
    pub line: usize,
    pub column: usize,
    pub target: String,
    pub kind: ReferenceKind,
    pub origin: LinkOrigin,
    pub verdict: Verdict,
    /// Human-readable form of the verdict.
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub documents: usize,
    pub references: usize,
    pub valid: usize,
    pub skipped: usize,
    pub broken: usize,
    pub orphans: usize,
    pub load_failures: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub issues: Vec<Issue>,
    pub orphans: Vec<String>,
    pub load_failures: Vec<LoadFailure>,
    pub summary: Summary,
}

// One line of --json output
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonLine<'a> {
    Issue(&'a Issue),
    Orphan { path: &'a str },
    LoadFailure(&'a LoadFailure),
}

impl Report {
    /// `verdicts[i]` is the verdict of `references[i]`.
    pub fn build(corpus: &Corpus, references: &[Reference], verdicts: &[Verdict], orphans: Vec<String>) -> Self {
        let mut issues: Vec<Issue> = references
            .iter()
            .zip(verdicts)
            .filter(|(_, verdict)| verdict.is_issue())
            .map(|(reference, verdict)| Issue {
                document: reference.source.clone(),
                line: reference.line,
                column: reference.column,
                target: reference.target_raw.clone(),
                kind: reference.kind(),
                origin: reference.origin,
                verdict: verdict.clone(),
                message: verdict.to_string(),
            })
            .collect();
        issues.sort_by(|a, b| {
            (&a.document, a.line, a.column, &a.target).cmp(&(&b.document, b.line, b.column, &b.target))
        });

        let mut orphans = orphans;
        orphans.sort();

        let mut load_failures = corpus.failures.clone();
        load_failures.sort_by(|a, b| a.path.cmp(&b.path));

        let summary = Summary {
            documents: corpus.documents.len(),
            references: references.len(),
            valid: verdicts.iter().filter(|v| matches!(v, Verdict::Valid)).count(),
            skipped: verdicts
                .iter()
                .filter(|v| matches!(v, Verdict::SkippedByConfig { .. }))
                .count(),
            broken: issues.len(),
            orphans: orphans.len(),
            load_failures: load_failures.len(),
        };

        Self {
            issues,
            orphans,
            load_failures,
            summary,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.orphans.is_empty() && self.load_failures.is_empty()
    }

    /// 0 when clean, 1 when anything was found.
    pub fn exit_code(&self) -> i32 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }

    /// Grouped human-readable report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        // Load failures sit at line 0, ahead of the document's issues
        let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for failure in &self.load_failures {
            groups
                .entry(failure.path.as_str())
                .or_default()
                .push(format!("{}:0:0: cannot load: {}", failure.path, failure.reason));
        }
        for issue in &self.issues {
            groups.entry(issue.document.as_str()).or_default().push(format!(
                "{}:{}:{}: {} ({})",
                issue.document, issue.line, issue.column, issue.message, issue.target
            ));
        }

        for (document, lines) in &groups {
            out.push_str(&format!("❌ {document}\n"));
            for line in lines {
                out.push_str(&format!("   {line}\n"));
            }
            out.push('\n');
        }

        if !self.orphans.is_empty() {
            out.push_str("👻 Orphaned documents (not reachable from any entry point):\n");
            for orphan in &self.orphans {
                out.push_str(&format!("   {orphan}\n"));
            }
            out.push('\n');
        }

        let s = &self.summary;
        out.push_str("📊 Summary:\n");
        out.push_str(&format!("   📄 Documents: {}\n", s.documents));
        out.push_str(&format!("   🔗 References: {}\n", s.references));
        out.push_str(&format!("   ✅ OK: {}\n", s.valid));
        out.push_str(&format!("   ⏭️  Skipped: {}\n", s.skipped));
        out.push_str(&format!("   ❌ Broken: {}\n", s.broken));
        out.push_str(&format!("   👻 Orphans: {}\n", s.orphans));
        if s.load_failures > 0 {
            out.push_str(&format!("   ⚠️  Unreadable: {}\n", s.load_failures));
        }
        out
    }

    /// One JSON object per line: load failures and issues in document
    /// order, then orphans.
    pub fn render_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut entries: Vec<(&str, usize, JsonLine<'_>)> = Vec::new();
        for failure in &self.load_failures {
            entries.push((failure.path.as_str(), 0, JsonLine::LoadFailure(failure)));
        }
        for issue in &self.issues {
            entries.push((issue.document.as_str(), issue.line, JsonLine::Issue(issue)));
        }
        // Stable: issues keep their (column, target) order within a line
        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        entries.extend(
            self.orphans
                .iter()
                .map(|path| (path.as_str(), 0, JsonLine::Orphan { path })),
        );

        let mut out = String::new();
        for (_, _, entry) in &entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}
