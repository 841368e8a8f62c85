// src/main.rs
// =============================================================================
// Entry point of the check-links CLI.
//
// What happens here:
// 1. Parse command-line arguments (clap) and set up logging on stderr
// 2. Build the one immutable Config (defaults, config file, flags)
// 3. Run the pipeline:
//    load documents -> extract references -> build the graph
//    -> find orphans -> resolve every reference -> build the report
// 4. Save the URL cache, print the report, exit
//
// Exit codes: 0 = clean, 1 = issues found, 2 = fatal error.
// stdout carries only the report; everything else goes to stderr.
// =============================================================================

mod checker;
mod cli;
mod config;
mod docs;
mod error;
mod graph;
mod markdown;
mod model;
mod report;

use anyhow::{Context, Result};
use checker::{HttpProbe, Probe, Resolver, VerdictCache};
use clap::Parser;
use cli::Cli;
use config::Config;
use error::Error;
use graph::{find_orphans, ReferenceGraph};
use report::Report;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // The working directory is the repository root
    let base_dir = std::env::current_dir()
        .and_then(|dir| dir.canonicalize())
        .context("cannot determine the working directory")?;
    let config = Config::from_cli(&cli, &base_dir)?;

    let cache = match (&config.cache_file, config.offline) {
        (Some(path), false) => VerdictCache::load(path, config.cache_ttl)?,
        _ => VerdictCache::in_memory(),
    };
    let probe = HttpProbe::new(&config.http)?;

    let report = check_repository(&config, &cache, &probe).await?;

    // A cache that cannot be written costs the next run some time, nothing more
    if let Err(e) = cache.save() {
        warn!("{}", e);
    }

    if cli.json {
        print!("{}", report.render_json_lines()?);
    } else {
        print!("{}", report.render_text());
    }

    Ok(report.exit_code())
}

/// The whole pipeline over one configuration. Only fatal problems are
/// errors; everything else lands in the report.
async fn check_repository<P: Probe>(config: &Config, cache: &VerdictCache, probe: &P) -> Result<Report, Error> {
    let corpus = docs::load_corpus(config);
    let references = markdown::extract_all(&corpus);
    info!(
        "Found {} references in {} documents",
        references.len(),
        corpus.documents.len()
    );

    let graph = ReferenceGraph::build(&corpus, &references, &config.base_dir);
    debug!("{} edges in the reference graph", graph.edges().len());

    // Before any network traffic, so a bad --entry fails fast
    let orphans = find_orphans(&graph, &corpus, &config.entries)?;

    let verdicts = Resolver::new(config, cache, probe)
        .resolve(&corpus, &graph, &references)
        .await;

    Ok(Report::build(&corpus, &references, &verdicts, orphans))
}

// RUST_LOG wins when set; otherwise -v / -vv raise our own level only
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,check_links={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use checker::{Attempt, FakeProbe};
    use model::{PathProblem, UrlFailure, Verdict};
    use std::fs;
    use std::path::Path;

    fn write(base: &Path, files: &[(&str, &str)]) {
        for (path, text) in files {
            let full = base.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, text).unwrap();
        }
    }

    async fn check(files: &[(&str, &str)], probe: &FakeProbe) -> Report {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        write(&base, files);
        let config = Config::for_base_dir(&base);
        check_repository(&config, &VerdictCache::in_memory(), probe)
            .await
            .unwrap()
    }

    fn offline() -> FakeProbe {
        FakeProbe::new(Attempt::Failed(UrlFailure::Other {
            message: "no network in tests".to_string(),
        }))
    }

    #[tokio::test]
    async fn test_anchor_present_is_valid() {
        let report = check(
            &[
                ("README.md", "[a](a.md) [b](b.md)\n"),
                ("a.md", "[see b](./b.md#setup)\n"),
                ("b.md", "# B\n\n## Setup\n"),
            ],
            &offline(),
        )
        .await;
        assert!(report.is_clean(), "{}", report.render_text());
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_anchor_missing_is_broken_anchor() {
        let report = check(
            &[
                ("README.md", "[a](a.md)\n"),
                ("a.md", "[see b](./b.md#missing)\n"),
                ("b.md", "## Setup\n"),
            ],
            &offline(),
        )
        .await;
        assert_eq!(report.issues.len(), 1);
        assert_eq!(
            report.issues[0].verdict,
            Verdict::BrokenAnchor {
                anchor: "missing".to_string(),
                document: "b.md".to_string()
            }
        );
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_broken_local_path() {
        let report = check(&[("README.md", "[a](a.md)\n"), ("a.md", "[gone](./nope.md)\n")], &offline()).await;
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].document, "a.md");
        assert_eq!(report.issues[0].line, 1);
        assert_eq!(
            report.issues[0].verdict,
            Verdict::BrokenLocalPath {
                reason: PathProblem::NotFound { resolved: "nope.md".to_string() }
            }
        );
    }

    #[tokio::test]
    async fn test_unlinked_document_is_orphan() {
        let report = check(
            &[("README.md", "[a](a.md)\n"), ("a.md", "# A\n"), ("c.md", "# C\n")],
            &offline(),
        )
        .await;
        assert!(report.issues.is_empty());
        assert_eq!(report.orphans, vec!["c.md"]);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_fenced_code_is_never_checked() {
        let report = check(
            &[(
                "README.md",
                "# Effects\n\n```csharp\n// see [Heal](./Heal.md)\nnew Heal(50).EmitComponentTargeted(player);\n```\n",
            )],
            &offline(),
        )
        .await;
        assert_eq!(report.summary.references, 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_external_failures_are_reported_not_fatal() {
        let probe = FakeProbe::new(Attempt::Status(200)).with("https://example.com/gone", vec![Attempt::Status(410)]);
        let report = check(
            &[("README.md", "[ok](https://example.com/ok) [gone](https://example.com/gone)\n")],
            &probe,
        )
        .await;
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].target, "https://example.com/gone");
        assert_eq!(report.summary.valid, 1);
    }

    #[tokio::test]
    async fn test_unknown_entry_point_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        write(&base, &[("README.md", "# Home\n")]);
        let mut config = Config::for_base_dir(&base);
        config.entries = vec!["docs/start.md".to_string()];

        let result = check_repository(&config, &VerdictCache::in_memory(), &offline()).await;
        assert!(matches!(result, Err(Error::EntryNotFound { .. })));
    }

    #[tokio::test]
    async fn test_two_runs_render_identically() {
        let files = [
            ("README.md", "[b](b.md#nope) [x](x.md) [u](https://example.com/a)\n"),
            ("b.md", "[c](c.md) [y](y.md)\n"),
            ("c.md", "[README](README.md#nope)\n"),
            ("lonely.md", "# Lonely\n"),
        ];
        let probe = FakeProbe::new(Attempt::Status(404));
        let first = check(&files, &probe).await;
        let second = check(&files, &probe).await;
        assert_eq!(first.render_text(), second.render_text());
        assert_eq!(first.render_json_lines().unwrap(), second.render_json_lines().unwrap());
        assert_eq!(first.orphans, vec!["lonely.md"]);
    }
}
