// src/config.rs
// =============================================================================
// The one immutable configuration of a run.
//
// Built once at startup from three layers, lowest precedence first:
//   1. built-in defaults
//   2. an optional TOML file (--config, else .check-links.toml in the repo)
//   3. command-line flags
// List settings (ignore, entry, allow) from the file and the CLI are merged.
// Every component receives a &Config; nothing mutates it afterwards.
// =============================================================================

use crate::cli::Cli;
use crate::docs::path_key;
use crate::error::Error;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = ".check-links.toml";

const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_DEADLINE_SECS: u64 = 300;
const DEFAULT_MAX_CONCURRENCY: usize = 32;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Settings for a single external check.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub max_retries: u32,
    /// First backoff delay; doubled after every failed attempt.
    pub retry_backoff: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Repository root; document paths are relative to it.
    pub base_dir: PathBuf,
    pub roots: Vec<PathBuf>,
    pub ignore: GlobSet,
    /// Entry points as repository-relative keys. Empty means "use defaults".
    pub entries: Vec<String>,
    pub allow: AllowList,
    pub cache_file: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub http: HttpSettings,
    /// Budget for the whole external-check phase.
    pub deadline: Duration,
    pub max_concurrency: usize,
    pub offline: bool,
}

// Raw shape of .check-links.toml
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default)]
    entry: Vec<String>,
    #[serde(default)]
    allow: Vec<String>,
    allow_list: Option<PathBuf>,
    cache_file: Option<PathBuf>,
    cache_ttl_secs: Option<u64>,
    timeout_ms: Option<u64>,
    deadline_secs: Option<u64>,
    max_concurrency: Option<usize>,
    max_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    user_agent: Option<String>,
}

impl FileConfig {
    // A missing default file means "no file"; an explicit --config that is
    // missing, or any file that does not parse, is fatal.
    fn load(explicit: Option<&Path>, base_dir: &Path) -> Result<Self, Error> {
        let path = match explicit {
            Some(p) => base_dir.join(p),
            None => base_dir.join(DEFAULT_CONFIG_FILE),
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                return Ok(Self::default());
            }
            Err(source) => return Err(Error::ConfigRead { path, source }),
        };
        toml::from_str(&content).map_err(|source| Error::ConfigParse { path, source })
    }
}

impl Config {
    /// Build the run configuration from parsed flags.
    ///
    /// `base_dir` is the repository root (the working directory in the
    /// binary); relative paths in flags and in the config file are taken
    /// relative to it.
    pub fn from_cli(cli: &Cli, base_dir: &Path) -> Result<Self, Error> {
        let file = FileConfig::load(cli.config.as_deref(), base_dir)?;

        let mut roots = Vec::new();
        for root in &cli.roots {
            let joined = base_dir.join(root);
            if !joined.exists() {
                return Err(Error::RootNotFound { path: root.clone() });
            }
            let canonical = joined.canonicalize()?;
            if !canonical.starts_with(base_dir) {
                return Err(Error::InvalidArgument(format!(
                    "root {} is outside the repository root {}",
                    root.display(),
                    base_dir.display()
                )));
            }
            roots.push(canonical);
        }

        let patterns: Vec<&String> = file.ignore.iter().chain(cli.ignore.iter()).collect();
        let ignore = build_globset(&patterns)?;

        let entries = file
            .entry
            .iter()
            .chain(cli.entry.iter())
            .map(|e| path_key(&normalize_relative(Path::new(e))))
            .collect();

        let mut allow = AllowList::default();
        for entry in &file.allow {
            allow.add(entry);
        }
        let allow_files = [file.allow_list.as_ref(), cli.allow_list.as_ref()];
        for list in allow_files.into_iter().flatten() {
            let path = base_dir.join(list);
            let text = std::fs::read_to_string(&path)
                .map_err(|source| Error::AllowListRead { path: path.clone(), source })?;
            allow.extend_from_text(&text);
        }

        let cache_file = cli
            .cache_file
            .clone()
            .or(file.cache_file)
            .map(|p| base_dir.join(p));

        let max_concurrency = match cli.max_concurrency {
            Some(n) => usize::try_from(n)
                .map_err(|_| Error::InvalidArgument(format!("--max-concurrency {n} is too large")))?,
            None => file.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
        };
        if max_concurrency == 0 {
            return Err(Error::InvalidArgument("max_concurrency must be at least 1".to_string()));
        }

        let http = HttpSettings {
            request_timeout: Duration::from_millis(
                cli.timeout_ms.or(file.timeout_ms).unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            max_retries: cli.max_retries.or(file.max_retries).unwrap_or(DEFAULT_MAX_RETRIES),
            retry_backoff: Duration::from_millis(
                file.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
            ),
            user_agent: file.user_agent.unwrap_or_else(default_user_agent),
        };

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            roots,
            ignore,
            entries,
            allow,
            cache_file,
            cache_ttl: Duration::from_secs(
                cli.cache_ttl_secs
                    .or(file.cache_ttl_secs)
                    .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),
            http,
            deadline: Duration::from_secs(
                cli.deadline_secs.or(file.deadline_secs).unwrap_or(DEFAULT_DEADLINE_SECS),
            ),
            max_concurrency,
            offline: cli.offline,
        })
    }

    /// Defaults for a given repository root, with no ignores or entries.
    #[cfg(test)]
    pub fn for_base_dir(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            roots: vec![base_dir.to_path_buf()],
            ignore: GlobSet::empty(),
            entries: Vec::new(),
            allow: AllowList::default(),
            cache_file: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            http: HttpSettings::default(),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            offline: false,
        }
    }

    pub fn is_ignored(&self, relative: &str) -> bool {
        self.ignore.is_match(relative)
    }
}

fn build_globset(patterns: &[&String]) -> Result<GlobSet, Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| Error::InvalidGlob {
            pattern: (*pattern).clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| Error::InvalidGlob {
        pattern: patterns.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", "),
        source,
    })
}

// Drop `.` components so "./README.md" and "README.md" name the same entry.
fn normalize_relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

fn default_user_agent() -> String {
    format!("check-links/{}", env!("CARGO_PKG_VERSION"))
}

/// Hosts and URL prefixes that are never checked.
///
/// Entries:
/// - `example.com` matches the host and all of its subdomains
/// - `*.example.com` matches subdomains only
/// - anything containing `://` is a URL prefix
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    hosts: Vec<String>,
    wildcard_hosts: Vec<String>,
    prefixes: Vec<String>,
}

impl AllowList {
    pub fn add(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }
        if entry.contains("://") {
            self.prefixes.push(entry.to_string());
        } else if let Some(rest) = entry.strip_prefix("*.") {
            self.wildcard_hosts.push(rest.to_ascii_lowercase());
        } else {
            self.hosts.push(entry.trim_end_matches('/').to_ascii_lowercase());
        }
    }

    /// One entry per line; `#` starts a comment.
    pub fn extend_from_text(&mut self, text: &str) {
        for line in text.lines() {
            let entry = line.split('#').next().unwrap_or_default();
            self.add(entry);
        }
    }

    pub fn allows(&self, url: &Url) -> bool {
        if self.prefixes.iter().any(|p| url.as_str().starts_with(p.as_str())) {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let is_subdomain_of = |parent: &str| {
            host.strip_suffix(parent)
                .is_some_and(|head| head.ends_with('.'))
        };
        self.hosts.iter().any(|h| host == *h || is_subdomain_of(h))
            || self.wildcard_hosts.iter().any(|h| is_subdomain_of(h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_allow_list_host_matches_subdomains() {
        let mut allow = AllowList::default();
        allow.add("linkedin.com");
        assert!(allow.allows(&url("https://linkedin.com/in/someone")));
        assert!(allow.allows(&url("https://www.linkedin.com/")));
        assert!(!allow.allows(&url("https://notlinkedin.com/")));
    }

    #[test]
    fn test_allow_list_wildcard_and_prefix() {
        let mut allow = AllowList::default();
        allow.extend_from_text("# sites that block bots\n*.example.org\nhttps://docs.rs/private/ # paywalled\n\n");
        assert!(allow.allows(&url("https://api.example.org/x")));
        assert!(!allow.allows(&url("https://example.org/x")));
        assert!(allow.allows(&url("https://docs.rs/private/page")));
        assert!(!allow.allows(&url("https://docs.rs/public")));
    }

    #[test]
    fn test_file_and_cli_layers_merge() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        std::fs::create_dir(base.join("docs")).unwrap();
        std::fs::write(base.join("allow.txt"), "twitter.com\n").unwrap();
        std::fs::write(
            base.join(DEFAULT_CONFIG_FILE),
            "ignore = [\"vendor/**\"]\nentry = [\"./README.md\"]\ntimeout_ms = 1500\nmax_concurrency = 4\nallow_list = \"allow.txt\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from(["check-links", "docs", "--ignore", "site/**", "--max-concurrency", "9"]).unwrap();
        let config = Config::from_cli(&cli, &base).unwrap();

        assert!(config.is_ignored("vendor/lib/README.md"));
        assert!(config.is_ignored("site/index.md"));
        assert!(!config.is_ignored("docs/guide.md"));
        assert_eq!(config.entries, vec!["README.md"]);
        assert_eq!(config.http.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_concurrency, 9);
        assert!(config.allow.allows(&url("https://twitter.com/x")));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from(["check-links", "nope"]).unwrap();
        let err = Config::from_cli(&cli, dir.path()).unwrap_err();
        assert!(matches!(err, Error::RootNotFound { .. }));
    }

    #[test]
    fn test_malformed_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "ignore = 3").unwrap();
        let cli = Cli::try_parse_from(["check-links", "."]).unwrap();
        let err = Config::from_cli(&cli, dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_invalid_glob_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from(["check-links", ".", "--ignore", "a[b"]).unwrap();
        let err = Config::from_cli(&cli, dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidGlob { .. }));
    }
}
