// src/checker/mod.rs
// =============================================================================
// Resolver: one Verdict for every reference.
//
// Submodules:
// - local: files, directories and anchors (synchronous, reads the graph)
// - http: HEAD / partial GET reachability with retries
// - cache: TTL cache across runs and single-flight within a run
//
// External checks:
// - one check per distinct URL (the graph already deduplicates them)
// - offline mode and allow-listed URLs are skipped without a request
// - up to max_concurrency checks in flight, in no particular order
// - a global deadline cuts the whole phase short; whatever has not finished
//   by then is reported as "timed out, not attempted"
// =============================================================================

mod cache;
mod http;
mod local;

pub use cache::VerdictCache;
pub use http::{HttpProbe, Probe};

#[cfg(test)]
pub(crate) use http::{fake::FakeProbe, Attempt};

use crate::config::Config;
use crate::docs::Corpus;
use crate::graph::{NodeId, ReferenceGraph};
use crate::model::{Reference, SkipReason, UrlFailure, Verdict};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{info, warn};
use url::Url;

pub struct Resolver<'a, P: Probe> {
    config: &'a Config,
    cache: &'a VerdictCache,
    probe: &'a P,
}

impl<'a, P: Probe> Resolver<'a, P> {
    pub fn new(config: &'a Config, cache: &'a VerdictCache, probe: &'a P) -> Self {
        Self { config, cache, probe }
    }

    /// Verdicts in reference order. Never fails: every problem ends up in a
    /// verdict.
    pub async fn resolve(&self, corpus: &Corpus, graph: &ReferenceGraph, references: &[Reference]) -> Vec<Verdict> {
        let external = self.check_external(graph).await;

        references
            .iter()
            .enumerate()
            .map(|(i, reference)| {
                if let Some(verdict) = local::local_verdict(corpus, graph, i, reference) {
                    return verdict;
                }
                graph
                    .edge(i)
                    .and_then(|edge| external.get(&edge.to))
                    .cloned()
                    .unwrap_or(Verdict::UnreachableUrl {
                        reason: UrlFailure::DeadlineNotAttempted,
                    })
            })
            .collect()
    }

    async fn check_external(&self, graph: &ReferenceGraph) -> HashMap<NodeId, Verdict> {
        let mut verdicts = HashMap::new();
        let mut pending: Vec<(NodeId, &Url)> = Vec::new();

        for (id, url) in graph.external_urls() {
            let skip = if self.config.offline {
                Some(SkipReason::Offline)
            } else if self.config.allow.allows(url) {
                Some(SkipReason::AllowListed)
            } else {
                None
            };
            match skip {
                Some(reason) => {
                    verdicts.insert(id, Verdict::SkippedByConfig { reason });
                }
                None => pending.push((id, url)),
            }
        }
        if pending.is_empty() {
            return verdicts;
        }

        info!(
            "Checking {} external URL(s), up to {} at a time",
            pending.len(),
            self.config.max_concurrency
        );
        let deadline = tokio::time::Instant::now() + self.config.deadline;

        let checks = pending.iter().map(|&(id, url)| async move {
            let verdict = self
                .cache
                .get_or_check(url.as_str(), || http::check_url(self.probe, url, &self.config.http))
                .await;
            (id, verdict)
        });
        let finished: Vec<(NodeId, Verdict)> = stream::iter(checks)
            .buffer_unordered(self.config.max_concurrency)
            .take_until(tokio::time::sleep_until(deadline))
            .collect()
            .await;
        verdicts.extend(finished);

        for (id, url) in pending {
            verdicts.entry(id).or_insert_with(|| {
                warn!("Deadline reached before {} was checked", url);
                Verdict::UnreachableUrl {
                    reason: UrlFailure::DeadlineNotAttempted,
                }
            });
        }
        verdicts
    }
}
