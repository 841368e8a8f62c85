// src/checker/http.rs
// =============================================================================
// Reachability check of one external URL.
//
// Key functionality:
// - HEAD first (no body download)
// - If HEAD is answered with an error status, a partial GET decides
//   (plenty of servers reject HEAD but serve GET fine)
// - Transient failures (timeouts, connection errors, 429, 5xx) are retried
//   with exponential backoff, up to max_retries
// - Everything else is final on the first answer
//
// The network sits behind the Probe trait so the retry and caching logic can
// be tested against a scripted fake.
// =============================================================================

use crate::config::HttpSettings;
use crate::error::Error;
use crate::model::{UrlFailure, Verdict};
use reqwest::header::RANGE;
use reqwest::{redirect, Client};
use std::future::Future;
use tracing::debug;
use url::Url;

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Head,
    /// GET for the first byte only (`Range: bytes=0-0`).
    PartialGet,
}

/// What a single request came back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Status(u16),
    Failed(UrlFailure),
}

/// One HTTP request, nothing more. Retries and fallbacks live in check_url.
pub trait Probe: Send + Sync {
    fn send(&self, url: &Url, method: Method) -> impl Future<Output = Attempt> + Send;
}

/// The real thing: a shared reqwest client (connection pooling across checks).
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(settings: &HttpSettings) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl Probe for HttpProbe {
    async fn send(&self, url: &Url, method: Method) -> Attempt {
        let request = match method {
            Method::Head => self.client.head(url.clone()),
            Method::PartialGet => self.client.get(url.clone()).header(RANGE, "bytes=0-0"),
        };
        match request.send().await {
            Ok(response) => Attempt::Status(response.status().as_u16()),
            Err(e) => Attempt::Failed(categorize_error(&e)),
        }
    }
}

/// Result of checking one URL, with everything the cache needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCheck {
    pub verdict: Verdict,
    /// Last HTTP status seen, if any request got that far.
    pub status: Option<u16>,
    /// False when retries ran out on a transient failure; such a verdict
    /// says nothing about the next run.
    pub cacheable: bool,
}

enum Outcome {
    Valid,
    Permanent(UrlFailure),
    Transient(UrlFailure),
}

/// Check one URL: HEAD, partial GET fallback, retries on transient failures.
pub async fn check_url<P: Probe>(probe: &P, url: &Url, settings: &HttpSettings) -> UrlCheck {
    let mut delay = settings.retry_backoff;
    let mut retries = 0;

    loop {
        let attempt = probe_once(probe, url).await;
        let status = match &attempt {
            Attempt::Status(code) => Some(*code),
            Attempt::Failed(_) => None,
        };

        match classify(attempt) {
            Outcome::Valid => {
                return UrlCheck {
                    verdict: Verdict::Valid,
                    status,
                    cacheable: true,
                }
            }
            Outcome::Permanent(reason) => {
                debug!("{} is unreachable: {}", url, reason);
                return UrlCheck {
                    verdict: Verdict::UnreachableUrl { reason },
                    status,
                    cacheable: true,
                };
            }
            Outcome::Transient(reason) if retries >= settings.max_retries => {
                debug!("{} still failing after {} retries: {}", url, retries, reason);
                return UrlCheck {
                    verdict: Verdict::UnreachableUrl { reason },
                    status,
                    cacheable: false,
                };
            }
            Outcome::Transient(reason) => {
                retries += 1;
                debug!("{}: {}, retry {} in {:?}", url, reason, retries, delay);
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
        }
    }
}

async fn probe_once<P: Probe>(probe: &P, url: &Url) -> Attempt {
    match probe.send(url, Method::Head).await {
        Attempt::Status(code) if code >= 400 => probe.send(url, Method::PartialGet).await,
        other => other,
    }
}

// HTTP status codes:
// - 2xx, 3xx: the resource is there
// - 416: the partial GET asked past the end of an empty resource; it exists
// - 429, 5xx: try again later
// - other 4xx: gone
fn classify(attempt: Attempt) -> Outcome {
    match attempt {
        Attempt::Status(code) => match code {
            200..=399 | 416 => Outcome::Valid,
            429 | 500..=599 => Outcome::Transient(UrlFailure::HttpStatus { status: code }),
            _ => Outcome::Permanent(UrlFailure::HttpStatus { status: code }),
        },
        Attempt::Failed(failure) => match failure {
            UrlFailure::Timeout | UrlFailure::Connection { .. } => Outcome::Transient(failure),
            other => Outcome::Permanent(other),
        },
    }
}

// reqwest errors can happen for many reasons; keep the ones a reader of the
// report can act on.
fn categorize_error(error: &reqwest::Error) -> UrlFailure {
    let message = error_chain(error);
    let lowered = message.to_lowercase();

    if error.is_timeout() {
        UrlFailure::Timeout
    } else if error.is_redirect() {
        UrlFailure::TooManyRedirects
    } else if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl") {
        UrlFailure::Tls
    } else if error.is_connect() || error.is_request() {
        // Refused, reset, or closed before the response came back
        UrlFailure::Connection { message }
    } else {
        UrlFailure::Other { message }
    }
}

// reqwest's Display stops at the outermost layer; the useful part
// ("dns error", "connection refused") is further down the source chain.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
