//! Reachability and latency probing of candidate URLs
//!
//! Each distinct URL gets one lightweight request with its own short timeout.
//! A failure is final for the run and recorded as [`Latency::Unreachable`].

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode, redirect};
use tracing::{debug, info};

use crate::config::{ProbeConfig, ProbeMethod};
use crate::errors::{AppResult, ProbeError};
use crate::models::{Latency, ProbeResult};
use crate::utils::{RetryPolicy, with_retry};

/// Measures how quickly a URL answers
#[async_trait]
pub trait UrlProber: Send + Sync {
    async fn probe(&self, url: &str) -> Result<Duration, ProbeError>;
}

/// Probes with an HTTP HEAD, or a one-byte ranged GET
///
/// Latency is the time until response headers arrive.
pub struct HttpProber {
    client: Client,
    method: ProbeMethod,
    timeout: Duration,
}

impl HttpProber {
    pub fn from_config(config: &ProbeConfig, user_agent: &str) -> AppResult<Self> {
        let redirects = if config.follow_redirects {
            redirect::Policy::limited(5)
        } else {
            redirect::Policy::none()
        };
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(config.timeout)
            .redirect(redirects)
            .build()?;

        Ok(Self {
            client,
            method: config.method,
            timeout: config.timeout,
        })
    }
}

/// Whether a probe response shows a live endpoint
///
/// 405 means the server exists but refuses HEAD.
pub fn is_live_status(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection() || status == StatusCode::METHOD_NOT_ALLOWED
}

#[async_trait]
impl UrlProber for HttpProber {
    async fn probe(&self, url: &str) -> Result<Duration, ProbeError> {
        let request = match self.method {
            ProbeMethod::Head => self.client.head(url),
            ProbeMethod::Get => self.client.get(url).header(RANGE, "bytes=0-0"),
        };

        let started = Instant::now();
        let response = request.timeout(self.timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout {
                    url: url.to_string(),
                }
            } else {
                ProbeError::Unreachable {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        let elapsed = started.elapsed();

        let status = response.status();
        if is_live_status(status) {
            Ok(elapsed)
        } else {
            Err(ProbeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

/// Bounded fan-out of probes over a set of URLs
pub struct LatencyProbe<P> {
    prober: P,
    concurrency: usize,
    policy: RetryPolicy,
}

impl<P: UrlProber> LatencyProbe<P> {
    /// Probe with at most `concurrency` requests in flight and no retries
    pub fn new(prober: P, concurrency: usize) -> Self {
        Self {
            prober,
            concurrency: concurrency.max(1),
            policy: RetryPolicy::no_retry(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Probe every distinct URL once
    ///
    /// Duplicates in `urls` share one probe. The map holds an entry for every
    /// distinct input URL.
    pub async fn probe_all<'a, I>(&self, urls: I) -> HashMap<String, Latency>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = urls.into_iter().filter(|url| seen.insert(*url)).collect();
        let total = unique.len();

        let results: HashMap<String, Latency> = stream::iter(unique)
            .map(|url| async move {
                let latency = match with_retry(&self.policy, url, |_| self.prober.probe(url)).await {
                    Ok(elapsed) => Latency::Reachable(elapsed),
                    Err(e) => {
                        debug!("Unreachable candidate: {}", e);
                        Latency::Unreachable
                    }
                };
                ProbeResult {
                    url: url.to_string(),
                    latency,
                }
            })
            .buffer_unordered(self.concurrency)
            .map(|result| (result.url, result.latency))
            .collect()
            .await;

        let reachable = results.values().filter(|l| l.is_reachable()).count();
        info!(
            "Probed {} URLs: {} reachable, {} unreachable",
            total,
            reachable,
            total - reachable
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed table; tracks call counts and peak concurrency
    struct TableProber {
        latencies: HashMap<&'static str, u64>,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TableProber {
        fn new(latencies: &[(&'static str, u64)]) -> Self {
            Self {
                latencies: latencies.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UrlProber for TableProber {
        async fn probe(&self, url: &str) -> Result<Duration, ProbeError> {
            self.calls.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.latencies.get(url) {
                Some(ms) => Ok(Duration::from_millis(*ms)),
                None => Err(ProbeError::Timeout {
                    url: url.to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_duplicates_are_probed_once() {
        let probe = LatencyProbe::new(TableProber::new(&[("http://a", 30), ("http://b", 20)]), 4);
        let results = probe
            .probe_all(["http://a", "http://b", "http://a", "http://c"])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results["http://a"], Latency::Reachable(Duration::from_millis(30)));
        assert_eq!(results["http://c"], Latency::Unreachable);
        assert_eq!(probe.prober.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failures_are_not_retried() {
        let probe = LatencyProbe::new(TableProber::new(&[]), 2);
        let results = probe.probe_all(["http://x"]).await;
        assert_eq!(results["http://x"], Latency::Unreachable);
        assert_eq!(probe.prober.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_policy_retries_timeouts() {
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            jitter: false,
            ..RetryPolicy::default()
        };
        let probe = LatencyProbe::new(TableProber::new(&[]), 2).with_policy(policy);
        probe.probe_all(["http://x"]).await;
        assert_eq!(probe.prober.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let urls: Vec<String> = (0..20).map(|i| format!("http://10.0.0.{i}/")).collect();
        let probe = LatencyProbe::new(TableProber::new(&[]), 3);
        probe.probe_all(urls.iter().map(String::as_str)).await;

        let peak = probe.prober.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak}");
        assert_eq!(probe.prober.calls.lock().unwrap().len(), 20);
    }

    #[test]
    fn test_live_status_classification() {
        assert!(is_live_status(StatusCode::OK));
        assert!(is_live_status(StatusCode::PARTIAL_CONTENT));
        assert!(is_live_status(StatusCode::FOUND));
        assert!(is_live_status(StatusCode::METHOD_NOT_ALLOWED));
        assert!(!is_live_status(StatusCode::NOT_FOUND));
        assert!(!is_live_status(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_http_prober_reports_refused_connection() {
        let prober = HttpProber::from_config(&ProbeConfig::default(), "test").unwrap();
        let err = prober.probe("http://127.0.0.1:9/live").await.unwrap_err();
        assert!(
            matches!(err, ProbeError::Unreachable { .. } | ProbeError::Timeout { .. }),
            "{err:?}"
        );
    }
}
