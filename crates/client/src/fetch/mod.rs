//! Multi-source icon fetching with a shared timeout and bounded retries.
//!
//! ### Source priority
//! Candidate sources are probed concurrently, but outcomes are awaited in
//! declared priority order: the highest-trust source that succeeds wins,
//! even if a lower-priority probe completed sooner.
//!
//! ### Timeout & retry
//! Each attempt cycle shares one deadline (default 3s) across all probes;
//! when it expires every outstanding probe is aborted. A failed cycle is
//! retried with a fresh deadline and fresh probes until the retry budget
//! (default 3) is exhausted.

pub mod probe;
pub mod sources;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};

use favlink_core::{AppConfig, ResourceRegistry};

pub use probe::{HttpProbe, Probe, ProbeError};
pub use sources::source_urls;

/// Error type for icon fetch failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Every source failed on every attempt cycle.
    #[error("no icon found for {0}")]
    NoIcon(String),
}

/// Configuration for the icon fetcher.
#[derive(Debug, Clone)]
pub struct IconFetcherConfig {
    /// Shared deadline for one attempt cycle (default: 3s).
    pub timeout: Duration,

    /// Retries after the initial attempt cycle (default: 3).
    pub retry_count: u32,
}

impl Default for IconFetcherConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_millis(3_000), retry_count: 3 }
    }
}

impl From<&AppConfig> for IconFetcherConfig {
    fn from(config: &AppConfig) -> Self {
        Self { timeout: config.fetch_timeout(), retry_count: config.retry_count }
    }
}

/// Icon fetcher driving ordered source probes.
pub struct IconFetcher {
    probe: Arc<dyn Probe>,
    config: IconFetcherConfig,
    registry: Arc<ResourceRegistry>,
}

impl IconFetcher {
    pub fn new(probe: Arc<dyn Probe>, config: IconFetcherConfig, registry: Arc<ResourceRegistry>) -> Self {
        Self { probe, config, registry }
    }

    /// Fetch the icon URL for a normalized domain.
    ///
    /// Returns the URL of the highest-priority source that succeeded, or
    /// [`FetchError::NoIcon`] once the retry budget is exhausted.
    pub async fn fetch_icon(&self, domain: &str) -> Result<String, FetchError> {
        let urls = source_urls(domain);
        let cycles = self.config.retry_count + 1;

        for cycle in 0..cycles {
            // The shared timeout counts as a pending timer for the cycle.
            let _timer = self.registry.timer();
            let deadline = Instant::now() + self.config.timeout;

            let mut probes: Vec<(String, tokio::task::JoinHandle<bool>)> = urls
                .iter()
                .map(|url| {
                    let probe = self.probe.clone();
                    let target = url.clone();
                    let handle = tokio::spawn(async move { probe.probe(&target).await.is_ok() });
                    (url.clone(), handle)
                })
                .collect();

            let mut winner = None;
            for (url, handle) in probes.iter_mut() {
                match timeout_at(deadline, handle).await {
                    Ok(Ok(true)) => {
                        winner = Some(url.clone());
                        break;
                    }
                    // Probe failed, or its task was cancelled; next source.
                    Ok(_) => continue,
                    // Deadline expired while this probe was pending. A
                    // lower-priority probe may already have finished, and
                    // `timeout_at` polls the handle before the deadline,
                    // so completed handles still yield; keep consulting.
                    Err(_) => continue,
                }
            }

            for (_, handle) in &probes {
                handle.abort();
            }

            if let Some(url) = winner {
                tracing::debug!(domain, source = %url, cycle, "icon resolved");
                return Ok(url);
            }

            tracing::debug!(domain, cycle, "all icon sources failed");
        }

        Err(FetchError::NoIcon(domain.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted probe behavior keyed by a URL fragment.
    #[derive(Clone, Copy)]
    enum Script {
        Succeed,
        SucceedAfter(Duration),
        Fail,
        Hang,
    }

    struct ScriptedProbe {
        scripts: Vec<(&'static str, Script)>,
        calls: Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(scripts: Vec<(&'static str, Script)>) -> Arc<Self> {
            Arc::new(Self { scripts, calls: Mutex::new(HashMap::new()), total: AtomicUsize::new(0) })
        }

        fn calls_for(&self, fragment: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(url, _)| url.contains(fragment))
                .map(|(_, n)| n)
                .sum()
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self, url: &str) -> Result<(), ProbeError> {
            *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
            self.total.fetch_add(1, Ordering::SeqCst);

            let script = self
                .scripts
                .iter()
                .find(|(fragment, _)| url.contains(fragment))
                .map(|(_, s)| *s)
                .unwrap_or(Script::Fail);

            match script {
                Script::Succeed => Ok(()),
                Script::SucceedAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(())
                }
                Script::Fail => Err(ProbeError::Transport("scripted failure".into())),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }
    }

    fn fetcher(probe: Arc<ScriptedProbe>, retry_count: u32) -> IconFetcher {
        let config = IconFetcherConfig { timeout: Duration::from_secs(3), retry_count };
        IconFetcher::new(probe, config, ResourceRegistry::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_order_wins_over_completion_order() {
        // Source 1 fails fast, source 2 succeeds slowly, source 3 succeeds
        // instantly. The winner must still be source 2.
        let probe = ScriptedProbe::new(vec![
            ("favicon.ico", Script::Fail),
            ("google.com", Script::SucceedAfter(Duration::from_millis(500))),
            ("duckduckgo.com", Script::Succeed),
        ]);

        let result = fetcher(probe.clone(), 0).fetch_icon("example.com").await.unwrap();
        assert!(result.contains("google.com"), "expected google source, got {result}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_source_wins_when_it_succeeds() {
        let probe = ScriptedProbe::new(vec![
            ("favicon.ico", Script::Succeed),
            ("google.com", Script::Succeed),
        ]);

        let result = fetcher(probe, 0).fetch_icon("example.com").await.unwrap();
        assert_eq!(result, "https://example.com/favicon.ico");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_runs_exact_cycles() {
        // Budget 3 -> exactly 4 attempt cycles (initial + 3 retries),
        // each probing every source once.
        let probe = ScriptedProbe::new(vec![]);

        let result = fetcher(probe.clone(), 3).fetch_icon("example.com").await;
        assert!(matches!(result, Err(FetchError::NoIcon(_))));
        assert_eq!(probe.calls_for("favicon.ico"), 4);
        assert_eq!(probe.calls_for("google.com"), 4);
        assert_eq!(probe.total.load(Ordering::SeqCst), 4 * source_urls("example.com").len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_timeout_aborts_cycle() {
        let probe = ScriptedProbe::new(vec![
            ("favicon.ico", Script::Hang),
            ("google.com", Script::Hang),
            ("duckduckgo.com", Script::Hang),
            ("yandex.net", Script::Hang),
        ]);

        let result = fetcher(probe.clone(), 1).fetch_icon("example.com").await;
        assert!(matches!(result, Err(FetchError::NoIcon(_))));
        // One dispatch per source per cycle, no more: hung probes are
        // aborted, not re-awaited.
        assert_eq!(probe.total.load(Ordering::SeqCst), 2 * source_urls("example.com").len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_lower_priority_wins_when_higher_hangs() {
        // The site's own favicon endpoint hangs past the deadline, but an
        // aggregator already answered. The completed probe must win in the
        // same cycle instead of failing it.
        let probe = ScriptedProbe::new(vec![
            ("favicon.ico", Script::Hang),
            ("google.com", Script::Succeed),
        ]);

        let result = fetcher(probe.clone(), 0).fetch_icon("example.com").await.unwrap();
        assert!(result.contains("google.com"), "expected google source, got {result}");
        assert_eq!(probe.total.load(Ordering::SeqCst), source_urls("example.com").len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_source_succeeds_after_earlier_failures() {
        let probe = ScriptedProbe::new(vec![("yandex.net", Script::Succeed)]);

        let result = fetcher(probe, 0).fetch_icon("example.com").await.unwrap();
        assert!(result.contains("yandex.net"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_on_second_cycle() {
        // Fails the first cycle, succeeds on the retry.
        struct FlakyProbe {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl Probe for FlakyProbe {
            async fn probe(&self, _url: &str) -> Result<(), ProbeError> {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n < source_urls("example.com").len() {
                    Err(ProbeError::Transport("first cycle down".into()))
                } else {
                    Ok(())
                }
            }
        }

        let probe = Arc::new(FlakyProbe { calls: AtomicUsize::new(0) });
        let config = IconFetcherConfig { timeout: Duration::from_secs(3), retry_count: 3 };
        let fetcher = IconFetcher::new(probe, config, ResourceRegistry::new());

        let result = fetcher.fetch_icon("example.com").await.unwrap();
        assert_eq!(result, "https://example.com/favicon.ico");
    }

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig::default();
        let config = IconFetcherConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_millis(3_000));
        assert_eq!(config.retry_count, 3);
    }
}
