//! Exponential backoff around any [`PageFetch`] transport.
//!
//! Only errors for which [`FetchError::is_retryable`] holds (HTTP 429 and
//! 5xx) are retried; every other failure is returned immediately.
//!
//! The delay before retry `n` is:
//! ```text
//! delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=jitter)
//! ```

use super::PageFetch;
use crate::error::FetchError;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

pub struct Retrying<T> {
    inner: T,
    /// Total attempts, including the first.
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Duration,
}

impl<T> Retrying<T>
where
    T: PageFetch,
{
    pub fn new(inner: T, max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(8),
            jitter: Duration::from_millis(250),
        }
    }

    #[cfg(test)]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let shift = (attempt - 1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms = self.jitter.as_millis() as u64;
        delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }
}

impl<T> fmt::Debug for Retrying<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageFetch for Retrying<T>
where
    T: PageFetch,
{
    #[instrument(level = "info", skip(self))]
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match self.inner.get_text(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!(
                            attempt,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "fetch exhausted retries"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Flaky {
        failures: Mutex<Vec<u16>>,
        calls: Mutex<usize>,
    }

    impl Flaky {
        fn new(failures: Vec<u16>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl PageFetch for Flaky {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok("<urlset/>".to_string())
            } else {
                Err(FetchError::Status {
                    status: failures.remove(0),
                    url: url.to_string(),
                })
            }
        }
    }

    fn retrying(inner: &Flaky, attempts: usize) -> Retrying<&Flaky> {
        Retrying::new(inner, attempts, Duration::from_millis(1)).with_jitter(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let flaky = Flaky::new(vec![503, 429]);
        let body = retrying(&flaky, 3).get_text("https://a.test/sitemap.xml").await.unwrap();
        assert_eq!(body, "<urlset/>");
        assert_eq!(flaky.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let flaky = Flaky::new(vec![500, 500, 500, 500]);
        let err = retrying(&flaky, 3).get_text("https://a.test/sitemap.xml").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
        assert_eq!(flaky.calls(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let flaky = Flaky::new(vec![404]);
        let err = retrying(&flaky, 3).get_text("https://a.test/sitemap.xml").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(flaky.calls(), 1);
    }

    #[test]
    fn test_delay_is_capped() {
        let flaky = Flaky::new(vec![]);
        let r = Retrying::new(&flaky, 10, Duration::from_secs(1)).with_jitter(Duration::ZERO);
        assert_eq!(r.delay_for(1), Duration::from_secs(1));
        assert_eq!(r.delay_for(3), Duration::from_secs(4));
        assert_eq!(r.delay_for(9), Duration::from_secs(8));
    }
}
