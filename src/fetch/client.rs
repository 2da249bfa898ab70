//! Blocking HTTP fetcher: gate-paced attempts, bounded retries, exponential
//! backoff.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::ScrapeConfig;

use super::error::FetchError;
use super::gate::{Deadline, RateGate};

const MAX_REDIRECTS: usize = 10;

/// The success half of a fetch: HTTP status of the response plus its raw
/// body bytes, untouched by any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Anything that can turn a URL into page bytes.
pub trait Fetch {
    fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Blocking fetcher that paces every attempt through a shared [`RateGate`]
/// and retries every failure kind up to the configured attempt count.
#[derive(Debug)]
pub struct HttpFetcher {
    inner: reqwest::blocking::Client,
    gate: Arc<RateGate>,
    max_retries: u32,
    deadline: Option<Deadline>,
}

impl HttpFetcher {
    /// Build a fetcher from the given config, pacing through `gate`.
    pub fn new(config: &ScrapeConfig, gate: Arc<RateGate>) -> Result<Self, reqwest::Error> {
        let inner = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            inner,
            gate,
            max_retries: config.max_retries.max(1),
            deadline: None,
        })
    }

    /// Arm (or clear) a whole-run deadline, checked before every attempt.
    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    /// One GET. Non-2xx statuses and body-read failures count as attempt
    /// failures just like transport errors.
    fn attempt(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self.inner.get(url).send().map_err(|e| classify(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.bytes().map_err(|e| classify(url, e))?;
        Ok(FetchedPage {
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }
}

impl Fetch for HttpFetcher {
    /// Fetch with retries. Waits on the gate before every attempt, sleeps
    /// `2^n` seconds after the n-th failed attempt (clipped to the deadline
    /// when one is armed), and gives up with [`FetchError::RetriesExhausted`]
    /// after `max_retries` attempts.
    fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
        let max_attempts = self.max_retries;
        let mut attempt = 0u32;
        loop {
            if let Some(deadline) = self.deadline {
                if deadline.expired() {
                    return Err(FetchError::DeadlineExceeded {
                        url: url.to_string(),
                    });
                }
            }
            self.gate.acquire();
            match self.attempt(url) {
                Ok(page) => return Ok(page),
                Err(cause) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: max_attempts,
                            cause: Box::new(cause),
                        });
                    }
                    let backoff = backoff_delay(attempt - 1);
                    warn!(
                        "Attempt {}/{} failed for {}: {} (retrying in {:?})",
                        attempt, max_attempts, url, cause, backoff
                    );
                    backoff_sleep(backoff, self.deadline);
                }
            }
        }
    }
}

/// Backoff after the n-th failed attempt (0-based): 2^n seconds, saturating.
fn backoff_delay(failed_attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(failed_attempt))
}

fn backoff_sleep(delay: Duration, deadline: Option<Deadline>) {
    let capped = match deadline {
        Some(d) => delay.min(d.remaining()),
        None => delay,
    };
    if !capped.is_zero() {
        std::thread::sleep(capped);
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_failed_attempt() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(5), Duration::from_secs(32));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        assert_eq!(backoff_delay(200), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn backoff_sleep_is_clipped_by_the_deadline() {
        let deadline = Deadline::after(Duration::from_millis(50));
        let start = std::time::Instant::now();
        backoff_sleep(Duration::from_secs(5), Some(deadline));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn backoff_sleep_with_expired_deadline_returns_at_once() {
        let deadline = Deadline::after(Duration::ZERO);
        let start = std::time::Instant::now();
        backoff_sleep(Duration::from_secs(5), Some(deadline));
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
