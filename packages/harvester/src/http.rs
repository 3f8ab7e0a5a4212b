//! HTTP client wrapper and retry policy shared by the source adapters.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;

use crate::error::{HarvesterError, Result};

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("sfs-harvester/", env!("CARGO_PKG_VERSION"));

/// Default maximum number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff (milliseconds).
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Default upper bound for a single backoff delay (milliseconds).
pub const DEFAULT_MAX_DELAY_MS: u64 = 8_000;

/// Bounded retry policy with exponential backoff.
///
/// Adapters receive a policy at construction so tests can swap in
/// [`RetryPolicy::immediate`] and never sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every later attempt.
    pub base_delay: Duration,
    /// Cap for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Retry up to `max_attempts` times without sleeping in between.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait before the given zero-based attempt.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use sfs_harvester::http::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.delay_before(0), Duration::ZERO);
    /// assert_eq!(policy.delay_before(1), Duration::from_millis(500));
    /// assert_eq!(policy.delay_before(2), Duration::from_millis(1000));
    /// ```
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (attempt - 1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Create a configured HTTP client.
pub fn create_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Send a request, retrying transient failures according to `policy`.
///
/// `build` is called once per attempt because blocking request builders
/// cannot be reused. `subject` names what is being fetched and ends up in
/// [`HarvesterError::NotFound`] when the source answers 404.
///
/// Transient: connection errors, timeouts, 5xx and 429. Everything else is
/// returned on the first attempt.
pub fn send_with_retry<F>(policy: &RetryPolicy, subject: &str, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error: Option<String> = None;
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 0..max_attempts {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            tracing::debug!(attempt, ?delay, "Retrying after delay");
            thread::sleep(delay);
        }

        match build().send() {
            Ok(response) => {
                let status = response.status();

                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    tracing::warn!(
                        %status,
                        subject,
                        attempt = attempt + 1,
                        max_attempts,
                        "Server error, will retry"
                    );
                    last_error = Some(format!("Server error: {status}"));
                    continue;
                }

                if status == StatusCode::NOT_FOUND {
                    return Err(HarvesterError::NotFound {
                        id: subject.to_string(),
                    });
                }

                if !status.is_success() {
                    return Err(HarvesterError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: response.url().to_string(),
                    });
                }

                return Ok(response);
            }
            Err(e) => {
                if e.is_connect() || e.is_timeout() {
                    tracing::warn!(
                        error = %e,
                        subject,
                        attempt = attempt + 1,
                        max_attempts,
                        "Connection error, will retry"
                    );
                    last_error = Some(e.to_string());
                    continue;
                }
                return Err(HarvesterError::Http(e));
            }
        }
    }

    Err(HarvesterError::RetriesExhausted {
        attempts: max_attempts,
        message: last_error.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Read a response body as text.
///
/// Invalid UTF-8 is decoded lossily with a warning rather than failing, so
/// one bad byte does not cost a whole document.
pub fn response_text(response: Response, context: &str) -> Result<String> {
    let bytes = response.bytes()?;
    Ok(bytes_to_string(&bytes, context))
}

fn bytes_to_string(bytes: &[u8], context: &str) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            tracing::warn!(context, error = %e, "Response is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
