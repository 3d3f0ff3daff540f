//! Resilient request execution.
//!
//! Every exchange with the portal goes through [`RequestExecutor::execute`]
//! rather than calling [`Session::send`] directly, so that each request
//! gets the same retry and throttling behaviour:
//!
//! - status `200` or `201` is success, whatever the body says;
//! - any other status, and any transport fault, is retried after a
//!   `2^attempt` second backoff until the attempt budget runs out;
//! - after a success the executor waits a random cooldown before
//!   returning, to keep the request rate low.
//!
//! Sleeps go through a [`Delay`] so tests can record them instead.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng as _;
use reqwest::Method;

use crate::FetchError;
use crate::delay::{Delay, TokioDelay};
use crate::session::{HttpRequest, HttpResponse, Session};

/// Default number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default post-success cooldown range, in whole seconds.
pub const DEFAULT_COOLDOWN_SECS: RangeInclusive<u64> = 2..=5;

/// Retry budget and throttle settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Maximum attempts per request. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Inclusive range the cooldown is drawn from, in seconds.
    pub cooldown_secs: RangeInclusive<u64>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
        }
    }
}

/// Issues requests through a [`Session`] with bounded retries.
#[derive(Clone)]
pub struct RequestExecutor {
    config: ExecutorConfig,
    delay: Arc<dyn Delay>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Creates an executor that sleeps on the tokio timer.
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        Self::with_delay(config, Arc::new(TokioDelay))
    }

    /// Creates an executor with a custom [`Delay`].
    #[must_use]
    pub fn with_delay(config: ExecutorConfig, delay: Arc<dyn Delay>) -> Self {
        Self { config, delay }
    }

    /// Sends `request` through `session`, retrying until it succeeds or
    /// the attempt budget is spent.
    ///
    /// # Errors
    ///
    /// * [`FetchError::InvalidMethod`] for anything other than `GET` or
    ///   `POST`, without making an attempt.
    /// * [`FetchError::AllAttemptsExhausted`] once every attempt has
    ///   failed.
    pub async fn execute(
        &self,
        session: &dyn Session,
        request: &HttpRequest,
    ) -> Result<HttpResponse, FetchError> {
        if request.method != Method::GET && request.method != Method::POST {
            log::error!("Invalid request method {} for {}", request.method, request.url);
            return Err(FetchError::InvalidMethod(request.method.clone()));
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match session.send(request).await {
                Ok(response) => {
                    log::info!(
                        "[{}] {} - status {}",
                        request.method,
                        request.url,
                        response.status
                    );
                    if is_success(response.status) {
                        let cooldown = self.cooldown();
                        log::debug!("Sleeping {cooldown:?} after {}", request.url);
                        self.delay.sleep(cooldown).await;
                        return Ok(response);
                    }
                    log::warn!(
                        "Unexpected status {} from {} (attempt {attempt}/{max_attempts})",
                        response.status,
                        request.url
                    );
                    last_error = format!("HTTP {}", response.status);
                }
                Err(e) => {
                    log::error!(
                        "Request failed for {} (attempt {attempt}/{max_attempts}): {e}",
                        request.url
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts {
                let backoff = backoff_delay(attempt);
                log::info!("  retry {}/{max_attempts} in {backoff:?}...", attempt + 1);
                self.delay.sleep(backoff).await;
            }
        }

        log::error!("All {max_attempts} attempt(s) failed for {}", request.url);
        Err(FetchError::AllAttemptsExhausted {
            url: request.url.clone(),
            attempts: max_attempts,
            last_error,
        })
    }

    fn cooldown(&self) -> Duration {
        let (start, end) = (
            *self.config.cooldown_secs.start(),
            *self.config.cooldown_secs.end(),
        );
        let secs = if start >= end {
            start
        } else {
            rand::thread_rng().gen_range(start..=end)
        };
        Duration::from_secs(secs)
    }
}

/// Whether `status` counts as a successful exchange.
#[must_use]
pub const fn is_success(status: u16) -> bool {
    matches!(status, 200 | 201)
}

/// Backoff after failed attempt number `attempt` (1-based): `2^attempt`
/// seconds.
#[must_use]
pub const fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::RecordingDelay;
    use crate::testing::ScriptedSession;

    const URL: &str = "https://portal.test/page";

    fn recording_executor(
        max_attempts: u32,
        cooldown_secs: RangeInclusive<u64>,
    ) -> (RequestExecutor, Arc<RecordingDelay>) {
        let delay = Arc::new(RecordingDelay::new());
        let executor = RequestExecutor::with_delay(
            ExecutorConfig {
                max_attempts,
                cooldown_secs,
            },
            delay.clone(),
        );
        (executor, delay)
    }

    #[tokio::test]
    async fn returns_first_success_after_cooldown() {
        let (executor, delay) = recording_executor(3, 2..=5);
        let session = ScriptedSession::new().respond(&Method::GET, URL, 200, "ok");

        let response = executor
            .execute(&session, &HttpRequest::get(URL))
            .await
            .unwrap();

        assert_eq!(response.body, b"ok");
        assert_eq!(session.requests().len(), 1);
        let slept = delay.recorded();
        assert_eq!(slept.len(), 1);
        assert!((2..=5).contains(&slept[0].as_secs()));
    }

    #[tokio::test]
    async fn created_status_is_success_regardless_of_body() {
        let (executor, _delay) = recording_executor(3, 0..=0);
        let session =
            ScriptedSession::new().respond(&Method::POST, URL, 201, "<html>error page</html>");

        let response = executor
            .execute(&session, &HttpRequest::post(URL))
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(session.requests().len(), 1);
    }

    #[tokio::test]
    async fn retries_with_exponential_backoff_then_exhausts() {
        for budget in 1..=4_u32 {
            let (executor, delay) = recording_executor(budget, 0..=0);
            let mut session = ScriptedSession::new();
            for _ in 0..budget + 2 {
                session = session.respond(&Method::GET, URL, 503, "busy");
            }

            let err = executor
                .execute(&session, &HttpRequest::get(URL))
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                FetchError::AllAttemptsExhausted { attempts, .. } if attempts == budget
            ));
            assert_eq!(session.requests().len(), budget as usize);
            let expected: Vec<Duration> = (1..budget).map(backoff_delay).collect();
            assert_eq!(delay.recorded(), expected);
        }
    }

    #[tokio::test]
    async fn recovers_from_transport_fault() {
        let (executor, delay) = recording_executor(3, 0..=0);
        let session = ScriptedSession::new()
            .fail(&Method::GET, URL, "connection reset")
            .respond(&Method::GET, URL, 200, "ok");

        let response = executor
            .execute(&session, &HttpRequest::get(URL))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            delay.recorded(),
            vec![Duration::from_secs(2), Duration::from_secs(0)]
        );
    }

    #[tokio::test]
    async fn rejects_unsupported_method_without_attempting() {
        let (executor, delay) = recording_executor(3, 0..=0);
        let session = ScriptedSession::new().respond(&Method::PUT, URL, 200, "ok");

        let err = executor
            .execute(&session, &HttpRequest::new(Method::PUT, URL))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::InvalidMethod(m) if m == Method::PUT));
        assert!(session.requests().is_empty());
        assert!(delay.recorded().is_empty());
    }

    #[tokio::test]
    async fn zero_budget_still_makes_one_attempt() {
        let (executor, _delay) = recording_executor(0, 0..=0);
        let session = ScriptedSession::new().respond(&Method::GET, URL, 404, "missing");

        let err = executor
            .execute(&session, &HttpRequest::get(URL))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::AllAttemptsExhausted { attempts: 1, .. }));
        assert_eq!(session.requests().len(), 1);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn only_200_and_201_succeed() {
        assert!(is_success(200));
        assert!(is_success(201));
        assert!(!is_success(204));
        assert!(!is_success(302));
        assert!(!is_success(500));
    }
}
