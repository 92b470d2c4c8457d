use std::{
    fmt,
    sync::Arc,
    time::{Duration, SystemTime},
};

use reqwest::Response;
use reqwest_retry::{RetryDecision, RetryPolicy, Retryable, RetryableStrategy};

/// Computes the wait before a retry from the number of retries already made.
pub type BackoffFunc = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Decides whether the outcome of an attempt should be retried.
pub type CheckRetryFunc =
    Arc<dyn Fn(&Result<Response, reqwest_middleware::Error>) -> bool + Send + Sync>;

/// Backoff that always waits `wait`.
pub fn constant_backoff(wait: Duration) -> BackoffFunc {
    Arc::new(move |_: u32| wait)
}

/// Retries connection errors, timeouts and 5xx responses.
pub fn server_errors_retry_policy() -> CheckRetryFunc {
    Arc::new(|outcome: &Result<Response, reqwest_middleware::Error>| match outcome {
        Ok(response) => response.status().is_server_error(),
        Err(reqwest_middleware::Error::Reqwest(err)) => err.is_connect() || err.is_timeout(),
        Err(reqwest_middleware::Error::Middleware(_)) => false,
    })
}

pub fn default_backoff_strategy() -> BackoffFunc {
    constant_backoff(Duration::ZERO)
}

pub fn default_retry_policy() -> CheckRetryFunc {
    server_errors_retry_policy()
}

/// Feeds a [`BackoffFunc`] to `reqwest-retry`, capped at `retry_max` retries.
#[derive(Clone)]
pub(crate) struct BackoffPolicy {
    pub(crate) retry_max: u32,
    pub(crate) backoff: BackoffFunc,
}

impl fmt::Debug for BackoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffPolicy")
            .field("retry_max", &self.retry_max)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, _request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.retry_max {
            return RetryDecision::DoNotRetry;
        }

        let wait = (self.backoff)(n_past_retries);
        let Some(execute_after) = SystemTime::now().checked_add(wait) else {
            tracing::debug!(?wait, "backoff out of range, giving up");
            return RetryDecision::DoNotRetry;
        };

        tracing::debug!(retry = n_past_retries + 1, ?wait, "scheduling retry");

        RetryDecision::Retry { execute_after }
    }
}

/// Feeds a [`CheckRetryFunc`] to `reqwest-retry`.
#[derive(Clone)]
pub(crate) struct CheckRetryStrategy(pub(crate) CheckRetryFunc);

impl RetryableStrategy for CheckRetryStrategy {
    fn handle(&self, res: &Result<Response, reqwest_middleware::Error>) -> Option<Retryable> {
        if (self.0)(res) {
            Some(Retryable::Transient)
        } else if res.is_err() {
            Some(Retryable::Fatal)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> Result<Response, reqwest_middleware::Error> {
        let response = http::Response::builder()
            .status(status)
            .body("")
            .expect("valid test response");
        Ok(Response::from(response))
    }

    #[test]
    fn constant_backoff_ignores_attempt() {
        let backoff = constant_backoff(Duration::from_millis(150));
        assert_eq!(backoff(0), Duration::from_millis(150));
        assert_eq!(backoff(7), Duration::from_millis(150));
    }

    #[test]
    fn default_backoff_never_waits() {
        let backoff = default_backoff_strategy();
        for attempt in 0..5 {
            assert_eq!(backoff(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn server_errors_are_retried() {
        let policy = server_errors_retry_policy();
        assert!(policy(&response(500)));
        assert!(policy(&response(503)));
        assert!(!policy(&response(200)));
        assert!(!policy(&response(404)));
        assert!(!policy(&response(429)));
    }

    #[test]
    fn middleware_errors_are_not_retried() {
        let policy = default_retry_policy();
        let err = reqwest_middleware::Error::Middleware(anyhow::anyhow!("boom"));
        assert!(!policy(&Err(err)));
    }

    #[test]
    fn backoff_policy_stops_at_retry_max() {
        let policy = BackoffPolicy {
            retry_max: 2,
            backoff: default_backoff_strategy(),
        };
        let start = SystemTime::now();

        assert!(matches!(
            policy.should_retry(start, 0),
            RetryDecision::Retry { .. }
        ));
        assert!(matches!(
            policy.should_retry(start, 1),
            RetryDecision::Retry { .. }
        ));
        assert!(matches!(
            policy.should_retry(start, 2),
            RetryDecision::DoNotRetry
        ));
    }

    #[test]
    fn zero_retry_max_never_retries() {
        let policy = BackoffPolicy {
            retry_max: 0,
            backoff: default_backoff_strategy(),
        };
        assert!(matches!(
            policy.should_retry(SystemTime::now(), 0),
            RetryDecision::DoNotRetry
        ));
    }

    #[test]
    fn backoff_policy_waits_for_backoff() {
        let policy = BackoffPolicy {
            retry_max: 1,
            backoff: constant_backoff(Duration::from_secs(60)),
        };
        let before = SystemTime::now();

        match policy.should_retry(before, 0) {
            RetryDecision::Retry { execute_after } => {
                assert!(execute_after >= before + Duration::from_secs(60));
            }
            RetryDecision::DoNotRetry => panic!("expected a retry"),
        }
    }

    #[test]
    fn unrepresentable_backoff_stops_retrying() {
        let policy = BackoffPolicy {
            retry_max: 1,
            backoff: constant_backoff(Duration::MAX),
        };

        assert!(matches!(
            policy.should_retry(SystemTime::now(), 0),
            RetryDecision::DoNotRetry
        ));
    }

    #[test]
    fn strategy_maps_outcomes() {
        let strategy = CheckRetryStrategy(server_errors_retry_policy());

        assert!(matches!(
            strategy.handle(&response(502)),
            Some(Retryable::Transient)
        ));
        assert!(strategy.handle(&response(200)).is_none());
        assert!(strategy.handle(&response(400)).is_none());

        let err = reqwest_middleware::Error::Middleware(anyhow::anyhow!("boom"));
        assert!(matches!(strategy.handle(&Err(err)), Some(Retryable::Fatal)));
    }
}
