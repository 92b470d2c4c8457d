use std::{fmt, time::Duration};

use chrono::TimeDelta;
use http::HeaderMap;

use crate::policy::{BackoffFunc, CheckRetryFunc, default_backoff_strategy, default_retry_policy};

/// Timeout used when no [`with_timeout`] option is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolved configuration of a plain [`Client`](crate::Client).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    /// Per-request timeout. Zero disables it.
    pub timeout: Duration,
    /// Headers attached to every request.
    pub default_headers: HeaderMap,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            default_headers: HeaderMap::new(),
        }
    }
}

/// Resolved configuration of a [`RetryableClient`](crate::RetryableClient).
#[derive(Clone)]
pub struct RetryOptions {
    pub client: ClientOptions,
    pub backoff_strategy: BackoffFunc,
    pub check_retry: CheckRetryFunc,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            client: ClientOptions::default(),
            backoff_strategy: default_backoff_strategy(),
            check_retry: default_retry_policy(),
        }
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// Option accepted by both [`new`](crate::new) and
/// [`new_retryable`](crate::new_retryable).
#[derive(Clone, Debug)]
pub enum ClientOption {
    Timeout(TimeDelta),
    DefaultHeaders(HeaderMap),
}

impl ClientOption {
    pub(crate) fn apply(self, opts: &mut ClientOptions) {
        match self {
            // Negative durations make no sense as a timeout; keep what is staged.
            ClientOption::Timeout(t) => {
                if let Ok(t) = t.to_std() {
                    opts.timeout = t;
                }
            }
            ClientOption::DefaultHeaders(headers) => opts.default_headers.extend(headers),
        }
    }
}

/// Option accepted by [`new_retryable`](crate::new_retryable).
///
/// Every [`ClientOption`] converts into one, so plain options can be mixed in
/// with `.into()`. The reverse does not hold.
#[derive(Clone)]
pub enum RetryableOption {
    Client(ClientOption),
    BackoffStrategy(BackoffFunc),
    RetryPolicy(CheckRetryFunc),
}

impl RetryableOption {
    pub(crate) fn apply(self, opts: &mut RetryOptions) {
        match self {
            RetryableOption::Client(opt) => opt.apply(&mut opts.client),
            RetryableOption::BackoffStrategy(strategy) => opts.backoff_strategy = strategy,
            RetryableOption::RetryPolicy(check_retry) => opts.check_retry = check_retry,
        }
    }
}

impl From<ClientOption> for RetryableOption {
    fn from(opt: ClientOption) -> Self {
        RetryableOption::Client(opt)
    }
}

impl fmt::Debug for RetryableOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryableOption::Client(opt) => f.debug_tuple("Client").field(opt).finish(),
            RetryableOption::BackoffStrategy(_) => f.write_str("BackoffStrategy(<fn>)"),
            RetryableOption::RetryPolicy(_) => f.write_str("RetryPolicy(<fn>)"),
        }
    }
}

/// Controls the timeout for each request. When retrying, every attempt
/// starts counting from zero again.
///
/// A zero timeout disables request timeouts. Negative values are ignored.
pub fn with_timeout(t: TimeDelta) -> ClientOption {
    ClientOption::Timeout(t)
}

/// Adds headers sent with every request. Later options win on conflicts.
pub fn with_default_headers(headers: HeaderMap) -> ClientOption {
    ClientOption::DefaultHeaders(headers)
}

/// Controls the wait time between retries.
pub fn with_backoff_strategy(strategy: BackoffFunc) -> RetryableOption {
    RetryableOption::BackoffStrategy(strategy)
}

/// Controls which outcomes are retried.
pub fn with_retry_policy(check_retry: CheckRetryFunc) -> RetryableOption {
    RetryableOption::RetryPolicy(check_retry)
}
