use std::{fmt, future::Future, time::Duration};

use http::HeaderMap;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::RetryTransientMiddleware;

use crate::{
    Error, Result,
    options::{ClientOption, ClientOptions, RetryOptions, RetryableOption},
    policy::{BackoffFunc, BackoffPolicy, CheckRetryFunc, CheckRetryStrategy},
};

/// The minimum needed to execute HTTP requests.
pub trait Requester {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = std::result::Result<Response, reqwest_middleware::Error>> + Send;
}

impl Requester for reqwest::Client {
    async fn execute(
        &self,
        request: Request,
    ) -> std::result::Result<Response, reqwest_middleware::Error> {
        Ok(reqwest::Client::execute(self, request).await?)
    }
}

impl Requester for ClientWithMiddleware {
    async fn execute(
        &self,
        request: Request,
    ) -> std::result::Result<Response, reqwest_middleware::Error> {
        ClientWithMiddleware::execute(self, request).await
    }
}

impl<R: Requester> Requester for &R {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = std::result::Result<Response, reqwest_middleware::Error>> + Send {
        (**self).execute(request)
    }
}

/// HTTP client without retries, keeping TCP connections to destination servers.
#[derive(Clone, Debug)]
pub struct Client {
    inner: reqwest::Client,
    options: ClientOptions,
}

impl Client {
    fn build(options: ClientOptions) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().default_headers(options.default_headers.clone());
        if !options.timeout.is_zero() {
            builder = builder.timeout(options.timeout);
        }

        Ok(Self {
            inner: builder.build().map_err(Error::Build)?,
            options,
        })
    }

    /// Per-request timeout. Zero means none.
    pub fn timeout(&self) -> Duration {
        self.options.timeout
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.options.default_headers
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl Requester for Client {
    async fn execute(
        &self,
        request: Request,
    ) -> std::result::Result<Response, reqwest_middleware::Error> {
        Ok(self.inner.execute(request).await?)
    }
}

/// HTTP client that retries requests according to its backoff strategy and
/// retry policy.
#[derive(Clone)]
pub struct RetryableClient {
    retry_max: u32,
    backoff_strategy: BackoffFunc,
    check_retry: CheckRetryFunc,
    client: Client,
    http: ClientWithMiddleware,
}

impl fmt::Debug for RetryableClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryableClient")
            .field("retry_max", &self.retry_max)
            .field("backoff_strategy", &"<fn>")
            .field("check_retry", &"<fn>")
            .field("client", &self.client)
            .finish()
    }
}

impl RetryableClient {
    /// Maximum number of retries after the initial attempt.
    pub fn retry_max(&self) -> u32 {
        self.retry_max
    }

    pub fn backoff_strategy(&self) -> &BackoffFunc {
        &self.backoff_strategy
    }

    pub fn check_retry(&self) -> &CheckRetryFunc {
        &self.check_retry
    }

    /// The plain transport, without retries.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The transport wrapped in the retry middleware.
    pub fn middleware(&self) -> &ClientWithMiddleware {
        &self.http
    }
}

impl Requester for RetryableClient {
    async fn execute(
        &self,
        request: Request,
    ) -> std::result::Result<Response, reqwest_middleware::Error> {
        self.http.execute(request).await
    }
}

/// Builds a [`Client`]. Options are applied in order over the defaults.
pub fn new(opts: impl IntoIterator<Item = ClientOption>) -> Result<Client> {
    let mut config = ClientOptions::default();
    for opt in opts {
        opt.apply(&mut config);
    }

    tracing::debug!(timeout = ?config.timeout, "building http client");

    Client::build(config)
}

/// Builds a [`RetryableClient`]. Plain [`ClientOption`]s can be passed
/// through `.into()`.
///
/// `retry_max` is the number of retries on top of the original request: `3`
/// means up to 4 requests in total, `0` behaves like [`new`].
pub fn new_retryable(
    retry_max: u32,
    opts: impl IntoIterator<Item = RetryableOption>,
) -> Result<RetryableClient> {
    let mut config = RetryOptions::default();
    for opt in opts {
        opt.apply(&mut config);
    }

    tracing::debug!(
        timeout = ?config.client.timeout,
        retry_max,
        "building retryable http client"
    );

    let client = Client::build(config.client)?;

    let policy = BackoffPolicy {
        retry_max,
        backoff: config.backoff_strategy.clone(),
    };
    let strategy = CheckRetryStrategy(config.check_retry.clone());

    let http = ClientBuilder::new(client.inner.clone())
        .with(RetryTransientMiddleware::new_with_policy_and_strategy(
            policy, strategy,
        ))
        .build();

    Ok(RetryableClient {
        retry_max,
        backoff_strategy: config.backoff_strategy,
        check_retry: config.check_retry,
        client,
        http,
    })
}
