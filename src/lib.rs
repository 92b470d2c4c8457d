//! Small client-side helpers for an invoicing API.
//!
//! - [`SearchRequest`] turns limit, offset and filters into query parameters.
//! - [`new`] and [`new_retryable`] build HTTP clients from functional options.
//! - [`InvoiceApi`] runs invoice searches through any [`Requester`].

mod client;
mod error;
mod invoice;
mod options;
mod policy;

pub use client::{Client, Requester, RetryableClient, new, new_retryable};
pub use error::Error;
pub use invoice::{DEFAULT_LIMIT, InvoiceApi, SearchRequest};
pub use options::{
    ClientOption, ClientOptions, DEFAULT_TIMEOUT, RetryOptions, RetryableOption,
    with_backoff_strategy, with_default_headers, with_retry_policy, with_timeout,
};
pub use policy::{
    BackoffFunc, CheckRetryFunc, constant_backoff, default_backoff_strategy,
    default_retry_policy, server_errors_retry_policy,
};

pub type Result<T> = std::result::Result<T, Error>;
