/// Error type returned by this crate.
///
/// Messages name the failing stage only; the underlying error is the source.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying `reqwest::Client` could not be built.
    #[error("failed to build http client")]
    Build(#[source] reqwest::Error),
    /// Network, middleware or retry exhaustion error.
    #[error("transport error")]
    Transport(#[from] reqwest_middleware::Error),
    /// Non-success HTTP status code.
    #[error("http error")]
    Status(#[source] reqwest::Error),
    /// Response body was not the expected JSON.
    #[error("decode error")]
    Decode(#[source] reqwest::Error),
}
