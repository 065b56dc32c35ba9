//! Unified error type.

use crate::method::Method;

/// The error type returned by baton's fallible operations.
///
/// Application-level failures (403, 400, etc.) are expressed as
/// [`Envelope`](crate::Envelope) values, not as `Error`s. This type surfaces
/// configuration and infrastructure failures: conflicting routes, binding a
/// listener, loading TLS material, or decoding a request body on behalf of a
/// handler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    #[error("tls: {0}")]
    Certificate(String),

    #[error("route `{method} {path}`: {source}")]
    Route {
        method: Method,
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("request body: {0}")]
    Body(#[from] serde_json::Error),
}
