use thiserror::Error;

/// Errors produced by the gateway layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure (connection refused, TLS, timeout, body decode).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("server responded with HTTP {status}")]
    Status { status: u16 },

    /// The configured instance host does not form a valid base URL.
    #[error("invalid gateway URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;
