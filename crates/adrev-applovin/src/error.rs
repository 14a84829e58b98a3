use thiserror::Error;

/// Errors returned by the MAX reporting client.
///
/// The `context` fields name the endpoint call that failed (never the API
/// key), so pipeline-level error strings stay safe to log and persist.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 401 or 403: credential or permission fault, never retried.
    #[error("authentication rejected ({status}) for {context}")]
    Auth { status: u16, context: String },

    /// HTTP 429.
    #[error("rate limited for {context}")]
    RateLimited { context: String },

    /// HTTP 5xx.
    #[error("upstream server error {status} for {context}")]
    Server { status: u16, context: String },

    /// Any other non-2xx status, not retried.
    #[error("unexpected HTTP status {status} for {context}")]
    UnexpectedStatus { status: u16, context: String },

    /// The user-level report envelope was not valid JSON.
    #[error("JSON deserialization error for {context}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A report body that cannot be ingested: unreadable CSV, a missing
    /// required column, or an unparsable download URL.
    #[error("malformed report for {context}: {reason}")]
    MalformedReport { context: String, reason: String },

    /// The configured base URL is not a valid URL.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
