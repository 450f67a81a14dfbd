//! Error types describing every way a call can fail.
//!
//! Verb-level calls never surface these as panics or raw `Err` values;
//! they arrive folded into an [`Outcome`](crate::Outcome). The enum is
//! still public because resilience policies and [`RetryPredicate`]s
//! inspect errors mid-pipeline, and because [`Outcome::error`] hands the
//! classified failure back to callers that want detail beyond the
//! fallback value.
//!
//! [`RetryPredicate`]: crate::retry::RetryPredicate
//! [`Outcome::error`]: crate::Outcome::error

use std::time::Duration;

use http::{HeaderMap, StatusCode};

use crate::rate_limit::RateLimitInfo;

/// Specialized `Result` used by builders and internal plumbing.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error type carried by hook and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Longest response-body excerpt retained inside an error.
const BODY_EXCERPT_CAP: usize = 2048;

/// All the ways a call can fail.
///
/// # Examples
///
/// ```
/// use gantry::Error;
/// use http::{HeaderMap, StatusCode};
///
/// let err = Error::Http {
///     status: StatusCode::INTERNAL_SERVER_ERROR,
///     body: "upstream fell over".to_string(),
///     headers: HeaderMap::new(),
///     rate_limit: None,
/// };
/// assert!(err.is_retryable());
/// assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
///
/// let err = Error::Http {
///     status: StatusCode::NOT_FOUND,
///     body: "no such user".to_string(),
///     headers: HeaderMap::new(),
///     rate_limit: None,
/// };
/// assert!(!err.is_retryable());
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The pre-request hook refused the call. Nothing was sent.
    #[error("Preflight hook failed: {0}")]
    Preflight(#[source] BoxError),

    /// The transport could not complete the exchange (connection refused,
    /// DNS failure, broken pipe, TLS trouble).
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// A single attempt exceeded its time budget. The in-flight attempt
    /// was signalled to cancel before being dropped.
    #[error("Attempt timed out after {budget:?}")]
    Timeout {
        /// The per-attempt budget that was exhausted.
        budget: Duration,
    },

    /// The caller's cancellation token fired while the call was in flight.
    #[error("Call cancelled")]
    Cancelled,

    /// The server answered with a non-success status.
    #[error("HTTP error {status}: {body}")]
    Http {
        /// The response status code.
        status: StatusCode,
        /// The response body, capped to a fixed excerpt length.
        body: String,
        /// The response headers, kept for diagnostics.
        headers: HeaderMap,
        /// Rate-limit hints parsed from the headers, when present.
        rate_limit: Option<RateLimitInfo>,
    },

    /// The server answered successfully but the body did not decode into
    /// the expected type.
    #[error("Failed to deserialize response (status {status}): {detail}")]
    Deserialize {
        /// Status of the response whose body failed to decode.
        status: StatusCode,
        /// The decoder's own message.
        detail: String,
        /// The offending body, capped to a fixed excerpt length.
        body: String,
    },

    /// The caller's payload could not be serialized. Nothing was sent.
    #[error("Failed to serialize payload: {0}")]
    Serialize(String),

    /// Every permitted attempt failed. Wraps the final attempt's error.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Total attempts made, including the first.
        attempts: usize,
        /// The error from the final attempt.
        last: Box<Error>,
    },

    /// The client or a request was configured with invalid values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The URL source did not resolve to a parseable URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if this failure class is worth repeating.
    ///
    /// Transient faults qualify: transport failures, attempt timeouts,
    /// server errors (5xx), and rate limiting (429). Deterministic
    /// failures do not; a payload that would not serialize or a 4xx
    /// answer will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout { .. } => true,
            Error::Http { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// The HTTP status associated with this error, when one exists.
    ///
    /// Failures that never produced a response (transport faults,
    /// timeouts, hook refusals) have no status. Exhaustion wrappers
    /// answer with the final attempt's status.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } | Error::Deserialize { status, .. } => Some(*status),
            Error::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// The retained response-body excerpt, when one exists.
    pub fn body_excerpt(&self) -> Option<&str> {
        match self {
            Error::Http { body, .. } | Error::Deserialize { body, .. } => Some(body),
            Error::RetriesExhausted { last, .. } => last.body_excerpt(),
            _ => None,
        }
    }

    /// Rate-limit hints parsed from the offending response, if any.
    pub fn rate_limit_info(&self) -> Option<&RateLimitInfo> {
        match self {
            Error::Http { rate_limit, .. } => rate_limit.as_ref(),
            Error::RetriesExhausted { last, .. } => last.rate_limit_info(),
            _ => None,
        }
    }

    /// How long the server asked us to wait, capped at `max_wait`.
    ///
    /// `None` when the error carries no usable rate-limit hints,
    /// including a reset instant that has already passed. An ask beyond
    /// the cap comes back as `max_wait` itself.
    pub fn rate_limit_delay(&self, max_wait: Duration) -> Option<Duration> {
        self.rate_limit_info()?.delay(max_wait)
    }
}

impl From<reqwest::Error> for Error {
    fn from(cause: reqwest::Error) -> Self {
        Error::Transport(Box::new(cause))
    }
}

/// Decode a body for retention inside an error, lossily and capped.
pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= BODY_EXCERPT_CAP {
        return text.into_owned();
    }
    let mut cut = BODY_EXCERPT_CAP;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... ({} bytes total)", &text[..cut], bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_error(status: StatusCode) -> Error {
        Error::Http {
            status,
            body: "body".to_string(),
            headers: HeaderMap::new(),
            rate_limit: None,
        }
    }

    #[test]
    fn server_errors_and_rate_limits_are_retryable() {
        assert!(http_error(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());
        assert!(http_error(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(http_error(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(Error::Timeout { budget: Duration::from_secs(1) }.is_retryable());
    }

    #[test]
    fn deterministic_failures_are_not_retryable() {
        assert!(!http_error(StatusCode::NOT_FOUND).is_retryable());
        assert!(!http_error(StatusCode::UNAUTHORIZED).is_retryable());
        assert!(!Error::Serialize("bad payload".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::Preflight("no token".into()).is_retryable());
    }

    #[test]
    fn status_reaches_through_exhaustion_wrapper() {
        let wrapped = Error::RetriesExhausted {
            attempts: 4,
            last: Box::new(http_error(StatusCode::SERVICE_UNAVAILABLE)),
        };
        assert_eq!(wrapped.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(wrapped.body_excerpt(), Some("body"));
    }

    #[test]
    fn over_cap_asks_come_back_as_the_cap() {
        let error = Error::Http {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "slow down".to_string(),
            headers: HeaderMap::new(),
            rate_limit: Some(RateLimitInfo {
                reset_at: None,
                retry_after: Some(Duration::from_secs(600)),
                remaining: Some(0),
            }),
        };
        assert_eq!(
            error.rate_limit_delay(Duration::from_secs(120)),
            Some(Duration::from_secs(120))
        );

        let bare = http_error(StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(bare.rate_limit_delay(Duration::from_secs(120)), None);
    }

    #[test]
    fn excerpt_caps_long_bodies_on_char_boundary() {
        let long = "é".repeat(4096);
        let excerpt = body_excerpt(long.as_bytes());
        assert!(excerpt.len() < long.len());
        assert!(excerpt.ends_with("bytes total)"));

        let short = body_excerpt(b"tiny");
        assert_eq!(short, "tiny");
    }
}
