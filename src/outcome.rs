//! The uniform result of every call.
//!
//! Verb-level calls return an [`Outcome`] instead of a `Result`: the
//! value slot is always populated, holding the decoded response on
//! success and the caller's fallback on failure, so call sites read
//! straight-line. Callers that want failures as `Err` values convert
//! with [`Outcome::into_result`].

use std::time::Duration;

use http::StatusCode;

use crate::error::Error;

/// What one call produced: a value (decoded or fallback), the response
/// status when one arrived, the classified error when something failed,
/// and the wall-clock latency of the whole call including retries.
///
/// An outcome is immutable once built. Exactly one of the two shapes
/// exists: success (`error` absent, `status` present) or failure
/// (`error` present, `status` only when a response was received).
///
/// # Examples
///
/// ```
/// use gantry::{Error, Outcome};
/// use http::StatusCode;
/// use std::time::Duration;
///
/// let ok = Outcome::success(vec![1, 2], StatusCode::OK, Duration::from_millis(12));
/// assert!(ok.is_success());
/// assert_eq!(ok.value(), &vec![1, 2]);
///
/// let failed: Outcome<Vec<i32>> = Outcome::failure(
///     Vec::new(),
///     Some(StatusCode::NOT_FOUND),
///     Error::Http {
///         status: StatusCode::NOT_FOUND,
///         body: "missing".into(),
///         headers: http::HeaderMap::new(),
///         rate_limit: None,
///     },
///     Duration::from_millis(8),
/// );
/// assert!(!failed.is_success());
/// assert!(failed.value().is_empty());
/// assert_eq!(failed.status(), Some(StatusCode::NOT_FOUND));
/// ```
#[derive(Debug)]
pub struct Outcome<T> {
    value: T,
    status: Option<StatusCode>,
    error: Option<Error>,
    latency: Duration,
}

impl<T> Outcome<T> {
    /// A successful outcome carrying the decoded value.
    pub fn success(value: T, status: StatusCode, latency: Duration) -> Self {
        Self {
            value,
            status: Some(status),
            error: None,
            latency,
        }
    }

    /// A failed outcome carrying the caller's fallback and the
    /// classified error. `status` is present only when a response was
    /// actually received.
    pub fn failure(fallback: T, status: Option<StatusCode>, error: Error, latency: Duration) -> Self {
        Self {
            value: fallback,
            status,
            error: Some(error),
            latency,
        }
    }

    /// Whether the call succeeded end to end, decoding included.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The decoded value on success, the caller's fallback on failure.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume the outcome, keeping only the value slot.
    pub fn into_value(self) -> T {
        self.value
    }

    /// The response status, when a response was received. Absent for
    /// failures that never got an answer (transport faults, timeouts,
    /// hook refusals).
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The classified error on failure, `None` on success.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Wall-clock time the call took, retries and waits included.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Transform the value slot, leaving classification untouched. On a
    /// failed outcome this maps the fallback.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        Outcome {
            value: f(self.value),
            status: self.status,
            error: self.error,
            latency: self.latency,
        }
    }

    /// Convert to a plain `Result`, dropping the fallback on failure.
    pub fn into_result(self) -> Result<T, Error> {
        match self.error {
            None => Ok(self.value),
            Some(error) => Err(error),
        }
    }

    /// The value on success, `None` on failure.
    pub fn ok(self) -> Option<T> {
        self.error.is_none().then_some(self.value)
    }
}

impl<T> AsRef<T> for Outcome<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T> std::ops::Deref for Outcome<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
