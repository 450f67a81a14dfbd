//! Rate-limit header parsing and wait policy.
//!
//! Servers that throttle announce it through response headers. This
//! module extracts those hints into a [`RateLimitInfo`] that the retry
//! pipeline consults when choosing a delay, preferring the server's own
//! ask over the configured backoff curve.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::HeaderMap;

/// Reset-timestamp headers, in lookup order.
const RESET_HEADERS: [&str; 2] = ["x-ratelimit-reset", "ratelimit-reset"];

/// Rate-limit hints parsed from one response's headers.
///
/// # Examples
///
/// ```
/// use gantry::rate_limit::RateLimitInfo;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", "60".parse().unwrap());
/// headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
///
/// let info = RateLimitInfo::from_headers(&headers);
/// assert!(info.is_active());
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// When the current window resets, from `X-RateLimit-Reset` or
    /// `RateLimit-Reset` (Unix timestamps).
    pub reset_at: Option<SystemTime>,
    /// How long the server asked us to wait, from `Retry-After`
    /// (delay-seconds or an HTTP date).
    pub retry_after: Option<Duration>,
    /// Requests left in the current window, from `X-RateLimit-Remaining`.
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// Parse whatever rate-limit hints the headers carry. Absent or
    /// malformed headers simply leave fields unset.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            reset_at: parse_reset(headers),
            retry_after: parse_retry_after(headers),
            remaining: header_str(headers, "x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        }
    }

    /// The wait the server asked for, capped at `max_wait`.
    ///
    /// An explicit `Retry-After` wins; otherwise the delay is computed
    /// from `reset_at`. `None` when neither hint is usable, including a
    /// reset instant that has already passed.
    pub fn delay(&self, max_wait: Duration) -> Option<Duration> {
        if let Some(retry_after) = self.retry_after {
            return Some(retry_after.min(max_wait));
        }
        let until_reset = self.reset_at?.duration_since(SystemTime::now()).ok()?;
        Some(until_reset.min(max_wait))
    }

    /// Whether these hints describe a limit currently in force: an
    /// explicit wait, or a window with nothing left.
    pub fn is_active(&self) -> bool {
        self.retry_after.is_some() || self.remaining == Some(0)
    }
}

/// Policy for honoring server rate-limit hints during retries.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Parse hints and wait the server-indicated time before retrying.
    pub enabled: bool,
    /// Upper bound on any server-indicated wait. Defaults to 5 minutes.
    pub max_wait: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_wait: Duration::from_secs(300),
        }
    }
}

impl RateLimitConfig {
    /// A config that ignores rate-limit headers entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// A config honoring hints up to the given cap.
    pub fn with_max_wait(max_wait: Duration) -> Self {
        Self {
            enabled: true,
            max_wait,
        }
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name)?.to_str().ok()
}

/// `Retry-After` carries either delay-seconds or an HTTP date.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = header_str(headers, "retry-after")?;
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = httpdate::parse_http_date(value).ok()?;
    date.duration_since(SystemTime::now()).ok()
}

fn parse_reset(headers: &HeaderMap) -> Option<SystemTime> {
    RESET_HEADERS.iter().find_map(|name| {
        let timestamp = header_str(headers, name)?.parse::<u64>().ok()?;
        Some(UNIX_EPOCH + Duration::from_secs(timestamp))
    })
}
