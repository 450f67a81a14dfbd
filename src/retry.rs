//! Retry strategies and eligibility predicates.
//!
//! A [`RetryStrategy`] decides how many repeats a pipeline may spend and
//! how long to wait between them; a [`RetryPredicate`] decides whether a
//! particular failure is worth repeating at all. The two are combined by
//! [`RetryPipeline`](crate::RetryPipeline), which keys the budget to the
//! request kind and the eligibility to the failure class.

use std::time::Duration;

use rand::Rng;

use crate::Error;

/// The retry budget and delay curve for a pipeline.
///
/// # Examples
///
/// ```
/// use gantry::RetryStrategy;
/// use std::time::Duration;
///
/// // Exponential backoff: 100ms, 200ms, 400ms, ...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     max_retries: 5,
///     jitter: true,
/// };
///
/// // Fixed delay: 1s, 1s, 1s.
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_secs(1),
///     max_retries: 3,
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub enum RetryStrategy {
    /// Never retry.
    #[default]
    None,

    /// Exponentially increasing delays, doubling per attempt up to
    /// `max_delay`. Jitter scales each delay by a random factor in
    /// `0.5..=1.0` to spread out synchronized clients.
    ExponentialBackoff {
        /// Delay before the first retry.
        initial_delay: Duration,
        /// Ceiling for the doubled delays.
        max_delay: Duration,
        /// Retries permitted after the initial attempt.
        max_retries: usize,
        /// Randomize each delay within `0.5..=1.0` of its value.
        jitter: bool,
    },

    /// A fixed delay between attempts.
    Linear {
        /// Delay before every retry.
        delay: Duration,
        /// Retries permitted after the initial attempt.
        max_retries: usize,
    },

    /// Caller-supplied curve. The function receives the retry number
    /// (1-indexed) and answers `Some(delay)` to continue or `None` to
    /// stop.
    Custom {
        /// Delay per retry, or `None` when the budget is spent.
        delay_fn: fn(attempt: usize) -> Option<Duration>,
    },
}

impl RetryStrategy {
    /// The delay before retry number `attempt` (1-indexed), or `None`
    /// when the budget is spent.
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_retries,
                jitter,
            } => {
                if attempt > *max_retries {
                    return None;
                }
                let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1) as u32);
                let base = initial_delay.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base.min(*max_delay);
                if *jitter {
                    let factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay, max_retries } => {
                (attempt <= *max_retries).then_some(*delay)
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }

    /// The retry budget, when the strategy knows it up front.
    pub fn max_retries(&self) -> Option<usize> {
        match self {
            RetryStrategy::None => Some(0),
            RetryStrategy::ExponentialBackoff { max_retries, .. }
            | RetryStrategy::Linear { max_retries, .. } => Some(*max_retries),
            RetryStrategy::Custom { .. } => None,
        }
    }
}

/// Decides whether a failure class is eligible for another attempt.
///
/// The pipeline consults the predicate before spending budget, so a
/// deterministic failure (a 404, a payload that will not serialize)
/// short-circuits without waiting out a delay.
///
/// # Examples
///
/// ```
/// use gantry::{Error, RetryPredicate};
/// use http::StatusCode;
///
/// struct RetryOnRateLimit;
///
/// impl RetryPredicate for RetryOnRateLimit {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         matches!(
///             error,
///             Error::Http { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS
///         )
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// `true` to permit another attempt after `error` on attempt number
    /// `attempt` (1-indexed).
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

/// Retry every failure [`Error::is_retryable`] marks transient. The
/// default predicate.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRetryable;

impl RetryPredicate for RetryOnRetryable {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_retryable()
    }
}

/// Retry only on 5xx answers.
#[derive(Debug, Clone, Copy)]
pub struct RetryOn5xx;

impl RetryPredicate for RetryOn5xx {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Http { status, .. } if status.is_server_error())
    }
}

/// Retry only on attempt timeouts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Timeout { .. })
    }
}

/// Retry only on transport-level failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTransport;

impl RetryPredicate for RetryOnTransport {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Transport(_))
    }
}

/// Any-of combinator: retries when any inner predicate says yes.
///
/// # Examples
///
/// ```
/// use gantry::retry::{OrPredicate, RetryOn5xx, RetryOnTimeout};
///
/// let predicate = OrPredicate::new(vec![
///     Box::new(RetryOn5xx),
///     Box::new(RetryOnTimeout),
/// ]);
/// ```
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    /// Combine the given predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates.iter().any(|p| p.should_retry(error, attempt))
    }
}

/// All-of combinator: retries only when every inner predicate says yes.
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    /// Combine the given predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for AndPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates.iter().all(|p| p.should_retry(error, attempt))
    }
}
