//! Resilience policies: how attempts are repeated, timed, and delayed.
//!
//! A [`ResiliencePolicy`] owns the attempt loop for one call. The client
//! hands it an [`Attempt`] closure that performs a single transport
//! exchange, and the policy decides how many times to invoke it, under
//! what per-attempt time budget, and with what waits in between. The
//! shipped policy is [`RetryPipeline`]; anything implementing the trait
//! (a circuit breaker, a hedging scheme) plugs into the same slot.
//!
//! Policies are chosen per request kind through a [`PolicySet`], so a
//! GET can retry aggressively while a POST stays at one shot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use http::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::error::{body_excerpt, Error, Result};
use crate::kind::RequestKind;
use crate::rate_limit::{RateLimitConfig, RateLimitInfo};
use crate::retry::{RetryOnRetryable, RetryPredicate, RetryStrategy};
use crate::transport::RawResponse;

/// One transport exchange, ready to be invoked as many times as the
/// policy permits. Each invocation receives a cancellation token scoped
/// to that attempt; the closure owns everything else it needs, so the
/// produced future is `'static`.
pub type Attempt =
    dyn Fn(CancellationToken) -> BoxFuture<'static, Result<RawResponse>> + Send + Sync;

/// Drives the attempt loop for one call.
///
/// The contract: invoke `attempt` at least once, return the first raw
/// response whose status is a success, and convert everything else into
/// an [`Error`]. `cancel` is the call-scoped token; implementations
/// must stop promptly when it fires and answer [`Error::Cancelled`].
#[async_trait]
pub trait ResiliencePolicy: Send + Sync {
    /// Run the loop to completion.
    async fn execute(&self, attempt: &Attempt, cancel: CancellationToken) -> Result<RawResponse>;
}

/// The shipped policy: bounded retries with backoff, a per-attempt time
/// budget, and server rate-limit hints honored for the wait.
///
/// Retry permission is split in two. The [`RetryPredicate`] answers
/// whether a failure class is worth repeating at all; the
/// [`RetryStrategy`] answers how much budget remains and how long to
/// wait. A deterministic failure returns immediately, an eligible one
/// retries until the strategy's budget runs out, and exhaustion after at
/// least one retry wraps the final error in [`Error::RetriesExhausted`].
///
/// # Examples
///
/// ```
/// use gantry::{RetryPipeline, RetryStrategy};
/// use gantry::retry::RetryOn5xx;
/// use std::time::Duration;
///
/// let pipeline = RetryPipeline::new(RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(10),
///     max_retries: 3,
///     jitter: true,
/// })
/// .predicate(Box::new(RetryOn5xx))
/// .attempt_timeout(Duration::from_secs(30));
/// ```
pub struct RetryPipeline {
    strategy: RetryStrategy,
    predicate: Box<dyn RetryPredicate>,
    attempt_timeout: Option<Duration>,
    rate_limit: RateLimitConfig,
}

impl RetryPipeline {
    /// A pipeline with the given budget, retrying everything
    /// [`Error::is_retryable`] marks transient, honoring rate-limit
    /// hints, with no per-attempt timeout.
    pub fn new(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            predicate: Box::new(RetryOnRetryable),
            attempt_timeout: None,
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// A single-shot pipeline. Failures are classified and returned
    /// without a second attempt.
    pub fn no_retry() -> Self {
        Self::new(RetryStrategy::None)
    }

    /// Replace the eligibility predicate.
    pub fn predicate(mut self, predicate: Box<dyn RetryPredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Bound each attempt to `budget`. When it elapses, the attempt's
    /// token is cancelled, the attempt is dropped, and the failure
    /// counts as [`Error::Timeout`].
    pub fn attempt_timeout(mut self, budget: Duration) -> Self {
        self.attempt_timeout = Some(budget);
        self
    }

    /// Replace the rate-limit policy.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Convert a non-success response into its error, parsing rate-limit
    /// hints when the config wants them.
    fn non_success_error(&self, response: RawResponse) -> Error {
        let RawResponse {
            status,
            headers,
            body,
        } = response;
        let rate_limit = if self.rate_limit.enabled {
            let info = RateLimitInfo::from_headers(&headers);
            (info.is_active() || status == StatusCode::TOO_MANY_REQUESTS).then_some(info)
        } else {
            None
        };
        Error::Http {
            status,
            body: body_excerpt(&body),
            headers,
            rate_limit,
        }
    }

    /// The wait before the next attempt. The strategy's budget is
    /// authoritative; within it, the server's own capped ask wins over
    /// the backoff curve. `None` means the budget is spent.
    fn next_delay(&self, error: &Error, attempt: usize) -> Option<Duration> {
        let backoff = self.strategy.delay_for_attempt(attempt)?;
        if self.rate_limit.enabled {
            if let Some(wait) = error.rate_limit_delay(self.rate_limit.max_wait) {
                return Some(wait);
            }
        }
        Some(backoff)
    }

    /// One attempt under the per-attempt budget, racing the call-scoped
    /// token. On timeout the attempt token is cancelled before the
    /// future is dropped, so a cooperative transport sees the signal.
    async fn run_attempt(
        &self,
        attempt: &Attempt,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        let attempt_token = cancel.child_token();
        let mut work = attempt(attempt_token.clone());
        match self.attempt_timeout {
            Some(budget) => {
                tokio::select! {
                    result = &mut work => result,
                    () = tokio::time::sleep(budget) => {
                        attempt_token.cancel();
                        Err(Error::Timeout { budget })
                    }
                    () = cancel.cancelled() => Err(Error::Cancelled),
                }
            }
            None => {
                tokio::select! {
                    result = &mut work => result,
                    () = cancel.cancelled() => Err(Error::Cancelled),
                }
            }
        }
    }
}

#[async_trait]
impl ResiliencePolicy for RetryPipeline {
    async fn execute(&self, attempt: &Attempt, cancel: CancellationToken) -> Result<RawResponse> {
        let mut attempts = 0usize;
        loop {
            attempts += 1;
            let error = match self.run_attempt(attempt, &cancel).await {
                Ok(response) if response.status.is_success() => {
                    if attempts > 1 {
                        tracing::debug!(attempts, "attempt succeeded after retries");
                    }
                    return Ok(response);
                }
                Ok(response) => self.non_success_error(response),
                Err(error) => error,
            };

            if !self.predicate.should_retry(&error, attempts) {
                return Err(error);
            }
            let Some(delay) = self.next_delay(&error, attempts) else {
                // Single-shot pipelines report the failure itself, not a
                // budget that never existed.
                if attempts == 1 {
                    return Err(error);
                }
                return Err(Error::RetriesExhausted {
                    attempts,
                    last: Box::new(error),
                });
            };

            tracing::debug!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying"
            );
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return Err(Error::Cancelled),
            }
        }
    }
}

/// The per-kind policy table.
///
/// Defaults are keyed to idempotence: GET gets three retries, PUT and
/// DELETE two, POST and PATCH none. Repeating a non-idempotent call
/// after an ambiguous failure risks duplicating its effect, so those
/// kinds stay single-shot unless the caller opts in.
#[derive(Clone)]
pub struct PolicySet {
    get: Arc<dyn ResiliencePolicy>,
    post: Arc<dyn ResiliencePolicy>,
    put: Arc<dyn ResiliencePolicy>,
    patch: Arc<dyn ResiliencePolicy>,
    delete: Arc<dyn ResiliencePolicy>,
}

impl PolicySet {
    /// The same policy for every kind.
    pub fn uniform(policy: Arc<dyn ResiliencePolicy>) -> Self {
        Self {
            get: Arc::clone(&policy),
            post: Arc::clone(&policy),
            put: Arc::clone(&policy),
            patch: Arc::clone(&policy),
            delete: policy,
        }
    }

    /// Replace the policy for one kind.
    pub fn with_policy(mut self, kind: RequestKind, policy: Arc<dyn ResiliencePolicy>) -> Self {
        match kind {
            RequestKind::Get => self.get = policy,
            RequestKind::Post => self.post = policy,
            RequestKind::Put => self.put = policy,
            RequestKind::Patch => self.patch = policy,
            RequestKind::Delete => self.delete = policy,
        }
        self
    }

    /// The policy governing `kind`.
    pub fn for_kind(&self, kind: RequestKind) -> &Arc<dyn ResiliencePolicy> {
        match kind {
            RequestKind::Get => &self.get,
            RequestKind::Post => &self.post,
            RequestKind::Put => &self.put,
            RequestKind::Patch => &self.patch,
            RequestKind::Delete => &self.delete,
        }
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        let retrying = |max_retries: usize| -> Arc<dyn ResiliencePolicy> {
            Arc::new(RetryPipeline::new(RetryStrategy::ExponentialBackoff {
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(10),
                max_retries,
                jitter: true,
            }))
        };
        Self {
            get: retrying(3),
            put: retrying(2),
            delete: retrying(2),
            post: Arc::new(RetryPipeline::no_retry()),
            patch: Arc::new(RetryPipeline::no_retry()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{RetryOn5xx, RetryOnTimeout};
    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Instant;

    fn raw(status: u16, headers: &[(&'static str, &'static str)], body: &str) -> RawResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(value));
        }
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: map,
            body: Bytes::from(body.to_string()),
        }
    }

    /// An attempt that walks a fixed status script, repeating the final
    /// entry once the script runs out.
    fn scripted(
        script: Vec<RawResponse>,
    ) -> (
        Arc<AtomicUsize>,
        impl Fn(CancellationToken) -> BoxFuture<'static, Result<RawResponse>> + Send + Sync,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let attempt = move |_token: CancellationToken| -> BoxFuture<'static, Result<RawResponse>> {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let response = script
                .get(n)
                .or_else(|| script.last())
                .expect("script must not be empty")
                .clone();
            Box::pin(async move { Ok(response) })
        };
        (calls, attempt)
    }

    #[tokio::test]
    async fn first_success_needs_no_retry() {
        let (calls, attempt) = scripted(vec![raw(200, &[], "{}")]);
        let pipeline = RetryPipeline::no_retry();
        let response = pipeline
            .execute(&attempt, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_retry_until_success() {
        let (calls, attempt) = scripted(vec![
            raw(500, &[], "boom"),
            raw(503, &[], "still down"),
            raw(200, &[], "{}"),
        ]);
        let pipeline = RetryPipeline::new(RetryStrategy::Linear {
            delay: Duration::from_millis(1),
            max_retries: 5,
        });
        let response = pipeline
            .execute(&attempt, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn deterministic_failures_return_immediately() {
        let (calls, attempt) = scripted(vec![raw(404, &[], "missing")]);
        let pipeline = RetryPipeline::new(RetryStrategy::Linear {
            delay: Duration::from_millis(1),
            max_retries: 5,
        });
        let error = pipeline
            .execute(&attempt, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Http { status, .. } if status == StatusCode::NOT_FOUND));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_wraps_the_final_error() {
        let (calls, attempt) = scripted(vec![raw(500, &[], "boom")]);
        let pipeline = RetryPipeline::new(RetryStrategy::Linear {
            delay: Duration::from_millis(1),
            max_retries: 2,
        });
        let error = pipeline
            .execute(&attempt, CancellationToken::new())
            .await
            .unwrap_err();
        match error {
            Error::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, Error::Http { .. }));
            }
            other => panic!("expected exhaustion, got {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_shot_failures_come_back_unwrapped() {
        let (calls, attempt) = scripted(vec![raw(500, &[], "boom")]);
        let pipeline = RetryPipeline::no_retry();
        let error = pipeline
            .execute(&attempt, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(error, Error::Http { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn predicate_gates_eligibility_before_budget() {
        let (calls, attempt) = scripted(vec![raw(500, &[], "boom")]);
        let pipeline = RetryPipeline::new(RetryStrategy::Linear {
            delay: Duration::from_millis(1),
            max_retries: 5,
        })
        .predicate(Box::new(RetryOnTimeout));
        let error = pipeline
            .execute(&attempt, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Http { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_success_keeps_excerpt_and_rate_hints() {
        let (_, attempt) = scripted(vec![raw(
            429,
            &[("retry-after", "120")],
            "slow down",
        )]);
        let pipeline = RetryPipeline::no_retry().predicate(Box::new(RetryOn5xx));
        let error = pipeline
            .execute(&attempt, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(error.body_excerpt(), Some("slow down"));
        assert_eq!(
            error.rate_limit_delay(Duration::from_secs(300)),
            Some(Duration::from_secs(120))
        );
    }

    #[tokio::test]
    async fn server_ask_beats_backoff_curve_for_the_wait() {
        let (calls, attempt) = scripted(vec![
            raw(429, &[("retry-after", "0")], "throttled"),
            raw(200, &[], "{}"),
        ]);
        // A five-second curve that the server's zero-second ask overrides.
        let pipeline = RetryPipeline::new(RetryStrategy::Linear {
            delay: Duration::from_secs(5),
            max_retries: 2,
        });
        let started = Instant::now();
        let response = pipeline
            .execute(&attempt, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn attempt_timeout_signals_the_attempt_token() {
        let observed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&observed);
        let attempt = move |token: CancellationToken| -> BoxFuture<'static, Result<RawResponse>> {
            let flag = Arc::clone(&flag);
            tokio::spawn(async move {
                token.cancelled().await;
                flag.store(true, Ordering::SeqCst);
            });
            Box::pin(futures_util::future::pending())
        };

        let pipeline = RetryPipeline::no_retry()
            .predicate(Box::new(RetryOn5xx))
            .attempt_timeout(Duration::from_millis(25));
        let started = Instant::now();
        let error = pipeline
            .execute(&attempt, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));

        // The abandoned attempt was signalled, not silently dropped.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancellation_interrupts_an_attempt_in_flight() {
        let attempt = |_token: CancellationToken| -> BoxFuture<'static, Result<RawResponse>> {
            Box::pin(futures_util::future::pending())
        };
        let pipeline = RetryPipeline::no_retry();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let error = pipeline.execute(&attempt, cancel).await.unwrap_err();
        assert!(matches!(error, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_retry_wait() {
        let (calls, attempt) = scripted(vec![raw(500, &[], "boom")]);
        let pipeline = RetryPipeline::new(RetryStrategy::Linear {
            delay: Duration::from_secs(30),
            max_retries: 3,
        });
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let error = pipeline.execute(&attempt, cancel).await.unwrap_err();
        assert!(matches!(error, Error::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn uniform_set_shares_one_policy() {
        let policy: Arc<dyn ResiliencePolicy> = Arc::new(RetryPipeline::no_retry());
        let set = PolicySet::uniform(Arc::clone(&policy));
        for kind in RequestKind::ALL {
            assert!(Arc::ptr_eq(set.for_kind(kind), &policy));
        }
    }

    #[test]
    fn with_policy_replaces_a_single_slot() {
        let replacement: Arc<dyn ResiliencePolicy> = Arc::new(RetryPipeline::no_retry());
        let set = PolicySet::default().with_policy(RequestKind::Post, Arc::clone(&replacement));
        assert!(Arc::ptr_eq(set.for_kind(RequestKind::Post), &replacement));
        assert!(!Arc::ptr_eq(set.for_kind(RequestKind::Get), &replacement));
    }
}
