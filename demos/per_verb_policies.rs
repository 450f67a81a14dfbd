//! Example demonstrating per-verb resilience policies.
//!
//! This example shows how to:
//! - Rely on the default split (reads retry, writes stay single-shot)
//! - Give one verb its own retry pipeline
//! - Combine retry predicates
//! - Share a single pipeline across every verb
//!
//! Run with: `cargo run --example per_verb_policies`

use gantry::retry::{
    AndPredicate, OrPredicate, RetryOn5xx, RetryOnTimeout, RetryOnTransport, RetryPredicate,
};
use gantry::{Client, Error, PolicySet, RequestKind, RetryPipeline, RetryStrategy};
use std::sync::Arc;
use std::time::Duration;

/// Custom predicate: only retry for the first N attempts.
struct MaxAttempts(usize);

impl RetryPredicate for MaxAttempts {
    fn should_retry(&self, _error: &Error, attempt: usize) -> bool {
        attempt <= self.0
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("gantry=debug,per_verb_policies=info")
        .init();

    println!("=== Example 1: The Default Split ===");
    // GET retries transient failures three times; POST and PATCH get a
    // single attempt because the server may have applied the write.
    let client = Client::builder().build()?;

    let fetched = client
        .get(
            "https://jsonplaceholder.typicode.com/posts/1",
            serde_json::json!(null),
        )
        .await;
    println!("GET success: {}", fetched.is_success());
    println!("Latency: {:?}", fetched.latency());
    println!();

    println!("=== Example 2: A Generous GET Pipeline ===");
    // Retry on 5xx errors OR timeouts OR connection failures.
    let eager = OrPredicate::new(vec![
        Box::new(RetryOn5xx),
        Box::new(RetryOnTimeout),
        Box::new(RetryOnTransport),
    ]);

    let client = Client::builder()
        .policy(
            RequestKind::Get,
            Arc::new(
                RetryPipeline::new(RetryStrategy::ExponentialBackoff {
                    initial_delay: Duration::from_millis(100),
                    max_delay: Duration::from_secs(10),
                    max_retries: 5,
                    jitter: true,
                })
                .predicate(Box::new(eager))
                .attempt_timeout(Duration::from_secs(10)),
            ),
        )
        .build()?;

    println!("GET now retries 5xx, timeouts, and connection failures");
    let outcome = client
        .get(
            "https://jsonplaceholder.typicode.com/posts/1",
            serde_json::json!(null),
        )
        .await;
    println!("Success: {}", outcome.is_success());
    println!();

    println!("=== Example 3: Bounded Eagerness with AND ===");
    // Retry on 5xx errors, but only for the first 2 attempts even though
    // the strategy would allow 5.
    let bounded = AndPredicate::new(vec![Box::new(RetryOn5xx), Box::new(MaxAttempts(2))]);

    let client = Client::builder()
        .policy(
            RequestKind::Get,
            Arc::new(
                RetryPipeline::new(RetryStrategy::Linear {
                    delay: Duration::from_millis(500),
                    max_retries: 5,
                })
                .predicate(Box::new(bounded)),
            ),
        )
        .build()?;

    let outcome = client
        .get(
            "https://jsonplaceholder.typicode.com/posts/1",
            serde_json::json!(null),
        )
        .await;
    println!("Success: {}", outcome.is_success());
    println!();

    println!("=== Example 4: One Pipeline for Every Verb ===");
    // A uniform set makes writes retry too. Only do this against
    // idempotent endpoints.
    let everywhere = PolicySet::uniform(Arc::new(RetryPipeline::new(RetryStrategy::Linear {
        delay: Duration::from_millis(250),
        max_retries: 2,
    })));

    let client = Client::builder().policies(everywhere).build()?;

    let outcome = client
        .put(
            "https://jsonplaceholder.typicode.com/posts/1",
            &serde_json::json!({"id": 1, "title": "updated"}),
            serde_json::json!(null),
        )
        .await;
    println!("PUT success: {}", outcome.is_success());
    println!("Status code: {:?}", outcome.status());

    Ok(())
}
