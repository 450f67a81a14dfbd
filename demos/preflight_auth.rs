//! Example demonstrating a pre-request hook for authentication.
//!
//! This example shows how to:
//! - Run an async hook once before every call
//! - Refresh an expiring token without touching call sites
//! - Surface hook failures through the outcome instead of a panic
//!
//! Run with: `cargo run --example preflight_auth`

use async_trait::async_trait;
use gantry::{BoxError, Client, Error, Preflight, RequestKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Refreshes a bearer token when it is close to expiry.
struct TokenRefresher {
    expires_at: AtomicU64,
}

impl TokenRefresher {
    fn new() -> Self {
        Self {
            expires_at: AtomicU64::new(0),
        }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Preflight for TokenRefresher {
    async fn before_request(&self, kind: RequestKind) -> Result<(), BoxError> {
        let now = Self::now();
        if self.expires_at.load(Ordering::SeqCst) <= now {
            // A real hook would call the token endpoint here.
            println!("[hook] refreshing token before a {kind} call");
            self.expires_at.store(now + 300, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A hook that always fails, to show the failure path.
struct BrokenRefresher;

#[async_trait]
impl Preflight for BrokenRefresher {
    async fn before_request(&self, _kind: RequestKind) -> Result<(), BoxError> {
        Err("identity provider unreachable".into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("gantry=debug,preflight_auth=info")
        .init();

    println!("=== Hook Runs Once Per Call ===");
    let client = Client::builder()
        .preflight(Arc::new(TokenRefresher::new()))
        .default_header("authorization", "Bearer demo-token")?
        .build()?;

    let first = client
        .get(
            "https://jsonplaceholder.typicode.com/posts/1",
            serde_json::json!(null),
        )
        .await;
    println!("First call success: {}", first.is_success());

    let second = client
        .get(
            "https://jsonplaceholder.typicode.com/posts/2",
            serde_json::json!(null),
        )
        .await;
    println!("Second call success: {} (token still fresh)", second.is_success());
    println!();

    println!("=== A Failing Hook Stays Inside the Outcome ===");
    let broken = Client::builder().preflight(Arc::new(BrokenRefresher)).build()?;

    let outcome = broken
        .get(
            "https://jsonplaceholder.typicode.com/posts/1",
            serde_json::json!(null),
        )
        .await;

    println!("Success: {}", outcome.is_success());
    println!("Status code: {:?}", outcome.status());
    match outcome.error() {
        Some(Error::Preflight(cause)) => println!("Preflight failed: {cause}"),
        other => println!("Unexpected error: {other:?}"),
    }

    Ok(())
}
