//! # Gantry - a typed HTTP API-client base with uniform outcomes
//!
//! Gantry executes typed JSON API calls on top of `reqwest` and hands
//! back an [`Outcome`] for every call: the decoded value on success, a
//! caller-supplied fallback plus a classified [`Error`] on failure, and
//! never a panic or a stray `Err` at the verb level. Resilience (retry,
//! backoff, per-attempt timeouts, rate-limit waits) is chosen per
//! request kind, so reads can hammer away while writes stay cautious.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gantry::{Client, RequestKind, RetryPipeline, RetryStrategy};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//!     email: String,
//! }
//!
//! #[derive(Deserialize, Default)]
//! struct User {
//!     id: u64,
//!     name: String,
//!     email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gantry::Error> {
//!     let client = Client::builder()
//!         .default_header("user-agent", "my-app/1.0")?
//!         .policy(
//!             RequestKind::Get,
//!             Arc::new(
//!                 RetryPipeline::new(RetryStrategy::ExponentialBackoff {
//!                     initial_delay: Duration::from_millis(100),
//!                     max_delay: Duration::from_secs(10),
//!                     max_retries: 3,
//!                     jitter: true,
//!                 })
//!                 .attempt_timeout(Duration::from_secs(30)),
//!             ),
//!         )
//!         .build()?;
//!
//!     // GET: on any failure the fallback comes back, with the
//!     // classified error beside it for inspection.
//!     let user = client
//!         .get("https://api.example.com/users/123", User::default())
//!         .await;
//!     println!("user {} ({:?}, {:?})", user.name, user.status(), user.latency());
//!
//!     // POST: the payload is serialized once and sent as JSON.
//!     let new_user = CreateUser {
//!         name: "Alice".to_string(),
//!         email: "alice@example.com".to_string(),
//!     };
//!     let created = client
//!         .post("https://api.example.com/users", &new_user, User::default())
//!         .await;
//!     if created.is_success() {
//!         println!("created user {}", created.id);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Uniform outcomes** - Every verb call returns an [`Outcome`] holding a value (decoded or fallback), the status when one arrived, and the classified error when something failed
//! - **Per-kind resilience** - A [`PolicySet`] maps each request kind to its own [`ResiliencePolicy`]; defaults retry idempotent kinds only
//! - **Pluggable policies** - The shipped [`RetryPipeline`] covers backoff, eligibility predicates, per-attempt timeouts, and rate-limit waits; anything implementing the trait slots in
//! - **Typed payloads** - Generic over `Serialize` payloads and `DeserializeOwned` responses, with GET payloads flattened into the query string
//! - **Encoding options** - camelCase renaming and null skipping applied uniformly to bodies and queries via [`EncodeOptions`]
//! - **Preflight hook** - An async [`Preflight`] awaited once per call, before anything is built or sent
//! - **Cooperative cancellation** - A client-wide token interrupts in-flight calls and retry waits; abandoned attempts are signalled first
//! - **Structured logging** - Exactly one `tracing` outcome event per call, with attempt internals at debug level
//!
//! ## Working with outcomes
//!
//! Failures never escape as exceptions; they ride inside the outcome:
//!
//! ```no_run
//! use gantry::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().build()?;
//! let answer = client
//!     .get("https://api.example.com/flaky", serde_json::json!({"ok": false}))
//!     .await;
//!
//! match answer.error() {
//!     None => println!("got {}", answer.value()),
//!     Some(Error::Http { status, body, .. }) => {
//!         eprintln!("server said {status}: {body}");
//!     }
//!     Some(Error::Deserialize { status, detail, .. }) => {
//!         eprintln!("unreadable answer (status {status}): {detail}");
//!     }
//!     Some(other) => eprintln!("call failed: {other}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Per-kind resilience
//!
//! ```no_run
//! use gantry::retry::{OrPredicate, RetryOn5xx, RetryOnTimeout};
//! use gantry::{Client, PolicySet, RequestKind, RetryPipeline, RetryStrategy};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), gantry::Error> {
//! // Reads retry hard; writes keep the cautious defaults.
//! let sturdy_reads = RetryPipeline::new(RetryStrategy::ExponentialBackoff {
//!     initial_delay: Duration::from_millis(100),
//!     max_delay: Duration::from_secs(30),
//!     max_retries: 5,
//!     jitter: true,
//! })
//! .predicate(Box::new(OrPredicate::new(vec![
//!     Box::new(RetryOn5xx),
//!     Box::new(RetryOnTimeout),
//! ])));
//!
//! let client = Client::builder()
//!     .policies(PolicySet::default().with_policy(RequestKind::Get, Arc::new(sturdy_reads)))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod encode;
mod error;
mod hook;
mod kind;
mod outcome;
pub mod rate_limit;
mod request;
pub mod resilience;
pub mod retry;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use encode::{encode_payload, EncodeOptions, FieldNaming};
pub use error::{BoxError, Error, Result};
pub use hook::Preflight;
pub use kind::{BodyPlacement, KindProfile, RequestKind};
pub use outcome::Outcome;
pub use rate_limit::{RateLimitConfig, RateLimitInfo};
pub use request::{OutboundRequest, UrlSource};
pub use resilience::{Attempt, PolicySet, ResiliencePolicy, RetryPipeline};
pub use retry::{RetryPredicate, RetryStrategy};
pub use transport::{RawResponse, ReqwestTransport, Transport};
