//! The client: typed verb calls with uniform outcomes.
//!
//! [`Client`] is the entry point. Each call runs the same pipeline:
//! preflight hook, URL binding, header and payload attachment, dispatch
//! through the kind's resilience policy, then classification into an
//! [`Outcome`]. Use [`ClientBuilder`] to configure and create clients.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::encode::{attach_query, encode_payload, EncodeOptions};
use crate::error::{body_excerpt, Error, Result};
use crate::hook::Preflight;
use crate::kind::{BodyPlacement, RequestKind, JSON_CONTENT_TYPE};
use crate::outcome::Outcome;
use crate::request::{OutboundRequest, UrlSource};
use crate::resilience::{PolicySet, ResiliencePolicy};
use crate::transport::{dispatch, RawResponse, ReqwestTransport, Transport};

/// A typed HTTP client whose verb calls cannot fail loudly.
///
/// Every verb method returns an [`Outcome`] carrying either the decoded
/// response or the caller-supplied fallback, never an `Err` and never a
/// panic for runtime faults. The client is cheap to clone and designed
/// to be shared; configuration and the transport's connection pool live
/// behind one `Arc`.
///
/// # Examples
///
/// ```no_run
/// use gantry::Client;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, Default)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), gantry::Error> {
/// let client = Client::builder()
///     .default_header("user-agent", "my-app/1.0")?
///     .build()?;
///
/// let user = client
///     .get("https://api.example.com/users/123", User::default())
///     .await;
///
/// if user.is_success() {
///     println!("hello, {}", user.name);
/// } else if let Some(error) = user.error() {
///     eprintln!("lookup failed: {error}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    policies: PolicySet,
    encode: EncodeOptions,
    default_headers: HeaderMap,
    preflight: Option<Arc<dyn Preflight>>,
    shutdown: CancellationToken,
}

impl Client {
    /// Creates a new [`ClientBuilder`] with default settings.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The root cancellation token for this client.
    ///
    /// Cancelling it interrupts every in-flight call, including retry
    /// waits; interrupted calls classify as
    /// [`Error::Cancelled`](crate::Error::Cancelled).
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    /// Executes one call of the given kind.
    ///
    /// This is the generic entry the verb methods delegate to. The
    /// payload is placed according to the kind's profile: GET flattens
    /// it into the URL query, POST/PUT/PATCH serialize it once as a
    /// JSON body reused across retries, DELETE ignores it. `fallback`
    /// fills the outcome's value slot whenever the call fails.
    ///
    /// Exactly one outcome event is logged per call, success or not.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gantry::{Client, RequestKind};
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize)]
    /// struct Search {
    ///     q: String,
    /// }
    ///
    /// #[derive(Deserialize, Default)]
    /// struct Results {
    ///     hits: Vec<String>,
    /// }
    ///
    /// # async fn example() -> Result<(), gantry::Error> {
    /// let client = Client::builder().build()?;
    /// let query = Search { q: "rust".to_string() };
    ///
    /// let results = client
    ///     .call(
    ///         RequestKind::Get,
    ///         "https://api.example.com/search",
    ///         Some(&query),
    ///         Results::default(),
    ///     )
    ///     .await;
    /// println!("{} hits", results.hits.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<U, B, R>(
        &self,
        kind: RequestKind,
        url: U,
        payload: Option<&B>,
        fallback: R,
    ) -> Outcome<R>
    where
        U: UrlSource,
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let started = Instant::now();

        if let Some(hook) = &self.inner.preflight {
            if let Err(cause) = hook.before_request(kind).await {
                return self.classify(kind, None, Err(Error::Preflight(cause)), fallback, started);
            }
        }

        let mut request = match OutboundRequest::bind(kind, &url) {
            Ok(request) => request,
            Err(error) => return self.classify(kind, None, Err(error), fallback, started),
        };

        let body = match self.attach(&mut request, payload) {
            Ok(body) => body,
            Err(error) => {
                return self.classify(kind, Some(&request.url), Err(error), fallback, started)
            }
        };

        let policy = Arc::clone(self.inner.policies.for_kind(kind));
        let cancel = self.inner.shutdown.child_token();
        let attempt = {
            let transport = Arc::clone(&self.inner.transport);
            let request = request.clone();
            let body = body.clone();
            move |token: CancellationToken| -> BoxFuture<'static, Result<RawResponse>> {
                let transport = Arc::clone(&transport);
                let request = request.clone();
                let body = body.clone();
                Box::pin(async move {
                    dispatch(transport.as_ref(), &request, body.as_ref(), &token).await
                })
            }
        };

        let raw = policy.execute(&attempt, cancel).await;
        self.classify(kind, Some(&request.url), raw, fallback, started)
    }

    /// Merge client defaults and the kind's headers into the request,
    /// then place the payload. Returns the serialized body bytes when
    /// the kind sends one.
    fn attach<B>(
        &self,
        request: &mut OutboundRequest,
        payload: Option<&B>,
    ) -> Result<Option<Bytes>>
    where
        B: Serialize + ?Sized,
    {
        for (name, value) in &self.inner.default_headers {
            request
                .headers
                .entry(name)
                .or_insert_with(|| value.clone());
        }
        (request.kind.profile().attach_headers)(&mut request.headers);

        match request.kind.profile().body {
            BodyPlacement::None => Ok(None),
            BodyPlacement::Query => {
                if let Some(payload) = payload {
                    attach_query(&mut request.url, payload, &self.inner.encode)?;
                }
                Ok(None)
            }
            BodyPlacement::Json => match payload {
                Some(payload) => {
                    let bytes = encode_payload(payload, &self.inner.encode)?;
                    request
                        .headers
                        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                    Ok(Some(bytes))
                }
                None => Ok(None),
            },
        }
    }

    /// Fold a pipeline result into the outcome and emit the one log
    /// event this call gets.
    fn classify<R>(
        &self,
        kind: RequestKind,
        url: Option<&Url>,
        result: Result<RawResponse>,
        fallback: R,
        started: Instant,
    ) -> Outcome<R>
    where
        R: DeserializeOwned,
    {
        let latency = started.elapsed();
        let url = url.map(Url::as_str).unwrap_or("-");
        let latency_ms = latency.as_millis() as u64;

        match result {
            Ok(raw) => match serde_json::from_slice::<R>(&raw.body) {
                Ok(value) => {
                    tracing::info!(
                        method = %kind,
                        url,
                        status = raw.status.as_u16(),
                        latency_ms,
                        "request completed"
                    );
                    Outcome::success(value, raw.status, latency)
                }
                Err(cause) => {
                    let error = Error::Deserialize {
                        status: raw.status,
                        detail: cause.to_string(),
                        body: body_excerpt(&raw.body),
                    };
                    tracing::warn!(
                        method = %kind,
                        url,
                        error = %error,
                        latency_ms,
                        "request failed"
                    );
                    Outcome::failure(fallback, Some(raw.status), error, latency)
                }
            },
            Err(error) => {
                let status = error.status();
                tracing::warn!(
                    method = %kind,
                    url,
                    error = %error,
                    latency_ms,
                    "request failed"
                );
                Outcome::failure(fallback, status, error, latency)
            }
        }
    }

    /// GET without query content.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gantry::Client;
    ///
    /// # async fn example() -> Result<(), gantry::Error> {
    /// let client = Client::builder().build()?;
    /// let todo = client
    ///     .get("https://api.example.com/todos/1", serde_json::Value::Null)
    ///     .await;
    /// println!("{}", todo.value());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<U, R>(&self, url: U, fallback: R) -> Outcome<R>
    where
        U: UrlSource,
        R: DeserializeOwned,
    {
        self.call::<_, (), _>(RequestKind::Get, url, None, fallback).await
    }

    /// GET with a payload flattened into the URL query string.
    ///
    /// The payload must serialize to a flat JSON object; nested values
    /// classify the call as a serialization failure.
    pub async fn get_query<U, Q, R>(&self, url: U, query: &Q, fallback: R) -> Outcome<R>
    where
        U: UrlSource,
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call(RequestKind::Get, url, Some(query), fallback).await
    }

    /// POST with a JSON body.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gantry::Client;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize)]
    /// struct CreateUser {
    ///     name: String,
    /// }
    ///
    /// #[derive(Deserialize, Default)]
    /// struct User {
    ///     id: u64,
    ///     name: String,
    /// }
    ///
    /// # async fn example() -> Result<(), gantry::Error> {
    /// let client = Client::builder().build()?;
    /// let created = client
    ///     .post(
    ///         "https://api.example.com/users",
    ///         &CreateUser { name: "Alice".to_string() },
    ///         User::default(),
    ///     )
    ///     .await;
    /// if created.is_success() {
    ///     println!("created user {}", created.id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn post<U, B, R>(&self, url: U, body: &B, fallback: R) -> Outcome<R>
    where
        U: UrlSource,
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call(RequestKind::Post, url, Some(body), fallback).await
    }

    /// PUT with a JSON body.
    pub async fn put<U, B, R>(&self, url: U, body: &B, fallback: R) -> Outcome<R>
    where
        U: UrlSource,
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call(RequestKind::Put, url, Some(body), fallback).await
    }

    /// PATCH with a JSON body.
    pub async fn patch<U, B, R>(&self, url: U, body: &B, fallback: R) -> Outcome<R>
    where
        U: UrlSource,
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call(RequestKind::Patch, url, Some(body), fallback).await
    }

    /// DELETE. Payloads are never sent for this kind.
    pub async fn delete<U, R>(&self, url: U, fallback: R) -> Outcome<R>
    where
        U: UrlSource,
        R: DeserializeOwned,
    {
        self.call::<_, (), _>(RequestKind::Delete, url, None, fallback).await
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use gantry::{ClientBuilder, EncodeOptions, FieldNaming, RequestKind, RetryPipeline, RetryStrategy};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), gantry::Error> {
/// let client = ClientBuilder::new()
///     .default_header("user-agent", "my-app/1.0")?
///     .encode_options(EncodeOptions {
///         field_naming: FieldNaming::CamelCase,
///         skip_nulls: true,
///     })
///     .policy(
///         RequestKind::Get,
///         Arc::new(
///             RetryPipeline::new(RetryStrategy::ExponentialBackoff {
///                 initial_delay: Duration::from_millis(100),
///                 max_delay: Duration::from_secs(10),
///                 max_retries: 3,
///                 jitter: true,
///             })
///             .attempt_timeout(Duration::from_secs(30)),
///         ),
///     )
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    policies: PolicySet,
    encode: EncodeOptions,
    default_headers: HeaderMap,
    preflight: Option<Arc<dyn Preflight>>,
    shutdown: Option<CancellationToken>,
}

impl ClientBuilder {
    /// Creates a builder with the default policy set and encoding.
    pub fn new() -> Self {
        Self {
            transport: None,
            policies: PolicySet::default(),
            encode: EncodeOptions::default(),
            default_headers: HeaderMap::new(),
            preflight: None,
            shutdown: None,
        }
    }

    /// Use a custom transport instead of the default reqwest-backed one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use the default transport, but backed by this `reqwest::Client`
    /// (keeping its pool, proxy, and TLS configuration).
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.transport = Some(Arc::new(ReqwestTransport::new(client)));
        self
    }

    /// Add a header included in every request. Per-call attachment never
    /// overrides these, except the JSON content type that accompanies a
    /// serialized body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Config(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Config(format!("invalid header value: {e}")))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Replace the serialization options applied to every payload.
    pub fn encode_options(mut self, options: EncodeOptions) -> Self {
        self.encode = options;
        self
    }

    /// Replace the resilience policy for one request kind.
    pub fn policy(mut self, kind: RequestKind, policy: Arc<dyn ResiliencePolicy>) -> Self {
        self.policies = self.policies.with_policy(kind, policy);
        self
    }

    /// Use one resilience policy for every kind.
    pub fn policy_for_all(mut self, policy: Arc<dyn ResiliencePolicy>) -> Self {
        self.policies = PolicySet::uniform(policy);
        self
    }

    /// Replace the whole per-kind policy table.
    pub fn policies(mut self, policies: PolicySet) -> Self {
        self.policies = policies;
        self
    }

    /// Install the pre-request hook, awaited once per call before the
    /// request is built.
    pub fn preflight(mut self, hook: Arc<dyn Preflight>) -> Self {
        self.preflight = Some(hook);
        self
    }

    /// Tie every call to this token. Cancelling it interrupts in-flight
    /// calls and retry waits.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Builds the configured [`Client`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the default transport's HTTP client
    /// cannot be constructed.
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let http = reqwest::Client::builder()
                    .build()
                    .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
                Arc::new(ReqwestTransport::new(http))
            }
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                policies: self.policies,
                encode: self.encode,
                default_headers: self.default_headers,
                preflight: self.preflight,
                shutdown: self.shutdown.unwrap_or_default(),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
