//! The transport seam: one method per verb, plus the dispatch table that
//! routes a bound request to the right one.
//!
//! [`Transport`] is the boundary a test double or alternative HTTP stack
//! plugs in at. The shipped implementation is [`ReqwestTransport`].
//! Transports deal only in raw bytes; decoding and classification happen
//! above them, and retry decisions happen around them.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::kind::RequestKind;
use crate::request::OutboundRequest;

/// The undecoded result of one attempt.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The response status.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The body, exactly as received.
    pub body: Bytes,
}

/// One verb method per request kind.
///
/// `body` carries the payload already serialized by the client; the same
/// buffer is handed to every attempt. GET and DELETE take no body
/// parameter because their kinds never produce one. Implementations
/// should watch `cancel` and bail out with [`Error::Cancelled`] when it
/// fires.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a GET. Query content is already on `request.url`.
    async fn get(
        &self,
        request: &OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse>;

    /// Execute a POST with an optional JSON body.
    async fn post(
        &self,
        request: &OutboundRequest,
        body: Option<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse>;

    /// Execute a PUT with an optional JSON body.
    async fn put(
        &self,
        request: &OutboundRequest,
        body: Option<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse>;

    /// Execute a PATCH with an optional JSON body.
    async fn patch(
        &self,
        request: &OutboundRequest,
        body: Option<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse>;

    /// Execute a DELETE.
    async fn delete(
        &self,
        request: &OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse>;
}

/// Route one attempt to the verb method selected by the request's kind.
///
/// # Panics
///
/// Panics if serialized body bytes arrive for a kind whose profile
/// declares no body. That combination cannot come from a caller; it
/// means the kind table and the attachment step disagree, and the
/// process is wrong in a way no retry or fallback can repair.
pub(crate) async fn dispatch(
    transport: &dyn Transport,
    request: &OutboundRequest,
    body: Option<&Bytes>,
    cancel: &CancellationToken,
) -> Result<RawResponse> {
    match request.kind {
        RequestKind::Get | RequestKind::Delete => {
            if body.is_some() {
                panic!(
                    "kind table defect: {} dispatched with a serialized body",
                    request.kind
                );
            }
            if request.kind == RequestKind::Get {
                transport.get(request, cancel).await
            } else {
                transport.delete(request, cancel).await
            }
        }
        RequestKind::Post => transport.post(request, body.cloned(), cancel).await,
        RequestKind::Put => transport.put(request, body.cloned(), cancel).await,
        RequestKind::Patch => transport.patch(request, body.cloned(), cancel).await,
    }
}

/// The default transport, backed by a shared [`reqwest::Client`].
///
/// Cancellation is honored by racing the exchange against the token;
/// when the token wins, the connection is torn down by drop and the
/// attempt reports [`Error::Cancelled`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wrap an existing `reqwest::Client`, keeping its pool and TLS setup.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        request: &OutboundRequest,
        body: Option<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        let mut builder = self
            .client
            .request(request.kind.method(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok(RawResponse {
                status,
                headers,
                body,
            })
        };

        tokio::select! {
            result = exchange => result,
            () = cancel.cancelled() => Err(Error::Cancelled),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        request: &OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        self.send(request, None, cancel).await
    }

    async fn post(
        &self,
        request: &OutboundRequest,
        body: Option<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        self.send(request, body, cancel).await
    }

    async fn put(
        &self,
        request: &OutboundRequest,
        body: Option<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        self.send(request, body, cancel).await
    }

    async fn patch(
        &self,
        request: &OutboundRequest,
        body: Option<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        self.send(request, body, cancel).await
    }

    async fn delete(
        &self,
        request: &OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        self.send(request, None, cancel).await
    }
}
