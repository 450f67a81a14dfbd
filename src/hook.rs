//! The pre-request lifecycle hook.

use async_trait::async_trait;

use crate::error::BoxError;
use crate::kind::RequestKind;

/// Work that must finish before a request is built.
///
/// The client awaits the hook before resolving the URL or touching the
/// payload, once per call, never per retry attempt. The usual job is
/// making sure shared state is fresh: an access token, a session, a
/// feature gate. A hook failure abandons the call before anything is
/// sent and surfaces as [`Error::Preflight`](crate::Error::Preflight)
/// in the outcome.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use gantry::{BoxError, Preflight, RequestKind};
///
/// struct TokenRefresher {
///     auth: my_auth::Cache,
/// }
///
/// #[async_trait]
/// impl Preflight for TokenRefresher {
///     async fn before_request(&self, _kind: RequestKind) -> Result<(), BoxError> {
///         self.auth.refresh_if_stale().await?;
///         Ok(())
///     }
/// }
/// # mod my_auth {
/// #     pub struct Cache;
/// #     impl Cache {
/// #         pub async fn refresh_if_stale(&self) -> Result<(), std::io::Error> { Ok(()) }
/// #     }
/// # }
/// ```
#[async_trait]
pub trait Preflight: Send + Sync {
    /// Runs before the request for `kind` is built. Returning an error
    /// abandons the call.
    async fn before_request(&self, kind: RequestKind) -> Result<(), BoxError>;
}
