//! Request kinds and the per-kind dispatch profile.
//!
//! Every call is classified by a [`RequestKind`]. The kind selects three
//! things: the HTTP method on the wire, where an optional payload goes
//! (URL query for GET, JSON body for POST/PUT/PATCH, nowhere for DELETE),
//! and which resilience policy the client picks from its
//! [`PolicySet`](crate::PolicySet).
//!
//! The mapping lives in a fixed table of [`KindProfile`] records built at
//! compile time, so the routing is data, not scattered branching, and a
//! test can walk [`RequestKind::ALL`] to prove the table is consistent.

use http::header::{self, HeaderMap, HeaderValue};
use http::Method;

/// The verb category of a single call.
///
/// The set is closed: gantry only executes the five verbs a JSON API
/// client needs. Other methods (HEAD, OPTIONS, ...) are out of scope.
///
/// # Examples
///
/// ```
/// use gantry::RequestKind;
/// use http::Method;
///
/// assert_eq!(RequestKind::Get.method(), Method::GET);
/// assert_eq!(RequestKind::Patch.to_string(), "PATCH");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Idempotent read. An optional payload is encoded as URL query content.
    Get,
    /// Create. An optional payload is serialized as a JSON body.
    Post,
    /// Idempotent replace. An optional payload is serialized as a JSON body.
    Put,
    /// Partial update. An optional payload is serialized as a JSON body.
    Patch,
    /// Idempotent delete. Payloads are not sent.
    Delete,
}

/// Where a kind places an optional caller payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPlacement {
    /// The payload, if any, is ignored.
    None,
    /// The payload is flattened into the URL query string.
    Query,
    /// The payload is serialized once to JSON bytes and sent as the body.
    Json,
}

/// The per-kind dispatch record: wire method, payload placement, and the
/// header set attached before any body content.
#[derive(Debug)]
pub struct KindProfile {
    /// The HTTP method sent on the wire.
    pub method: Method,
    /// Where this kind places an optional payload.
    pub body: BodyPlacement,
    pub(crate) attach_headers: fn(&mut HeaderMap),
}

/// Content type attached alongside serialized JSON bodies.
pub(crate) const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Header set shared by every kind. Uses `entry` so caller-supplied
/// defaults keep precedence over the built-in Accept.
fn accept_json(headers: &mut HeaderMap) {
    headers
        .entry(header::ACCEPT)
        .or_insert_with(|| HeaderValue::from_static("application/json"));
}

static GET: KindProfile = KindProfile {
    method: Method::GET,
    body: BodyPlacement::Query,
    attach_headers: accept_json,
};
static POST: KindProfile = KindProfile {
    method: Method::POST,
    body: BodyPlacement::Json,
    attach_headers: accept_json,
};
static PUT: KindProfile = KindProfile {
    method: Method::PUT,
    body: BodyPlacement::Json,
    attach_headers: accept_json,
};
static PATCH: KindProfile = KindProfile {
    method: Method::PATCH,
    body: BodyPlacement::Json,
    attach_headers: accept_json,
};
static DELETE: KindProfile = KindProfile {
    method: Method::DELETE,
    body: BodyPlacement::None,
    attach_headers: accept_json,
};

impl RequestKind {
    /// Every kind, in dispatch-table order. Useful for exhaustive tests
    /// and for building a [`PolicySet`](crate::PolicySet) per kind.
    pub const ALL: [RequestKind; 5] = [
        RequestKind::Get,
        RequestKind::Post,
        RequestKind::Put,
        RequestKind::Patch,
        RequestKind::Delete,
    ];

    /// The dispatch record for this kind.
    pub fn profile(self) -> &'static KindProfile {
        match self {
            RequestKind::Get => &GET,
            RequestKind::Post => &POST,
            RequestKind::Put => &PUT,
            RequestKind::Patch => &PATCH,
            RequestKind::Delete => &DELETE,
        }
    }

    /// The HTTP method this kind dispatches as.
    pub fn method(self) -> Method {
        self.profile().method.clone()
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.profile().method.as_str())
    }
}
