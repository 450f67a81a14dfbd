//! The outbound request handle and the URL sources it binds from.
//!
//! A call starts from any [`UrlSource`] (a parsed [`Url`], a borrowed
//! one, or a string) and binds it into an [`OutboundRequest`]: the
//! mutable handle that headers and query content are attached to before
//! dispatch. The handle never holds body bytes; a serialized body
//! travels beside it so retries can reuse the same buffer.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::{Error, Result};
use crate::kind::RequestKind;

/// Anything that can resolve to a request URL.
///
/// Resolution takes `&self`, so a source is never consumed or mutated by
/// binding; callers can hold a [`Url`] and bind fresh requests from it
/// repeatedly.
///
/// # Examples
///
/// ```
/// use gantry::UrlSource;
/// use url::Url;
///
/// let parsed = Url::parse("https://api.example.com/users").unwrap();
/// assert_eq!(parsed.resolve().unwrap(), parsed);
///
/// let err = "not a url".resolve();
/// assert!(err.is_err());
/// ```
pub trait UrlSource {
    /// Produce the request URL.
    fn resolve(&self) -> std::result::Result<Url, url::ParseError>;
}

impl UrlSource for Url {
    fn resolve(&self) -> std::result::Result<Url, url::ParseError> {
        Ok(self.clone())
    }
}

impl UrlSource for &Url {
    fn resolve(&self) -> std::result::Result<Url, url::ParseError> {
        Ok((*self).clone())
    }
}

impl UrlSource for str {
    fn resolve(&self) -> std::result::Result<Url, url::ParseError> {
        Url::parse(self)
    }
}

impl UrlSource for &str {
    fn resolve(&self) -> std::result::Result<Url, url::ParseError> {
        Url::parse(self)
    }
}

impl UrlSource for String {
    fn resolve(&self) -> std::result::Result<Url, url::ParseError> {
        Url::parse(self)
    }
}

impl UrlSource for &String {
    fn resolve(&self) -> std::result::Result<Url, url::ParseError> {
        Url::parse(self)
    }
}

/// A bound request ready for header and query attachment.
///
/// Transports receive the handle by reference together with the optional
/// serialized body. Custom [`Transport`](crate::Transport)
/// implementations read `kind`, `url`, and `headers` to build whatever
/// their backend needs.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// The kind this request dispatches as.
    pub kind: RequestKind,
    /// The resolved target, including any attached query content.
    pub url: Url,
    /// Headers accumulated from client defaults, the kind profile, and
    /// body attachment.
    pub headers: HeaderMap,
}

impl OutboundRequest {
    /// Bind a URL source into a request handle for `kind`.
    ///
    /// Fails with [`Error::InvalidUrl`] when the source does not parse
    /// and [`Error::Config`] when it parses to a non-HTTP scheme.
    pub fn bind<U>(kind: RequestKind, source: &U) -> Result<Self>
    where
        U: UrlSource + ?Sized,
    {
        let url = source.resolve().map_err(Error::InvalidUrl)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "unsupported URL scheme '{}' in {url}",
                url.scheme()
            )));
        }
        Ok(Self {
            kind,
            url,
            headers: HeaderMap::new(),
        })
    }

    /// Insert a header, validating name and value.
    ///
    /// Replaces any existing value for the same name.
    pub fn insert_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<()> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Config(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Config(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_from_str_string_and_url() {
        let from_str = OutboundRequest::bind(RequestKind::Get, "https://example.com/a").unwrap();
        let from_string =
            OutboundRequest::bind(RequestKind::Get, &String::from("https://example.com/a"))
                .unwrap();
        let url = Url::parse("https://example.com/a").unwrap();
        let from_url = OutboundRequest::bind(RequestKind::Get, &url).unwrap();

        assert_eq!(from_str.url, from_string.url);
        assert_eq!(from_string.url, from_url.url);
    }

    #[test]
    fn binding_borrows_the_source() {
        let url = Url::parse("https://example.com/users?page=1").unwrap();
        let first = OutboundRequest::bind(RequestKind::Get, &url).unwrap();
        let second = OutboundRequest::bind(RequestKind::Post, &url).unwrap();
        // The source is untouched even though each handle may diverge.
        assert_eq!(url.as_str(), "https://example.com/users?page=1");
        assert_eq!(first.url, second.url);
    }

    #[test]
    fn rejects_unparseable_urls() {
        let err = OutboundRequest::bind(RequestKind::Get, "definitely not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = OutboundRequest::bind(RequestKind::Get, "ftp://example.com/file").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn insert_header_validates_names() {
        let mut request = OutboundRequest::bind(RequestKind::Get, "https://example.com").unwrap();
        request.insert_header("x-request-id", "abc-123").unwrap();
        assert_eq!(request.headers.get("x-request-id").unwrap(), "abc-123");

        let err = request.insert_header("bad header", "value").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
