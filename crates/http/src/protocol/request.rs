//! Outgoing-side request value: method, URI and the shared message parts.

use crate::protocol::{HeaderMap, Message, MessageError, MessageParts, Method, Stream, Uri, Version};
use once_cell::sync::OnceCell;

/// An immutable HTTP request.
///
/// The request target (`path[?query]`) is derived from the URI on first
/// access and cached; [`with_request_target`](Request::with_request_target)
/// overrides the derivation, and [`with_uri`](Request::with_uri) resets it.
#[derive(Debug, Clone)]
pub struct Request {
    parts: MessageParts,
    method: Method,
    uri: Uri,
    request_target: OnceCell<String>,
}

impl Request {
    pub fn new(method: Method, version: Version, uri: Uri, headers: HeaderMap, body: Stream) -> Self {
        Self {
            parts: MessageParts::new(version, headers, body),
            method,
            uri,
            request_target: OnceCell::new(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Replaces the URI. Unless `preserve_host` is set, the `Host` header
    /// is rewritten from the new URI's host and port when present.
    pub fn with_uri(mut self, uri: Uri, preserve_host: bool) -> Result<Self, MessageError> {
        if !preserve_host {
            let mut host = uri.host().to_string();
            if let Some(port) = uri.port() {
                host.push(':');
                host.push_str(&port.to_string());
            }

            if !uri.host().is_empty() {
                self.parts.headers.set("Host", vec![host])?;
            }
        }

        self.uri = uri;
        self.request_target = OnceCell::new();
        Ok(self)
    }

    /// The request target, derived lazily from the URI path and query and
    /// cached once computed.
    pub fn request_target(&self) -> &str {
        self.request_target.get_or_init(|| {
            let query = self.uri.query();
            if query.is_empty() {
                self.uri.path().to_string()
            } else {
                format!("{}?{}", self.uri.path(), query)
            }
        })
    }

    /// Overrides the derived request target.
    pub fn with_request_target(mut self, target: &str) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(target.trim().to_string());
        self.request_target = cell;
        self
    }
}

impl Message for Request {
    fn parts(&self) -> &MessageParts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut MessageParts {
        &mut self.parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        Request::new(Method::Get, Version::Http11, uri.parse().unwrap(), HeaderMap::new(), Stream::memory())
    }

    #[test]
    fn request_target_is_path_and_query() {
        assert_eq!(request("http://example.com/users/alice/?full=1").request_target(), "/users/alice/?full=1");
        assert_eq!(request("http://example.com/users/").request_target(), "/users/");
    }

    #[test]
    fn request_target_can_be_overridden() {
        let request = request("http://example.com/users/").with_request_target("  *  ");
        assert_eq!(request.request_target(), "*");
    }

    #[test]
    fn with_uri_rewrites_the_host_header() {
        let original = request("http://one.example/a/")
            .with_header("Host", "one.example")
            .unwrap();

        let moved = original.with_uri("http://two.example:8080/b/".parse().unwrap(), false).unwrap();
        assert_eq!(moved.header("host"), ["two.example:8080"]);
        assert_eq!(moved.request_target(), "/b/");

        let kept = moved.with_uri("http://three.example/c/".parse().unwrap(), true).unwrap();
        assert_eq!(kept.header("host"), ["two.example:8080"]);
    }

    #[test]
    fn with_method_changes_only_the_method() {
        let request = request("http://example.com/users/").with_method(Method::Post);
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.uri().host(), "example.com");
    }
}
