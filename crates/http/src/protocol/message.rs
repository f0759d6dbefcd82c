//! Shared request/response behavior.
//!
//! Requests and responses both carry a protocol version, a header
//! collection and a body stream. The shared state lives in
//! [`MessageParts`]; the shared accessors and mutators are default methods
//! on the [`Message`] trait over it.
//!
//! The immutability contract: `with_*` mutators consume the receiver and
//! return a new instance. Callers that need to keep the previous value
//! clone first — cloning deep-copies the body stream, so sibling messages
//! never alias a channel.

use crate::protocol::{HeaderMap, MessageError, Stream, Version};

/// The state shared by every message type.
#[derive(Debug, Clone, Default)]
pub struct MessageParts {
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Stream,
}

impl MessageParts {
    pub fn new(version: Version, headers: HeaderMap, body: Stream) -> Self {
        Self { version, headers, body }
    }
}

/// One or many header values, so `with_header` accepts either a single
/// string or a list.
pub struct HeaderValues(pub(crate) Vec<String>);

impl From<&str> for HeaderValues {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for HeaderValues {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for HeaderValues {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

/// Shared message behavior for [`Request`](crate::protocol::Request),
/// [`ServerRequest`](crate::protocol::ServerRequest) and
/// [`Response`](crate::protocol::Response).
///
/// The protocol version is an enum, so `with_protocol_version` cannot fail
/// — unsupported versions are rejected where text is parsed.
pub trait Message: Sized {
    fn parts(&self) -> &MessageParts;

    fn parts_mut(&mut self) -> &mut MessageParts;

    fn protocol_version(&self) -> Version {
        self.parts().version
    }

    fn with_protocol_version(mut self, version: Version) -> Self {
        self.parts_mut().version = version;
        self
    }

    fn headers(&self) -> &HeaderMap {
        &self.parts().headers
    }

    fn has_header(&self, name: &str) -> bool {
        self.parts().headers.contains(name)
    }

    fn header(&self, name: &str) -> &[String] {
        self.parts().headers.get(name)
    }

    fn header_line(&self, name: &str) -> String {
        self.parts().headers.get_line(name)
    }

    /// Replaces a header, validating the name against the token grammar.
    fn with_header(mut self, name: &str, value: impl Into<HeaderValues>) -> Result<Self, MessageError> {
        self.parts_mut().headers.set(name, value.into().0)?;
        Ok(self)
    }

    /// Appends to an existing header, or sets it when absent.
    fn with_added_header(mut self, name: &str, value: &str) -> Result<Self, MessageError> {
        self.parts_mut().headers.append(name, value)?;
        Ok(self)
    }

    fn without_header(mut self, name: &str) -> Self {
        self.parts_mut().headers.remove(name);
        self
    }

    fn body(&self) -> &Stream {
        &self.parts().body
    }

    fn body_mut(&mut self) -> &mut Stream {
        &mut self.parts_mut().body
    }

    /// Replaces the body wholesale. The previous stream is dropped with
    /// the consumed receiver.
    fn with_body(mut self, body: Stream) -> Self {
        self.parts_mut().body = body;
        self
    }
}
