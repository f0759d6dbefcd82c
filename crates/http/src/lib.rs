//! Immutable HTTP message values for a one-request-per-invocation backend.
//!
//! This crate provides the protocol layer of the realtor backend: a set of
//! value objects modelling an HTTP exchange (URI, stream, request, server
//! request, uploaded file, response) plus the codec that serializes a
//! response back onto an output channel. It is deliberately synchronous —
//! the surrounding application handles exactly one request per invocation,
//! so there is no connection pooling, no keep-alive and no async runtime.
//!
//! # Features
//!
//! - Immutable message values: every `with_*` mutator consumes the receiver
//!   and returns a new instance with exactly one thing changed
//! - Case-insensitive header lookup with case-preserving output
//! - Lazy, cached query-string and body parsing on the server request
//! - Idempotent percent-encoding of URI path/query/fragment
//! - Chunked body copy to the output channel without full buffering
//! - Clean error handling through typed `thiserror` enums
//!
//! # Example
//!
//! ```
//! use realtor_http::protocol::{Message, Method, Request, Response, Stream, Uri, Version};
//! use realtor_http::protocol::HeaderMap;
//!
//! let uri: Uri = "http://localhost/listings/?page=2".parse().unwrap();
//! let request = Request::new(
//!     Method::Get,
//!     Version::Http11,
//!     uri,
//!     HeaderMap::new(),
//!     Stream::from_bytes(Vec::new()),
//! );
//! assert_eq!(request.request_target(), "/listings/?page=2");
//!
//! let response = Response::new()
//!     .with_header("Content-Type", "application/json")
//!     .unwrap()
//!     .with_status(201)
//!     .unwrap();
//! assert_eq!(response.reason_phrase(), "Created");
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: the message value objects and their error types
//! - [`codec`]: response head serialization
//! - [`connection`]: the output-channel seam the dispatcher writes through
//!
//! # Limitations
//!
//! - One message body per value, buffered or file-backed — no chunked
//!   transfer encoding
//! - Accepted URI schemes are limited to `http`/`https` (or none)
//! - Header names follow the strict token grammar (letters and internal
//!   hyphens only)

pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
