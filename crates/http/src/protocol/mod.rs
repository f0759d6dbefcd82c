//! The HTTP message value objects.
//!
//! This module provides the protocol-level building blocks the rest of the
//! backend is assembled from. Everything here follows the same
//! immutability contract: values are constructed once and every `with_*`
//! mutator consumes the receiver and returns a fresh instance.
//!
//! # Architecture
//!
//! - **Leaf values**
//!   - [`Uri`]: parsed resource locator with idempotent percent-encoding
//!   - [`Stream`]: byte channel with cached capability flags
//!   - [`UploadedFile`]: one uploaded resource with a one-shot move
//!
//! - **Messages**
//!   - [`Message`]: the shared version/header/body behavior
//!   - [`Request`]: method, URI and derived request target
//!   - [`ServerRequest`]: the inbound request with environment snapshot,
//!     lazy query/body parsing and the attribute bag
//!   - [`Response`]: status code from the recognized table
//!
//! - **Decoding** ([`query`]): nested-bracket query/form decoding shared
//!   by the query-parameter and parsed-body paths
//!
//! - **Errors** ([`HttpError`] and friends): one `thiserror` enum per
//!   concern, aggregated at the top
//!
//! Construction errors here are hard failures by design — they indicate a
//! programming error, not a request-time condition. Request-time failures
//! are shaped into responses by the application layer instead.

mod error;
pub use error::HttpError;
pub use error::MessageError;
pub use error::SendError;
pub use error::StreamError;
pub use error::UploadFileError;
pub use error::UriError;

mod headers;
pub use headers::HeaderMap;

mod message;
pub use message::HeaderValues;
pub use message::Message;
pub use message::MessageParts;

mod method;
pub use method::Method;

mod request;
pub use request::Request;

mod response;
pub use response::Response;
pub use response::reason_phrase;

mod server_request;
pub use server_request::Attributes;
pub use server_request::ParsedBody;
pub use server_request::ROUTE_PARAMS;
pub use server_request::ServerRequest;

mod stream;
pub use stream::CHUNK_SIZE;
pub use stream::Mode;
pub use stream::Stream;
pub use stream::StreamHandle;

mod uploaded_file;
pub use uploaded_file::UploadErrorCode;
pub use uploaded_file::UploadedFile;

mod uri;
pub use uri::Scheme;
pub use uri::Uri;

mod version;
pub use version::Version;

pub mod query;
