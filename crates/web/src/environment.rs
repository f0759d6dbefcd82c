//! The ambient environment one request arrives from.
//!
//! An [`Environment`] is a CGI-style snapshot: server parameters (with
//! headers folded in under `HTTP_*` names), cookies, the raw body bytes,
//! uploaded-file descriptors and the ambient multipart form parse. The
//! server-request factory turns exactly one snapshot into one
//! [`ServerRequest`](realtor_http::protocol::ServerRequest).
//!
//! [`Environment::from_raw`] builds a snapshot from raw HTTP/1.x bytes,
//! which is how the binary reads its single request from stdin and how
//! tests write fixtures.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("malformed raw request: {reason}")]
    Malformed { reason: String },

    #[error("raw request is incomplete")]
    Incomplete,
}

impl EnvironmentError {
    fn malformed<S: ToString>(reason: S) -> Self {
        Self::Malformed { reason: reason.to_string() }
    }
}

/// Where an uploaded file's bytes live before the request is processed.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A temp file staged on disk by the transport.
    Path(PathBuf),
    /// Bytes held in memory (tests, small uploads).
    Bytes(Vec<u8>),
}

/// Descriptor for one uploaded file as the transport reported it.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub source: FileSource,
    pub size: Option<u64>,
    /// Conventional CGI upload error integer; 0 is success.
    pub error_code: u8,
    pub client_filename: String,
    pub client_media_type: String,
}

/// A read-only snapshot of the process environment for one inbound call.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// CGI-style variables: `REQUEST_METHOD`, `SERVER_PROTOCOL`,
    /// `REQUEST_URI`, `QUERY_STRING`, `HTTP_*` headers and friends.
    pub server: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub body: Vec<u8>,
    pub files: Vec<FileUpload>,
    /// The ambient collaborator's multipart form parse; consulted by the
    /// server request only for `multipart/form-data` bodies.
    pub form: Map<String, Value>,
}

impl Environment {
    /// Parses raw HTTP/1.x bytes into a snapshot.
    ///
    /// Headers become `HTTP_*` server parameters (`User-Agent` →
    /// `HTTP_USER_AGENT`), the request line becomes `REQUEST_METHOD`,
    /// `REQUEST_URI`, `QUERY_STRING` and `SERVER_PROTOCOL`, and a
    /// `Cookie` header is additionally split into the cookie map.
    pub fn from_raw(raw: &[u8]) -> Result<Self, EnvironmentError> {
        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut parsed = httparse::Request::new(&mut headers);

        let body_offset = match parsed.parse(raw) {
            Ok(httparse::Status::Complete(offset)) => offset,
            Ok(httparse::Status::Partial) => return Err(EnvironmentError::Incomplete),
            Err(cause) => return Err(EnvironmentError::malformed(cause)),
        };

        let method = parsed.method.ok_or_else(|| EnvironmentError::malformed("missing method"))?;
        let target = parsed.path.ok_or_else(|| EnvironmentError::malformed("missing request target"))?;
        let minor = parsed.version.ok_or_else(|| EnvironmentError::malformed("missing version"))?;

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };

        let mut server = HashMap::new();
        server.insert("REQUEST_METHOD".to_string(), method.to_string());
        server.insert("SERVER_PROTOCOL".to_string(), format!("HTTP/1.{minor}"));
        server.insert("REQUEST_URI".to_string(), path.to_string());
        server.insert("QUERY_STRING".to_string(), query.to_string());

        let mut cookies = HashMap::new();

        for header in parsed.headers.iter() {
            let value = String::from_utf8_lossy(header.value).into_owned();

            if header.name.eq_ignore_ascii_case("cookie") {
                cookies.extend(parse_cookies(&value));
            }

            server.insert(cgi_name(header.name), value);
        }

        Ok(Self {
            server,
            cookies,
            body: raw[body_offset..].to_vec(),
            files: Vec::new(),
            form: Map::new(),
        })
    }
}

/// `Content-Type` and `Content-Length` keep their bare CGI names;
/// everything else is prefixed with `HTTP_`.
fn cgi_name(header: &str) -> String {
    let upper = header.to_ascii_uppercase().replace('-', "_");
    match upper.as_str() {
        "CONTENT_TYPE" | "CONTENT_LENGTH" => upper,
        _ => format!("HTTP_{upper}"),
    }
}

fn parse_cookies(value: &str) -> HashMap<String, String> {
    value
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
