//! Incoming-side request value built by the server-request factory.
//!
//! [`ServerRequest`] wraps a [`Request`] with the server-side state of one
//! inbound call: the environment snapshot, cookies, uploaded files, the
//! lazily parsed query string and body, and an ordered attribute bag.
//!
//! The attribute bag is the one place state threads forward explicitly
//! through the request lifecycle: the dispatcher injects matched route
//! parameters under [`ROUTE_PARAMS`] and controllers read them back.

use crate::protocol::{Message, MessageError, MessageParts, Method, Request, UploadedFile, Uri, query};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Attribute key under which the dispatcher stores matched route
/// parameters.
pub const ROUTE_PARAMS: &str = "routeParams";

/// A body after parsing: structured when the content type named a format
/// this implementation decodes, otherwise the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Structured(Value),
    Raw(String),
}

impl ParsedBody {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ParsedBody::Structured(value) => Some(value),
            ParsedBody::Raw(_) => None,
        }
    }

    /// True when there is nothing usable in the body: empty text, an
    /// empty map/array, or a JSON null.
    pub fn is_empty(&self) -> bool {
        match self {
            ParsedBody::Raw(text) => text.is_empty(),
            ParsedBody::Structured(Value::Null) => true,
            ParsedBody::Structured(Value::Object(map)) => map.is_empty(),
            ParsedBody::Structured(Value::Array(items)) => items.is_empty(),
            ParsedBody::Structured(_) => false,
        }
    }
}

/// An ordered map of request attributes: insertion order is kept, keys are
/// unique, and writing an existing key replaces its value in place.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: Vec<(String, Value)>,
}

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(key, _)| key != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// An immutable server-side request.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    request: Request,
    server_params: HashMap<String, String>,
    cookie_params: HashMap<String, String>,
    query_params: OnceCell<Map<String, Value>>,
    uploaded_files: Vec<UploadedFile>,
    attributes: Attributes,
    parsed_body: OnceCell<ParsedBody>,
    form_params: Map<String, Value>,
}

impl ServerRequest {
    /// Wraps a request with the ambient state of one inbound call.
    /// `form_params` is the ambient collaborator's multipart parse result,
    /// consulted only for `multipart/form-data` bodies.
    pub fn new(
        request: Request,
        server_params: HashMap<String, String>,
        cookie_params: HashMap<String, String>,
        uploaded_files: Vec<UploadedFile>,
        form_params: Map<String, Value>,
    ) -> Self {
        Self {
            request,
            server_params,
            cookie_params,
            query_params: OnceCell::new(),
            uploaded_files,
            attributes: Attributes::default(),
            parsed_body: OnceCell::new(),
            form_params,
        }
    }

    pub fn method(&self) -> Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn request_target(&self) -> &str {
        self.request.request_target()
    }

    /// The read-only environment snapshot this request was built from.
    pub fn server_params(&self) -> &HashMap<String, String> {
        &self.server_params
    }

    pub fn cookie_params(&self) -> &HashMap<String, String> {
        &self.cookie_params
    }

    pub fn with_cookie_params(mut self, cookies: HashMap<String, String>) -> Self {
        self.cookie_params = cookies;
        self
    }

    /// Query parameters, parsed from the URI query string on first access
    /// and cached.
    pub fn query_params(&self) -> &Map<String, Value> {
        self.query_params.get_or_init(|| query::parse(self.request.uri().query()))
    }

    pub fn with_query_params(mut self, params: Map<String, Value>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(params);
        self.query_params = cell;
        self
    }

    pub fn uploaded_files(&self) -> &[UploadedFile] {
        &self.uploaded_files
    }

    pub fn uploaded_files_mut(&mut self) -> &mut [UploadedFile] {
        &mut self.uploaded_files
    }

    pub fn with_uploaded_files(mut self, files: Vec<UploadedFile>) -> Self {
        self.uploaded_files = files;
        self
    }

    /// The parsed body, computed once per instance and cached.
    ///
    /// The content type decides the decoding: form-urlencoded and JSON are
    /// decoded here, multipart defers to the ambient collaborator's form
    /// parse, and everything else comes back as raw text.
    pub fn parsed_body(&mut self) -> &ParsedBody {
        if self.parsed_body.get().is_none() {
            let parsed = self.parse_body();
            let _ = self.parsed_body.set(parsed);
        }

        self.parsed_body.get().expect("just cached")
    }

    fn parse_body(&mut self) -> ParsedBody {
        let contents = self.request.body_mut().full_string();
        let content_type = self.request.header_line("Content-Type");

        if content_type.is_empty() {
            return ParsedBody::Raw(contents);
        }

        let Ok(media_type) = content_type.parse::<mime::Mime>() else {
            debug!(content_type, "unparseable content type, leaving body raw");
            return ParsedBody::Raw(contents);
        };

        if media_type.type_() == mime::APPLICATION && media_type.subtype() == mime::WWW_FORM_URLENCODED {
            return ParsedBody::Structured(Value::Object(query::parse(&contents)));
        }

        if media_type.type_() == mime::MULTIPART && media_type.subtype() == mime::FORM_DATA {
            return ParsedBody::Structured(Value::Object(self.form_params.clone()));
        }

        if media_type.subtype() == mime::JSON {
            return match serde_json::from_str(&contents) {
                Ok(value) => ParsedBody::Structured(value),
                Err(cause) => {
                    debug!(%cause, "body claimed to be json but did not decode");
                    ParsedBody::Structured(Value::Null)
                }
            };
        }

        ParsedBody::Raw(contents)
    }

    /// Pre-fills the parsed-body cache. Only structured values are
    /// accepted.
    pub fn with_parsed_body(mut self, value: Value) -> Result<Self, MessageError> {
        if !value.is_object() && !value.is_array() {
            return Err(MessageError::NotStructured);
        }

        let cell = OnceCell::new();
        let _ = cell.set(ParsedBody::Structured(value));
        self.parsed_body = cell;
        Ok(self)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter()
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn with_attribute(mut self, name: &str, value: Value) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn without_attribute(mut self, name: &str) -> Self {
        self.attributes.remove(name);
        self
    }

    /// A single matched route parameter, by capture-group name.
    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.attribute(ROUTE_PARAMS)?.get(name)?.as_str()
    }
}

impl Message for ServerRequest {
    fn parts(&self) -> &MessageParts {
        self.request.parts()
    }

    fn parts_mut(&mut self) -> &mut MessageParts {
        self.request.parts_mut()
    }
}

/// Convenience constructor for tests and simple callers: a server request
/// with an empty environment.
impl From<Request> for ServerRequest {
    fn from(request: Request) -> Self {
        Self::new(request, HashMap::new(), HashMap::new(), Vec::new(), Map::new())
    }
}
