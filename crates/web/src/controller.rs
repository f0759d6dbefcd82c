//! The controller contract.
//!
//! A controller is constructed bound to one request/response pair and
//! produces its final [`Response`] through the [`Context`] helpers —
//! `json`, `text`, `html` or `status`. Each helper sets Content-Type and
//! status together with the body write, clones the bound response into the
//! new one and re-binds the context, mirroring the immutability contract
//! of the message values.
//!
//! Controllers are registered with the application as factories keyed by a
//! short string; the dispatcher resolves the key, instantiates (or
//! re-binds) the controller and calls [`Controller::dispatch`] with the
//! action name from the route table.

use realtor_http::protocol::{Message, MessageError, Response, ServerRequest, Stream, StreamError};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("message error: {source}")]
    Message {
        #[from]
        source: MessageError,
    },

    #[error("stream error: {source}")]
    Stream {
        #[from]
        source: StreamError,
    },

    #[error("json contents must be a structured value")]
    NotStructured,

    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("upstream failure: {source}")]
    Upstream {
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl ControllerError {
    pub fn upstream<E: StdError + Send + Sync + 'static>(source: E) -> Self {
        Self::Upstream { source: Box::new(source) }
    }
}

/// The outcome of dispatching an action name against a controller.
#[derive(Debug)]
pub enum Dispatch {
    /// The action ran and produced a response.
    Response(Response),
    /// The controller has no action by that name.
    UnknownAction,
    /// The action ran but could not produce a response.
    Failed(ControllerError),
}

impl From<Result<Response, ControllerError>> for Dispatch {
    fn from(result: Result<Response, ControllerError>) -> Self {
        match result {
            Ok(response) => Dispatch::Response(response),
            Err(cause) => Dispatch::Failed(cause),
        }
    }
}

/// A routable controller. Instances live for one application run and are
/// re-bound to the current request/response pair when a later route
/// resolves to the same controller key.
pub trait Controller {
    fn bind(&mut self, request: ServerRequest, response: Response);

    fn dispatch(&mut self, action: &str) -> Dispatch;
}

/// Builds a controller bound to a request/response pair. Resolved at
/// registration time — the registry maps keys to these, never to type
/// names looked up at dispatch.
pub type ControllerFactory = Box<dyn Fn(ServerRequest, Response) -> Box<dyn Controller>>;

/// The request/response pair a controller works against.
#[derive(Debug)]
pub struct Context {
    request: ServerRequest,
    response: Response,
}

impl Context {
    pub fn new(request: ServerRequest, response: Response) -> Self {
        Self { request, response }
    }

    /// Re-binds the pair for controller reuse across routes within one
    /// application run.
    pub fn bind(&mut self, request: ServerRequest, response: Response) {
        self.request = request;
        self.response = response;
    }

    pub fn request(&self) -> &ServerRequest {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut ServerRequest {
        &mut self.request
    }

    /// A matched route parameter, by capture-group name.
    pub fn param(&self, name: &str) -> Option<String> {
        self.request.route_param(name).map(str::to_string)
    }

    /// The parsed request body when it decoded to a structured value.
    pub fn body_value(&mut self) -> Option<Value> {
        self.request.parsed_body().as_value().cloned()
    }

    /// Serializes `contents` to JSON and finishes the response with
    /// content type `application/json`.
    ///
    /// Only structured values are accepted. Integers beyond 2^53 are
    /// serialized as strings so consumers decoding into doubles do not
    /// lose precision.
    pub fn json(&mut self, contents: Value, status: u16) -> Result<Response, ControllerError> {
        if !contents.is_object() && !contents.is_array() {
            return Err(ControllerError::NotStructured);
        }

        let encoded = serde_json::to_string(&stringify_big_ints(contents))?;
        self.write_response(mime::APPLICATION_JSON.as_ref(), encoded.as_bytes(), status)
    }

    /// Finishes the response with a plain-text body.
    pub fn text(&mut self, contents: &str, status: u16) -> Result<Response, ControllerError> {
        self.write_response(mime::TEXT_PLAIN.as_ref(), contents.as_bytes(), status)
    }

    /// Finishes the response with an HTML body.
    pub fn html(&mut self, contents: &str, status: u16) -> Result<Response, ControllerError> {
        self.write_response(mime::TEXT_HTML.as_ref(), contents.as_bytes(), status)
    }

    /// Finishes the response with a status code and an empty body. A code
    /// outside the recognized table falls back to 500.
    pub fn status(&mut self, code: u16) -> Response {
        let code = if Response::recognizes(code) { code } else { 500 };

        let response = self
            .response
            .clone()
            .with_header("Content-Type", mime::TEXT_PLAIN.as_ref())
            .expect("static header name")
            .with_status(code)
            .expect("code is in the recognized table")
            .with_body(Stream::memory());

        self.response = response.clone();
        response
    }

    fn write_response(&mut self, media_type: &str, contents: &[u8], status: u16) -> Result<Response, ControllerError> {
        let mut body = Stream::memory();
        body.write(contents)?;

        let response = self
            .response
            .clone()
            .with_header("Content-Type", media_type)?
            .with_status(status)?
            .with_body(body);

        self.response = response.clone();
        Ok(response)
    }
}

/// Integers a double cannot represent exactly.
const MAX_SAFE_JSON_INT: u64 = 1 << 53;

/// Rewrites numbers beyond the double-safe range into strings, leaving
/// everything else untouched.
fn stringify_big_ints(value: Value) -> Value {
    match value {
        Value::Number(number) => {
            let too_big = match (number.as_i64(), number.as_u64()) {
                (Some(signed), _) => signed.unsigned_abs() > MAX_SAFE_JSON_INT,
                (None, Some(unsigned)) => unsigned > MAX_SAFE_JSON_INT,
                (None, None) => false,
            };

            if too_big {
                Value::String(number.to_string())
            } else {
                Value::Number(number)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(stringify_big_ints).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(key, value)| (key, stringify_big_ints(value))).collect::<Map<_, _>>())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realtor_http::protocol::{HeaderMap, Method, Request, Version};
    use serde_json::json;

    fn context() -> Context {
        let request = Request::new(
            Method::Get,
            Version::Http11,
            "/test/".parse().unwrap(),
            HeaderMap::new(),
            Stream::memory(),
        );
        Context::new(ServerRequest::from(request), Response::new())
    }

    fn body_of(mut response: Response) -> String {
        response.body_mut().full_string()
    }

    #[test]
    fn json_sets_content_type_status_and_body_together() {
        let mut ctx = context();
        let response = ctx.json(json!({"id": 7}), 201).unwrap();

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.header_line("content-type"), "application/json");
        assert_eq!(body_of(response), r#"{"id":7}"#);
    }

    #[test]
    fn json_rejects_scalars() {
        let mut ctx = context();
        assert!(matches!(ctx.json(json!("nope"), 200), Err(ControllerError::NotStructured)));
        assert!(matches!(ctx.json(json!(42), 200), Err(ControllerError::NotStructured)));
    }

    #[test]
    fn json_encodes_big_integers_as_strings() {
        let mut ctx = context();
        let response = ctx
            .json(json!({"big": 9_007_199_254_740_993_u64, "small": 12, "neg": -9_007_199_254_740_993_i64}), 200)
            .unwrap();

        let body = body_of(response);
        assert!(body.contains(r#""big":"9007199254740993""#));
        assert!(body.contains(r#""small":12"#));
        assert!(body.contains(r#""neg":"-9007199254740993""#));
    }

    #[test]
    fn text_and_html_set_their_media_types() {
        let mut ctx = context();

        let response = ctx.text("plain", 200).unwrap();
        assert_eq!(response.header_line("content-type"), "text/plain");
        assert_eq!(body_of(response), "plain");

        let response = ctx.html("<p>hi</p>", 200).unwrap();
        assert_eq!(response.header_line("content-type"), "text/html");
        assert_eq!(body_of(response), "<p>hi</p>");
    }

    #[test]
    fn status_falls_back_to_500_for_unknown_codes() {
        let mut ctx = context();
        assert_eq!(ctx.status(999).status_code(), 500);
        assert_eq!(ctx.status(204).status_code(), 204);
    }

    #[test]
    fn helpers_rebind_the_context_response() {
        let mut ctx = context();
        ctx.text("first", 200).unwrap();
        let response = ctx.status(404);

        // The second helper worked on the clone produced by the first.
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.header_line("content-type"), "text/plain");
    }
}
