//! The application: route matching, controller dispatch and response
//! emission for exactly one request.
//!
//! The dispatch state machine, in order, with its fixed fallbacks:
//!
//! 1. no routes registered for the request method → 404
//! 2. no registered pattern matches the path → 404
//! 3. a match injects its named captures as the `routeParams` attribute
//! 4. the matched controller key is not registered → 404
//! 5. the resolved controller has no such action → 500
//! 6. the action ran but produced no response → 500
//! 7. otherwise the action's response is adopted
//! 8. respond: head (unless already sent), then the body copied to the
//!    output channel in fixed-size chunks, stopping early when the
//!    connection is reported severed
//!
//! Structural failures never escape as errors — a caller always gets an
//! HTTP-shaped response. Only transport failures ([`SendError`]) surface,
//! because once the channel is gone there is nothing left to shape.

use crate::controller::{Controller, ControllerFactory, Dispatch};
use crate::router::{Router, RouterError};
use bytes::BytesMut;
use realtor_http::codec::ResponseEncoder;
use realtor_http::connection::OutputChannel;
use realtor_http::protocol::{CHUNK_SIZE, Message, Response, ROUTE_PARAMS, SendError, ServerRequest};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, warn};

struct ControllerEntry {
    factory: ControllerFactory,
    /// Materialized on first dispatch and reused for every route sharing
    /// the key within this application run.
    instance: Option<Box<dyn Controller>>,
}

/// Owns the route table, the controller registry and the current
/// request/response pair for one run.
pub struct Application {
    request: ServerRequest,
    response: Response,
    router: Router,
    controllers: HashMap<String, ControllerEntry>,
}

impl Application {
    /// Wraps one inbound request with a fresh empty response.
    pub fn new(request: ServerRequest) -> Self {
        Self { request, response: Response::new(), router: Router::new(), controllers: HashMap::new() }
    }

    /// Registers a route; see [`Router::register`].
    pub fn register_route(&mut self, method: &str, pattern: &str, controller: &str, action: &str) -> Result<(), RouterError> {
        self.router.register(method, pattern, controller, action)
    }

    /// Registers a controller factory under a key. Routes referencing the
    /// key resolve to one shared instance, created lazily on first
    /// dispatch.
    pub fn register_controller<F>(&mut self, key: &str, factory: F)
    where
        F: Fn(ServerRequest, Response) -> Box<dyn Controller> + 'static,
    {
        self.controllers.insert(key.to_string(), ControllerEntry { factory: Box::new(factory), instance: None });
    }

    /// The request as the controllers saw it, route parameters included.
    pub fn request(&self) -> &ServerRequest {
        &self.request
    }

    /// The response produced by the last [`run`](Self::run).
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Matches, dispatches and responds. Every structural failure is
    /// converted into a 404/500 response on its way out.
    pub fn run(&mut self, output: &mut dyn OutputChannel) -> Result<(), SendError> {
        let method = self.request.method();
        let path = self.request.uri().path().to_string();

        if !self.router.has_method(method) {
            debug!(%method, "no routes registered for method");
            return self.respond_with_status(404, output);
        }

        let (controller_key, action, params) = match self.router.find(method, &path) {
            Some(matched) => (matched.target.controller.clone(), matched.target.action.clone(), matched.params),
            None => {
                debug!(%method, %path, "no route matched");
                return self.respond_with_status(404, output);
            }
        };

        self.request = self.request.clone().with_attribute(ROUTE_PARAMS, Value::Object(params));

        let request = self.request.clone();
        let response = self.response.clone();

        let entry = match self.controllers.get_mut(&controller_key) {
            Some(entry) => entry,
            None => {
                warn!(controller = %controller_key, "matched route names an unregistered controller");
                return self.respond_with_status(404, output);
            }
        };

        let rebind = entry.instance.is_some();
        let instance = entry.instance.get_or_insert_with(|| (entry.factory)(request.clone(), response.clone()));
        if rebind {
            instance.bind(request, response);
        }

        match instance.dispatch(&action) {
            Dispatch::Response(response) => {
                self.response = response;
                self.respond(output)
            }
            Dispatch::UnknownAction => {
                warn!(controller = %controller_key, %action, "controller has no such action");
                self.respond_with_status(500, output)
            }
            Dispatch::Failed(cause) => {
                error!(controller = %controller_key, %action, %cause, "controller action failed");
                self.respond_with_status(500, output)
            }
        }
    }

    fn respond_with_status(&mut self, code: u16, output: &mut dyn OutputChannel) -> Result<(), SendError> {
        // Both paths are in the recognized table, and the header name is a
        // static token.
        self.response = self
            .response
            .clone()
            .with_header("Content-Type", mime::TEXT_PLAIN.as_ref())
            .expect("static header name")
            .with_status(code)
            .expect("fixed fallback status");

        self.respond(output)
    }

    /// Emits the response: status line and headers unless the head is
    /// already out, then the body in [`CHUNK_SIZE`] pieces. The body is
    /// never buffered whole; the copy stops as soon as the channel
    /// reports the downstream connection severed.
    fn respond(&mut self, output: &mut dyn OutputChannel) -> Result<(), SendError> {
        if let Some(size) = self.response.body().size() {
            self.response = self
                .response
                .clone()
                .with_header("Content-Length", size.to_string())
                .expect("static header name");
        }

        if !output.headers_sent() {
            let mut head = BytesMut::new();
            ResponseEncoder::encode_head(&self.response, &mut head)?;
            output.send_head(&head)?;
        }

        let body = self.response.body_mut();
        if body.is_seekable() && body.rewind().is_err() {
            return Ok(());
        }

        loop {
            if !output.is_connected() {
                debug!("downstream connection severed, stopping body copy");
                break;
            }

            let chunk = body.read(CHUNK_SIZE).map_err(|cause| SendError::io(std::io::Error::other(cause)))?;
            if chunk.is_empty() {
                break;
            }

            output.send_chunk(&chunk)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Context, ControllerError};
    use realtor_http::connection::WriteChannel;
    use realtor_http::protocol::{HeaderMap, Method, Request, Stream, Version};
    use serde_json::json;

    struct Probe {
        ctx: Context,
    }

    impl Probe {
        fn echo_username(&mut self) -> Result<Response, ControllerError> {
            let username = self.ctx.param("username").unwrap_or_default();
            self.ctx.json(json!({ "username": username }), 200)
        }
    }

    impl Controller for Probe {
        fn bind(&mut self, request: ServerRequest, response: Response) {
            self.ctx.bind(request, response);
        }

        fn dispatch(&mut self, action: &str) -> Dispatch {
            match action {
                "echo_username" => self.echo_username().into(),
                "broken" => Dispatch::Failed(ControllerError::NotStructured),
                _ => Dispatch::UnknownAction,
            }
        }
    }

    fn server_request(method: Method, path: &str) -> ServerRequest {
        let request =
            Request::new(method, Version::Http11, path.parse().unwrap(), HeaderMap::new(), Stream::memory());
        ServerRequest::from(request)
    }

    fn app(method: Method, path: &str) -> Application {
        let mut app = Application::new(server_request(method, path));
        app.register_controller("probe", |request, response| Box::new(Probe { ctx: Context::new(request, response) }));
        app
    }

    fn run_to_string(app: &mut Application) -> String {
        let mut output = WriteChannel::new(Vec::new());
        app.run(&mut output).unwrap();
        String::from_utf8(output.into_inner()).unwrap()
    }

    #[test]
    fn unregistered_method_responds_404() {
        let mut app = app(Method::Post, "/users/alice/");
        app.register_route("GET", r"^/users/(?P<username>[a-z0-9_-]+)/$", "probe", "echo_username").unwrap();

        assert!(run_to_string(&mut app).starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn unmatched_path_responds_404() {
        let mut app = app(Method::Get, "/listings/");
        app.register_route("GET", r"^/users/(?P<username>[a-z0-9_-]+)/$", "probe", "echo_username").unwrap();

        assert!(run_to_string(&mut app).starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn unregistered_controller_key_responds_404() {
        let mut app = app(Method::Get, "/users/alice/");
        app.register_route("GET", r"^/users/(?P<username>[a-z0-9_-]+)/$", "ghost", "echo_username").unwrap();

        assert!(run_to_string(&mut app).starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn missing_action_responds_500() {
        let mut app = app(Method::Get, "/users/alice/");
        app.register_route("GET", r"^/users/(?P<username>[a-z0-9_-]+)/$", "probe", "no_such_action").unwrap();

        assert!(run_to_string(&mut app).starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[test]
    fn failed_action_responds_500() {
        let mut app = app(Method::Get, "/users/alice/");
        app.register_route("GET", r"^/users/(?P<username>[a-z0-9_-]+)/$", "probe", "broken").unwrap();

        assert!(run_to_string(&mut app).starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[test]
    fn matched_route_injects_route_params_and_responds() {
        let mut app = app(Method::Get, "/users/alice/");
        app.register_route("GET", r"^/users/(?P<username>[a-z0-9_-]+)/$", "probe", "echo_username").unwrap();

        let output = run_to_string(&mut app);
        assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(output.contains("Content-Type: application/json\r\n"));
        assert!(output.ends_with(r#"{"username":"alice"}"#));

        assert_eq!(app.request().route_param("username"), Some("alice"));
    }

    #[test]
    fn earlier_registration_wins_on_overlap() {
        let mut app = app(Method::Get, "/users/alice/");
        app.register_route("GET", r"^/users/(?P<username>[a-z]+)/$", "probe", "echo_username").unwrap();
        app.register_route("GET", r"^/users/(?P<username>[a-z0-9_-]+)/$", "probe", "broken").unwrap();

        assert!(run_to_string(&mut app).starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn missing_user_end_to_end_is_404() {
        use crate::auth::MockAuthenticator;
        use crate::controllers::UsersController;
        use crate::controllers::testing::MemoryStore;
        use crate::entities::User;
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut app = Application::new(server_request(Method::Get, "/users/alice/"));

        let users: Rc<RefCell<MemoryStore<User>>> = Rc::new(RefCell::new(MemoryStore::default()));
        app.register_controller("users", move |request, response| {
            let mut auth = MockAuthenticator::new();
            auth.expect_has_capability().return_const(true);
            auth.expect_is_principal().return_const(false);
            Box::new(UsersController::new(request, response, users.clone(), Rc::new(RefCell::new(auth))))
        });
        app.register_route("GET", r"^/users/(?P<id>[a-z0-9_-]+)/$", "users", "get_user").unwrap();

        // The route matched and the controller ran; the store simply has
        // no such user.
        assert!(run_to_string(&mut app).starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert_eq!(app.request().route_param("id"), Some("alice"));
    }

    #[test]
    fn json_create_user_end_to_end() {
        use crate::auth::MockAuthenticator;
        use crate::controllers::UsersController;
        use crate::controllers::testing::MemoryStore;
        use crate::entities::User;
        use crate::environment::Environment;
        use crate::factory::ServerRequestFactory;
        use std::cell::RefCell;
        use std::rc::Rc;

        let raw = "POST /users/ HTTP/1.1\r\nHost: x\r\nContent-Type: application/json\r\n\r\n\
                   {\"name\":\"Bob\",\"email\":\"b@x.com\",\"password\":\"secret1\"}";
        let environment = Environment::from_raw(raw.as_bytes()).unwrap();
        let request = ServerRequestFactory::from_env(&environment).unwrap();

        let mut app = Application::new(request);

        let users: Rc<RefCell<MemoryStore<User>>> = Rc::new(RefCell::new(MemoryStore::default()));
        let store = users.clone();
        app.register_controller("users", move |request, response| {
            let mut auth = MockAuthenticator::new();
            auth.expect_has_capability().return_const(true);
            auth.expect_is_principal().return_const(false);
            Box::new(UsersController::new(request, response, store.clone(), Rc::new(RefCell::new(auth))))
        });
        app.register_route("POST", r"^/users/$", "users", "create_user").unwrap();

        assert!(run_to_string(&mut app).starts_with("HTTP/1.1 201 Created\r\n"));
        assert_eq!(users.borrow().items["b@x.com"].name, "Bob");
    }

    #[test]
    fn responses_carry_a_content_length() {
        let mut app = app(Method::Get, "/users/alice/");
        app.register_route("GET", r"^/users/(?P<username>[a-z0-9_-]+)/$", "probe", "echo_username").unwrap();

        let output = run_to_string(&mut app);
        let body_len = r#"{"username":"alice"}"#.len();
        assert!(output.contains(&format!("Content-Length: {body_len}\r\n")));
    }
}
