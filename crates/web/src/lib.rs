//! The realtor web backend: routing, dispatch and CRUD controllers over
//! the `realtor-http` message values.
//!
//! The centre of this crate is the [`Application`](application::Application)
//! — it owns the route table and controller registry, matches one inbound
//! request against regex route patterns, dispatches to the matched
//! controller action and writes the resulting response to the output
//! channel. Everything else supports that loop: the environment/factory
//! pair builds the inbound [`ServerRequest`](realtor_http::protocol::ServerRequest),
//! controllers talk to the session-backed authenticator and the JSON-file
//! repositories, and the config carries the few deployment knobs.
//!
//! The model is deliberately one request per invocation: a single
//! synchronous pass from environment snapshot to serialized response, with
//! no concurrent request handling inside one application instance.
//!
//! # Example
//!
//! ```no_run
//! use realtor_http::connection::WriteChannel;
//! use realtor_http::protocol::ServerRequest;
//! use realtor_web::application::Application;
//! use realtor_web::controller::{Context, Controller, Dispatch};
//!
//! struct Hello {
//!     ctx: Context,
//! }
//!
//! impl Controller for Hello {
//!     fn bind(&mut self, request: realtor_http::protocol::ServerRequest, response: realtor_http::protocol::Response) {
//!         self.ctx.bind(request, response);
//!     }
//!
//!     fn dispatch(&mut self, action: &str) -> Dispatch {
//!         match action {
//!             "hello" => self.ctx.text("hello", 200).into(),
//!             _ => Dispatch::UnknownAction,
//!         }
//!     }
//! }
//!
//! fn run(request: ServerRequest) {
//!     let mut app = Application::new(request);
//!     app.register_controller("hello", |request, response| {
//!         Box::new(Hello { ctx: Context::new(request, response) })
//!     });
//!     app.register_route("GET", r"^/hello/$", "hello", "hello").unwrap();
//!
//!     let mut output = WriteChannel::new(std::io::stdout().lock());
//!     if let Err(cause) = app.run(&mut output) {
//!         tracing::error!(%cause, "failed to write response");
//!     }
//! }
//! ```

pub mod application;
pub mod auth;
pub mod config;
pub mod controller;
pub mod controllers;
pub mod entities;
pub mod environment;
pub mod factory;
pub mod repository;
pub mod router;
