//! The route table.
//!
//! Routes map an HTTP method and a regex path pattern onto a controller
//! key and an action name. Patterns are compiled at registration time —
//! an unparseable pattern is a registration error, never a dispatch-time
//! surprise — and matched in registration order, so the first registered
//! pattern that matches a path wins.
//!
//! Named capture groups in a pattern become the route parameters the
//! dispatcher injects into the request attribute bag.

use realtor_http::protocol::{MessageError, Method};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Reusable pattern fragments for common route parameter shapes.
pub mod fragment {
    /// A run of digits.
    pub const INT: &str = r"\d+";
    /// A url-friendly identifier.
    pub const SLUG: &str = r"[\w-]+";
    /// A 32-character hex id, as produced for created properties.
    pub const UNIQ: &str = "[a-f0-9]{32}";
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("message error: {source}")]
    Message {
        #[from]
        source: MessageError,
    },
}

/// What a matched route points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub controller: String,
    pub action: String,
}

#[derive(Debug)]
struct Route {
    pattern: Regex,
    target: RouteTarget,
}

/// A successful match: the target plus the named captures, ready to be
/// injected as the route-parameter attribute.
#[derive(Debug)]
pub struct RouteMatch<'router> {
    pub target: &'router RouteTarget,
    pub params: Map<String, Value>,
}

/// Method → insertion-ordered route list.
#[derive(Debug, Default)]
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route. The method string is normalized
    /// case-insensitively against the allow-list and the pattern is
    /// compiled here; nothing else is validated.
    pub fn register(&mut self, method: &str, pattern: &str, controller: &str, action: &str) -> Result<(), RouterError> {
        let method: Method = method.parse()?;
        let pattern = Regex::new(pattern)
            .map_err(|source| RouterError::InvalidPattern { pattern: pattern.to_string(), source })?;

        self.routes.entry(method).or_default().push(Route {
            pattern,
            target: RouteTarget { controller: controller.to_string(), action: action.to_string() },
        });

        Ok(())
    }

    /// Whether any route is registered for the method.
    pub fn has_method(&self, method: Method) -> bool {
        self.routes.contains_key(&method)
    }

    /// Finds the first registered pattern for `method` matching `path`,
    /// in registration order.
    pub fn find(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        for route in self.routes.get(&method)? {
            let Some(captures) = route.pattern.captures(path) else {
                continue;
            };

            let mut params = Map::new();
            for name in route.pattern.capture_names().flatten() {
                if let Some(capture) = captures.name(name) {
                    params.insert(name.to_string(), Value::String(capture.as_str().to_string()));
                }
            }

            return Some(RouteMatch { target: &route.target, params });
        }

        None
    }
}
