//! The concrete controllers behind the registered routes.

mod properties;
mod users;

pub use properties::PropertiesController;
pub use users::UsersController;

use serde_json::Value;

/// A required string field out of a parsed body.
pub(crate) fn body_str(body: &Value, field: &str) -> Option<String> {
    body.get(field)?.as_str().map(str::to_string)
}
