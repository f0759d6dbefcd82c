//! The typed entities and their validation rules.
//!
//! Field rules are expressed as validators returning a list of
//! field-level violations, not a bare boolean — an empty list means the
//! entity is storable.

use crate::auth::Scope;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One failed field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub reason: &'static str,
}

impl Violation {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

/// Anything a store can hold: serializable both ways plus a validator.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// All violated field rules, empty when the entity is storable.
    fn validate(&self) -> Vec<Violation>;
}

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.+@.+\..+$").unwrap());
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// An account. Users are keyed by email in the store; the password is
/// whatever the original data carries and is compared verbatim at
/// sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Scope,
}

impl Entity for User {
    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.name.is_empty() {
            violations.push(Violation::new("name", "must not be empty"));
        }
        if !EMAIL.is_match(&self.email) {
            violations.push(Violation::new("email", "must be an email address"));
        }
        if self.password.len() < 6 {
            violations.push(Violation::new("password", "must be at least 6 characters"));
        }

        violations
    }
}

/// A listed property. `images` and `map` are filled in by the controller
/// on creation — clients do not supply them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub roadname: String,
    pub roadnumber: String,
    pub door: String,
    pub municipality: String,
    pub postalcode: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub map: String,
}

impl Property {
    /// The address as one line, for the map embed query.
    pub fn address(&self) -> String {
        format!("{} {} {} {}", self.roadname, self.roadnumber, self.postalcode, self.municipality)
    }
}

impl Entity for Property {
    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.roadname.is_empty() {
            violations.push(Violation::new("roadname", "must not be empty"));
        }
        if !DIGITS.is_match(&self.roadnumber) {
            violations.push(Violation::new("roadnumber", "must be digits"));
        }
        if !DIGITS.is_match(&self.door) {
            violations.push(Violation::new("door", "must be digits"));
        }
        if self.municipality.is_empty() {
            violations.push(Violation::new("municipality", "must not be empty"));
        }
        if !DIGITS.is_match(&self.postalcode) {
            violations.push(Violation::new("postalcode", "must be digits"));
        }

        violations
    }
}

/// The Google Maps embed URL for a property's address.
pub fn map_embed_url(property: &Property, maps_key: &str) -> String {
    // serde_urlencoded handles the query encoding of the address line.
    let address = property.address();
    let query = serde_urlencoded::to_string([("key", maps_key), ("q", address.as_str())]).unwrap_or_default();

    format!("https://www.google.com/maps/embed/v1/place?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property() -> Property {
        Property {
            roadname: "Elm Street".to_string(),
            roadnumber: "12".to_string(),
            door: "3".to_string(),
            municipality: "Copenhagen".to_string(),
            postalcode: "2100".to_string(),
            images: Vec::new(),
            map: String::new(),
        }
    }

    fn user() -> User {
        User {
            name: "Alice Agent".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret1".to_string(),
            role: Scope::Normal,
        }
    }

    #[test]
    fn valid_entities_have_no_violations() {
        assert!(user().validate().is_empty());
        assert!(property().validate().is_empty());
    }

    #[test]
    fn user_rules_flag_each_field() {
        let mut user = user();
        user.name = String::new();
        user.email = "not-an-email".to_string();
        user.password = "short".to_string();

        let fields: Vec<_> = user.validate().into_iter().map(|violation| violation.field).collect();
        assert_eq!(fields, ["name", "email", "password"]);
    }

    #[test]
    fn property_rules_require_numeric_fields() {
        let mut property = property();
        property.roadnumber = "twelve".to_string();
        property.postalcode = "21OO".to_string();

        let fields: Vec<_> = property.validate().into_iter().map(|violation| violation.field).collect();
        assert_eq!(fields, ["roadnumber", "postalcode"]);
    }

    #[test]
    fn map_url_encodes_the_address() {
        let url = map_embed_url(&property(), "test-key");
        assert_eq!(
            url,
            "https://www.google.com/maps/embed/v1/place?key=test-key&q=Elm+Street+12+2100+Copenhagen"
        );
    }
}
