//! Header collection with case-insensitive lookup and case-preserving
//! output.
//!
//! Headers are stored twice: a normalized-lowercase map for lookup and an
//! insertion-ordered, original-case list for output. Every mutation keeps
//! both views in sync — replacing a header removes all prior entries for
//! the same normalized key before the new one is inserted, so the output
//! view carries the casing of the most recent write.

use crate::protocol::MessageError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Header names must match the token grammar: letters with internal
/// hyphens, nothing else.
static HEADER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+(?:-[A-Za-z]+)*$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    /// Lowercase name → values, for lookup.
    lookup: HashMap<String, Vec<String>>,
    /// Original-case name → the same values, in insertion order, for output.
    lines: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct headers.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(&name.to_ascii_lowercase())
    }

    /// All values for a header, or an empty slice when it is absent.
    /// Lookup is case-insensitive.
    pub fn get(&self, name: &str) -> &[String] {
        self.lookup.get(&name.to_ascii_lowercase()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All values for a header joined with `", "`, or an empty string.
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Replaces a header. Prior entries under the same normalized key are
    /// removed from both views first, so the stored casing is the one
    /// passed here.
    pub fn set(&mut self, name: &str, values: Vec<String>) -> Result<(), MessageError> {
        if !HEADER_NAME.is_match(name) {
            return Err(MessageError::invalid_header_name(name));
        }

        let key = name.to_ascii_lowercase();
        self.lines.retain(|(line_name, _)| !line_name.eq_ignore_ascii_case(&key));
        self.lookup.insert(key, values.clone());
        self.lines.push((name.to_string(), values));

        Ok(())
    }

    /// Appends a value to an existing header, or behaves like
    /// [`set`](Self::set) when the header is absent.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), MessageError> {
        if !self.contains(name) {
            return self.set(name, vec![value.to_string()]);
        }

        let key = name.to_ascii_lowercase();
        if let Some(values) = self.lookup.get_mut(&key) {
            values.push(value.to_string());
        }
        for (line_name, values) in &mut self.lines {
            if line_name.eq_ignore_ascii_case(&key) {
                values.push(value.to_string());
            }
        }

        Ok(())
    }

    pub fn remove(&mut self, name: &str) {
        let key = name.to_ascii_lowercase();
        self.lookup.remove(&key);
        self.lines.retain(|(line_name, _)| !line_name.eq_ignore_ascii_case(&key));
    }

    /// Iterates headers in insertion order with their original casing.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.lines.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.set("Content-Type", vec!["application/json".to_string()]).unwrap();

        assert!(headers.contains("content-type"));
        assert!(headers.contains("CONTENT-TYPE"));
        assert_eq!(headers.get("content-TYPE"), ["application/json"]);
    }

    #[test]
    fn output_preserves_the_most_recent_casing() {
        let mut headers = HeaderMap::new();
        headers.set("x-request-id", vec!["1".to_string()]).unwrap();
        headers.set("X-Request-Id", vec!["2".to_string()]).unwrap();

        let lines: Vec<_> = headers.iter().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, "X-Request-Id");
        assert_eq!(lines[0].1, ["2"]);
    }

    #[test]
    fn set_replaces_regardless_of_prior_state() {
        let mut headers = HeaderMap::new();
        headers.set("Accept", vec!["text/html".to_string(), "text/plain".to_string()]).unwrap();
        headers.set("accept", vec!["application/json".to_string()]).unwrap();

        assert_eq!(headers.get("Accept"), ["application/json"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn get_line_joins_values() {
        let mut headers = HeaderMap::new();
        headers.set("Accept", vec!["text/html".to_string()]).unwrap();
        headers.append("Accept", "application/json").unwrap();

        assert_eq!(headers.get_line("accept"), "text/html, application/json");
        assert_eq!(headers.get_line("missing"), "");
    }

    #[test]
    fn append_on_a_missing_header_creates_it() {
        let mut headers = HeaderMap::new();
        headers.append("Set-Cookie", "a=1").unwrap();
        assert_eq!(headers.get("set-cookie"), ["a=1"]);
    }

    #[test]
    fn rejects_names_outside_the_token_grammar() {
        let mut headers = HeaderMap::new();

        assert!(headers.set("", vec![]).is_err());
        assert!(headers.set("-Leading", vec![]).is_err());
        assert!(headers.set("Trailing-", vec![]).is_err());
        assert!(headers.set("Has Space", vec![]).is_err());
        assert!(headers.set("X-B3-TraceId2", vec![]).is_err());
        assert!(headers.set("Content-Type", vec![]).is_ok());
    }

    #[test]
    fn remove_clears_both_views() {
        let mut headers = HeaderMap::new();
        headers.set("Cache-Control", vec!["no-store".to_string()]).unwrap();
        headers.remove("cache-control");

        assert!(!headers.contains("Cache-Control"));
        assert!(headers.iter().next().is_none());
    }
}
