//! Query-string and form decoding with nested bracket notation.
//!
//! `serde_urlencoded` handles the pair splitting and percent decoding;
//! this module layers the bracket conventions on top:
//!
//! - `a=1` — plain key, later pairs overwrite earlier ones
//! - `a[]=1&a[]=2` — appends into an array
//! - `a[b][c]=d` — nests into maps
//!
//! Decoded values land in `serde_json` maps, which is also the shape the
//! parsed-body and route-parameter plumbing uses.

use serde_json::{Map, Value};

/// Decodes a query string or form body into a map. Undecodable input
/// yields an empty map rather than an error — a request with a garbled
/// query simply has no parameters.
pub fn parse(input: &str) -> Map<String, Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(input).unwrap_or_default();

    let mut root = Map::new();
    for (key, value) in pairs {
        insert_pair(&mut root, &key, value);
    }

    root
}

enum Segment {
    Named(String),
    Append,
}

/// Splits `a[b][]` into the root key `a` and its bracket segments. An
/// unterminated bracket swallows the rest of the key as one segment.
fn split_key(key: &str) -> (String, Vec<Segment>) {
    let Some(open) = key.find('[') else {
        return (key.to_string(), Vec::new());
    };

    let root = key[..open].to_string();
    let mut segments = Vec::new();
    let mut rest = &key[open..];

    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(close) => {
                let segment = &stripped[..close];
                segments.push(if segment.is_empty() {
                    Segment::Append
                } else {
                    Segment::Named(segment.to_string())
                });
                rest = &stripped[close + 1..];
            }
            None => {
                segments.push(Segment::Named(stripped.to_string()));
                rest = "";
            }
        }
    }

    (root, segments)
}

fn insert_pair(root: &mut Map<String, Value>, key: &str, value: String) {
    let (root_key, segments) = split_key(key);
    if root_key.is_empty() {
        return;
    }

    if segments.is_empty() {
        root.insert(root_key, Value::String(value));
        return;
    }

    let slot = root.entry(root_key).or_insert(Value::Null);
    place(slot, &segments, value);
}

/// Walks the bracket segments, materializing maps and arrays along the
/// way. A node of the wrong shape is replaced — last write wins, as with
/// plain keys.
fn place(node: &mut Value, segments: &[Segment], value: String) {
    let Some((segment, rest)) = segments.split_first() else {
        *node = Value::String(value);
        return;
    };

    match segment {
        Segment::Append => {
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            let items = node.as_array_mut().expect("just ensured array");

            if rest.is_empty() {
                items.push(Value::String(value));
            } else {
                items.push(Value::Null);
                let last = items.last_mut().expect("just pushed");
                place(last, rest, value);
            }
        }
        Segment::Named(name) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let map = node.as_object_mut().expect("just ensured object");

            let slot = map.entry(name.clone()).or_insert(Value::Null);
            place(slot, rest, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_flat_pairs() {
        let params = parse("page=2&sort=price");
        assert_eq!(params["page"], json!("2"));
        assert_eq!(params["sort"], json!("price"));
    }

    #[test]
    fn later_pairs_overwrite_earlier_ones() {
        let params = parse("a=1&a=2");
        assert_eq!(params["a"], json!("2"));
    }

    #[test]
    fn empty_brackets_append() {
        let params = parse("tags[]=sea&tags[]=garden");
        assert_eq!(params["tags"], json!(["sea", "garden"]));
    }

    #[test]
    fn named_brackets_nest() {
        let params = parse("filter[price][max]=5000&filter[area]=90");
        assert_eq!(params["filter"], json!({"price": {"max": "5000"}, "area": "90"}));
    }

    #[test]
    fn percent_encoded_pairs_are_decoded() {
        let params = parse("q=led%20lys&municipality=K%C3%B8benhavn");
        assert_eq!(params["q"], json!("led lys"));
        assert_eq!(params["municipality"], json!("København"));
    }

    #[test]
    fn empty_input_yields_an_empty_map() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn a_scalar_is_replaced_by_a_deeper_write() {
        let params = parse("a=1&a[b]=2");
        assert_eq!(params["a"], json!({"b": "2"}));
    }
}
