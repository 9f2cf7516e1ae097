//! Schema-less view over one library entry

use serde_json::{Map, Value};

/// A single library entry exactly as the server returned it.
///
/// The payload shape differs between movies, shows and albums and any field
/// may be absent, so values are only reached through lookups that return
/// `None` (or an empty list) instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem(Map<String, Value>);

impl RawItem {
    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Underlying key/value map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Raw value for a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set or replace a key
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Scalar value as a string. Numbers and booleans are rendered, blank
    /// strings count as missing.
    pub fn str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Integer value, accepting numeric strings
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Floating point value, accepting numeric strings
    pub fn float(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Nested objects under `key`. A single object is treated as a list of one.
    pub fn children(&self, key: &str) -> Vec<RawItem> {
        match self.0.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| RawItem::from_value(v.clone()))
                .collect(),
            Some(Value::Object(map)) => vec![RawItem(map.clone())],
            _ => Vec::new(),
        }
    }

    /// First nested object under `key`
    pub fn first(&self, key: &str) -> Option<RawItem> {
        self.children(key).into_iter().next()
    }

    /// `attr` of every nested object under `key`, skipping objects without it
    pub fn attrs(&self, key: &str, attr: &str) -> Vec<String> {
        self.children(key)
            .iter()
            .filter_map(|child| child.str(attr))
            .collect()
    }

    /// Tag names of a tag list such as `Genre` or `Role`
    pub fn tags(&self, key: &str) -> Vec<String> {
        self.attrs(key, "tag")
    }

    /// The server's identifier for this item
    pub fn rating_key(&self) -> Option<String> {
        self.str("ratingKey")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> RawItem {
        RawItem::from_value(value).unwrap()
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(RawItem::from_value(json!([1, 2])).is_none());
        assert!(RawItem::from_value(json!("title")).is_none());
        assert!(RawItem::from_value(json!({})).is_some());
    }

    #[test]
    fn test_str_handles_numbers_and_blanks() {
        let raw = item(json!({"year": 1999, "title": "  The Matrix ", "tagline": "   "}));
        assert_eq!(raw.str("year").as_deref(), Some("1999"));
        assert_eq!(raw.str("title").as_deref(), Some("The Matrix"));
        assert_eq!(raw.str("tagline"), None);
        assert_eq!(raw.str("missing"), None);
    }

    #[test]
    fn test_numeric_lookups_accept_strings() {
        let raw = item(json!({"duration": "8160000", "rating": 7.5, "size": "big"}));
        assert_eq!(raw.int("duration"), Some(8_160_000));
        assert_eq!(raw.float("rating"), Some(7.5));
        assert_eq!(raw.int("size"), None);
    }

    #[test]
    fn test_tags_and_children() {
        let raw = item(json!({
            "Genre": [{"tag": "Action"}, {"id": 3}, {"tag": "Sci-Fi"}],
            "Media": {"videoCodec": "h264"},
        }));
        assert_eq!(raw.tags("Genre"), vec!["Action", "Sci-Fi"]);
        assert_eq!(
            raw.first("Media").and_then(|m| m.str("videoCodec")).as_deref(),
            Some("h264")
        );
        assert!(raw.tags("Role").is_empty());
        assert!(raw.first("Part").is_none());
    }
}
