//! Search (query string) codec.
//!
//! Values are JSON-aware: a raw value that parses as JSON becomes that value
//! (`2` is a number, `true` a boolean), anything else stays a string.
//! Stringifying is the exact inverse for strings, numbers and booleans:
//! strings that would re-parse as another JSON value are JSON-quoted, and
//! keys and values are percent-encoded.

use serde_json::Value;

use crate::params::SearchMap;

/// Parses a query string (with or without the leading `?`).
///
/// Repeated keys collect their values into an array.
pub fn parse_search(query: &str) -> SearchMap {
	let query = query.strip_prefix('?').unwrap_or(query);
	let mut search = SearchMap::new();

	for pair in query.split('&').filter(|p| !p.is_empty()) {
		let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
		let key = decode(raw_key);
		let value = parse_value(&decode(raw_value));

		match search.get_mut(&key) {
			Some(Value::Array(values)) => values.push(value),
			Some(existing) => {
				let first = existing.take();
				*existing = Value::Array(vec![first, value]);
			}
			None => {
				search.insert(key, value);
			}
		}
	}

	search
}

/// Serializes search values into a query string including the leading `?`.
///
/// Returns an empty string when there is nothing to serialize.
pub fn stringify_search(search: &SearchMap) -> String {
	let pairs: Vec<String> = search
		.iter()
		.map(|(key, value)| {
			format!(
				"{}={}",
				urlencoding::encode(key),
				urlencoding::encode(&stringify_value(value))
			)
		})
		.collect();

	if pairs.is_empty() {
		String::new()
	} else {
		format!("?{}", pairs.join("&"))
	}
}

fn decode(raw: &str) -> String {
	urlencoding::decode(raw)
		.map(|s| s.into_owned())
		.unwrap_or_else(|_| raw.to_string())
}

fn parse_value(raw: &str) -> Value {
	serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn stringify_value(value: &Value) -> String {
	match value {
		// A string that parses as JSON would come back as a different value
		Value::String(s) if serde_json::from_str::<Value>(s).is_ok() => value.to_string(),
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::to_map;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_parse_json_aware_values() {
		let search = parse_search("?page=2&draft=true&q=hello&ratio=0.5");
		assert_eq!(search["page"], json!(2));
		assert_eq!(search["draft"], json!(true));
		assert_eq!(search["q"], json!("hello"));
		assert_eq!(search["ratio"], json!(0.5));
	}

	#[rstest]
	fn test_parse_escaped_key() {
		let search = parse_search("?foo%3Dbar=2");
		assert_eq!(search, to_map([("foo=bar", 2)]));
		assert_eq!(stringify_search(&search), "?foo%3Dbar=2");
	}

	#[rstest]
	fn test_parse_repeated_keys_collect() {
		let search = parse_search("tag=a&tag=b&tag=3");
		assert_eq!(search["tag"], json!(["a", "b", 3]));
	}

	#[rstest]
	#[case("", 0)]
	#[case("?", 0)]
	#[case("?&&a=1&", 1)]
	#[case("flag", 1)]
	fn test_parse_degenerate_queries(#[case] query: &str, #[case] len: usize) {
		assert_eq!(parse_search(query).len(), len);
	}

	#[rstest]
	fn test_parse_key_without_value() {
		assert_eq!(parse_search("?flag")["flag"], json!(""));
	}

	#[rstest]
	fn test_stringify_preserves_order() {
		let search = to_map([("z", 1), ("a", 2)]);
		assert_eq!(stringify_search(&search), "?z=1&a=2");
	}

	#[rstest]
	fn test_stringify_quotes_ambiguous_strings() {
		let search = to_map([("n", "2"), ("b", "true"), ("s", "plain")]);
		let query = stringify_search(&search);
		assert_eq!(query, "?n=%222%22&b=%22true%22&s=plain");
		assert_eq!(parse_search(&query), search);
	}

	#[rstest]
	fn test_stringify_nested_values_as_json() {
		let mut search = SearchMap::new();
		search.insert("filter".to_string(), json!({"status": ["open"]}));
		let query = stringify_search(&search);
		assert_eq!(parse_search(&query), search);
	}

	#[rstest]
	fn test_stringify_empty() {
		assert_eq!(stringify_search(&SearchMap::new()), "");
	}
}
