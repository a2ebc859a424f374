//! Path pattern compilation and interpolation.
//!
//! Route paths are written as `/`-separated segment lists:
//!
//! - `posts` - static literal
//! - `$postId` - named parameter, captures exactly one segment
//! - `$` or `*` - wildcard, captures the rest of the path under `_splat`
//! - `/` - index route, matches only when no segments remain
//! - `posts_` - static literal `posts`; the trailing underscore keeps the
//!   route id apart from a nested `posts` route of the same URL
//!
//! Routes without a path are pathless (layout) routes and contribute no
//! segment at all.

use serde_json::Value;

use crate::error::{RouterError, RouterResult};
use crate::params::ParamMap;

/// Param key under which wildcard captures are stored.
pub const SPLAT_PARAM: &str = "_splat";

/// Maximum allowed length for a route path in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed number of segments in a route path.
const MAX_PATH_SEGMENTS: usize = 32;

/// One compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	/// Matches the literal text.
	Static(String),
	/// Captures one segment under the given name.
	Param(String),
	/// Captures every remaining segment.
	Wildcard,
}

impl Segment {
	/// Specificity rank used to order candidate matches.
	pub(crate) fn rank(&self) -> u8 {
		match self {
			Self::Static(_) => 3,
			Self::Param(_) => 2,
			Self::Wildcard => 1,
		}
	}
}

/// The shape of a route's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
	/// The tree root.
	Root,
	/// A layout route that consumes no segment.
	Pathless,
	/// An index route (`/`).
	Index,
	/// A route with one or more segments.
	Segments,
}

/// A compiled route path.
#[derive(Debug, Clone)]
pub struct PathPattern {
	raw: String,
	url: String,
	kind: PatternKind,
	segments: Vec<Segment>,
}

impl PathPattern {
	/// The pattern of the tree root.
	pub fn root() -> Self {
		Self {
			raw: "/".to_string(),
			url: "/".to_string(),
			kind: PatternKind::Root,
			segments: Vec::new(),
		}
	}

	/// The pattern of a pathless layout route.
	pub fn pathless() -> Self {
		Self {
			raw: String::new(),
			url: String::new(),
			kind: PatternKind::Pathless,
			segments: Vec::new(),
		}
	}

	/// Compiles a route path.
	///
	/// Leading and trailing slashes are ignored, so `/posts`, `posts` and
	/// `posts/` compile to the same pattern. A path consisting only of
	/// slashes is an index route.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidPattern`] if the path is too long, has
	/// too many segments, contains an empty segment, has an invalid param
	/// name, or places a wildcard anywhere but last.
	pub fn parse(path: &str) -> RouterResult<Self> {
		let invalid = |reason: String| RouterError::InvalidPattern {
			path: path.to_string(),
			reason,
		};

		if path.len() > MAX_PATTERN_LENGTH {
			return Err(invalid(format!(
				"length {} exceeds maximum allowed length of {} bytes",
				path.len(),
				MAX_PATTERN_LENGTH
			)));
		}

		let trimmed = path.trim().trim_matches('/');
		if trimmed.is_empty() {
			return Ok(Self {
				raw: "/".to_string(),
				url: "/".to_string(),
				kind: PatternKind::Index,
				segments: Vec::new(),
			});
		}

		let pieces: Vec<&str> = trimmed.split('/').collect();
		if pieces.len() > MAX_PATH_SEGMENTS {
			return Err(invalid(format!(
				"{} segments exceed maximum of {}",
				pieces.len(),
				MAX_PATH_SEGMENTS
			)));
		}

		let mut segments = Vec::with_capacity(pieces.len());
		let mut url = String::with_capacity(trimmed.len() + 1);
		for (index, piece) in pieces.iter().enumerate() {
			let segment = match *piece {
				"" => return Err(invalid("empty segment".to_string())),
				"$" | "*" => {
					if index + 1 != pieces.len() {
						return Err(invalid("wildcard must be the last segment".to_string()));
					}
					Segment::Wildcard
				}
				p if p.starts_with('$') => {
					let name = &p[1..];
					if !is_param_name(name) {
						return Err(invalid(format!("invalid param name '{}'", name)));
					}
					Segment::Param(name.to_string())
				}
				p => Segment::Static(unnested(p).to_string()),
			};
			url.push('/');
			url.push_str(match &segment {
				Segment::Static(text) => text.as_str(),
				_ => *piece,
			});
			segments.push(segment);
		}

		Ok(Self {
			raw: format!("/{}", trimmed),
			url,
			kind: PatternKind::Segments,
			segments,
		})
	}

	/// Returns the normalized pattern string.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// Returns the URL template, with un-nesting underscores removed.
	pub fn url_template(&self) -> &str {
		&self.url
	}

	/// Returns the pattern kind.
	pub fn kind(&self) -> PatternKind {
		self.kind
	}

	/// Returns the compiled segments.
	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	/// Returns the names of the params this pattern captures, in order.
	pub fn param_names(&self) -> Vec<&str> {
		self.segments
			.iter()
			.filter_map(|s| match s {
				Segment::Param(name) => Some(name.as_str()),
				Segment::Wildcard => Some(SPLAT_PARAM),
				Segment::Static(_) => None,
			})
			.collect()
	}
}

impl PartialEq for PathPattern {
	fn eq(&self, other: &Self) -> bool {
		self.kind == other.kind && self.raw == other.raw
	}
}

impl Eq for PathPattern {}

impl std::fmt::Display for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.raw)
	}
}

/// Strips the un-nesting marker from a static segment.
fn unnested(piece: &str) -> &str {
	match piece.strip_suffix('_') {
		Some(stripped) if !stripped.is_empty() => stripped,
		_ => piece,
	}
}

fn is_param_name(name: &str) -> bool {
	!name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits a pathname into its non-empty segments.
///
/// Trailing slashes and repeated slashes are dropped, which is what makes
/// `/posts/` and `/posts` match the same routes.
pub fn split_path(pathname: &str) -> Vec<&str> {
	pathname.split('/').filter(|s| !s.is_empty()).collect()
}

/// Percent-decodes one path segment, keeping the raw text if it is not UTF-8.
pub(crate) fn decode_segment(segment: &str) -> String {
	urlencoding::decode(segment)
		.map(|s| s.into_owned())
		.unwrap_or_else(|_| segment.to_string())
}

/// Renders a param value as path text.
pub(crate) fn param_to_string(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(s) => Some(s.clone()),
		Value::Bool(b) => Some(b.to_string()),
		Value::Number(n) => Some(n.to_string()),
		other => Some(other.to_string()),
	}
}

/// Joins two paths, resolving `.` and `..` segments of `to` against `base`.
///
/// An absolute `to` (leading `/`) is returned as is. Both may be route
/// templates containing `$param` segments.
pub fn resolve_path(base: &str, to: &str) -> String {
	if to.starts_with('/') {
		return to.to_string();
	}

	let mut segments: Vec<&str> = split_path(base);
	for piece in to.split('/') {
		match piece {
			"" | "." => {}
			".." => {
				segments.pop();
			}
			other => segments.push(other),
		}
	}

	let mut resolved = format!("/{}", segments.join("/"));
	if to.ends_with('/') && resolved != "/" {
		resolved.push('/');
	}
	resolved
}

/// Fills a path template with param values.
///
/// `$name` segments are replaced by the percent-encoded param value and
/// wildcard segments by the `_splat` param with each of its segments encoded.
///
/// # Errors
///
/// Returns [`RouterError::MissingParameter`] if the template references a
/// param that `params` does not contain.
pub fn interpolate_path(template: &str, params: &ParamMap) -> RouterResult<String> {
	let mut out = String::with_capacity(template.len());
	for piece in split_path(template) {
		out.push('/');
		match piece {
			"$" | "*" => {
				let value = params
					.get(SPLAT_PARAM)
					.and_then(param_to_string)
					.ok_or_else(|| RouterError::MissingParameter(SPLAT_PARAM.to_string()))?;
				let encoded: Vec<String> = split_path(&value)
					.into_iter()
					.map(|s| urlencoding::encode(s).into_owned())
					.collect();
				out.push_str(&encoded.join("/"));
			}
			p if p.starts_with('$') => {
				let name = &p[1..];
				let value = params
					.get(name)
					.and_then(param_to_string)
					.ok_or_else(|| RouterError::MissingParameter(name.to_string()))?;
				out.push_str(&urlencoding::encode(&value));
			}
			p => out.push_str(p),
		}
	}

	if out.is_empty() {
		out.push('/');
	} else if template.ends_with('/') {
		out.push('/');
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn params(value: Value) -> ParamMap {
		match value {
			Value::Object(map) => map,
			_ => ParamMap::new(),
		}
	}

	#[rstest]
	#[case("/posts", "/posts")]
	#[case("posts", "/posts")]
	#[case("posts/", "/posts")]
	#[case("/posts/$slug/", "/posts/$slug")]
	fn test_parse_normalizes(#[case] input: &str, #[case] expected: &str) {
		let pattern = PathPattern::parse(input).unwrap();
		assert_eq!(pattern.kind(), PatternKind::Segments);
		assert_eq!(pattern.as_str(), expected);
	}

	#[rstest]
	fn test_parse_segments() {
		let pattern = PathPattern::parse("/files/$owner/raw/$").unwrap();
		assert_eq!(
			pattern.segments(),
			&[
				Segment::Static("files".to_string()),
				Segment::Param("owner".to_string()),
				Segment::Static("raw".to_string()),
				Segment::Wildcard,
			]
		);
		assert_eq!(pattern.param_names(), vec!["owner", SPLAT_PARAM]);
	}

	#[rstest]
	#[case("/")]
	#[case("")]
	#[case("//")]
	fn test_parse_index(#[case] input: &str) {
		let pattern = PathPattern::parse(input).unwrap();
		assert_eq!(pattern.kind(), PatternKind::Index);
		assert!(pattern.segments().is_empty());
	}

	#[rstest]
	#[case("/a//b", "empty segment")]
	#[case("/a/$/b", "wildcard must be the last segment")]
	#[case("/a/$bad-name", "invalid param name")]
	fn test_parse_rejects(#[case] input: &str, #[case] reason: &str) {
		match PathPattern::parse(input) {
			Err(RouterError::InvalidPattern { reason: got, .. }) => assert!(got.contains(reason)),
			other => panic!("expected InvalidPattern, got {:?}", other),
		}
	}

	#[rstest]
	fn test_parse_rejects_excessive_length() {
		// Arrange
		let long_pattern = "/".to_string() + &"a".repeat(1025);

		// Act
		let result = PathPattern::parse(&long_pattern);

		// Assert
		assert!(matches!(result, Err(RouterError::InvalidPattern { .. })));
	}

	#[rstest]
	fn test_parse_rejects_excessive_segments() {
		// Arrange
		let segments: Vec<&str> = (0..35).map(|_| "seg").collect();
		let pattern = format!("/{}/", segments.join("/"));

		// Act
		let result = PathPattern::parse(&pattern);

		// Assert
		assert!(matches!(result, Err(RouterError::InvalidPattern { .. })));
	}

	#[rstest]
	#[case("/posts", "./$slug", "/posts/$slug")]
	#[case("/posts/$slug", "..", "/posts")]
	#[case("/posts/$slug", ".", "/posts/$slug")]
	#[case("/posts/$slug", "../../users", "/users")]
	#[case("/a/b", "/c", "/c")]
	#[case("/", "..", "/")]
	#[case("/posts", "edit/", "/posts/edit/")]
	fn test_resolve_path(#[case] base: &str, #[case] to: &str, #[case] expected: &str) {
		assert_eq!(resolve_path(base, to), expected);
	}

	#[rstest]
	fn test_interpolate_named_params() {
		let p = params(json!({"projectId": "router", "version": "v1"}));
		assert_eq!(
			interpolate_path("/p/$projectId/$version", &p).unwrap(),
			"/p/router/v1"
		);
	}

	#[rstest]
	fn test_interpolate_encodes_values() {
		let p = params(json!({"slug": "hello world/x", "n": 5}));
		assert_eq!(
			interpolate_path("/posts/$slug/$n", &p).unwrap(),
			"/posts/hello%20world%2Fx/5"
		);
	}

	#[rstest]
	fn test_interpolate_splat_keeps_separators() {
		let p = params(json!({"_splat": "css/main file.css"}));
		assert_eq!(
			interpolate_path("/static/$", &p).unwrap(),
			"/static/css/main%20file.css"
		);
	}

	#[rstest]
	fn test_interpolate_missing_param() {
		let result = interpolate_path("/users/$id", &ParamMap::new());
		assert_eq!(result, Err(RouterError::MissingParameter("id".to_string())));
	}

	#[rstest]
	fn test_interpolate_root_and_trailing_slash() {
		assert_eq!(interpolate_path("/", &ParamMap::new()).unwrap(), "/");
		assert_eq!(interpolate_path("/posts/", &ParamMap::new()).unwrap(), "/posts/");
	}

	#[rstest]
	fn test_pattern_display_and_equality() {
		let a = PathPattern::parse("/users/$id").unwrap();
		let b = PathPattern::parse("users/$id/").unwrap();
		let c = PathPattern::parse("/users/$userId").unwrap();
		assert_eq!(format!("{}", a), "/users/$id");
		assert_eq!(a, b);
		assert_ne!(a, c);
	}

	#[rstest]
	#[case("/posts_/$postId/deep", "/posts/$postId/deep")]
	#[case("/a_/b_", "/a/b")]
	#[case("/_/x", "/_/x")]
	#[case("/$", "/$")]
	fn test_unnested_segments(#[case] input: &str, #[case] url: &str) {
		let pattern = PathPattern::parse(input).unwrap();
		assert_eq!(pattern.as_str(), input);
		assert_eq!(pattern.url_template(), url);
	}

	#[rstest]
	fn test_unnested_segment_matches_plain_literal() {
		let pattern = PathPattern::parse("posts_/$postId").unwrap();
		assert_eq!(
			pattern.segments(),
			&[Segment::Static("posts".to_string()), Segment::Param("postId".to_string())]
		);
	}
}
