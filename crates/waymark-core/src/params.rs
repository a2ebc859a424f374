//! Path params, search values and their validation pipeline.
//!
//! Params and search values are dynamic JSON values so that validators can
//! turn raw strings into numbers, booleans or nested data at runtime.
//! Validation runs root to leaf: every validator sees the output of its
//! ancestors merged over the raw, not yet validated, values, and its own
//! output is shallow-merged over that input.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationTarget};

/// Path params keyed by name.
pub type ParamMap = Map<String, Value>;

/// Search values keyed by name, in query order.
pub type SearchMap = Map<String, Value>;

/// Route context accumulated from `before_load` hooks.
pub type ContextMap = Map<String, Value>;

/// Validates and converts the params visible at a route.
pub type ParamsValidator =
	Arc<dyn Fn(&ParamMap) -> Result<ParamMap, ValidationError> + Send + Sync>;

/// Validates and converts the search visible at a route.
pub type SearchValidator =
	Arc<dyn Fn(&SearchMap) -> Result<SearchMap, ValidationError> + Send + Sync>;

/// Updater function form of a params or search update.
pub type MapUpdater = Arc<dyn Fn(&Map<String, Value>) -> Map<String, Value> + Send + Sync>;

/// Collects key/value pairs into a value map.
///
/// ```
/// use waymark_core::params::to_map;
///
/// let params = to_map([("slug", "tanner")]);
/// assert_eq!(params["slug"], "tanner");
/// ```
pub fn to_map<K, V, I>(pairs: I) -> Map<String, Value>
where
	I: IntoIterator<Item = (K, V)>,
	K: Into<String>,
	V: Into<Value>,
{
	pairs
		.into_iter()
		.map(|(k, v)| (k.into(), v.into()))
		.collect()
}

/// How a navigation derives its params from the current ones.
#[derive(Clone, Default)]
pub enum ParamsUpdate {
	/// Reuse the current params.
	#[default]
	Keep,
	/// Shallow-merge these params over the current ones.
	Merge(ParamMap),
	/// Compute params from the current ones; the result is merged over them.
	With(MapUpdater),
}

impl ParamsUpdate {
	/// Applies the update to the current params.
	pub fn apply(&self, previous: &ParamMap) -> ParamMap {
		let mut next = previous.clone();
		match self {
			Self::Keep => {}
			Self::Merge(params) => next.extend(params.clone()),
			Self::With(update) => next.extend(update(previous)),
		}
		next
	}
}

impl std::fmt::Debug for ParamsUpdate {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Keep => f.write_str("Keep"),
			Self::Merge(params) => f.debug_tuple("Merge").field(params).finish(),
			Self::With(_) => f.write_str("With(<fn>)"),
		}
	}
}

/// How a navigation derives its search from the current one.
#[derive(Clone, Default)]
pub enum SearchUpdate {
	/// Navigate without search values.
	#[default]
	Clear,
	/// Reuse the current search.
	Keep,
	/// Replace the search with these values.
	Set(SearchMap),
	/// Compute the next search from the current one.
	With(MapUpdater),
}

impl SearchUpdate {
	/// Applies the update to the current search.
	pub fn apply(&self, previous: &SearchMap) -> SearchMap {
		match self {
			Self::Clear => SearchMap::new(),
			Self::Keep => previous.clone(),
			Self::Set(search) => search.clone(),
			Self::With(update) => update(previous),
		}
	}
}

impl std::fmt::Debug for SearchUpdate {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Clear => f.write_str("Clear"),
			Self::Keep => f.write_str("Keep"),
			Self::Set(search) => f.debug_tuple("Set").field(search).finish(),
			Self::With(_) => f.write_str("With(<fn>)"),
		}
	}
}

/// Runs one route's param validator.
///
/// `inherited` holds the validated params of the ancestors and `captured`
/// the raw captures of this route's own segments.
pub(crate) fn validate_params(
	validator: Option<&ParamsValidator>,
	route_id: &str,
	inherited: &ParamMap,
	captured: &[(String, String)],
) -> Result<ParamMap, ValidationError> {
	let mut input = inherited.clone();
	for (name, value) in captured {
		input.insert(name.clone(), Value::String(value.clone()));
	}

	let Some(validator) = validator else {
		return Ok(input);
	};
	let validated = validator(&input).map_err(|e| e.attach(route_id, ValidationTarget::Params))?;
	input.extend(validated);
	Ok(input)
}

/// Runs one route's search validator over the accumulated search.
pub(crate) fn validate_search(
	validator: Option<&SearchValidator>,
	route_id: &str,
	accumulated: &SearchMap,
) -> Result<SearchMap, ValidationError> {
	let Some(validator) = validator else {
		return Ok(accumulated.clone());
	};
	let validated =
		validator(accumulated).map_err(|e| e.attach(route_id, ValidationTarget::Search))?;
	let mut next = accumulated.clone();
	next.extend(validated);
	Ok(next)
}
