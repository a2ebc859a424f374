//! Locations and navigation targets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RouterResult;
use crate::params::{MapUpdater, ParamMap, ParamsUpdate, SearchMap, SearchUpdate, to_map};
use crate::pattern::{interpolate_path, resolve_path};
use crate::resolve::RouteMatch;
use crate::search::{parse_search, stringify_search};
use crate::sharing::replace_equal_deep;
use crate::tree::RouteTree;

/// An immutable URL location.
///
/// `href` is derived from the other parts and is the canonical form handed
/// to the history backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
	pathname: String,
	search: Arc<SearchMap>,
	search_str: String,
	hash: String,
	href: String,
}

impl Location {
	/// Builds a location from its parts.
	pub fn new(pathname: impl Into<String>, search: SearchMap, hash: impl Into<String>) -> Self {
		Self::from_shared(pathname, Arc::new(search), hash)
	}

	/// Builds a location around an already shared search map.
	pub fn from_shared(
		pathname: impl Into<String>,
		search: Arc<SearchMap>,
		hash: impl Into<String>,
	) -> Self {
		let mut pathname = pathname.into();
		if !pathname.starts_with('/') {
			pathname.insert(0, '/');
		}
		let hash = hash.into().trim_start_matches('#').to_string();
		let search_str = stringify_search(&search);
		let href = if hash.is_empty() {
			format!("{}{}", pathname, search_str)
		} else {
			format!("{}{}#{}", pathname, search_str, hash)
		};

		Self {
			pathname,
			search,
			search_str,
			hash,
			href,
		}
	}

	/// Parses an href such as `/posts/1?redirect=true#top`.
	pub fn parse(href: &str) -> Self {
		let (rest, hash) = href.split_once('#').unwrap_or((href, ""));
		let (pathname, query) = rest.split_once('?').unwrap_or((rest, ""));
		let pathname = if pathname.is_empty() { "/" } else { pathname };
		Self::new(pathname, parse_search(query), hash)
	}

	/// Takes over `previous`'s search allocation when the values are equal.
	pub fn shared_with(self, previous: &Location) -> Self {
		if Arc::ptr_eq(&self.search, &previous.search) || *self.search != *previous.search {
			return self;
		}
		Self {
			search: Arc::clone(&previous.search),
			..self
		}
	}

	/// The path portion, always starting with `/`.
	pub fn pathname(&self) -> &str {
		&self.pathname
	}

	/// The parsed search values.
	pub fn search(&self) -> &Arc<SearchMap> {
		&self.search
	}

	/// The serialized search including the leading `?`, or empty.
	pub fn search_str(&self) -> &str {
		&self.search_str
	}

	/// The hash without the leading `#`.
	pub fn hash(&self) -> &str {
		&self.hash
	}

	/// The canonical href.
	pub fn href(&self) -> &str {
		&self.href
	}
}

impl Default for Location {
	fn default() -> Self {
		Self::new("/", SearchMap::new(), "")
	}
}

impl std::fmt::Display for Location {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.href)
	}
}

/// How built pathnames treat a trailing slash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
	/// Strip trailing slashes.
	#[default]
	Never,
	/// Always end in a slash.
	Always,
	/// Keep whatever the template produced.
	Preserve,
}

impl TrailingSlash {
	/// Applies the policy to a pathname. The root path is left untouched.
	pub fn apply(self, pathname: String) -> String {
		if pathname == "/" {
			return pathname;
		}
		match self {
			Self::Never => {
				let trimmed = pathname.trim_end_matches('/');
				if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() }
			}
			Self::Always if !pathname.ends_with('/') => format!("{}/", pathname),
			_ => pathname,
		}
	}
}

/// A navigation request.
///
/// `to` may be absolute or relative (`.`, `..`, `./child`); relative targets
/// resolve against `from`, which defaults to the full path of the currently
/// active leaf route. Omitting `to` targets `from` itself, which is how
/// param-only updates are expressed.
#[derive(Debug, Clone, Default)]
pub struct NavigateOptions {
	/// Target path template.
	pub to: Option<String>,
	/// Base for relative targets.
	pub from: Option<String>,
	/// Params for the target.
	pub params: ParamsUpdate,
	/// Search for the target.
	pub search: SearchUpdate,
	/// Hash for the target; `None` clears it.
	pub hash: Option<String>,
	/// Replace the current history entry instead of pushing.
	pub replace: bool,
}

impl NavigateOptions {
	/// Creates an empty request (stay on the current route).
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a request targeting `to`.
	pub fn to(to: impl Into<String>) -> Self {
		Self {
			to: Some(to.into()),
			..Self::default()
		}
	}

	/// Sets the base for relative targets.
	pub fn from(mut self, from: impl Into<String>) -> Self {
		self.from = Some(from.into());
		self
	}

	/// Merges literal params over the current ones.
	pub fn params<K, V, I>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<Value>,
	{
		self.params = ParamsUpdate::Merge(to_map(params));
		self
	}

	/// Computes params from the current ones.
	pub fn params_with<F>(mut self, update: F) -> Self
	where
		F: Fn(&ParamMap) -> ParamMap + Send + Sync + 'static,
	{
		let update: MapUpdater = Arc::new(update);
		self.params = ParamsUpdate::With(update);
		self
	}

	/// Replaces the search with literal values.
	pub fn search<K, V, I>(mut self, search: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<Value>,
	{
		self.search = SearchUpdate::Set(to_map(search));
		self
	}

	/// Computes the search from the current one.
	pub fn search_with<F>(mut self, update: F) -> Self
	where
		F: Fn(&SearchMap) -> SearchMap + Send + Sync + 'static,
	{
		let update: MapUpdater = Arc::new(update);
		self.search = SearchUpdate::With(update);
		self
	}

	/// Keeps the current search.
	pub fn keep_search(mut self) -> Self {
		self.search = SearchUpdate::Keep;
		self
	}

	/// Sets the hash.
	pub fn hash(mut self, hash: impl Into<String>) -> Self {
		self.hash = Some(hash.into());
		self
	}

	/// Requests a history replace instead of a push.
	pub fn replace(mut self, replace: bool) -> Self {
		self.replace = replace;
		self
	}
}

/// Computes the location a navigation request targets.
///
/// Resolution is deterministic given the request, the committed location and
/// the committed matches. The returned search shares its allocation with the
/// current one when the values are unchanged.
///
/// # Errors
///
/// Returns [`RouterError::MissingParameter`](crate::error::RouterError::MissingParameter)
/// if the target template needs a param the merged params lack.
pub fn build_location(
	tree: &RouteTree,
	current: &Location,
	current_matches: &[Arc<RouteMatch>],
	options: &NavigateOptions,
	trailing_slash: TrailingSlash,
) -> RouterResult<Location> {
	let leaf = current_matches.last();
	let from = options
		.from
		.clone()
		.or_else(|| leaf.map(|m| tree.node(m.route).full_path().to_string()))
		.unwrap_or_else(|| current.pathname().to_string());
	let template = resolve_path(&from, options.to.as_deref().unwrap_or("."));

	let previous_params = leaf.map(|m| (*m.params).clone()).unwrap_or_default();
	let params = options.params.apply(&previous_params);
	let pathname = trailing_slash.apply(interpolate_path(&template, &params)?);

	let search = replace_equal_deep(current.search(), options.search.apply(current.search()));
	let hash = options.hash.clone().unwrap_or_default();

	Ok(Location::from_shared(pathname, search, hash))
}
