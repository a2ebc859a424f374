//! Match resolution.
//!
//! Turns a location into the ordered chain of [`RouteMatch`]es, root first,
//! running the param and search validators and reusing matches from the
//! committed chain where nothing relevant changed.

use std::sync::Arc;

use crate::error::{RouterError, RouterResult};
use crate::location::Location;
use crate::matcher::Matcher;
use crate::params::{ContextMap, ParamMap, SearchMap, validate_params, validate_search};
use crate::sharing::share_with;
use crate::tree::RouteId;

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStatus {
	/// Created by a navigation that has not committed yet.
	Pending,
	/// Every guard and loader passed.
	Resolved,
	/// Validation or a hook failed; see [`RouteMatch::error`].
	Error,
	/// A hook on this match redirected the navigation.
	Redirected,
}

/// The binding of one route to a location.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
	/// Arena id of the route.
	pub route: RouteId,
	/// String id of the route.
	pub id: String,
	/// Pathname matched up to this route.
	pub pathname: String,
	/// Validated params, including the ancestors'.
	pub params: Arc<ParamMap>,
	/// Validated search, merged from the root down.
	pub search: Arc<SearchMap>,
	/// Route context after this route's `before_load`.
	pub context: Arc<ContextMap>,
	/// Lifecycle status.
	pub status: MatchStatus,
	/// Failure attached to this match.
	pub error: Option<RouterError>,
}

impl RouteMatch {
	/// Returns a copy with a different status.
	pub fn with_status(&self, status: MatchStatus) -> Self {
		Self {
			status,
			..self.clone()
		}
	}
}

/// A resolved match chain.
#[derive(Debug, Clone)]
pub struct Resolution {
	/// Matches, root first.
	pub matches: Vec<Arc<RouteMatch>>,
	/// Length of the prefix taken over unchanged from the committed chain.
	pub reused: usize,
}

impl Resolution {
	/// Returns the first match carrying an error, with its position.
	pub fn first_error(&self) -> Option<(usize, &RouterError)> {
		self.matches
			.iter()
			.enumerate()
			.find_map(|(i, m)| m.error.as_ref().map(|e| (i, e)))
	}

	/// The deepest match.
	pub fn leaf(&self) -> Option<&Arc<RouteMatch>> {
		self.matches.last()
	}
}

/// Resolves `location` against the matcher's tree.
///
/// Params are validated root to leaf: each route's validator sees its
/// ancestors' validated params plus its own raw captures. Search is
/// validated the same way starting from the raw location search. A failing
/// validator marks its match [`MatchStatus::Error`]; resolution continues
/// so the whole chain is reported.
///
/// The leading matches of `current` whose route, params and search are
/// unchanged and which resolved successfully are reused as is. Other
/// matches share params and search allocations with their predecessor in
/// `current` when the values are deeply equal.
///
/// # Errors
///
/// Returns [`RouterError::NotFound`] if no route chain matches the pathname.
pub fn resolve_matches(
	matcher: &Matcher<'_>,
	location: &Location,
	current: &[Arc<RouteMatch>],
) -> RouterResult<Resolution> {
	let tree = matcher.tree();
	let chain = matcher.best(location.pathname())?;

	let mut matches: Vec<Arc<RouteMatch>> = Vec::with_capacity(chain.len());
	let mut inherited = ParamMap::new();
	let mut accumulated = (**location.search()).clone();
	let mut reusing = true;
	let mut reused = 0;

	for (index, route) in chain.routes().iter().copied().enumerate() {
		let node = tree.node(route);
		let options = node.options();
		let mut error = None;

		let params = validate_params(
			options.params_validator(),
			node.route_id(),
			&inherited,
			chain.captured_at(index),
		)
		.unwrap_or_else(|e| {
			let raw = raw_params(&inherited, chain.captured_at(index));
			error = Some(RouterError::from(e));
			raw
		});

		let search = validate_search(options.search_validator(), node.route_id(), &accumulated)
			.unwrap_or_else(|e| {
				error.get_or_insert(RouterError::from(e));
				accumulated.clone()
			});

		inherited = params.clone();
		accumulated = search.clone();

		let previous = current.get(index).filter(|m| m.route == route);
		if reusing && error.is_none() {
			if let Some(previous) = previous.filter(|m| {
				m.status == MatchStatus::Resolved && *m.params == params && *m.search == search
			}) {
				matches.push(Arc::clone(previous));
				reused += 1;
				continue;
			}
		}
		reusing = false;

		let parent = matches.last();
		let search = match previous {
			Some(previous) => share_with(Some(&previous.search), search),
			None => share_with(parent.map(|p| &p.search), search),
		};
		let context = parent
			.map(|p| Arc::clone(&p.context))
			.unwrap_or_else(|| Arc::new(ContextMap::new()));

		matches.push(Arc::new(RouteMatch {
			route,
			id: node.route_id().to_string(),
			pathname: chain.pathname_at(index),
			params: share_with(previous.map(|p| &p.params), params),
			search,
			context,
			status: if error.is_some() {
				MatchStatus::Error
			} else {
				MatchStatus::Pending
			},
			error,
		}));
	}

	Ok(Resolution { matches, reused })
}

fn raw_params(inherited: &ParamMap, captured: &[(String, String)]) -> ParamMap {
	let mut raw = inherited.clone();
	for (name, value) in captured {
		raw.insert(name.clone(), value.clone().into());
	}
	raw
}
