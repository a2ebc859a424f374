//! Error types for route resolution and navigation.

use std::fmt;

/// Result type used throughout the router.
pub type RouterResult<T> = Result<T, RouterError>;

/// Which validator rejected its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationTarget {
	/// The route's param validator.
	Params,
	/// The route's search validator.
	Search,
}

impl fmt::Display for ValidationTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Params => f.write_str("params"),
			Self::Search => f.write_str("search"),
		}
	}
}

/// A param or search validator rejected its input.
///
/// Validators build this with [`ValidationError::new`]; the codec attaches the
/// route id and target before the error is stored on the offending match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{target} validation failed for route '{route_id}': {message}")]
pub struct ValidationError {
	/// Id of the route whose validator failed.
	pub route_id: String,
	/// Which validator failed.
	pub target: ValidationTarget,
	/// Message produced by the validator.
	pub message: String,
}

impl ValidationError {
	/// Creates an error carrying only a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			route_id: String::new(),
			target: ValidationTarget::Params,
			message: message.into(),
		}
	}

	/// Attributes this error to a route and validator.
	pub fn attach(mut self, route_id: &str, target: ValidationTarget) -> Self {
		self.route_id = route_id.to_string();
		self.target = target;
		self
	}
}

impl From<String> for ValidationError {
	fn from(message: String) -> Self {
		Self::new(message)
	}
}

impl From<&str> for ValidationError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}

/// Error type for router operations.
///
/// Redirects and cancellations are not errors; they are reported through
/// [`Flow`](crate::hooks::Flow) and the navigation outcome instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
	/// No route chain matches the pathname.
	#[error("Route not found: {0}")]
	NotFound(String),
	/// A param or search validator rejected its input.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// The redirect chain exceeded the configured bound.
	#[error("Redirect limit of {limit} exceeded while navigating to {href}")]
	RedirectLoop {
		/// Configured maximum number of redirects.
		limit: usize,
		/// Target of the redirect that crossed the limit.
		href: String,
	},
	/// A route path could not be compiled.
	#[error("Invalid route path '{path}': {reason}")]
	InvalidPattern {
		/// The offending path.
		path: String,
		/// Why it was rejected.
		reason: String,
	},
	/// Two routes resolved to the same id.
	#[error("Duplicate route id: {0}")]
	DuplicateRoute(String),
	/// A path template references a param that has no value.
	#[error("Missing parameter: {0}")]
	MissingParameter(String),
	/// A guard or loader hook returned an error.
	#[error("Hook failed on route '{route_id}': {message}")]
	HookFailed {
		/// Id of the route whose hook failed.
		route_id: String,
		/// Message produced by the hook.
		message: String,
	},
	/// The history backend rejected a push or replace.
	#[error("Navigation failed: {0}")]
	History(String),
	/// The router was disposed.
	#[error("Router has been disposed")]
	Disposed,
}

impl RouterError {
	/// Returns true for errors attached to a specific match.
	pub fn is_match_error(&self) -> bool {
		matches!(
			self,
			Self::NotFound(_) | Self::Validation(_) | Self::HookFailed { .. }
		)
	}
}
