//! Guard and loader hooks.
//!
//! Hooks never unwind to redirect or cancel a navigation. They return a
//! [`Flow`] and the navigation state machine matches on it.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::location::{Location, NavigateOptions};
use crate::params::{ContextMap, ParamMap, SearchMap};

/// Control value returned by guard and loader hooks.
#[derive(Debug, Clone)]
pub enum Flow<T = ()> {
	/// Continue the navigation with this value.
	Proceed(T),
	/// Abandon the navigation and start a new one for the target.
	Redirect(Box<NavigateOptions>),
	/// Abandon the navigation and keep the committed state.
	Cancel,
}

impl<T> Flow<T> {
	/// Redirects to `target`.
	pub fn redirect(target: NavigateOptions) -> Self {
		Self::Redirect(Box::new(target))
	}

	/// Returns true for [`Flow::Proceed`].
	pub fn is_proceed(&self) -> bool {
		matches!(self, Self::Proceed(_))
	}
}

impl Flow<()> {
	/// Continues the navigation.
	pub fn proceed() -> Self {
		Self::Proceed(())
	}
}

impl Flow<ContextMap> {
	/// Continues the navigation without adding route context.
	pub fn empty() -> Self {
		Self::Proceed(ContextMap::new())
	}
}

/// Everything a hook sees for its own route.
#[derive(Debug, Clone)]
pub struct HookContext {
	/// Id of the route the hook belongs to.
	pub route_id: String,
	/// Validated params, including those inherited from ancestors.
	pub params: Arc<ParamMap>,
	/// Validated search, merged from the root down to this route.
	pub search: Arc<SearchMap>,
	/// Router context supplied at construction, identical for every hook.
	pub context: Arc<Value>,
	/// Route context accumulated from the ancestors' `before_load` hooks.
	pub route_context: Arc<ContextMap>,
	/// The location being navigated to.
	pub location: Arc<Location>,
}

/// A hook failed with an error rather than a redirect or cancel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
	/// What went wrong.
	pub message: String,
}

impl HookError {
	/// Creates a hook error.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

impl From<String> for HookError {
	fn from(message: String) -> Self {
		Self::new(message)
	}
}

impl From<&str> for HookError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}

/// Result of a `before_navigate` guard.
pub type GuardResult = Result<Flow, HookError>;

/// Result of a `before_load` hook; the proceed value is merged into the
/// route context.
pub type LoadResult = Result<Flow<ContextMap>, HookError>;

/// A boxed `before_navigate` guard.
pub type GuardFn = Arc<dyn Fn(HookContext) -> BoxFuture<'static, GuardResult> + Send + Sync>;

/// A boxed `before_load` hook.
pub type LoadFn = Arc<dyn Fn(HookContext) -> BoxFuture<'static, LoadResult> + Send + Sync>;
