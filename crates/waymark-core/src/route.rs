//! Route declarations.
//!
//! A [`Route`] is the declaration surface: a path, optional validators and
//! hooks, and owned children. Declarations are compiled into an immutable
//! [`RouteTree`](crate::tree::RouteTree) before use.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::ValidationError;
use crate::hooks::{GuardFn, GuardResult, HookContext, LoadFn, LoadResult};
use crate::params::{ParamMap, ParamsValidator, SearchMap, SearchValidator};

/// What a route contributes to the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RoutePath {
	/// The tree root.
	Root,
	/// A path pattern relative to the parent.
	Path(String),
	/// A pathless layout route identified by this id segment.
	Layout(String),
}

/// Validators and hooks attached to a route.
#[derive(Clone, Default)]
pub struct RouteOptions {
	pub(crate) params_validator: Option<ParamsValidator>,
	pub(crate) search_validator: Option<SearchValidator>,
	pub(crate) before_navigate: Option<GuardFn>,
	pub(crate) before_load: Option<LoadFn>,
}

impl RouteOptions {
	/// Returns the param validator, if any.
	pub fn params_validator(&self) -> Option<&ParamsValidator> {
		self.params_validator.as_ref()
	}

	/// Returns the search validator, if any.
	pub fn search_validator(&self) -> Option<&SearchValidator> {
		self.search_validator.as_ref()
	}

	/// Returns the `before_navigate` guard, if any.
	pub fn before_navigate(&self) -> Option<&GuardFn> {
		self.before_navigate.as_ref()
	}

	/// Returns the `before_load` hook, if any.
	pub fn before_load(&self) -> Option<&LoadFn> {
		self.before_load.as_ref()
	}
}

impl std::fmt::Debug for RouteOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouteOptions")
			.field("has_params_validator", &self.params_validator.is_some())
			.field("has_search_validator", &self.search_validator.is_some())
			.field("has_before_navigate", &self.before_navigate.is_some())
			.field("has_before_load", &self.before_load.is_some())
			.finish()
	}
}

/// A route declaration.
///
/// # Example
///
/// ```
/// use waymark_core::route::Route;
/// use waymark_core::tree::RouteTree;
///
/// let tree = RouteTree::new(Route::root().children([
/// 	Route::new("/"),
/// 	Route::new("posts").children([Route::new("$slug")]),
/// 	Route::new("u").children([Route::layout("_layout").children([Route::new("$username")])]),
/// ]))
/// .unwrap();
///
/// assert!(tree.lookup("/posts/$slug").is_some());
/// assert!(tree.lookup("/u/_layout/$username").is_some());
/// ```
#[derive(Clone)]
pub struct Route {
	pub(crate) path: RoutePath,
	pub(crate) options: RouteOptions,
	pub(crate) children: Vec<Route>,
}

impl Route {
	/// Declares the root route.
	pub fn root() -> Self {
		Self::with_path(RoutePath::Root)
	}

	/// Declares a route with a path relative to its parent.
	///
	/// `/` declares an index route.
	pub fn new(path: impl Into<String>) -> Self {
		Self::with_path(RoutePath::Path(path.into()))
	}

	/// Declares a pathless layout route.
	pub fn layout(id: impl Into<String>) -> Self {
		Self::with_path(RoutePath::Layout(id.into()))
	}

	fn with_path(path: RoutePath) -> Self {
		Self {
			path,
			options: RouteOptions::default(),
			children: Vec::new(),
		}
	}

	/// Sets the param validator.
	///
	/// The validator receives the ancestors' validated params plus this
	/// route's raw captures; its output is merged over that input.
	pub fn validate_params<F>(mut self, validator: F) -> Self
	where
		F: Fn(&ParamMap) -> Result<ParamMap, ValidationError> + Send + Sync + 'static,
	{
		self.options.params_validator = Some(Arc::new(validator));
		self
	}

	/// Sets the search validator.
	///
	/// The validator receives the parent's validated search merged over the
	/// raw location search; its output is merged over that input.
	pub fn validate_search<F>(mut self, validator: F) -> Self
	where
		F: Fn(&SearchMap) -> Result<SearchMap, ValidationError> + Send + Sync + 'static,
	{
		self.options.search_validator = Some(Arc::new(validator));
		self
	}

	/// Sets the guard that runs before any loader.
	pub fn before_navigate<F, Fut>(mut self, guard: F) -> Self
	where
		F: Fn(HookContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = GuardResult> + Send + 'static,
	{
		let guard: GuardFn = Arc::new(move |ctx| guard(ctx).boxed());
		self.options.before_navigate = Some(guard);
		self
	}

	/// Sets the loader hook that runs after every guard passed.
	pub fn before_load<F, Fut>(mut self, hook: F) -> Self
	where
		F: Fn(HookContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = LoadResult> + Send + 'static,
	{
		let hook: LoadFn = Arc::new(move |ctx| hook(ctx).boxed());
		self.options.before_load = Some(hook);
		self
	}

	/// Appends child routes, keeping declaration order.
	pub fn children(mut self, children: impl IntoIterator<Item = Route>) -> Self {
		self.children.extend(children);
		self
	}

	/// Returns the validators and hooks.
	pub fn options(&self) -> &RouteOptions {
		&self.options
	}
}

impl std::fmt::Debug for Route {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Route")
			.field("path", &self.path)
			.field("options", &self.options)
			.field("children", &self.children.len())
			.finish()
	}
}
