//! Router handle.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, broadcast, watch};
use waymark_core::{
	Location, Matcher, NavigateOptions, Resolution, RouteMatch, RouteTree, RouterResult, SearchMap,
	build_location, resolve_matches,
};

use crate::config::{ConfigError, RouterOptions};
use crate::history::{History, HistoryEvent, MemoryHistory};
use crate::navigation::{self, NavigationKind, NavigationOutcome, Target};
use crate::store::{PendingNavigation, RouterSnapshot, RouterStore, SubscriptionId};

/// State shared by every clone of a [`Router`].
pub(crate) struct RouterInner {
	pub(crate) tree: RouteTree,
	pub(crate) options: RouterOptions,
	pub(crate) history: Arc<dyn History>,
	pub(crate) store: RouterStore,
	pub(crate) context: Arc<Value>,
	/// Held from a commit's history write until its store update.
	pub(crate) history_writes: Mutex<()>,
	shutdown: watch::Sender<bool>,
}

/// Builder for [`Router`].
pub struct RouterBuilder {
	tree: RouteTree,
	history: Option<Arc<dyn History>>,
	options: RouterOptions,
	context: Value,
}

impl RouterBuilder {
	/// Sets the history backend. Defaults to a [`MemoryHistory`] at `/`.
	pub fn history(mut self, history: Arc<dyn History>) -> Self {
		self.history = Some(history);
		self
	}

	/// Sets the router options.
	pub fn options(mut self, options: RouterOptions) -> Self {
		self.options = options;
		self
	}

	/// Sets the router context handed unchanged to every hook.
	pub fn context(mut self, context: Value) -> Self {
		self.context = context;
		self
	}

	/// Builds the router.
	///
	/// The store starts at the history's current entry but nothing is
	/// resolved until [`Router::load`] runs.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Invalid`] if the options fail validation.
	pub fn build(self) -> Result<Router, ConfigError> {
		self.options.validate()?;
		let history = self
			.history
			.unwrap_or_else(|| Arc::new(MemoryHistory::default()));
		let initial = Location::parse(&self.options.strip_basepath(&history.location()));
		let (shutdown, _) = watch::channel(false);

		Ok(Router {
			inner: Arc::new(RouterInner {
				tree: self.tree,
				options: self.options,
				history,
				store: RouterStore::new(initial),
				context: Arc::new(self.context),
				history_writes: Mutex::new(()),
				shutdown,
			}),
		})
	}
}

/// A router instance.
///
/// Cloning is cheap; every clone drives the same store.
///
/// # Example
///
/// ```
/// use waymark_core::{NavigateOptions, Route, RouteTree};
/// use waymark_router::Router;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let tree = RouteTree::new(Route::root().children([
/// 	Route::new("/"),
/// 	Route::new("posts").children([Route::new("$slug")]),
/// ]))
/// .unwrap();
/// let router = Router::builder(tree).build().unwrap();
///
/// router.load().await.unwrap();
/// router
/// 	.navigate(NavigateOptions::to("/posts/$slug").params([("slug", "tanner")]))
/// 	.await
/// 	.unwrap();
///
/// assert_eq!(router.location().href(), "/posts/tanner");
/// # }
/// ```
#[derive(Clone)]
pub struct Router {
	inner: Arc<RouterInner>,
}

impl Router {
	/// Starts building a router over a compiled route tree.
	pub fn builder(tree: RouteTree) -> RouterBuilder {
		RouterBuilder {
			tree,
			history: None,
			options: RouterOptions::default(),
			context: Value::Null,
		}
	}

	/// Resolves the history's current entry and commits it.
	///
	/// History is only written if a hook redirected or the entry was not in
	/// canonical form.
	///
	/// # Errors
	///
	/// Returns the navigation error if the entry does not resolve.
	pub async fn load(&self) -> RouterResult<NavigationOutcome> {
		let href = self.inner.history.location();
		navigation::run(&self.inner, NavigationKind::Load, Target::Href(href)).await
	}

	/// Navigates to a target built from `options` and the committed state.
	///
	/// Redirects and cancellations are reported through the outcome.
	///
	/// # Errors
	///
	/// Returns [`RouterError::NotFound`](waymark_core::RouterError::NotFound),
	/// [`RouterError::Validation`](waymark_core::RouterError::Validation),
	/// [`RouterError::RedirectLoop`](waymark_core::RouterError::RedirectLoop)
	/// and hook or history failures. The committed state is unchanged on error.
	pub async fn navigate(&self, options: NavigateOptions) -> RouterResult<NavigationOutcome> {
		let kind = if options.replace {
			NavigationKind::Replace
		} else {
			NavigationKind::Push
		};
		navigation::run(&self.inner, kind, Target::Options(options)).await
	}

	/// Re-runs every guard and loader for the committed location and commits
	/// the result without writing history.
	///
	/// Matches are recreated even when unchanged, so hooks see fresh data.
	///
	/// # Errors
	///
	/// Same as [`navigate`](Self::navigate).
	pub async fn invalidate(&self) -> RouterResult<NavigationOutcome> {
		let href = self.inner.options.join_basepath(self.state().location.href());
		navigation::run(&self.inner, NavigationKind::Invalidate, Target::Href(href)).await
	}

	/// Handles a history pop event.
	///
	/// A cancelled or failed pop moves the history back where it was.
	pub async fn handle_pop(&self, event: HistoryEvent) -> RouterResult<NavigationOutcome> {
		tracing::debug!(href = %event.href, delta = event.delta, "history pop");
		navigation::run(
			&self.inner,
			NavigationKind::Pop { delta: event.delta },
			Target::Href(event.href),
		)
		.await
	}

	/// Returns a future that handles history pop events until the router is
	/// disposed or the history closes its channel.
	///
	/// The subscription is taken immediately, so events emitted before the
	/// future is first polled are not lost. Each pop runs on its own task,
	/// which lets a later pop supersede an earlier one.
	pub fn listen(&self) -> impl Future<Output = ()> + Send + 'static {
		let router = self.clone();
		let mut events = self.inner.history.subscribe();
		let mut shutdown = self.inner.shutdown.subscribe();

		async move {
			loop {
				tokio::select! {
					_ = shutdown.wait_for(|disposed| *disposed) => break,
					event = events.recv() => match event {
						Ok(event) => {
							let router = router.clone();
							tokio::spawn(async move {
								if let Err(error) = router.handle_pop(event).await {
									tracing::debug!(%error, "pop navigation failed");
								}
							});
						}
						Err(broadcast::error::RecvError::Lagged(skipped)) => {
							tracing::warn!(skipped, "history events lagged");
						}
						Err(broadcast::error::RecvError::Closed) => break,
					},
				}
			}
			tracing::debug!("history listener stopped");
		}
	}

	/// Builds the location `options` would navigate to.
	///
	/// # Errors
	///
	/// Returns [`RouterError::MissingParameter`](waymark_core::RouterError::MissingParameter)
	/// if the target lacks a param.
	pub fn build_location(&self, options: &NavigateOptions) -> RouterResult<Location> {
		let snapshot = self.inner.store.snapshot();
		build_location(
			&self.inner.tree,
			&snapshot.location,
			&snapshot.matches,
			options,
			self.inner.options.trailing_slash,
		)
	}

	/// The href, basepath included, that `options` would navigate to.
	///
	/// # Errors
	///
	/// Same as [`build_location`](Self::build_location).
	pub fn href(&self, options: &NavigateOptions) -> RouterResult<String> {
		let location = self.build_location(options)?;
		Ok(self.inner.options.join_basepath(location.href()))
	}

	/// Resolves an href against the tree without navigating.
	///
	/// Matches equal to committed ones are returned as the committed `Arc`s.
	///
	/// # Errors
	///
	/// Returns [`RouterError::NotFound`](waymark_core::RouterError::NotFound)
	/// if nothing matches. Validation failures are attached to the matches.
	pub fn match_route(&self, href: &str) -> RouterResult<Resolution> {
		let snapshot = self.state();
		let location = Location::parse(href).shared_with(&snapshot.location);
		let matcher = Matcher::new(&self.inner.tree).case_sensitive(self.inner.options.case_sensitive);
		resolve_matches(&matcher, &location, &snapshot.matches)
	}

	/// The committed state.
	pub fn state(&self) -> Arc<RouterSnapshot> {
		self.inner.store.snapshot()
	}

	/// The committed location.
	pub fn location(&self) -> Arc<Location> {
		Arc::clone(&self.state().location)
	}

	/// The committed match of a route, looked up by route id.
	pub fn route_match(&self, route_id: &str) -> Option<Arc<RouteMatch>> {
		self.state().matches.iter().find(|m| m.id == route_id).cloned()
	}

	/// The validated search committed for `from`, or for the leaf match when
	/// `from` is `None`.
	///
	/// Returns `None` if the route is not part of the committed chain.
	pub fn search(&self, from: Option<&str>) -> Option<Arc<SearchMap>> {
		let found = match from {
			Some(route_id) => self.route_match(route_id),
			None => self.state().leaf().cloned(),
		};
		found.map(|m| Arc::clone(&m.search))
	}

	/// Projects the committed search of `from` through `select`.
	pub fn select_search<T>(&self, from: Option<&str>, select: impl FnOnce(&SearchMap) -> T) -> Option<T> {
		self.search(from).map(|search| select(&search))
	}

	/// The in-flight navigation, if any.
	pub fn pending(&self) -> Option<PendingNavigation> {
		self.inner.store.pending()
	}

	/// Returns true while a navigation is in flight.
	pub fn is_loading(&self) -> bool {
		self.pending().is_some()
	}

	/// Registers a callback invoked once per commit.
	pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
	where
		F: Fn(&RouterSnapshot) + Send + Sync + 'static,
	{
		self.inner.store.subscribe(listener)
	}

	/// Removes a callback registered with [`subscribe`](Self::subscribe).
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		self.inner.store.unsubscribe(id)
	}

	/// A receiver observing every commit.
	pub fn watch(&self) -> watch::Receiver<Arc<RouterSnapshot>> {
		self.inner.store.watch()
	}

	/// Cancels the in-flight navigation, drops listeners and stops
	/// [`listen`](Self::listen). Later navigations fail with
	/// [`RouterError::Disposed`](waymark_core::RouterError::Disposed).
	pub fn dispose(&self) {
		self.inner.store.dispose();
		self.inner.shutdown.send_replace(true);
		tracing::info!("router disposed");
	}

	/// Returns true once the router was disposed.
	pub fn is_disposed(&self) -> bool {
		self.inner.store.is_disposed()
	}

	/// The compiled route tree.
	pub fn tree(&self) -> &RouteTree {
		&self.inner.tree
	}

	/// The router options.
	pub fn options(&self) -> &RouterOptions {
		&self.inner.options
	}

	/// The router context.
	pub fn context(&self) -> &Value {
		&self.inner.context
	}
}

impl std::fmt::Debug for Router {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Router")
			.field("routes", &self.inner.tree.len())
			.field("options", &self.inner.options)
			.field("store", &self.inner.store)
			.finish()
	}
}
