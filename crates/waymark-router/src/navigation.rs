//! Navigation state machine.
//!
//! A navigation runs `idle -> pending -> committed | cancelled | errored`,
//! restarting from `pending` on every redirect. Each run holds a generation
//! token from the store and re-checks it after every suspension point: after
//! each guard, after each loader and after the history write. A navigation
//! whose token is stale stops without touching the store, and undoes its
//! history write if it already made one. History writes and commits are
//! serialized, so the newest navigation always writes last.

use std::sync::Arc;

use waymark_core::{
	ContextMap, Flow, HookContext, Location, MatchStatus, Matcher, NavigateOptions, RouteMatch,
	RouterError, RouterResult, build_location, resolve_matches,
};
use waymark_core::sharing::share_with;

use crate::router::RouterInner;
use crate::store::NavigationPhase;

/// What started a navigation and how it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationKind {
	/// Push a new history entry.
	Push,
	/// Replace the current history entry.
	Replace,
	/// The history already moved by `delta`; nothing is written.
	Pop {
		/// Distance the history moved.
		delta: isize,
	},
	/// Initial resolution of the history's current entry.
	Load,
	/// Re-runs every hook for the committed location; nothing is written.
	Invalidate,
}

impl NavigationKind {
	/// How the navigation continues after a redirect.
	///
	/// A redirect away from a popped, loaded or invalidated entry replaces
	/// it, so the redirecting location never stays in history.
	fn after_redirect(self, target: &NavigateOptions) -> Self {
		match self {
			Self::Push if !target.replace => Self::Push,
			_ => Self::Replace,
		}
	}
}

/// How a navigation ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
	/// The target was committed to the store.
	Committed {
		/// Committed href, without basepath.
		href: String,
		/// Redirects followed on the way.
		redirects: usize,
	},
	/// A hook cancelled; the committed state is unchanged.
	Cancelled,
	/// A newer navigation took over before this one could commit.
	Superseded,
}

impl NavigationOutcome {
	/// Returns true for [`NavigationOutcome::Committed`].
	pub fn is_committed(&self) -> bool {
		matches!(self, Self::Committed { .. })
	}
}

/// Where a navigation is going.
#[derive(Debug, Clone)]
pub(crate) enum Target {
	/// A request resolved against the committed state.
	Options(NavigateOptions),
	/// An href read from history, basepath included.
	Href(String),
}

/// A history write made by a commit.
#[derive(Debug, Clone, Copy)]
enum Write {
	Push,
	Replace,
}

/// Clears the pending navigation, and reverts a still current pop, unless
/// the navigation committed or was superseded. Runs on drop so abandoned
/// navigation futures clean up as well.
struct Cleanup<'a> {
	inner: &'a RouterInner,
	generation: u64,
	kind: NavigationKind,
	armed: bool,
}

impl Cleanup<'_> {
	fn disarm(&mut self) {
		self.armed = false;
	}
}

impl Drop for Cleanup<'_> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}
		let current = self.inner.store.is_current(self.generation);
		self.inner.store.clear_pending(self.generation);
		if let (NavigationKind::Pop { delta }, true) = (self.kind, current) {
			tracing::debug!(delta, "reverting popped history entry");
			self.inner.history.rewind(-delta);
		}
	}
}

/// Result of running one hook phase.
enum Step {
	Proceed(Vec<Arc<RouteMatch>>),
	Redirect(Box<NavigateOptions>),
	Cancel,
	Superseded,
}

struct Navigation<'a> {
	inner: &'a RouterInner,
	generation: u64,
}

/// Runs a navigation to completion.
pub(crate) async fn run(
	inner: &RouterInner,
	kind: NavigationKind,
	target: Target,
) -> RouterResult<NavigationOutcome> {
	if inner.store.is_disposed() {
		return Err(RouterError::Disposed);
	}

	let navigation = Navigation {
		inner,
		generation: inner.store.begin(),
	};
	tracing::debug!(generation = navigation.generation, ?kind, "navigation started");
	let mut cleanup = Cleanup {
		inner,
		generation: navigation.generation,
		kind,
		armed: true,
	};

	let result = navigation.drive(kind, target).await;

	if let Ok(NavigationOutcome::Committed { .. } | NavigationOutcome::Superseded) = &result {
		cleanup.disarm();
	}
	drop(cleanup);
	if let Err(error) = &result {
		tracing::warn!(generation = navigation.generation, %error, "navigation failed");
	}
	result
}

impl Navigation<'_> {
	fn is_current(&self) -> bool {
		self.inner.store.is_current(self.generation)
	}

	fn set_phase(&self, phase: NavigationPhase) {
		self.inner.store.update_pending(self.generation, |p| p.phase = phase);
	}

	async fn drive(&self, mut kind: NavigationKind, target: Target) -> RouterResult<NavigationOutcome> {
		let inner = self.inner;
		let snapshot = inner.store.snapshot();
		let mut location = match target {
			Target::Href(href) => {
				Location::parse(&inner.options.strip_basepath(&href)).shared_with(&snapshot.location)
			}
			Target::Options(options) => build_location(
				&inner.tree,
				&snapshot.location,
				&snapshot.matches,
				&options,
				inner.options.trailing_slash,
			)?,
		};
		let mut redirects = 0;

		loop {
			if !self.is_current() {
				return Ok(self.superseded());
			}

			let target = Arc::new(location);
			tracing::debug!(generation = self.generation, href = target.href(), "resolving");
			self.inner.store.update_pending(self.generation, |p| {
				p.location = Some(Arc::clone(&target));
				p.phase = NavigationPhase::Resolving;
			});

			let committed = inner.store.snapshot();
			let matcher = Matcher::new(&inner.tree).case_sensitive(inner.options.case_sensitive);
			let resolution = resolve_matches(&matcher, &target, &committed.matches)?;
			if let Some((_, error)) = resolution.first_error() {
				return Err(error.clone());
			}
			let reused = match kind {
				NavigationKind::Invalidate => 0,
				_ => resolution.reused,
			};
			let matches = resolution.matches;
			self.inner.store.update_pending(self.generation, |p| {
				p.matches = matches.clone();
				p.phase = NavigationPhase::Guarding;
			});

			let step = match self.run_guards(&target, matches, reused).await? {
				Step::Proceed(matches) => {
					self.set_phase(NavigationPhase::Loading);
					self.run_loaders(&target, matches, reused).await?
				}
				other => other,
			};

			let redirect = match step {
				Step::Proceed(matches) => return self.commit(kind, target, matches, redirects).await,
				Step::Cancel => {
					tracing::info!(generation = self.generation, href = target.href(), "navigation cancelled");
					return Ok(NavigationOutcome::Cancelled);
				}
				Step::Superseded => return Ok(self.superseded()),
				Step::Redirect(redirect) => redirect,
			};

			redirects += 1;
			let pending_matches = inner
				.store
				.pending()
				.filter(|p| p.generation == self.generation)
				.map(|p| p.matches)
				.unwrap_or_default();
			location = build_location(
				&inner.tree,
				&target,
				&pending_matches,
				&redirect,
				inner.options.trailing_slash,
			)?;
			if redirects > inner.options.max_redirects {
				tracing::warn!(
					limit = inner.options.max_redirects,
					href = location.href(),
					"redirect limit exceeded"
				);
				return Err(RouterError::RedirectLoop {
					limit: inner.options.max_redirects,
					href: location.href().to_string(),
				});
			}
			tracing::info!(
				generation = self.generation,
				from = target.href(),
				to = location.href(),
				redirects,
				"navigation redirected"
			);
			kind = kind.after_redirect(&redirect);
		}
	}

	fn superseded(&self) -> NavigationOutcome {
		tracing::debug!(generation = self.generation, "navigation superseded");
		NavigationOutcome::Superseded
	}

	fn hook_context(&self, target: &Arc<Location>, m: &RouteMatch, route_context: Arc<ContextMap>) -> HookContext {
		HookContext {
			route_id: m.id.clone(),
			params: Arc::clone(&m.params),
			search: Arc::clone(&m.search),
			context: Arc::clone(&self.inner.context),
			route_context,
			location: Arc::clone(target),
		}
	}

	/// Marks the match at `index` in the pending state.
	fn mark(&self, matches: &mut [Arc<RouteMatch>], index: usize, status: MatchStatus, error: Option<RouterError>) {
		let mut updated = matches[index].with_status(status);
		updated.error = error;
		matches[index] = Arc::new(updated);
		let snapshot = matches.to_vec();
		self.inner.store.update_pending(self.generation, |p| p.matches = snapshot);
	}

	/// Runs `before_navigate` guards of the fresh matches, root first.
	async fn run_guards(
		&self,
		target: &Arc<Location>,
		mut matches: Vec<Arc<RouteMatch>>,
		reused: usize,
	) -> RouterResult<Step> {
		for index in reused..matches.len() {
			let node = self.inner.tree.node(matches[index].route);
			let Some(guard) = node.options().before_navigate() else {
				continue;
			};

			let current = &matches[index];
			let ctx = self.hook_context(target, current, Arc::clone(&current.context));
			let result = guard(ctx).await;
			if !self.is_current() {
				return Ok(Step::Superseded);
			}

			match result {
				Ok(Flow::Proceed(())) => {}
				Ok(Flow::Redirect(redirect)) => {
					tracing::debug!(route_id = node.route_id(), "guard redirected");
					self.mark(&mut matches, index, MatchStatus::Redirected, None);
					return Ok(Step::Redirect(redirect));
				}
				Ok(Flow::Cancel) => {
					tracing::debug!(route_id = node.route_id(), "guard cancelled");
					return Ok(Step::Cancel);
				}
				Err(e) => {
					let error = RouterError::HookFailed {
						route_id: node.route_id().to_string(),
						message: e.message,
					};
					self.mark(&mut matches, index, MatchStatus::Error, Some(error.clone()));
					return Err(error);
				}
			}
		}
		Ok(Step::Proceed(matches))
	}

	/// Runs `before_load` hooks of the fresh matches, root first, threading
	/// route context down the chain.
	async fn run_loaders(
		&self,
		target: &Arc<Location>,
		mut matches: Vec<Arc<RouteMatch>>,
		reused: usize,
	) -> RouterResult<Step> {
		for index in reused..matches.len() {
			let node = self.inner.tree.node(matches[index].route);
			let inherited = match index {
				0 => Arc::new(ContextMap::new()),
				_ => Arc::clone(&matches[index - 1].context),
			};

			let context = match node.options().before_load() {
				None => inherited,
				Some(hook) => {
					let ctx = self.hook_context(target, &matches[index], Arc::clone(&inherited));
					let result = hook(ctx).await;
					if !self.is_current() {
						return Ok(Step::Superseded);
					}

					match result {
						Ok(Flow::Proceed(added)) if added.is_empty() => inherited,
						Ok(Flow::Proceed(added)) => {
							let mut merged = (*inherited).clone();
							merged.extend(added);
							Arc::new(merged)
						}
						Ok(Flow::Redirect(redirect)) => {
							tracing::debug!(route_id = node.route_id(), "loader redirected");
							self.mark(&mut matches, index, MatchStatus::Redirected, None);
							return Ok(Step::Redirect(redirect));
						}
						Ok(Flow::Cancel) => {
							tracing::debug!(route_id = node.route_id(), "loader cancelled");
							return Ok(Step::Cancel);
						}
						Err(e) => {
							let error = RouterError::HookFailed {
								route_id: node.route_id().to_string(),
								message: e.message,
							};
							self.mark(&mut matches, index, MatchStatus::Error, Some(error.clone()));
							return Err(error);
						}
					}
				}
			};

			let previous = &matches[index];
			let context = share_with(Some(&previous.context), (*context).clone());
			matches[index] = Arc::new(RouteMatch {
				context,
				status: MatchStatus::Resolved,
				..(**previous).clone()
			});
		}
		Ok(Step::Proceed(matches))
	}

	/// Writes history and publishes the new state.
	async fn commit(
		&self,
		kind: NavigationKind,
		target: Arc<Location>,
		matches: Vec<Arc<RouteMatch>>,
		redirects: usize,
	) -> RouterResult<NavigationOutcome> {
		let inner = self.inner;
		self.set_phase(NavigationPhase::Committing);
		let _writes = inner.history_writes.lock().await;
		if !self.is_current() {
			return Ok(self.superseded());
		}

		let href = inner.options.join_basepath(target.href());
		let write = match kind {
			NavigationKind::Push => Some(Write::Push),
			NavigationKind::Replace => Some(Write::Replace),
			NavigationKind::Load if redirects > 0 || inner.history.location() != href => {
				Some(Write::Replace)
			}
			NavigationKind::Pop { .. } | NavigationKind::Load | NavigationKind::Invalidate => None,
		};
		if let Some(write) = write {
			let previous = inner.history.location();
			let written = match write {
				Write::Push => inner.history.push(&href).await,
				Write::Replace => inner.history.replace(&href).await,
			};
			written.map_err(|e| RouterError::History(e.to_string()))?;
			if !self.is_current() {
				self.undo(write, &previous).await;
				return Ok(self.superseded());
			}
		}

		let committed_href = target.href().to_string();
		match inner.store.commit(self.generation, target, matches) {
			Some(snapshot) => {
				tracing::info!(
					generation = self.generation,
					href = %committed_href,
					commit = snapshot.commit,
					redirects,
					"navigation committed"
				);
				Ok(NavigationOutcome::Committed {
					href: committed_href,
					redirects,
				})
			}
			None => Ok(self.superseded()),
		}
	}
}

impl Navigation<'_> {
	/// Reverts a history write whose navigation was superseded meanwhile.
	async fn undo(&self, write: Write, previous: &str) {
		tracing::debug!(generation = self.generation, ?write, previous, "reverting superseded history write");
		match write {
			Write::Push => self.inner.history.rewind(-1),
			Write::Replace => {
				if let Err(error) = self.inner.history.replace(previous).await {
					tracing::warn!(%error, previous, "failed to revert superseded history write");
				}
			}
		}
	}
}
