//! Router store.
//!
//! Holds the committed location and match chain, the pending navigation
//! and the generation counter. Committed state is published through a
//! `tokio::sync::watch` channel so readers always see a whole snapshot,
//! and callback listeners fire exactly once per commit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use waymark_core::{Location, RouteMatch};

/// Committed router state.
#[derive(Debug, Clone)]
pub struct RouterSnapshot {
	/// The committed location.
	pub location: Arc<Location>,
	/// The committed match chain, root first.
	pub matches: Vec<Arc<RouteMatch>>,
	/// Number of commits so far; zero before the first one.
	pub commit: u64,
}

impl RouterSnapshot {
	/// The deepest committed match.
	pub fn leaf(&self) -> Option<&Arc<RouteMatch>> {
		self.matches.last()
	}
}

/// Step an in-flight navigation has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationPhase {
	/// Computing the target location and matches.
	Resolving,
	/// Running `before_navigate` guards.
	Guarding,
	/// Running `before_load` hooks.
	Loading,
	/// Writing to history.
	Committing,
}

/// The navigation currently allowed to commit.
#[derive(Debug, Clone)]
pub struct PendingNavigation {
	/// Generation token of the navigation.
	pub generation: u64,
	/// Target location, once known.
	pub location: Option<Arc<Location>>,
	/// Target matches, once resolved.
	pub matches: Vec<Arc<RouteMatch>>,
	/// Current phase.
	pub phase: NavigationPhase,
}

/// Handle returned by [`RouterStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&RouterSnapshot) + Send + Sync>;

/// Observable per-router state.
pub struct RouterStore {
	state: watch::Sender<Arc<RouterSnapshot>>,
	// Also serializes generation bumps against commits.
	pending: Mutex<Option<PendingNavigation>>,
	generation: AtomicU64,
	listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
	next_listener: AtomicU64,
	disposed: AtomicBool,
}

impl RouterStore {
	/// Creates a store holding an uncommitted initial location.
	pub fn new(location: Location) -> Self {
		let snapshot = RouterSnapshot {
			location: Arc::new(location),
			matches: Vec::new(),
			commit: 0,
		};
		let (state, _) = watch::channel(Arc::new(snapshot));

		Self {
			state,
			pending: Mutex::new(None),
			generation: AtomicU64::new(0),
			listeners: Mutex::new(Vec::new()),
			next_listener: AtomicU64::new(1),
			disposed: AtomicBool::new(false),
		}
	}

	/// The committed state.
	pub fn snapshot(&self) -> Arc<RouterSnapshot> {
		Arc::clone(&self.state.borrow())
	}

	/// A receiver that observes every commit.
	pub fn watch(&self) -> watch::Receiver<Arc<RouterSnapshot>> {
		self.state.subscribe()
	}

	/// The in-flight navigation, if any.
	pub fn pending(&self) -> Option<PendingNavigation> {
		self.pending.lock().clone()
	}

	/// The latest generation token.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::SeqCst)
	}

	/// Returns true if `generation` is still the latest token.
	pub fn is_current(&self, generation: u64) -> bool {
		!self.is_disposed() && self.generation() == generation
	}

	/// Starts a navigation, superseding any in-flight one.
	///
	/// Returns the new generation token.
	pub fn begin(&self) -> u64 {
		let mut pending = self.pending.lock();
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		*pending = Some(PendingNavigation {
			generation,
			location: None,
			matches: Vec::new(),
			phase: NavigationPhase::Resolving,
		});
		generation
	}

	/// Updates the pending navigation if it still belongs to `generation`.
	pub fn update_pending(&self, generation: u64, update: impl FnOnce(&mut PendingNavigation)) {
		let mut pending = self.pending.lock();
		if let Some(navigation) = pending.as_mut().filter(|p| p.generation == generation) {
			update(navigation);
		}
	}

	/// Clears the pending navigation if it still belongs to `generation`.
	pub fn clear_pending(&self, generation: u64) {
		let mut pending = self.pending.lock();
		if pending.as_ref().is_some_and(|p| p.generation == generation) {
			*pending = None;
		}
	}

	/// Atomically publishes a new committed state.
	///
	/// Returns `None` without touching the state if `generation` has been
	/// superseded or the store was disposed.
	pub fn commit(
		&self,
		generation: u64,
		location: Arc<Location>,
		matches: Vec<Arc<RouteMatch>>,
	) -> Option<Arc<RouterSnapshot>> {
		let snapshot = {
			let mut pending = self.pending.lock();
			if !self.is_current(generation) {
				return None;
			}
			let snapshot = Arc::new(RouterSnapshot {
				location,
				matches,
				commit: self.state.borrow().commit + 1,
			});
			self.state.send_replace(Arc::clone(&snapshot));
			*pending = None;
			snapshot
		};

		let listeners: Vec<Listener> = self
			.listeners
			.lock()
			.iter()
			.map(|(_, listener)| Arc::clone(listener))
			.collect();
		for listener in listeners {
			listener(&snapshot);
		}
		Some(snapshot)
	}

	/// Registers a callback invoked once per commit.
	pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
	where
		F: Fn(&RouterSnapshot) + Send + Sync + 'static,
	{
		let id = SubscriptionId(self.next_listener.fetch_add(1, Ordering::Relaxed));
		self.listeners.lock().push((id, Arc::new(listener)));
		id
	}

	/// Removes a callback, returning false if it was not registered.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let mut listeners = self.listeners.lock();
		let before = listeners.len();
		listeners.retain(|(listener_id, _)| *listener_id != id);
		listeners.len() != before
	}

	/// Number of registered callbacks.
	pub fn listener_count(&self) -> usize {
		self.listeners.lock().len()
	}

	/// Cancels the in-flight navigation and drops every listener.
	pub fn dispose(&self) {
		let mut pending = self.pending.lock();
		self.disposed.store(true, Ordering::SeqCst);
		self.generation.fetch_add(1, Ordering::SeqCst);
		*pending = None;
		drop(pending);
		self.listeners.lock().clear();
	}

	/// Returns true once [`dispose`](Self::dispose) was called.
	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::SeqCst)
	}
}

impl std::fmt::Debug for RouterStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouterStore")
			.field("location", &self.snapshot().location.href())
			.field("generation", &self.generation())
			.field("listeners", &self.listener_count())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::AtomicUsize;

	fn store() -> RouterStore {
		RouterStore::new(Location::parse("/"))
	}

	#[rstest]
	fn test_commit_publishes_and_notifies_once() {
		let store = store();
		let calls = Arc::new(AtomicUsize::new(0));
		let seen = Arc::clone(&calls);
		store.subscribe(move |_| {
			seen.fetch_add(1, Ordering::SeqCst);
		});
		let mut rx = store.watch();

		let generation = store.begin();
		let snapshot = store
			.commit(generation, Arc::new(Location::parse("/posts")), Vec::new())
			.unwrap();

		assert_eq!(snapshot.commit, 1);
		assert_eq!(store.snapshot().location.href(), "/posts");
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(rx.has_changed().unwrap());
		assert_eq!(rx.borrow_and_update().location.href(), "/posts");
		assert!(store.pending().is_none());
	}

	#[rstest]
	fn test_superseded_generation_cannot_commit() {
		let store = store();
		let first = store.begin();
		let second = store.begin();

		assert!(store.commit(first, Arc::new(Location::parse("/a")), Vec::new()).is_none());
		assert_eq!(store.snapshot().location.href(), "/");
		assert_eq!(store.pending().unwrap().generation, second);

		assert!(store.commit(second, Arc::new(Location::parse("/b")), Vec::new()).is_some());
		assert_eq!(store.snapshot().location.href(), "/b");
	}

	#[rstest]
	fn test_pending_updates_follow_generation() {
		let store = store();
		let first = store.begin();
		store.update_pending(first, |p| p.phase = NavigationPhase::Guarding);
		assert_eq!(store.pending().unwrap().phase, NavigationPhase::Guarding);

		let second = store.begin();
		store.update_pending(first, |p| p.phase = NavigationPhase::Loading);
		store.clear_pending(first);
		let pending = store.pending().unwrap();
		assert_eq!(pending.generation, second);
		assert_eq!(pending.phase, NavigationPhase::Resolving);

		store.clear_pending(second);
		assert!(store.pending().is_none());
	}

	#[rstest]
	fn test_unsubscribe() {
		let store = store();
		let id = store.subscribe(|_| {});
		assert_eq!(store.listener_count(), 1);
		assert!(store.unsubscribe(id));
		assert!(!store.unsubscribe(id));
		assert_eq!(store.listener_count(), 0);
	}

	#[rstest]
	fn test_dispose_cancels_and_clears() {
		let store = store();
		store.subscribe(|_| {});
		let generation = store.begin();

		store.dispose();

		assert!(store.is_disposed());
		assert!(store.pending().is_none());
		assert_eq!(store.listener_count(), 0);
		assert!(store.commit(generation, Arc::new(Location::parse("/x")), Vec::new()).is_none());
	}
}
