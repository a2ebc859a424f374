//! Integration tests for loader control flow and invalidation.
//!
//! These tests verify:
//! 1. A `before_load` redirect or cancel behaves like a guard's
//! 2. `invalidate` re-runs hooks for the committed location

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::{fixture, rstest};
use serde_json::json;
use waymark_core::{Flow, MatchStatus, NavigateOptions, Route, RouteTree, to_map};
use waymark_router::{History, MemoryHistory, NavigationOutcome, Router};

/// Routes whose loaders redirect, cancel or count their runs.
struct LoaderApp {
	router: Router,
	history: Arc<MemoryHistory>,
	dashboard_loads: Arc<AtomicUsize>,
}

fn loader_app(history: MemoryHistory) -> LoaderApp {
	let dashboard_loads = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&dashboard_loads);
	let tree = RouteTree::new(Route::root().children([
		Route::new("/"),
		Route::new("login"),
		Route::new("account").before_load(|_| async {
			Ok(Flow::redirect(NavigateOptions::to("/login").search([("next", "/account")])))
		}),
		Route::new("maintenance").before_load(|_| async { Ok(Flow::Cancel) }),
		Route::new("dashboard").before_load(move |_| {
			let run = counter.fetch_add(1, Ordering::SeqCst) + 1;
			async move { Ok(Flow::Proceed(to_map([("run", run)]))) }
		}),
	]))
	.unwrap();

	let history = Arc::new(history);
	let router = Router::builder(tree).history(history.clone()).build().unwrap();
	LoaderApp {
		router,
		history,
		dashboard_loads,
	}
}

#[fixture]
fn app() -> LoaderApp {
	loader_app(MemoryHistory::new("/"))
}

#[rstest]
#[tokio::test]
async fn test_loader_redirect(app: LoaderApp) {
	// Arrange
	app.router.load().await.unwrap();

	// Act
	let outcome = app.router.navigate(NavigateOptions::to("/account")).await.unwrap();

	// Assert
	assert_eq!(
		outcome,
		NavigationOutcome::Committed {
			href: "/login?next=%2Faccount".to_string(),
			redirects: 1,
		}
	);
	let state = app.router.state();
	assert_eq!(state.leaf().unwrap().id, "/login");
	assert!(state.matches.iter().all(|m| m.status == MatchStatus::Resolved));
	assert_eq!(app.history.entries(), vec!["/", "/login?next=%2Faccount"]);
	assert!(app.router.pending().is_none());
}

#[rstest]
#[tokio::test]
async fn test_loader_cancel_keeps_state(app: LoaderApp) {
	app.router.load().await.unwrap();
	let before = app.router.state();

	let outcome = app.router.navigate(NavigateOptions::to("/maintenance")).await.unwrap();

	assert_eq!(outcome, NavigationOutcome::Cancelled);
	assert!(Arc::ptr_eq(&before, &app.router.state()));
	assert_eq!(app.history.entries(), vec!["/"]);
	assert!(app.router.pending().is_none());
}

#[rstest]
#[tokio::test]
async fn test_loader_cancel_reverts_pop() {
	let app = loader_app(MemoryHistory::with_entries(["/maintenance", "/"], 1));
	app.router.load().await.unwrap();
	let mut events = app.history.subscribe();

	assert!(app.history.back());
	let outcome = app.router.handle_pop(events.recv().await.unwrap()).await.unwrap();

	assert_eq!(outcome, NavigationOutcome::Cancelled);
	assert_eq!(app.history.index(), 1);
	assert_eq!(app.router.location().pathname(), "/");
}

#[rstest]
#[tokio::test]
async fn test_loader_redirect_replaces_popped_entry() {
	let app = loader_app(MemoryHistory::with_entries(["/account", "/"], 1));
	app.router.load().await.unwrap();
	let mut events = app.history.subscribe();

	assert!(app.history.back());
	app.router.handle_pop(events.recv().await.unwrap()).await.unwrap();

	assert_eq!(app.history.entries(), vec!["/login?next=%2Faccount", "/"]);
	assert_eq!(app.history.index(), 0);
	assert_eq!(app.router.location().pathname(), "/login");
}

#[rstest]
#[tokio::test]
async fn test_invalidate_reruns_loaders(app: LoaderApp) {
	// Arrange
	app.router.load().await.unwrap();
	app.router.navigate(NavigateOptions::to("/dashboard")).await.unwrap();
	app.router
		.navigate(NavigateOptions::to("/dashboard").replace(true))
		.await
		.unwrap();
	assert_eq!(app.dashboard_loads.load(Ordering::SeqCst), 1);
	let before = app.router.state();

	// Act
	let outcome = app.router.invalidate().await.unwrap();

	// Assert
	assert!(outcome.is_committed());
	assert_eq!(app.dashboard_loads.load(Ordering::SeqCst), 2);
	let after = app.router.state();
	let leaf = after.leaf().unwrap();
	assert!(!Arc::ptr_eq(before.leaf().unwrap(), leaf));
	assert_eq!(leaf.context["run"], json!(2));
	assert_eq!(leaf.status, MatchStatus::Resolved);
	assert_eq!(app.history.entries(), vec!["/", "/dashboard"]);
}
