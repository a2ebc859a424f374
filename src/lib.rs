//! # Waymark
//!
//! A client-side application router. A route tree is compiled once; URLs are
//! matched against it, params and search values are validated per route, and
//! navigations run guard and loader hooks before committing to history.
//!
//! ## Feature Flags
//!
//! - `router` (default) - navigation state machine, router store and history
//!   backends from `waymark-router`
//!
//! Without `router` only matching, codecs and resolution from `waymark-core`
//! are exported.
//!
//! ## Quick Example
//!
//! ```rust
//! use waymark::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tree = RouteTree::new(Route::root().children([
//! 	Route::new("/"),
//! 	Route::new("posts").children([
//! 		Route::new("/").before_navigate(|_| async {
//! 			Ok(Flow::redirect(NavigateOptions::to("/posts/$slug").params([("slug", "latest")])))
//! 		}),
//! 		Route::new("$slug"),
//! 	]),
//! ]))
//! .unwrap();
//!
//! let router = Router::builder(tree).build().unwrap();
//! router.load().await.unwrap();
//! router.navigate(NavigateOptions::to("/posts")).await.unwrap();
//!
//! assert_eq!(router.location().pathname(), "/posts/latest");
//! # }
//! ```

pub use waymark_core::*;

#[cfg(feature = "router")]
pub use waymark_router::*;

/// Commonly used types.
pub mod prelude {
	pub use waymark_core::{
		Flow, HookContext, HookError, Location, MatchStatus, NavigateOptions, ParamMap, Route,
		RouteMatch, RouteTree, RouterError, RouterResult, SearchMap, ValidationError, to_map,
	};

	#[cfg(feature = "router")]
	pub use waymark_router::{
		History, MemoryHistory, NavigationOutcome, Router, RouterOptions, RouterSnapshot,
	};
}
