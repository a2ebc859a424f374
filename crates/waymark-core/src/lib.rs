//! Route resolution core for waymark.
//!
//! This crate holds everything that is synchronous and runtime-free:
//!
//! - [`route`] and [`tree`]: route declarations and the compiled arena tree
//! - [`pattern`] and [`matcher`]: path patterns and scored chain matching
//! - [`params`] and [`search`]: param/search validation and the query codec
//! - [`location`]: locations, navigation requests and target building
//! - [`resolve`]: match chains with structural sharing and reuse
//! - [`hooks`]: the guard and loader hook contract
//!
//! The navigation state machine lives in `waymark-router`.
//!
//! ## Example
//!
//! ```
//! use waymark_core::{Location, Matcher, Route, RouteTree, resolve_matches};
//!
//! let tree = RouteTree::new(Route::root().children([
//! 	Route::new("posts").children([Route::new("$slug")]),
//! ]))
//! .unwrap();
//!
//! let location = Location::parse("/posts/tanner?page=2");
//! let resolution = resolve_matches(&Matcher::new(&tree), &location, &[]).unwrap();
//! let leaf = resolution.leaf().unwrap();
//!
//! assert_eq!(leaf.id, "/posts/$slug");
//! assert_eq!(leaf.params["slug"], "tanner");
//! assert_eq!(leaf.search["page"], 2);
//! ```

pub mod error;
pub mod hooks;
pub mod location;
pub mod matcher;
pub mod params;
pub mod pattern;
pub mod resolve;
pub mod route;
pub mod search;
pub mod sharing;
pub mod tree;

pub use error::{RouterError, RouterResult, ValidationError, ValidationTarget};
pub use hooks::{
	Flow, GuardFn, GuardResult, HookContext, HookError, LoadFn, LoadResult,
};
pub use location::{Location, NavigateOptions, TrailingSlash, build_location};
pub use matcher::{Matcher, RouteChain};
pub use params::{
	ContextMap, MapUpdater, ParamMap, ParamsUpdate, ParamsValidator, SearchMap, SearchUpdate,
	SearchValidator, to_map,
};
pub use pattern::{PathPattern, PatternKind, SPLAT_PARAM, Segment, interpolate_path, resolve_path};
pub use resolve::{MatchStatus, Resolution, RouteMatch, resolve_matches};
pub use route::{Route, RouteOptions};
pub use search::{parse_search, stringify_search};
pub use sharing::replace_equal_deep;
pub use tree::{ROOT_ROUTE_ID, RouteId, RouteNode, RouteTree};
