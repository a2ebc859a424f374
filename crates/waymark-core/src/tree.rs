//! Route tree arena.
//!
//! Declarations are flattened pre-order into a vector of [`RouteNode`]s.
//! Parents and children refer to each other by [`RouteId`] index, so the
//! tree has no ownership cycles and is immutable once built.

use std::collections::HashMap;

use crate::error::{RouterError, RouterResult};
use crate::pattern::{PathPattern, PatternKind};
use crate::route::{Route, RouteOptions, RoutePath};

/// Id string of the root route.
pub const ROOT_ROUTE_ID: &str = "__root__";

/// Stable index of a node in a [`RouteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(usize);

impl RouteId {
	/// The root node.
	pub const ROOT: RouteId = RouteId(0);

	/// Returns the arena index.
	pub fn index(self) -> usize {
		self.0
	}
}

/// One compiled route.
#[derive(Debug, Clone)]
pub struct RouteNode {
	id: RouteId,
	route_id: String,
	full_path: String,
	pattern: PathPattern,
	parent: Option<RouteId>,
	children: Vec<RouteId>,
	options: RouteOptions,
}

impl RouteNode {
	/// Arena index.
	pub fn id(&self) -> RouteId {
		self.id
	}

	/// Unique string id, e.g. `/posts/$slug`, `/u/_layout` or `/posts_/$postId/deep`.
	pub fn route_id(&self) -> &str {
		&self.route_id
	}

	/// URL template of this route, layouts skipped.
	pub fn full_path(&self) -> &str {
		&self.full_path
	}

	/// This route's own compiled pattern.
	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	/// The parent node, `None` for the root.
	pub fn parent(&self) -> Option<RouteId> {
		self.parent
	}

	/// Children in declaration order.
	pub fn children(&self) -> &[RouteId] {
		&self.children
	}

	/// Validators and hooks.
	pub fn options(&self) -> &RouteOptions {
		&self.options
	}

	/// Returns true for the root and pathless layout routes.
	pub fn is_pathless(&self) -> bool {
		matches!(self.pattern.kind(), PatternKind::Root | PatternKind::Pathless)
	}
}

/// An immutable, flattened route tree.
#[derive(Debug, Clone)]
pub struct RouteTree {
	nodes: Vec<RouteNode>,
	by_id: HashMap<String, RouteId>,
}

impl RouteTree {
	/// Compiles a declaration tree.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidPattern`] if the top-level declaration
	/// is not [`Route::root`], a root is nested, a layout id is malformed or
	/// a path fails to compile, and [`RouterError::DuplicateRoute`] if two
	/// routes resolve to the same id.
	pub fn new(root: Route) -> RouterResult<Self> {
		if root.path != RoutePath::Root {
			return Err(RouterError::InvalidPattern {
				path: String::new(),
				reason: "route tree must start at Route::root()".to_string(),
			});
		}

		let mut tree = Self {
			nodes: Vec::new(),
			by_id: HashMap::new(),
		};
		tree.insert(root, None)?;
		tracing::debug!(routes = tree.nodes.len(), "route tree built");
		Ok(tree)
	}

	fn insert(&mut self, route: Route, parent: Option<RouteId>) -> RouterResult<RouteId> {
		let (pattern, segment) = match &route.path {
			RoutePath::Root if parent.is_none() => (PathPattern::root(), None),
			RoutePath::Root => {
				return Err(RouterError::InvalidPattern {
					path: String::new(),
					reason: "root route cannot be nested".to_string(),
				});
			}
			RoutePath::Layout(id) => {
				if id.is_empty() || id.contains('/') {
					return Err(RouterError::InvalidPattern {
						path: id.clone(),
						reason: "layout id must be a single non-empty segment".to_string(),
					});
				}
				(PathPattern::pathless(), Some(format!("/{}", id)))
			}
			RoutePath::Path(path) => {
				let pattern = PathPattern::parse(path)?;
				let segment = pattern.as_str().to_string();
				(pattern, Some(segment))
			}
		};

		let (route_id, full_path) = match (parent, segment) {
			(Some(parent), Some(segment)) => {
				let parent = &self.nodes[parent.index()];
				let id_prefix = if parent.parent.is_none() {
					""
				} else {
					parent.route_id.trim_end_matches('/')
				};
				let full_path = if pattern.kind() == PatternKind::Pathless {
					parent.full_path.clone()
				} else {
					format!("{}{}", parent.full_path.trim_end_matches('/'), pattern.url_template())
				};
				(format!("{}{}", id_prefix, segment), full_path)
			}
			_ => (ROOT_ROUTE_ID.to_string(), "/".to_string()),
		};

		if self.by_id.contains_key(&route_id) {
			return Err(RouterError::DuplicateRoute(route_id));
		}

		let id = RouteId(self.nodes.len());
		self.by_id.insert(route_id.clone(), id);
		self.nodes.push(RouteNode {
			id,
			route_id,
			full_path,
			pattern,
			parent,
			children: Vec::new(),
			options: route.options,
		});

		for child in route.children {
			let child_id = self.insert(child, Some(id))?;
			self.nodes[id.index()].children.push(child_id);
		}
		Ok(id)
	}

	/// Returns the node for an id produced by this tree.
	///
	/// # Panics
	///
	/// Panics if `id` belongs to a different tree and is out of range.
	pub fn node(&self, id: RouteId) -> &RouteNode {
		&self.nodes[id.index()]
	}

	/// Returns the root node.
	pub fn root(&self) -> &RouteNode {
		self.node(RouteId::ROOT)
	}

	/// Finds a node by its string id.
	pub fn lookup(&self, route_id: &str) -> Option<&RouteNode> {
		self.by_id.get(route_id).map(|id| self.node(*id))
	}

	/// Returns the ancestor chain of `id`, root first and `id` last.
	pub fn chain(&self, id: RouteId) -> Vec<RouteId> {
		let mut chain = vec![id];
		let mut current = self.node(id).parent;
		while let Some(parent) = current {
			chain.push(parent);
			current = self.node(parent).parent;
		}
		chain.reverse();
		chain
	}

	/// All nodes in pre-order.
	pub fn nodes(&self) -> &[RouteNode] {
		&self.nodes
	}

	/// Number of routes including the root.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Always false: a tree holds at least its root.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn tree() -> RouteTree {
		RouteTree::new(Route::root().children([
			Route::new("/"),
			Route::new("posts").children([Route::new("/"), Route::new("$slug")]),
			Route::new("u").children([Route::layout("_layout").children([Route::new("$username")])]),
			Route::layout("_auth").children([Route::new("settings")]),
		]))
		.unwrap()
	}

	#[rstest]
	#[case("__root__", "/")]
	#[case("/", "/")]
	#[case("/posts", "/posts")]
	#[case("/posts/", "/posts/")]
	#[case("/posts/$slug", "/posts/$slug")]
	#[case("/u/_layout", "/u")]
	#[case("/u/_layout/$username", "/u/$username")]
	#[case("/_auth", "/")]
	#[case("/_auth/settings", "/settings")]
	fn test_ids_and_full_paths(tree: RouteTree, #[case] route_id: &str, #[case] full_path: &str) {
		let node = tree.lookup(route_id).unwrap();
		assert_eq!(node.full_path(), full_path);
	}

	#[rstest]
	fn test_parent_child_links(tree: RouteTree) {
		let slug = tree.lookup("/posts/$slug").unwrap();
		let posts = tree.node(slug.parent().unwrap());
		assert_eq!(posts.route_id(), "/posts");
		assert!(posts.children().contains(&slug.id()));
		assert_eq!(tree.root().children().len(), 4);
		assert_eq!(tree.root().parent(), None);
	}

	#[rstest]
	fn test_chain_is_root_first(tree: RouteTree) {
		let leaf = tree.lookup("/u/_layout/$username").unwrap().id();
		let ids: Vec<&str> = tree
			.chain(leaf)
			.into_iter()
			.map(|id| tree.node(id).route_id())
			.collect();
		assert_eq!(ids, vec!["__root__", "/u", "/u/_layout", "/u/_layout/$username"]);
	}

	#[rstest]
	fn test_duplicate_route() {
		let result = RouteTree::new(Route::root().children([Route::new("a"), Route::new("/a/")]));
		assert_eq!(result.unwrap_err(), RouterError::DuplicateRoute("/a".to_string()));
	}

	#[rstest]
	fn test_requires_root() {
		assert!(matches!(
			RouteTree::new(Route::new("posts")),
			Err(RouterError::InvalidPattern { .. })
		));
		assert!(matches!(
			RouteTree::new(Route::root().children([Route::root()])),
			Err(RouterError::InvalidPattern { .. })
		));
	}

	#[rstest]
	#[case("")]
	#[case("a/b")]
	fn test_rejects_bad_layout_id(#[case] id: &str) {
		let result = RouteTree::new(Route::root().children([Route::layout(id)]));
		assert!(matches!(result, Err(RouterError::InvalidPattern { .. })));
	}

	#[rstest]
	fn test_invalid_path_propagates() {
		let result = RouteTree::new(Route::root().children([Route::new("a//b")]));
		assert!(matches!(result, Err(RouterError::InvalidPattern { .. })));
	}

	#[rstest]
	fn test_unnested_route_keeps_own_id() {
		let tree = RouteTree::new(Route::root().children([
			Route::new("posts").children([Route::new("$postId").children([Route::new("deep")])]),
			Route::new("posts_/$postId/deep"),
		]))
		.unwrap();

		let nested = tree.lookup("/posts/$postId/deep").unwrap();
		let unnested = tree.lookup("/posts_/$postId/deep").unwrap();

		assert_eq!(nested.full_path(), "/posts/$postId/deep");
		assert_eq!(unnested.full_path(), "/posts/$postId/deep");
		assert_eq!(unnested.parent(), Some(RouteId::ROOT));
	}
}
