//! Path matching against a [`RouteTree`].
//!
//! The matcher enumerates every ancestor chain that consumes the whole
//! pathname, depth first with children in declaration order, then orders the
//! candidates by specificity. Each consumed URL segment is ranked
//! static > param > wildcard and chains compare segment by segment from the
//! left, so a static segment anywhere beats a param at the same position.
//! Ties keep enumeration order, which makes declaration order the final
//! tie-break between equally specific siblings.

use std::cmp::Reverse;

use crate::error::{RouterError, RouterResult};
use crate::params::ParamMap;
use crate::pattern::{PatternKind, SPLAT_PARAM, Segment, decode_segment, split_path};
use crate::tree::{RouteId, RouteTree};

/// Ordering key of a candidate chain, larger is better.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
	ranks: Vec<u8>,
	// a trailing wildcard that captured nothing loses to an exact route
	no_empty_splat: bool,
	index_leaf: bool,
}

/// One candidate ancestor chain, root first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChain {
	routes: Vec<RouteId>,
	captures: Vec<Vec<(String, String)>>,
	segment_ends: Vec<usize>,
	segments: Vec<String>,
	score: Score,
}

impl RouteChain {
	/// Route ids, root first.
	pub fn routes(&self) -> &[RouteId] {
		&self.routes
	}

	/// The deepest route of the chain.
	pub fn leaf(&self) -> RouteId {
		self.routes[self.routes.len() - 1]
	}

	/// Number of routes in the chain.
	pub fn len(&self) -> usize {
		self.routes.len()
	}

	/// Always false: a chain holds at least the root.
	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}

	/// Raw, decoded captures of the route at `index`.
	pub fn captured_at(&self, index: usize) -> &[(String, String)] {
		&self.captures[index]
	}

	/// The part of the pathname matched up to and including the route at
	/// `index`.
	pub fn pathname_at(&self, index: usize) -> String {
		format!("/{}", self.segments[..self.segment_ends[index]].join("/"))
	}

	/// All raw captures as string params.
	pub fn params(&self) -> ParamMap {
		self.captures
			.iter()
			.flatten()
			.map(|(name, value)| (name.clone(), value.clone().into()))
			.collect()
	}
}

struct Frame {
	route: RouteId,
	captures: Vec<(String, String)>,
	ranks: Vec<u8>,
	end: usize,
	empty_splat: bool,
}

/// Matches pathnames against a route tree.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
	tree: &'a RouteTree,
	case_sensitive: bool,
}

impl<'a> Matcher<'a> {
	/// Creates a case-insensitive matcher.
	pub fn new(tree: &'a RouteTree) -> Self {
		Self {
			tree,
			case_sensitive: false,
		}
	}

	/// Sets whether static segments compare case-sensitively.
	pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
		self.case_sensitive = case_sensitive;
		self
	}

	/// The tree this matcher walks.
	pub fn tree(&self) -> &'a RouteTree {
		self.tree
	}

	/// Returns every chain that matches the whole pathname, best first.
	pub fn candidates(&self, pathname: &str) -> Vec<RouteChain> {
		let segments: Vec<String> = split_path(pathname)
			.into_iter()
			.map(decode_segment)
			.collect();

		let mut frames = Vec::new();
		let mut out = Vec::new();
		self.walk(RouteId::ROOT, 0, &segments, &mut frames, &mut out);

		// sort_by_key is stable
		out.sort_by_key(|chain| Reverse(chain.score.clone()));
		out
	}

	/// Returns the best chain for the pathname.
	///
	/// # Errors
	///
	/// Returns [`RouterError::NotFound`] if no chain consumes the whole
	/// pathname.
	pub fn best(&self, pathname: &str) -> RouterResult<RouteChain> {
		self.candidates(pathname).into_iter().next().ok_or_else(|| {
			tracing::debug!(pathname, "no route matches");
			RouterError::NotFound(pathname.to_string())
		})
	}

	fn walk(
		&self,
		id: RouteId,
		start: usize,
		segments: &[String],
		frames: &mut Vec<Frame>,
		out: &mut Vec<RouteChain>,
	) {
		let node = self.tree.node(id);
		let Some(frame) = self.match_node(id, start, segments) else {
			return;
		};
		let end = frame.end;
		frames.push(frame);

		match node.pattern().kind() {
			PatternKind::Index => out.push(Self::chain(frames, segments, true)),
			kind => {
				for child in node.children() {
					self.walk(*child, end, segments, frames, out);
				}
				if kind == PatternKind::Segments && end == segments.len() {
					out.push(Self::chain(frames, segments, false));
				}
			}
		}

		frames.pop();
	}

	fn match_node(&self, id: RouteId, start: usize, segments: &[String]) -> Option<Frame> {
		let pattern = self.tree.node(id).pattern();
		let mut frame = Frame {
			route: id,
			captures: Vec::new(),
			ranks: Vec::new(),
			end: start,
			empty_splat: false,
		};

		match pattern.kind() {
			PatternKind::Root | PatternKind::Pathless => return Some(frame),
			PatternKind::Index => return (start == segments.len()).then_some(frame),
			PatternKind::Segments => {}
		}

		for segment in pattern.segments() {
			match segment {
				Segment::Wildcard => {
					let rest = &segments[frame.end..];
					frame.empty_splat = rest.is_empty();
					frame.ranks.extend(rest.iter().map(|_| segment.rank()));
					frame.captures.push((SPLAT_PARAM.to_string(), rest.join("/")));
					frame.end = segments.len();
				}
				Segment::Static(literal) => {
					let actual = segments.get(frame.end)?;
					if !self.static_eq(literal, actual) {
						return None;
					}
					frame.ranks.push(segment.rank());
					frame.end += 1;
				}
				Segment::Param(name) => {
					let actual = segments.get(frame.end)?;
					frame.captures.push((name.clone(), actual.clone()));
					frame.ranks.push(segment.rank());
					frame.end += 1;
				}
			}
		}
		Some(frame)
	}

	fn static_eq(&self, literal: &str, actual: &str) -> bool {
		if self.case_sensitive {
			literal == actual
		} else {
			literal.to_lowercase() == actual.to_lowercase()
		}
	}

	fn chain(frames: &[Frame], segments: &[String], index_leaf: bool) -> RouteChain {
		RouteChain {
			routes: frames.iter().map(|f| f.route).collect(),
			captures: frames.iter().map(|f| f.captures.clone()).collect(),
			segment_ends: frames.iter().map(|f| f.end).collect(),
			segments: segments.to_vec(),
			score: Score {
				ranks: frames.iter().flat_map(|f| f.ranks.iter().copied()).collect(),
				no_empty_splat: !frames.iter().any(|f| f.empty_splat),
				index_leaf,
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::route::Route;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn tree() -> RouteTree {
		RouteTree::new(Route::root().children([
			Route::new("/"),
			Route::new("posts").children([
				Route::new("/"),
				Route::new("new"),
				Route::new("$postId"),
				Route::new("$slug"),
			]),
			Route::new("u").children([Route::layout("_layout").children([Route::new("$username")])]),
			Route::new("files/$"),
			Route::new("$lang/about"),
			Route::new("docs/about"),
		]))
		.unwrap()
	}

	fn leaf_id(tree: &RouteTree, pathname: &str) -> String {
		let chain = Matcher::new(tree).best(pathname).unwrap();
		tree.node(chain.leaf()).route_id().to_string()
	}

	#[rstest]
	#[case("/", "/")]
	#[case("/posts", "/posts/")]
	#[case("/posts/", "/posts/")]
	#[case("/posts/new", "/posts/new")]
	#[case("/posts/123", "/posts/$postId")]
	#[case("/u/tanner", "/u/_layout/$username")]
	#[case("/u", "/u")]
	#[case("/files/a/b.css", "/files/$")]
	#[case("/files", "/files/$")]
	#[case("/docs/about", "/docs/about")]
	#[case("/de/about", "/$lang/about")]
	fn test_best_match(tree: RouteTree, #[case] pathname: &str, #[case] expected: &str) {
		assert_eq!(leaf_id(&tree, pathname), expected);
	}

	#[rstest]
	fn test_static_beats_param(tree: RouteTree) {
		let candidates = Matcher::new(&tree).candidates("/posts/new");
		let leaves: Vec<&str> = candidates
			.iter()
			.map(|c| tree.node(c.leaf()).route_id())
			.collect();
		assert_eq!(leaves, vec!["/posts/new", "/posts/$postId", "/posts/$slug"]);
	}

	#[rstest]
	fn test_declaration_order_breaks_ties(tree: RouteTree) {
		let chain = Matcher::new(&tree).best("/posts/hello").unwrap();
		assert_eq!(tree.node(chain.leaf()).route_id(), "/posts/$postId");
		assert_eq!(chain.params(), crate::params::to_map([("postId", "hello")]));
	}

	#[rstest]
	fn test_layout_in_chain(tree: RouteTree) {
		let chain = Matcher::new(&tree).best("/u/tanner").unwrap();
		let ids: Vec<&str> = chain
			.routes()
			.iter()
			.map(|id| tree.node(*id).route_id())
			.collect();
		assert_eq!(ids, vec!["__root__", "/u", "/u/_layout", "/u/_layout/$username"]);
		assert_eq!(chain.pathname_at(1), "/u");
		assert_eq!(chain.pathname_at(2), "/u");
		assert_eq!(chain.pathname_at(3), "/u/tanner");
		assert!(chain.captured_at(2).is_empty());
	}

	#[rstest]
	fn test_splat_capture(tree: RouteTree) {
		let chain = Matcher::new(&tree).best("/files/css/main%20file.css").unwrap();
		assert_eq!(chain.params()[SPLAT_PARAM], json!("css/main file.css"));
	}

	#[rstest]
	fn test_decodes_params(tree: RouteTree) {
		let chain = Matcher::new(&tree).best("/u/t%C3%A4nner").unwrap();
		assert_eq!(chain.params()["username"], json!("tänner"));
	}

	#[rstest]
	#[case("/nope")]
	#[case("/posts/1/2")]
	#[case("/de")]
	fn test_not_found(tree: RouteTree, #[case] pathname: &str) {
		assert_eq!(
			Matcher::new(&tree).best(pathname),
			Err(RouterError::NotFound(pathname.to_string()))
		);
	}

	#[rstest]
	fn test_case_sensitivity(tree: RouteTree) {
		assert_eq!(leaf_id(&tree, "/POSTS/new"), "/posts/new");
		let sensitive = Matcher::new(&tree).case_sensitive(true);
		let chain = sensitive.best("/Docs/about").unwrap();
		assert_eq!(tree.node(chain.leaf()).route_id(), "/$lang/about");
	}

	#[rstest]
	fn test_exact_beats_empty_splat() {
		let tree = RouteTree::new(Route::root().children([
			Route::new("docs").children([Route::new("$")]),
		]))
		.unwrap();
		let candidates = Matcher::new(&tree).candidates("/docs");
		assert_eq!(candidates.len(), 2);
		assert_eq!(tree.node(candidates[0].leaf()).route_id(), "/docs");
	}
}
