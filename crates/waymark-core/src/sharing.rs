//! Structural sharing for resolved values.
//!
//! Subscribers detect changes with `Arc::ptr_eq`, so a freshly computed value
//! that is deeply equal to the previous one must be replaced by the previous
//! allocation.

use std::sync::Arc;

/// Returns `previous` if it is deeply equal to `next`, otherwise wraps `next`.
pub fn replace_equal_deep<T: PartialEq>(previous: &Arc<T>, next: T) -> Arc<T> {
	if **previous == next {
		Arc::clone(previous)
	} else {
		Arc::new(next)
	}
}

/// Like [`replace_equal_deep`] for an optional previous value.
pub fn share_with<T: PartialEq>(previous: Option<&Arc<T>>, next: T) -> Arc<T> {
	match previous {
		Some(previous) => replace_equal_deep(previous, next),
		None => Arc::new(next),
	}
}
