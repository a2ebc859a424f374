//! History backend contract and an in-memory implementation.
//!
//! The router never persists URL state on its own: every committed
//! navigation is written through [`History::push`] or [`History::replace`],
//! and externally triggered back/forward moves arrive as [`HistoryEvent`]s.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Capacity of the pop event channel.
const EVENT_CAPACITY: usize = 64;

/// A history backend failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
	/// The backend refused the entry.
	#[error("History rejected '{href}': {reason}")]
	Rejected {
		/// The href that was refused.
		href: String,
		/// Why it was refused.
		reason: String,
	},
	/// The backend is no longer available.
	#[error("History backend is closed")]
	Closed,
}

/// An externally triggered move through the history stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
	/// Href of the entry that became current.
	pub href: String,
	/// Signed distance moved; negative for back.
	pub delta: isize,
}

/// The history backend the router persists locations through.
#[async_trait]
pub trait History: Send + Sync {
	/// Href of the current entry.
	fn location(&self) -> String;

	/// Appends an entry after the current one and makes it current.
	async fn push(&self, href: &str) -> Result<(), HistoryError>;

	/// Overwrites the current entry.
	async fn replace(&self, href: &str) -> Result<(), HistoryError>;

	/// Moves the current index by `delta` without emitting an event.
	///
	/// Used to undo a pop whose navigation was cancelled.
	fn rewind(&self, delta: isize);

	/// Subscribes to pop events.
	fn subscribe(&self) -> broadcast::Receiver<HistoryEvent>;
}

struct Entries {
	stack: Vec<String>,
	index: usize,
}

/// An in-memory history stack.
///
/// # Example
///
/// ```
/// use waymark_router::history::{History, MemoryHistory};
///
/// let history = MemoryHistory::with_entries(["/", "/posts"], 1);
/// assert_eq!(history.location(), "/posts");
/// assert!(history.back());
/// assert_eq!(history.location(), "/");
/// ```
pub struct MemoryHistory {
	entries: Mutex<Entries>,
	events: broadcast::Sender<HistoryEvent>,
}

impl MemoryHistory {
	/// Creates a stack holding a single entry.
	pub fn new(initial: impl Into<String>) -> Self {
		Self::with_entries([initial.into()], 0)
	}

	/// Creates a stack from entries with `index` current.
	///
	/// An empty list yields a single `/` entry and the index is clamped to
	/// the last entry.
	pub fn with_entries<I, S>(entries: I, index: usize) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut stack: Vec<String> = entries.into_iter().map(Into::into).collect();
		if stack.is_empty() {
			stack.push("/".to_string());
		}
		let index = index.min(stack.len() - 1);
		let (events, _) = broadcast::channel(EVENT_CAPACITY);

		Self {
			entries: Mutex::new(Entries { stack, index }),
			events,
		}
	}

	/// Moves back one entry, returning false at the start of the stack.
	pub fn back(&self) -> bool {
		self.go(-1)
	}

	/// Moves forward one entry, returning false at the end of the stack.
	pub fn forward(&self) -> bool {
		self.go(1)
	}

	/// Moves by `delta` entries and emits a pop event.
	///
	/// Returns false without moving if the target is out of range.
	pub fn go(&self, delta: isize) -> bool {
		let href = {
			let mut entries = self.entries.lock();
			match Self::offset(&entries, delta) {
				Some(target) if delta != 0 => {
					entries.index = target;
					entries.stack[target].clone()
				}
				_ => return false,
			}
		};
		tracing::debug!(%href, delta, "memory history pop");
		// No receiver simply means nobody is listening yet.
		let _ = self.events.send(HistoryEvent { href, delta });
		true
	}

	fn offset(entries: &Entries, delta: isize) -> Option<usize> {
		entries
			.index
			.checked_add_signed(delta)
			.filter(|target| *target < entries.stack.len())
	}

	/// All entries, oldest first.
	pub fn entries(&self) -> Vec<String> {
		self.entries.lock().stack.clone()
	}

	/// Index of the current entry.
	pub fn index(&self) -> usize {
		self.entries.lock().index
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl std::fmt::Debug for MemoryHistory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let entries = self.entries.lock();
		f.debug_struct("MemoryHistory")
			.field("stack", &entries.stack)
			.field("index", &entries.index)
			.finish()
	}
}

#[async_trait]
impl History for MemoryHistory {
	fn location(&self) -> String {
		let entries = self.entries.lock();
		entries.stack[entries.index].clone()
	}

	async fn push(&self, href: &str) -> Result<(), HistoryError> {
		let mut entries = self.entries.lock();
		let next = entries.index + 1;
		entries.stack.truncate(next);
		entries.stack.push(href.to_string());
		entries.index = next;
		Ok(())
	}

	async fn replace(&self, href: &str) -> Result<(), HistoryError> {
		let mut entries = self.entries.lock();
		let index = entries.index;
		entries.stack[index] = href.to_string();
		Ok(())
	}

	fn rewind(&self, delta: isize) {
		let mut entries = self.entries.lock();
		if let Some(target) = Self::offset(&entries, delta) {
			entries.index = target;
		}
	}

	fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
		self.events.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_push_truncates_forward_entries() {
		let history = MemoryHistory::with_entries(["/", "/a", "/b"], 1);

		history.push("/c").await.unwrap();

		assert_eq!(history.entries(), vec!["/", "/a", "/c"]);
		assert_eq!(history.index(), 2);
		assert_eq!(history.location(), "/c");
	}

	#[rstest]
	#[tokio::test]
	async fn test_replace_overwrites_current() {
		let history = MemoryHistory::with_entries(["/", "/a"], 1);

		history.replace("/b").await.unwrap();

		assert_eq!(history.entries(), vec!["/", "/b"]);
		assert_eq!(history.index(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_go_emits_pop_events() {
		let history = MemoryHistory::with_entries(["/", "/a", "/b"], 2);
		let mut events = history.subscribe();

		assert!(history.go(-2));
		assert!(history.forward());

		assert_eq!(
			events.recv().await.unwrap(),
			HistoryEvent {
				href: "/".to_string(),
				delta: -2
			}
		);
		assert_eq!(
			events.recv().await.unwrap(),
			HistoryEvent {
				href: "/a".to_string(),
				delta: 1
			}
		);
	}

	#[rstest]
	#[case(0, -1)]
	#[case(2, 1)]
	#[case(1, 0)]
	fn test_go_out_of_range(#[case] index: usize, #[case] delta: isize) {
		let history = MemoryHistory::with_entries(["/", "/a", "/b"], index);
		let mut events = history.subscribe();

		assert!(!history.go(delta));
		assert_eq!(history.index(), index);
		assert!(events.try_recv().is_err());
	}

	#[rstest]
	fn test_rewind_is_silent() {
		let history = MemoryHistory::with_entries(["/", "/a"], 0);
		let mut events = history.subscribe();

		history.rewind(1);

		assert_eq!(history.location(), "/a");
		assert!(events.try_recv().is_err());
	}

	#[rstest]
	fn test_empty_entries_default_to_root() {
		let history = MemoryHistory::with_entries(Vec::<String>::new(), 5);
		assert_eq!(history.location(), "/");
		assert_eq!(history.index(), 0);
	}
}
