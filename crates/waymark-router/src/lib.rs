//! Navigation for waymark.
//!
//! This crate drives navigations over a compiled
//! [`RouteTree`](waymark_core::RouteTree):
//!
//! - [`router`]: the [`Router`] handle and its builder
//! - [`navigation`]: the navigation state machine
//! - [`store`]: committed state, pending navigation and subscriptions
//! - [`history`]: the history backend contract and [`MemoryHistory`]
//! - [`config`]: [`RouterOptions`], loadable from TOML
//!
//! Logging goes through `tracing`; install a subscriber in the host to see
//! navigation lifecycle events.

pub mod config;
pub mod history;
pub mod navigation;
pub mod router;
pub mod store;

pub use config::{ConfigError, DEFAULT_MAX_REDIRECTS, RouterOptions};
pub use history::{History, HistoryError, HistoryEvent, MemoryHistory};
pub use navigation::{NavigationKind, NavigationOutcome};
pub use router::{Router, RouterBuilder};
pub use store::{NavigationPhase, PendingNavigation, RouterSnapshot, RouterStore, SubscriptionId};
