//! Offline cache controller.
//!
//! ### Lifecycle
//! - **install**: populate the versioned namespace with the precache manifest
//!   (all-or-nothing), then request skip-waiting
//! - **activate**: delete every other namespace, claim open clients
//!
//! ### Fetch routing
//! Bypass → exclusion → asset → document → default; first match wins. Assets and
//! documents are network-first with cache fallback, documents additionally fall back
//! to the cached app shell at `/`. Only status 200 responses are stored.
//!
//! Storage, transport, host runtime and clock are injected through
//! [`CacheBackend`](crate::cache::CacheBackend), [`Network`], [`Platform`] and [`Clock`].

pub mod controller;
pub mod events;
pub mod lifecycle;
pub mod namespace;
pub mod network;
pub mod platform;
pub mod policy;
pub mod request;
pub mod route;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ActivationReport, CacheController, FetchOutcome, InstallReport};
pub use events::{ControlMessage, EventOutcome, WorkerEvent};
pub use lifecycle::WorkerState;
pub use namespace::{CacheNamespace, Clock, SystemClock};
pub use network::Network;
pub use platform::{ACTION_CLOSE, ACTION_EXPLORE, Notification, NotificationAction, Platform};
pub use policy::{CachePolicy, NotificationTemplate};
pub use request::{Destination, Headers, Request, Response, append_header};
pub use route::{ExclusionSet, Route, Router};
