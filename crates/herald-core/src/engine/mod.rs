//! The notification engine.
//!
//! [`Notifier`] is a thin, cloneable handle over a [`NotifyStore`] and a
//! [`Clock`]. Its operations are split by concern:
//!
//! | Module | Operations |
//! |--------|------------|
//! | [`registry`] | `resolve_or_create`, `activate_category`, `deactivate_category` |
//! | [`fanout`] | `emit` |
//! | [`follow`] | `follow`, `unfollow`, `subscriptions`, `update_subscription` |
//! | [`delivery`] | `deliverable`, `deliverable_now`, `mark_read` |
//!
//! The engine has no internal threads or locks. Concurrent callers are
//! serialised only by the per-row atomicity of the store.

pub mod delivery;
pub mod fanout;
pub mod follow;
pub mod registry;

use std::sync::Arc;

pub use delivery::DeliveryFilter;
pub use fanout::{EmitContext, EmitOutcome, EmitRequest, Filter};
pub use follow::{FollowArgs, FollowTarget, MutationSummary};

use crate::{
  clock::{Clock, SystemClock},
  store::NotifyStore,
};

/// Handle to the notification engine. Cloning is cheap.
pub struct Notifier<S> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
}

impl<S> Clone for Notifier<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), clock: Arc::clone(&self.clock) }
  }
}

impl<S: NotifyStore> Notifier<S> {
  /// An engine driven by wall-clock time.
  pub fn new(store: Arc<S>) -> Self { Self::with_clock(store, SystemClock) }

  pub fn with_clock(store: Arc<S>, clock: impl Clock + 'static) -> Self {
    Self { store, clock: Arc::new(clock) }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Current time in epoch seconds, according to the engine's clock.
  pub fn now(&self) -> i64 { self.clock.now() }
}
