//! Time source for dispatch-time computation.

use std::sync::{
  Arc,
  atomic::{AtomicI64, Ordering},
};

use chrono::Utc;

/// Supplies the current time as epoch seconds.
pub trait Clock: Send + Sync {
  fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> i64 { Utc::now().timestamp() }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
  now: Arc<AtomicI64>,
}

impl ManualClock {
  pub fn new(now: i64) -> Self {
    Self { now: Arc::new(AtomicI64::new(now)) }
  }

  pub fn set(&self, now: i64) { self.now.store(now, Ordering::SeqCst); }

  pub fn advance(&self, secs: i64) {
    self.now.fetch_add(secs, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> i64 { self.now.load(Ordering::SeqCst) }
}
