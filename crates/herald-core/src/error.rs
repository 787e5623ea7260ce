//! Error types for `herald-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::user::UserId;

#[derive(Debug, Error)]
pub enum Error {
  /// A required emit field was absent.
  #[error("the argument {0} is missing")]
  MissingArgument(&'static str),

  /// A custom fan-out predicate did not produce a boolean verdict.
  #[error("filter must return a bool")]
  InvalidFilterResult,

  /// follow/unfollow called with an unsupported argument combination.
  #[error("bad arguments: {0}")]
  BadArguments(String),

  /// An event looked up by id or name does not exist.
  #[error("event not found: {0}")]
  EventNotFound(String),

  #[error("no subscription for follower {follower} on event {event}")]
  SubscriptionNotFound { follower: UserId, event: Uuid },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether this error was caused by the caller's input rather than by the
  /// store.
  pub fn is_caller_error(&self) -> bool {
    matches!(
      self,
      Self::MissingArgument(_) | Self::InvalidFilterResult | Self::BadArguments(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
