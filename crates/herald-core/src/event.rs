//! Event types: named classes of occurrence that can trigger notifications.
//!
//! Events are created once through get-or-create semantics and never deleted.
//! Only the `active` flag changes afterwards, and only category-wide.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered event type, e.g. `"blog_post_created"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:          Uuid,
  /// Unique, stable identifier.
  pub name:              String,
  pub description:       String,
  /// Grouping key for bulk activation and category-level follow/unfollow.
  pub category:          String,
  pub active:            bool,
  /// Decided at creation time only; later registrations never change it.
  pub auto_subscription: bool,
}

/// Input to [`crate::engine::Notifier::resolve_or_create`].
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub name:              String,
  pub description:       String,
  pub category:          String,
  pub auto_subscription: bool,
}

impl NewEvent {
  /// Convenience constructor with `auto_subscription` enabled.
  pub fn new(
    name: impl Into<String>,
    description: impl Into<String>,
    category: impl Into<String>,
  ) -> Self {
    Self {
      name:              name.into(),
      description:       description.into(),
      category:          category.into(),
      auto_subscription: true,
    }
  }

  pub fn without_auto_subscription(mut self) -> Self {
    self.auto_subscription = false;
    self
  }

  /// Build the record the store persists. New events always start active.
  pub fn into_event(self) -> Event {
    Event {
      event_id:          Uuid::new_v4(),
      name:              self.name,
      description:       self.description,
      category:          self.category,
      active:            true,
      auto_subscription: self.auto_subscription,
    }
  }
}
