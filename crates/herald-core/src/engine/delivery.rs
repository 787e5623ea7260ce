//! Delivery query: the read path a transport polls.

use serde::Deserialize;
use uuid::Uuid;

use super::Notifier;
use crate::{
  Error, Result,
  notification::Notification,
  store::{NotificationQuery, NotifyStore},
  user::UserId,
};

/// Equality filters intersected with "unread and due".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryFilter {
  pub user:        Option<UserId>,
  pub event_id:    Option<Uuid>,
  pub actor:       Option<UserId>,
  pub object_type: Option<String>,
  /// Restrict to events in this category.
  pub category:    Option<String>,
}

impl DeliveryFilter {
  pub fn for_user(user: impl Into<UserId>) -> Self {
    Self { user: Some(user.into()), ..Default::default() }
  }

  fn into_query(self, now: i64) -> NotificationQuery {
    NotificationQuery {
      user: self.user,
      event_id: self.event_id,
      actor: self.actor,
      object_type: self.object_type,
      category: self.category,
      read: Some(false),
      dispatched_by: Some(now),
      ..Default::default()
    }
  }
}

impl<S: NotifyStore> Notifier<S> {
  /// Unread notifications whose dispatch time is at or before `now`.
  pub async fn deliverable(
    &self,
    now: i64,
    filter: DeliveryFilter,
  ) -> Result<Vec<Notification>> {
    self
      .store
      .list_notifications(&filter.into_query(now))
      .await
      .map_err(Error::store)
  }

  /// [`deliverable`](Self::deliverable) as of the engine clock.
  pub async fn deliverable_now(
    &self,
    filter: DeliveryFilter,
  ) -> Result<Vec<Notification>> {
    self.deliverable(self.now(), filter).await
  }

  /// Mark specific notifications read, typically after a transport has
  /// consumed them. Returns how many were still unread.
  pub async fn mark_read(&self, ids: Vec<Uuid>) -> Result<usize> {
    if ids.is_empty() {
      return Ok(0);
    }
    let query = NotificationQuery { ids, ..Default::default() };
    self.store.mark_read(&query).await.map_err(Error::store)
  }
}
