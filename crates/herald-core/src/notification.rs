//! Notification records: one fan-out artifact per non-suppressed follower.
//!
//! Notifications are written once by the fan-out engine. The only later
//! transition is `read: false -> true`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

/// Caller-defined payload, stored and returned verbatim.
pub type ExtraData = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  /// The recipient.
  pub user:            UserId,
  pub event_id:        Uuid,
  /// Who triggered the occurrence.
  pub actor:           UserId,
  pub object_type:     String,
  pub object_id:       String,
  pub extra_data:      ExtraData,
  /// Opaque routing tag consumed by whatever transport polls the store.
  pub notify_channel:  Option<String>,
  pub read:            bool,
  /// Epoch seconds; the record is not deliverable before this instant.
  pub dispatch_time:   i64,
}

impl Notification {
  /// Unread and past its dispatch time.
  pub fn is_deliverable(&self, now: i64) -> bool {
    !self.read && self.dispatch_time <= now
  }
}

/// Input to [`crate::store::NotifyStore::record_notifications`]. The store
/// assigns the id; `read` always starts `false`.
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub user:           UserId,
  pub event_id:       Uuid,
  pub actor:          UserId,
  pub object_type:    String,
  pub object_id:      String,
  pub extra_data:     ExtraData,
  pub notify_channel: Option<String>,
  pub dispatch_time:  i64,
}

impl NewNotification {
  pub fn into_notification(self) -> Notification {
    Notification {
      notification_id: Uuid::new_v4(),
      user:            self.user,
      event_id:        self.event_id,
      actor:           self.actor,
      object_type:     self.object_type,
      object_id:       self.object_id,
      extra_data:      self.extra_data,
      notify_channel:  self.notify_channel,
      read:            false,
      dispatch_time:   self.dispatch_time,
    }
  }
}
