//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings. Rule sets, denylists and
//! extra data are stored as compact JSON. Booleans and epoch seconds are
//! plain INTEGERs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use herald_core::{
  event::Event,
  notification::{ExtraData, Notification},
  subscription::{Subscription, SuppressionRule},
  user::UserId,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_period(period: u64) -> Result<i64> {
  i64::try_from(period)
    .map_err(|_| Error::Decode(format!("period out of range: {period}")))
}

pub fn decode_period(period: i64) -> Result<u64> {
  u64::try_from(period)
    .map_err(|_| Error::Decode(format!("negative period: {period}")))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_actors(actors: &BTreeSet<UserId>) -> Result<String> {
  Ok(serde_json::to_string(actors)?)
}

pub fn decode_actors(s: &str) -> Result<BTreeSet<UserId>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_rules(rules: &BTreeSet<SuppressionRule>) -> Result<String> {
  Ok(serde_json::to_string(rules)?)
}

pub fn decode_rules(s: &str) -> Result<BTreeSet<SuppressionRule>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_extra_data(data: &ExtraData) -> Result<String> {
  Ok(serde_json::to_string(data)?)
}

pub fn decode_extra_data(s: &str) -> Result<ExtraData> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const EVENT_COLUMNS: &str =
  "event_id, name, description, category, active, auto_subscription";

/// Raw values of an `events` row.
pub struct RawEvent {
  pub event_id:          String,
  pub name:              String,
  pub description:       String,
  pub category:          String,
  pub active:            bool,
  pub auto_subscription: bool,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:          row.get(0)?,
      name:              row.get(1)?,
      description:       row.get(2)?,
      category:          row.get(3)?,
      active:            row.get(4)?,
      auto_subscription: row.get(5)?,
    })
  }

  pub fn from_event(event: &Event) -> Self {
    Self {
      event_id:          encode_uuid(event.event_id),
      name:              event.name.clone(),
      description:       event.description.clone(),
      category:          event.category.clone(),
      active:            event.active,
      auto_subscription: event.auto_subscription,
    }
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:          decode_uuid(&self.event_id)?,
      name:              self.name,
      description:       self.description,
      category:          self.category,
      active:            self.active,
      auto_subscription: self.auto_subscription,
    })
  }
}

pub const SUBSCRIPTION_COLUMNS: &str = "subscription_id, follower, event_id, \
                                        unfollow_actors, rules, period, \
                                        notify_channels, active";

/// Raw values of a `subscriptions` row.
pub struct RawSubscription {
  pub subscription_id: String,
  pub follower:        String,
  pub event_id:        String,
  pub unfollow_actors: String,
  pub rules:           String,
  pub period:          i64,
  pub notify_channels: Option<String>,
  pub active:          bool,
}

impl RawSubscription {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subscription_id: row.get(0)?,
      follower:        row.get(1)?,
      event_id:        row.get(2)?,
      unfollow_actors: row.get(3)?,
      rules:           row.get(4)?,
      period:          row.get(5)?,
      notify_channels: row.get(6)?,
      active:          row.get(7)?,
    })
  }

  pub fn from_subscription(sub: &Subscription) -> Result<Self> {
    Ok(Self {
      subscription_id: encode_uuid(sub.subscription_id),
      follower:        sub.follower.as_str().to_owned(),
      event_id:        encode_uuid(sub.event_id),
      unfollow_actors: encode_actors(&sub.unfollow_actors)?,
      rules:           encode_rules(&sub.rules)?,
      period:          encode_period(sub.period)?,
      notify_channels: sub.notify_channels.clone(),
      active:          sub.active,
    })
  }

  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      subscription_id: decode_uuid(&self.subscription_id)?,
      follower:        UserId::new(self.follower),
      event_id:        decode_uuid(&self.event_id)?,
      unfollow_actors: decode_actors(&self.unfollow_actors)?,
      rules:           decode_rules(&self.rules)?,
      period:          decode_period(self.period)?,
      notify_channels: self.notify_channels,
      active:          self.active,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str = "notification_id, user_id, event_id, \
                                        actor, object_type, object_id, \
                                        extra_data, notify_channel, read, \
                                        dispatch_time";

/// Raw values of a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub user_id:         String,
  pub event_id:        String,
  pub actor:           String,
  pub object_type:     String,
  pub object_id:       String,
  pub extra_data:      String,
  pub notify_channel:  Option<String>,
  pub read:            bool,
  pub dispatch_time:   i64,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      user_id:         row.get(1)?,
      event_id:        row.get(2)?,
      actor:           row.get(3)?,
      object_type:     row.get(4)?,
      object_id:       row.get(5)?,
      extra_data:      row.get(6)?,
      notify_channel:  row.get(7)?,
      read:            row.get(8)?,
      dispatch_time:   row.get(9)?,
    })
  }

  pub fn from_notification(n: &Notification) -> Result<Self> {
    Ok(Self {
      notification_id: encode_uuid(n.notification_id),
      user_id:         n.user.as_str().to_owned(),
      event_id:        encode_uuid(n.event_id),
      actor:           n.actor.as_str().to_owned(),
      object_type:     n.object_type.clone(),
      object_id:       n.object_id.clone(),
      extra_data:      encode_extra_data(&n.extra_data)?,
      notify_channel:  n.notify_channel.clone(),
      read:            n.read,
      dispatch_time:   n.dispatch_time,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      user:            UserId::new(self.user_id),
      event_id:        decode_uuid(&self.event_id)?,
      actor:           UserId::new(self.actor),
      object_type:     self.object_type,
      object_id:       self.object_id,
      extra_data:      decode_extra_data(&self.extra_data)?,
      notify_channel:  self.notify_channel,
      read:            self.read,
      dispatch_time:   self.dispatch_time,
    })
  }
}
