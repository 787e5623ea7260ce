//! Subscriptions and the suppression rule engine.
//!
//! A subscription binds one follower to one event. Delivery is opt-out: a
//! fresh subscription notifies on everything, and the follower narrows it by
//! adding denylist entries. Any matching entry suppresses the occurrence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, user::UserId};

/// Largest period a store can hold; periods are persisted as signed seconds.
pub const MAX_PERIOD: u64 = i64::MAX as u64;

// ─── Rules ───────────────────────────────────────────────────────────────────

/// A single denylist entry. Each variant is one suppression dimension;
/// membership is exact equality on every field.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuppressionRule {
  /// Everything about this object type.
  ObjectType { object_type: String },
  /// This object type when done by this actor.
  ObjectTypeByActor { object_type: String, actor: UserId },
  /// One specific object.
  Object { object_type: String, object_id: String },
  /// One specific object when touched by this actor.
  ObjectByActor {
    object_type: String,
    object_id:   String,
    actor:       UserId,
  },
}

impl SuppressionRule {
  /// The four keys an occurrence could be suppressed under.
  pub fn keys_for(
    object_type: &str,
    object_id: &str,
    actor: &UserId,
  ) -> [SuppressionRule; 4] {
    [
      Self::ObjectType { object_type: object_type.to_owned() },
      Self::ObjectTypeByActor {
        object_type: object_type.to_owned(),
        actor:       actor.clone(),
      },
      Self::Object {
        object_type: object_type.to_owned(),
        object_id:   object_id.to_owned(),
      },
      Self::ObjectByActor {
        object_type: object_type.to_owned(),
        object_id:   object_id.to_owned(),
        actor:       actor.clone(),
      },
    ]
  }
}

/// Returns `true` iff any rule in `rules` matches the occurrence.
pub fn is_suppressed(
  rules: &BTreeSet<SuppressionRule>,
  object_type: &str,
  object_id: &str,
  actor: &UserId,
) -> bool {
  if rules.is_empty() {
    return false;
  }
  SuppressionRule::keys_for(object_type, object_id, actor)
    .iter()
    .any(|key| rules.contains(key))
}

// ─── Subscription ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub subscription_id: Uuid,
  pub follower:        UserId,
  pub event_id:        Uuid,
  /// Actors whose occurrences are never delivered to this follower.
  pub unfollow_actors: BTreeSet<UserId>,
  pub rules:           BTreeSet<SuppressionRule>,
  /// Minimum delay in seconds before a generated notification is deliverable.
  pub period:          u64,
  pub notify_channels: Option<String>,
  /// Hard on/off switch; an inactive subscription generates nothing.
  pub active:          bool,
}

impl Subscription {
  /// Rule engine check for this subscription's rule set.
  pub fn is_suppressed(
    &self,
    object_type: &str,
    object_id: &str,
    actor: &UserId,
  ) -> bool {
    is_suppressed(&self.rules, object_type, object_id, actor)
  }

  pub fn unfollows(&self, actor: &UserId) -> bool {
    self.unfollow_actors.contains(actor)
  }

  /// Dispatch time for an occurrence generated at `now`.
  pub fn dispatch_time(&self, now: i64) -> i64 {
    now.saturating_add(i64::try_from(self.period).unwrap_or(i64::MAX))
  }
}

/// Input to [`crate::store::NotifyStore::create_subscription`].
#[derive(Debug, Clone)]
pub struct NewSubscription {
  pub follower:        UserId,
  pub event_id:        Uuid,
  pub period:          u64,
  pub notify_channels: Option<String>,
}

impl NewSubscription {
  pub fn new(follower: UserId, event_id: Uuid) -> Self {
    Self { follower, event_id, period: 0, notify_channels: None }
  }

  pub fn with_period(mut self, period: u64) -> Self {
    self.period = period;
    self
  }

  /// Default state: no rules, nobody unfollowed, active.
  pub fn into_subscription(self) -> Subscription {
    Subscription {
      subscription_id: Uuid::new_v4(),
      follower:        self.follower,
      event_id:        self.event_id,
      unfollow_actors: BTreeSet::new(),
      rules:           BTreeSet::new(),
      period:          self.period,
      notify_channels: self.notify_channels,
      active:          true,
    }
  }
}

/// Direct edits applied by
/// [`crate::engine::Notifier::update_subscription`]. `None` leaves a field as
/// it is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionUpdate {
  pub period:          Option<u64>,
  /// `Some(None)` clears the channel.
  #[serde(default, with = "double_option")]
  pub notify_channels: Option<Option<String>>,
  /// Rules to add; applied after `remove_rules`.
  #[serde(default)]
  pub add_rules:       Vec<SuppressionRule>,
  #[serde(default)]
  pub remove_rules:    Vec<SuppressionRule>,
}

impl SubscriptionUpdate {
  /// Reject values no subscription can hold.
  pub fn validate(&self) -> Result<()> {
    match self.period {
      Some(period) if period > MAX_PERIOD => Err(Error::BadArguments(format!(
        "period {period} exceeds the maximum of {MAX_PERIOD} seconds"
      ))),
      _ => Ok(()),
    }
  }

  pub fn apply(self, sub: &mut Subscription) {
    if let Some(period) = self.period {
      sub.period = period;
    }
    if let Some(channels) = self.notify_channels {
      sub.notify_channels = channels;
    }
    for rule in &self.remove_rules {
      sub.rules.remove(rule);
    }
    sub.rules.extend(self.add_rules);
  }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
  where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
  {
    Option::<T>::deserialize(de).map(Some)
  }
}
