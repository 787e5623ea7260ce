//! Follow/unfollow: edits a follower's suppression state.
//!
//! Each mutation targets exactly one dimension, named by [`FollowTarget`].
//! Unfollowing also retracts (marks read) the follower's unread notifications
//! along the dimension just closed. Following never un-reads anything.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::Notifier;
use crate::{
  Error, Result,
  store::{NotificationQuery, NotifyStore, SubscriptionQuery},
  subscription::{Subscription, SubscriptionUpdate, SuppressionRule},
  user::UserId,
};

// ─── Targets ─────────────────────────────────────────────────────────────────

/// What a follow/unfollow applies to. `event` narrows the first three shapes
/// to a single subscription; when absent every subscription of the follower
/// is affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum FollowTarget {
  /// Toggle the follower's denylist entry for an actor.
  Actor { actor: UserId, event: Option<Uuid> },
  /// Toggle an object-type suppression rule.
  ObjectType {
    object_type: String,
    event:       Option<Uuid>,
  },
  /// Toggle the subscription's `active` flag.
  All { event: Option<Uuid> },
  /// Toggle `active` on every subscription to an event in the category.
  Category { category: String },
}

/// Loosely-shaped follow/unfollow arguments, as received from callers that
/// cannot name a [`FollowTarget`] directly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowArgs {
  pub actor:       Option<UserId>,
  pub object_type: Option<String>,
  pub object_id:   Option<String>,
  pub category:    Option<String>,
  pub event:       Option<Uuid>,
}

impl TryFrom<FollowArgs> for FollowTarget {
  type Error = Error;

  fn try_from(args: FollowArgs) -> Result<Self> {
    let FollowArgs { actor, object_type, object_id, category, event } = args;
    match (actor, object_type, object_id, category, event) {
      (Some(actor), None, None, None, event) => Ok(Self::Actor { actor, event }),
      (None, Some(object_type), None, None, event) => {
        Ok(Self::ObjectType { object_type, event })
      }
      (None, None, None, None, event) => Ok(Self::All { event }),
      (None, None, None, Some(category), None) => Ok(Self::Category { category }),
      (actor, object_type, object_id, category, event) => {
        let given: Vec<&str> = [
          actor.is_some().then_some("actor"),
          object_type.is_some().then_some("object_type"),
          object_id.is_some().then_some("object_id"),
          category.is_some().then_some("category"),
          event.is_some().then_some("event"),
        ]
        .into_iter()
        .flatten()
        .collect();
        Err(Error::BadArguments(format!(
          "unsupported combination: {}",
          given.join(", ")
        )))
      }
    }
  }
}

/// How much a follow/unfollow changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MutationSummary {
  /// Subscriptions whose state was written.
  pub subscriptions: usize,
  /// Notifications marked read by an unfollow.
  pub retracted:     usize,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

impl<S: NotifyStore> Notifier<S> {
  /// Re-open a dimension previously closed with [`unfollow`](Self::unfollow).
  pub async fn follow(
    &self,
    follower: &UserId,
    target: FollowTarget,
  ) -> Result<MutationSummary> {
    let subscriptions = match target {
      FollowTarget::Actor { actor, event } => {
        self
          .edit_subscriptions(follower, event, |sub| {
            sub.unfollow_actors.remove(&actor)
          })
          .await?
      }
      FollowTarget::ObjectType { object_type, event } => {
        let rule = SuppressionRule::ObjectType { object_type };
        self
          .edit_subscriptions(follower, event, |sub| sub.rules.remove(&rule))
          .await?
      }
      FollowTarget::All { event } => {
        let query = SubscriptionQuery::for_follower(follower).event(event);
        self.set_active(&query, true).await?
      }
      FollowTarget::Category { category } => {
        let query = SubscriptionQuery {
          category: Some(category),
          ..SubscriptionQuery::for_follower(follower)
        };
        self.set_active(&query, true).await?
      }
    };

    Ok(MutationSummary { subscriptions, retracted: 0 })
  }

  /// Close a dimension and retract the follower's unread notifications
  /// along it.
  pub async fn unfollow(
    &self,
    follower: &UserId,
    target: FollowTarget,
  ) -> Result<MutationSummary> {
    let unread = NotificationQuery::unread_for(follower);
    let (subscriptions, retract) = match target {
      FollowTarget::Actor { actor, event } => {
        let touched = self
          .edit_subscriptions(follower, event, |sub| {
            sub.unfollow_actors.insert(actor.clone())
          })
          .await?;
        let retract = NotificationQuery { actor: Some(actor), ..unread.event(event) };
        (touched, retract)
      }
      FollowTarget::ObjectType { object_type, event } => {
        let rule = SuppressionRule::ObjectType { object_type: object_type.clone() };
        let touched = self
          .edit_subscriptions(follower, event, |sub| sub.rules.insert(rule.clone()))
          .await?;
        let retract = NotificationQuery {
          object_type: Some(object_type),
          ..unread.event(event)
        };
        (touched, retract)
      }
      FollowTarget::All { event } => {
        let query = SubscriptionQuery::for_follower(follower).event(event);
        (self.set_active(&query, false).await?, unread.event(event))
      }
      FollowTarget::Category { category } => {
        let query = SubscriptionQuery {
          category: Some(category.clone()),
          ..SubscriptionQuery::for_follower(follower)
        };
        let touched = self.set_active(&query, false).await?;
        (touched, NotificationQuery { category: Some(category), ..unread })
      }
    };

    let retracted = self.store.mark_read(&retract).await.map_err(Error::store)?;
    info!(%follower, subscriptions, retracted, "unfollowed");
    Ok(MutationSummary { subscriptions, retracted })
  }

  /// Every subscription held by `follower`.
  pub async fn subscriptions(&self, follower: &UserId) -> Result<Vec<Subscription>> {
    self
      .store
      .list_subscriptions(&SubscriptionQuery::for_follower(follower))
      .await
      .map_err(Error::store)
  }

  /// Edit period, channel or raw suppression rules of one subscription.
  ///
  /// This is the only way to populate the object-id scoped rules; follow and
  /// unfollow never touch them.
  pub async fn update_subscription(
    &self,
    follower: &UserId,
    event_id: Uuid,
    update: SubscriptionUpdate,
  ) -> Result<Subscription> {
    update.validate()?;
    let mut sub = self.require_subscription(follower, event_id).await?;
    update.apply(&mut sub);
    self.store.save_subscription(&sub).await.map_err(Error::store)?;
    Ok(sub)
  }

  async fn require_subscription(
    &self,
    follower: &UserId,
    event_id: Uuid,
  ) -> Result<Subscription> {
    self
      .store
      .get_subscription(follower.clone(), event_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::SubscriptionNotFound {
        follower: follower.clone(),
        event:    event_id,
      })
  }

  /// Apply `edit` to the follower's subscription for `event`, or to all of
  /// them when `event` is `None`. Only subscriptions the edit reports as
  /// changed are written back.
  async fn edit_subscriptions<F>(
    &self,
    follower: &UserId,
    event: Option<Uuid>,
    mut edit: F,
  ) -> Result<usize>
  where
    F: FnMut(&mut Subscription) -> bool + Send,
  {
    let subs = match event {
      Some(event_id) => vec![self.require_subscription(follower, event_id).await?],
      None => self.subscriptions(follower).await?,
    };

    let mut written = 0;
    for mut sub in subs {
      if edit(&mut sub) {
        self.store.save_subscription(&sub).await.map_err(Error::store)?;
        written += 1;
      }
    }
    Ok(written)
  }

  async fn set_active(&self, query: &SubscriptionQuery, active: bool) -> Result<usize> {
    self
      .store
      .set_subscriptions_active(query, active)
      .await
      .map_err(Error::store)
  }
}
