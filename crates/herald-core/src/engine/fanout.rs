//! Fan-out: one emitted occurrence expands into one notification per
//! interested follower.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Notifier;
use crate::{
  Error, Result,
  event::{Event, NewEvent},
  notification::{ExtraData, NewNotification, Notification},
  store::{NotifyStore, SubscriptionQuery},
  subscription::Subscription,
  user::UserId,
};

/// Caller-supplied predicate consulted for every candidate subscription.
///
/// `Some(true)` keeps evaluating, `Some(false)` skips the subscription, and
/// `None` (no verdict) aborts the emit with [`Error::InvalidFilterResult`].
pub type Filter =
  Arc<dyn Fn(&Subscription, &EmitContext) -> Option<bool> + Send + Sync>;

// ─── Request ─────────────────────────────────────────────────────────────────

/// Arguments to [`Notifier::emit`].
///
/// The six identifying fields are optional so that requests assembled at run
/// time (e.g. deserialised from JSON) report a missing key as
/// [`Error::MissingArgument`] rather than failing to parse.
#[derive(Clone, Deserialize)]
pub struct EmitRequest {
  pub name:              Option<String>,
  pub description:       Option<String>,
  pub category:          Option<String>,
  pub object_type:       Option<String>,
  pub object_id:         Option<String>,
  pub actor:             Option<UserId>,
  #[serde(default)]
  pub extra_data:        ExtraData,
  #[serde(default)]
  pub notify_channel:    Option<String>,
  #[serde(default = "default_auto_subscription")]
  pub auto_subscription: bool,
  /// Free-form values handed to the filter alongside the emit fields.
  #[serde(default)]
  pub context:           serde_json::Map<String, serde_json::Value>,
  #[serde(skip)]
  pub filter:            Option<Filter>,
}

fn default_auto_subscription() -> bool { true }

impl Default for EmitRequest {
  fn default() -> Self {
    Self {
      name:              None,
      description:       None,
      category:          None,
      object_type:       None,
      object_id:         None,
      actor:             None,
      extra_data:        ExtraData::new(),
      notify_channel:    None,
      auto_subscription: true,
      context:           serde_json::Map::new(),
      filter:            None,
    }
  }
}

impl fmt::Debug for EmitRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EmitRequest")
      .field("name", &self.name)
      .field("description", &self.description)
      .field("category", &self.category)
      .field("object_type", &self.object_type)
      .field("object_id", &self.object_id)
      .field("actor", &self.actor)
      .field("extra_data", &self.extra_data)
      .field("notify_channel", &self.notify_channel)
      .field("auto_subscription", &self.auto_subscription)
      .field("context", &self.context)
      .field("filter", &self.filter.as_ref().map(|_| ".."))
      .finish()
  }
}

impl EmitRequest {
  /// A request with every required field set.
  pub fn new(
    name: impl Into<String>,
    description: impl Into<String>,
    category: impl Into<String>,
    object_type: impl Into<String>,
    object_id: impl Into<String>,
    actor: impl Into<UserId>,
  ) -> Self {
    Self {
      name: Some(name.into()),
      description: Some(description.into()),
      category: Some(category.into()),
      object_type: Some(object_type.into()),
      object_id: Some(object_id.into()),
      actor: Some(actor.into()),
      ..Default::default()
    }
  }

  pub fn extra_data(mut self, extra_data: ExtraData) -> Self {
    self.extra_data = extra_data;
    self
  }

  pub fn notify_channel(mut self, channel: impl Into<String>) -> Self {
    self.notify_channel = Some(channel.into());
    self
  }

  pub fn auto_subscription(mut self, enabled: bool) -> Self {
    self.auto_subscription = enabled;
    self
  }

  pub fn context(
    mut self,
    key: impl Into<String>,
    value: impl Into<serde_json::Value>,
  ) -> Self {
    self.context.insert(key.into(), value.into());
    self
  }

  /// Attach a boolean predicate.
  pub fn filter<F>(self, f: F) -> Self
  where
    F: Fn(&Subscription, &EmitContext) -> bool + Send + Sync + 'static,
  {
    self.filter_verdict(move |sub, ctx| Some(f(sub, ctx)))
  }

  /// Attach a predicate that may decline to give a verdict.
  pub fn filter_verdict<F>(mut self, f: F) -> Self
  where
    F: Fn(&Subscription, &EmitContext) -> Option<bool> + Send + Sync + 'static,
  {
    self.filter = Some(Arc::new(f));
    self
  }

  /// Check required fields, in declaration order.
  pub fn into_context(self) -> Result<(EmitContext, Option<Filter>)> {
    let ctx = EmitContext {
      name:              self.name.ok_or(Error::MissingArgument("name"))?,
      description:       self
        .description
        .ok_or(Error::MissingArgument("description"))?,
      category:          self.category.ok_or(Error::MissingArgument("category"))?,
      object_type:       self
        .object_type
        .ok_or(Error::MissingArgument("object_type"))?,
      object_id:         self
        .object_id
        .ok_or(Error::MissingArgument("object_id"))?,
      actor:             self.actor.ok_or(Error::MissingArgument("actor"))?,
      extra_data:        self.extra_data,
      notify_channel:    self.notify_channel,
      auto_subscription: self.auto_subscription,
      context:           self.context,
    };
    Ok((ctx, self.filter))
  }
}

/// A validated emit, as seen by filters.
#[derive(Debug, Clone, Serialize)]
pub struct EmitContext {
  pub name:              String,
  pub description:       String,
  pub category:          String,
  pub object_type:       String,
  pub object_id:         String,
  pub actor:             UserId,
  pub extra_data:        ExtraData,
  pub notify_channel:    Option<String>,
  pub auto_subscription: bool,
  pub context:           serde_json::Map<String, serde_json::Value>,
}

impl EmitContext {
  fn new_event(&self) -> NewEvent {
    NewEvent {
      name:              self.name.clone(),
      description:       self.description.clone(),
      category:          self.category.clone(),
      auto_subscription: self.auto_subscription,
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Result of a successful [`Notifier::emit`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EmitOutcome {
  /// The event is active; `notifications` may still be empty.
  Delivered {
    event:         Event,
    notifications: Vec<Notification>,
  },
  /// The event is inactive and nothing was fanned out.
  Suppressed { event: Event },
}

impl EmitOutcome {
  pub fn event(&self) -> &Event {
    match self {
      Self::Delivered { event, .. } | Self::Suppressed { event } => event,
    }
  }

  pub fn notifications(&self) -> &[Notification] {
    match self {
      Self::Delivered { notifications, .. } => notifications,
      Self::Suppressed { .. } => &[],
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

impl<S: NotifyStore> Notifier<S> {
  /// Emit an occurrence and fan it out to every follower of the event that
  /// has not suppressed it.
  ///
  /// The event is resolved (or created) first. Notifications are written in
  /// one batch, so a filter error leaves no partial fan-out behind.
  pub async fn emit(&self, request: EmitRequest) -> Result<EmitOutcome> {
    let (ctx, filter) = request.into_context()?;
    let event = self.resolve_or_create(ctx.new_event()).await?;

    if !event.active {
      debug!(event = %event.name, "event inactive, skipping fan-out");
      return Ok(EmitOutcome::Suppressed { event });
    }

    let query = SubscriptionQuery {
      event_id: Some(event.event_id),
      active: Some(true),
      ..Default::default()
    };
    let subscriptions = self
      .store
      .list_subscriptions(&query)
      .await
      .map_err(Error::store)?;

    let now = self.now();
    let mut batch = Vec::new();
    for sub in &subscriptions {
      if !admits(sub, &ctx, filter.as_ref())? {
        continue;
      }
      batch.push(NewNotification {
        user:           sub.follower.clone(),
        event_id:       event.event_id,
        actor:          ctx.actor.clone(),
        object_type:    ctx.object_type.clone(),
        object_id:      ctx.object_id.clone(),
        extra_data:     ctx.extra_data.clone(),
        notify_channel: ctx.notify_channel.clone(),
        dispatch_time:  sub.dispatch_time(now),
      });
    }

    debug!(
      event = %event.name,
      candidates = subscriptions.len(),
      notified = batch.len(),
      "fanned out"
    );

    let notifications = if batch.is_empty() {
      Vec::new()
    } else {
      self
        .store
        .record_notifications(batch)
        .await
        .map_err(Error::store)?
    };

    Ok(EmitOutcome::Delivered { event, notifications })
  }
}

/// Whether `sub` should receive the occurrence described by `ctx`.
fn admits(
  sub: &Subscription,
  ctx: &EmitContext,
  filter: Option<&Filter>,
) -> Result<bool> {
  if sub.follower == ctx.actor || !sub.active || sub.unfollows(&ctx.actor) {
    return Ok(false);
  }

  if let Some(filter) = filter {
    match filter(sub, ctx) {
      Some(true) => {}
      Some(false) => return Ok(false),
      None => return Err(Error::InvalidFilterResult),
    }
  }

  Ok(!sub.is_suppressed(&ctx.object_type, &ctx.object_id, &ctx.actor))
}
