//! The `NotifyStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `herald-store-sqlite`).
//! It bundles the entity store (events, subscriptions, notifications) with the
//! read side of the external user directory. The engine depends on this
//! abstraction, not on any concrete backend.

use std::{collections::HashMap, future::Future};

use uuid::Uuid;

use crate::{
  event::{Event, NewEvent},
  notification::{NewNotification, Notification},
  subscription::{NewSubscription, Subscription},
  user::UserId,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Equality predicates over subscriptions. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionQuery {
  pub follower: Option<UserId>,
  pub event_id: Option<Uuid>,
  /// Matches subscriptions whose event belongs to this category.
  pub category: Option<String>,
  pub active:   Option<bool>,
}

impl SubscriptionQuery {
  pub fn for_follower(follower: &UserId) -> Self {
    Self { follower: Some(follower.clone()), ..Default::default() }
  }

  pub fn event(mut self, event_id: Option<Uuid>) -> Self {
    self.event_id = event_id;
    self
  }
}

/// Predicates over notifications. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct NotificationQuery {
  /// Restrict to these ids; empty means no restriction.
  pub ids:           Vec<Uuid>,
  pub user:          Option<UserId>,
  pub event_id:      Option<Uuid>,
  pub actor:         Option<UserId>,
  pub object_type:   Option<String>,
  /// Matches notifications whose event belongs to this category.
  pub category:      Option<String>,
  pub read:          Option<bool>,
  /// Upper bound (inclusive) on `dispatch_time`.
  pub dispatched_by: Option<i64>,
}

impl NotificationQuery {
  /// Unread notifications for `user`, regardless of dispatch time.
  pub fn unread_for(user: &UserId) -> Self {
    Self {
      user: Some(user.clone()),
      read: Some(false),
      ..Default::default()
    }
  }

  pub fn event(mut self, event_id: Option<Uuid>) -> Self {
    self.event_id = event_id;
    self
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Herald storage backend.
///
/// Every single-record write must be atomic. Bulk updates need not be atomic
/// as a whole, with the exception of
/// [`record_notifications`](Self::record_notifications).
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait NotifyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── User directory ────────────────────────────────────────────────────

  /// Register a user. Registering an existing user is a no-op.
  fn add_user(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// One page of known users ordered by identifier, strictly after `after`.
  fn list_users(
    &self,
    after: Option<UserId>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  fn get_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  fn get_event_by_name(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Insert a new event. Returns `None` without writing anything if an event
  /// with the same name already exists (including one inserted concurrently).
  fn insert_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// List events, optionally restricted to a category.
  fn list_events(
    &self,
    category: Option<String>,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Set `active` on every event in `category`; returns the number of events
  /// in the category.
  fn set_category_active(
    &self,
    category: String,
    active: bool,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Subscriptions ─────────────────────────────────────────────────────

  fn create_subscription(
    &self,
    input: NewSubscription,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  fn get_subscription(
    &self,
    follower: UserId,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  fn list_subscriptions<'a>(
    &'a self,
    query: &'a SubscriptionQuery,
  ) -> impl Future<Output = Result<Vec<Subscription>, Self::Error>> + Send + 'a;

  /// Atomically overwrite the mutable fields of an existing subscription.
  fn save_subscription<'a>(
    &'a self,
    sub: &'a Subscription,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Bulk-set `active` on every matching subscription; returns rows touched.
  fn set_subscriptions_active<'a>(
    &'a self,
    query: &'a SubscriptionQuery,
    active: bool,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// For every follower with at least one subscription to an event in
  /// `category`, the minimum `period` among those subscriptions.
  fn min_periods_in_category(
    &self,
    category: String,
  ) -> impl Future<Output = Result<HashMap<UserId, u64>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Persist a fan-out batch in one transaction. Either every notification
  /// is written or none is.
  fn record_notifications(
    &self,
    batch: Vec<NewNotification>,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Matching notifications ordered by `dispatch_time`.
  fn list_notifications<'a>(
    &'a self,
    query: &'a NotificationQuery,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + 'a;

  /// Mark every matching unread notification as read; returns rows touched.
  fn mark_read<'a>(
    &'a self,
    query: &'a NotificationQuery,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}
