//! [`SqliteStore`]: the SQLite implementation of [`NotifyStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use herald_core::{
  event::{Event, NewEvent},
  notification::{NewNotification, Notification},
  store::{NotificationQuery, NotifyStore, SubscriptionQuery},
  subscription::{NewSubscription, Subscription},
  user::UserId,
};

use crate::{
  encode::{
    EVENT_COLUMNS, NOTIFICATION_COLUMNS, RawEvent, RawNotification,
    RawSubscription, SUBSCRIPTION_COLUMNS, decode_period, encode_dt,
    encode_uuid,
  },
  query::Conditions,
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Herald store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_events(&self, conds: Conditions) -> Result<Vec<Event>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {EVENT_COLUMNS} FROM events {} ORDER BY name",
          conds.where_clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(conds.params.iter()),
            RawEvent::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn query_subscriptions(
    &self,
    conds: Conditions,
  ) -> Result<Vec<Subscription>> {
    let raws: Vec<RawSubscription> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions {} ORDER BY rowid",
          conds.where_clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(conds.params.iter()),
            RawSubscription::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawSubscription::into_subscription)
      .collect()
  }
}

// ─── NotifyStore impl ────────────────────────────────────────────────────────

impl NotifyStore for SqliteStore {
  type Error = Error;

  // ── User directory ────────────────────────────────────────────────────────

  async fn add_user(&self, user: UserId) -> Result<()> {
    let id_str = user.into_inner();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, created_at) VALUES (?1, ?2)
           ON CONFLICT (user_id) DO NOTHING",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_users(
    &self,
    after: Option<UserId>,
    limit: usize,
  ) -> Result<Vec<UserId>> {
    let after_str = after.map(UserId::into_inner);
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id FROM users
           WHERE ?1 IS NULL OR user_id > ?1
           ORDER BY user_id
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![after_str, limit_val], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(ids.into_iter().map(UserId::new).collect())
  }

  // ── Events ────────────────────────────────────────────────────────────────

  async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
    let mut conds = Conditions::default();
    let p = conds.bind(encode_uuid(id));
    conds.push(format!("event_id = {p}"));
    Ok(self.query_events(conds).await?.into_iter().next())
  }

  async fn get_event_by_name(&self, name: String) -> Result<Option<Event>> {
    let mut conds = Conditions::default();
    let p = conds.bind(name);
    conds.push(format!("name = {p}"));
    Ok(self.query_events(conds).await?.into_iter().next())
  }

  async fn insert_event(&self, input: NewEvent) -> Result<Option<Event>> {
    let event = input.into_event();
    let raw = RawEvent::from_event(&event);

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO events (
             event_id, name, description, category, active, auto_subscription
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (name) DO NOTHING",
          rusqlite::params![
            raw.event_id,
            raw.name,
            raw.description,
            raw.category,
            raw.active,
            raw.auto_subscription,
          ],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(inserted.then_some(event))
  }

  async fn list_events(&self, category: Option<String>) -> Result<Vec<Event>> {
    let mut conds = Conditions::default();
    if let Some(category) = category {
      let p = conds.bind(category);
      conds.push(format!("category = {p}"));
    }
    self.query_events(conds).await
  }

  async fn set_category_active(
    &self,
    category: String,
    active: bool,
  ) -> Result<usize> {
    let touched = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE events SET active = ?1 WHERE category = ?2",
          rusqlite::params![active, category],
        )?)
      })
      .await?;
    Ok(touched)
  }

  // ── Subscriptions ─────────────────────────────────────────────────────────

  async fn create_subscription(
    &self,
    input: NewSubscription,
  ) -> Result<Subscription> {
    let sub = input.into_subscription();
    let raw = RawSubscription::from_subscription(&sub)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subscriptions (
             subscription_id, follower, event_id, unfollow_actors, rules,
             period, notify_channels, active
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            raw.subscription_id,
            raw.follower,
            raw.event_id,
            raw.unfollow_actors,
            raw.rules,
            raw.period,
            raw.notify_channels,
            raw.active,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(sub)
  }

  async fn get_subscription(
    &self,
    follower: UserId,
    event_id: Uuid,
  ) -> Result<Option<Subscription>> {
    let follower_str = follower.into_inner();
    let event_str = encode_uuid(event_id);

    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
           WHERE follower = ?1 AND event_id = ?2
           ORDER BY rowid
           LIMIT 1"
        );
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![follower_str, event_str],
              RawSubscription::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubscription::into_subscription).transpose()
  }

  async fn list_subscriptions(
    &self,
    query: &SubscriptionQuery,
  ) -> Result<Vec<Subscription>> {
    let conds = Conditions::default().subscriptions(query);
    self.query_subscriptions(conds).await
  }

  async fn save_subscription(&self, sub: &Subscription) -> Result<()> {
    let raw = RawSubscription::from_subscription(sub)?;
    let id = sub.subscription_id;

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE subscriptions
           SET unfollow_actors = ?1, rules = ?2, period = ?3,
               notify_channels = ?4, active = ?5
           WHERE subscription_id = ?6",
          rusqlite::params![
            raw.unfollow_actors,
            raw.rules,
            raw.period,
            raw.notify_channels,
            raw.active,
            raw.subscription_id,
          ],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::SubscriptionNotFound(id));
    }
    Ok(())
  }

  async fn set_subscriptions_active(
    &self,
    query: &SubscriptionQuery,
    active: bool,
  ) -> Result<usize> {
    let mut conds = Conditions::default();
    let set = conds.bind(active);
    let conds = conds.subscriptions(query);

    let touched = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE subscriptions SET active = {set} {}",
          conds.where_clause()
        );
        Ok(conn.execute(&sql, rusqlite::params_from_iter(conds.params.iter()))?)
      })
      .await?;
    Ok(touched)
  }

  async fn min_periods_in_category(
    &self,
    category: String,
  ) -> Result<HashMap<UserId, u64>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.follower, MIN(s.period)
           FROM subscriptions s
           JOIN events e ON e.event_id = s.event_id
           WHERE e.category = ?1
           GROUP BY s.follower",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![category], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(follower, period)| -> Result<(UserId, u64)> {
        Ok((UserId::new(follower), decode_period(period)?))
      })
      .collect()
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn record_notifications(
    &self,
    batch: Vec<NewNotification>,
  ) -> Result<Vec<Notification>> {
    let notifications: Vec<Notification> = batch
      .into_iter()
      .map(NewNotification::into_notification)
      .collect();
    let raws = notifications
      .iter()
      .map(RawNotification::from_notification)
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO notifications (
               notification_id, user_id, event_id, actor, object_type,
               object_id, extra_data, notify_channel, read, dispatch_time
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          )?;
          for raw in &raws {
            stmt.execute(rusqlite::params![
              raw.notification_id,
              raw.user_id,
              raw.event_id,
              raw.actor,
              raw.object_type,
              raw.object_id,
              raw.extra_data,
              raw.notify_channel,
              raw.read,
              raw.dispatch_time,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(notifications)
  }

  async fn list_notifications(
    &self,
    query: &NotificationQuery,
  ) -> Result<Vec<Notification>> {
    let conds = Conditions::default().notifications(query);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications {}
           ORDER BY dispatch_time, rowid",
          conds.where_clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(conds.params.iter()),
            RawNotification::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawNotification::into_notification)
      .collect()
  }

  async fn mark_read(&self, query: &NotificationQuery) -> Result<usize> {
    let mut conds = Conditions::default().notifications(query);
    conds.push("read = 0".to_owned());

    let touched = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE notifications SET read = 1 {}",
          conds.where_clause()
        );
        Ok(conn.execute(&sql, rusqlite::params_from_iter(conds.params.iter()))?)
      })
      .await?;
    Ok(touched)
  }
}
