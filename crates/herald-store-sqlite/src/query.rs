//! Translation of the core query types into parameterised WHERE clauses.

use herald_core::store::{NotificationQuery, SubscriptionQuery};
use rusqlite::types::Value;

use crate::encode::encode_uuid;

/// A conjunction of SQL predicates with positional (`?N`) parameters.
#[derive(Debug, Default)]
pub struct Conditions {
  clauses: Vec<String>,
  pub params: Vec<Value>,
}

impl Conditions {
  /// Register `value` as the next parameter and return its placeholder.
  pub fn bind(&mut self, value: impl Into<Value>) -> String {
    self.params.push(value.into());
    format!("?{}", self.params.len())
  }

  pub fn push(&mut self, clause: String) { self.clauses.push(clause); }

  fn eq(&mut self, column: &str, value: impl Into<Value>) {
    let p = self.bind(value);
    self.push(format!("{column} = {p}"));
  }

  fn in_category(&mut self, category: &str) {
    let p = self.bind(category.to_owned());
    self.push(format!(
      "event_id IN (SELECT event_id FROM events WHERE category = {p})"
    ));
  }

  /// `WHERE ...`, or an empty string when there are no predicates.
  pub fn where_clause(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }

  pub fn subscriptions(mut self, query: &SubscriptionQuery) -> Self {
    if let Some(follower) = &query.follower {
      self.eq("follower", follower.as_str().to_owned());
    }
    if let Some(event_id) = query.event_id {
      self.eq("event_id", encode_uuid(event_id));
    }
    if let Some(category) = &query.category {
      self.in_category(category);
    }
    if let Some(active) = query.active {
      self.eq("active", active);
    }
    self
  }

  pub fn notifications(mut self, query: &NotificationQuery) -> Self {
    if !query.ids.is_empty() {
      // One JSON array parameter, so the id set is not bounded by SQLite's
      // host-parameter limit.
      let ids: Vec<String> = query.ids.iter().map(|id| encode_uuid(*id)).collect();
      let p = self.bind(serde_json::Value::from(ids).to_string());
      self.push(format!(
        "notification_id IN (SELECT value FROM json_each({p}))"
      ));
    }
    if let Some(user) = &query.user {
      self.eq("user_id", user.as_str().to_owned());
    }
    if let Some(event_id) = query.event_id {
      self.eq("event_id", encode_uuid(event_id));
    }
    if let Some(actor) = &query.actor {
      self.eq("actor", actor.as_str().to_owned());
    }
    if let Some(object_type) = &query.object_type {
      self.eq("object_type", object_type.clone());
    }
    if let Some(category) = &query.category {
      self.in_category(category);
    }
    if let Some(read) = query.read {
      self.eq("read", read);
    }
    if let Some(by) = query.dispatched_by {
      let p = self.bind(by);
      self.push(format!("dispatch_time <= {p}"));
    }
    self
  }
}
