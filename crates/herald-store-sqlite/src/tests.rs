//! Integration tests for `SqliteStore` and the notification engine against an
//! in-memory database.

use std::sync::Arc;

use herald_core::{
  Error as CoreError,
  clock::{Clock, ManualClock},
  engine::{
    DeliveryFilter, EmitOutcome, EmitRequest, FollowArgs, FollowTarget,
    Notifier, registry::USER_PAGE_SIZE,
  },
  event::{Event, NewEvent},
  store::{NotificationQuery, NotifyStore, SubscriptionQuery},
  subscription::{NewSubscription, SubscriptionUpdate, SuppressionRule},
  user::UserId,
};
use serde_json::json;
use uuid::Uuid;

use crate::SqliteStore;

const T0: i64 = 1_000;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// An engine with three registered users: `follower`, `follower2`, `actor`.
async fn setup() -> (Notifier<SqliteStore>, ManualClock) {
  let s = store().await;
  for user in ["follower", "follower2", "actor"] {
    s.add_user(user.into()).await.unwrap();
  }
  let clock = ManualClock::new(T0);
  (Notifier::with_clock(Arc::new(s), clock.clone()), clock)
}

fn user(id: &str) -> UserId { UserId::from(id) }

fn post(name: &str, category: &str, actor: &str) -> EmitRequest {
  EmitRequest::new(name, "a post was created", category, "blog_post", "00", actor)
}

async fn register(n: &Notifier<SqliteStore>, name: &str, category: &str) -> Event {
  n.resolve_or_create(NewEvent::new(name, "is random", category))
    .await
    .unwrap()
}

async fn all_for(
  n: &Notifier<SqliteStore>,
  follower: &str,
  event: &Event,
) -> Vec<herald_core::notification::Notification> {
  n.store()
    .list_notifications(&NotificationQuery {
      user: Some(user(follower)),
      event_id: Some(event.event_id),
      ..Default::default()
    })
    .await
    .unwrap()
}

async fn pending_for(
  n: &Notifier<SqliteStore>,
  follower: &str,
  event: &Event,
) -> usize {
  n.deliverable_now(DeliveryFilter {
    user: Some(user(follower)),
    event_id: Some(event.event_id),
    ..Default::default()
  })
  .await
  .unwrap()
  .len()
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn users_are_paginated_in_order() {
  let s = store().await;
  for id in ["carol", "alice", "bob", "alice"] {
    s.add_user(id.into()).await.unwrap();
  }

  let first = s.list_users(None, 2).await.unwrap();
  assert_eq!(first, vec![user("alice"), user("bob")]);

  let rest = s.list_users(first.last().cloned(), 2).await.unwrap();
  assert_eq!(rest, vec![user("carol")]);
}

#[tokio::test]
async fn insert_event_ignores_duplicate_names() {
  let s = store().await;
  let first = s.insert_event(NewEvent::new("e", "d", "c")).await.unwrap();
  assert!(first.is_some());

  let second = s.insert_event(NewEvent::new("e", "other", "x")).await.unwrap();
  assert!(second.is_none());

  let stored = s.get_event_by_name("e".into()).await.unwrap().unwrap();
  assert_eq!(Some(stored), first);
}

#[tokio::test]
async fn save_unknown_subscription_errors() {
  let s = store().await;
  let sub = NewSubscription::new(user("ghost"), Uuid::new_v4()).into_subscription();
  let err = s.save_subscription(&sub).await.unwrap_err();
  assert!(matches!(err, crate::Error::SubscriptionNotFound(id) if id == sub.subscription_id));
}

#[tokio::test]
async fn subscription_roundtrips_rules_and_actors() {
  let s = store().await;
  let event = s
    .insert_event(NewEvent::new("e", "d", "c"))
    .await
    .unwrap()
    .unwrap();
  let mut sub = s
    .create_subscription(NewSubscription::new(user("f"), event.event_id))
    .await
    .unwrap();

  sub.unfollow_actors.insert(user("spammer"));
  sub.rules.insert(SuppressionRule::ObjectByActor {
    object_type: "comment".into(),
    object_id:   "3".into(),
    actor:       user("bob"),
  });
  sub.notify_channels = Some("email".into());
  sub.period = 90;
  s.save_subscription(&sub).await.unwrap();

  let fetched = s
    .get_subscription(user("f"), event.event_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched, sub);
}

// ─── Event registry ──────────────────────────────────────────────────────────

#[tokio::test]
async fn new_event_seeds_default_subscriptions() {
  let (n, _) = setup().await;
  let event = register(&n, "w_e_random1", "c_random").await;

  assert_eq!(event.name, "w_e_random1");
  assert_eq!(event.description, "is random");
  assert_eq!(event.category, "c_random");
  assert!(event.active);

  for follower in ["follower", "follower2", "actor"] {
    let subs = n
      .store()
      .list_subscriptions(&SubscriptionQuery {
        follower: Some(user(follower)),
        event_id: Some(event.event_id),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(subs.len(), 1);
    let sub = &subs[0];
    assert_eq!(sub.period, 0);
    assert!(sub.active);
    assert!(sub.rules.is_empty());
    assert!(sub.unfollow_actors.is_empty());
    assert_eq!(sub.notify_channels, None);
  }
}

async fn seeded_followers(n: &Notifier<SqliteStore>, event: &Event) -> Vec<UserId> {
  n.store()
    .list_subscriptions(&SubscriptionQuery {
      event_id: Some(event.event_id),
      ..Default::default()
    })
    .await
    .unwrap()
    .into_iter()
    .map(|sub| sub.follower)
    .collect()
}

#[tokio::test]
async fn seeding_walks_every_page_of_the_user_directory() {
  let (n, _) = setup().await;
  // Exactly two full pages: the walk must stop on the trailing empty page.
  let extra = 2 * USER_PAGE_SIZE - 3;
  for i in 0..extra {
    n.store().add_user(format!("user{i:05}").into()).await.unwrap();
  }

  let event = register(&n, "paged_a", "c_paged").await;
  let mut followers = seeded_followers(&n, &event).await;
  followers.sort();
  followers.dedup();
  assert_eq!(followers.len(), 2 * USER_PAGE_SIZE);

  // One more user spills into a third, partial page.
  n.store().add_user("zz_last".into()).await.unwrap();
  let event = register(&n, "paged_b", "c_paged").await;
  let followers = seeded_followers(&n, &event).await;
  assert_eq!(followers.len(), 2 * USER_PAGE_SIZE + 1);
  assert!(followers.contains(&user("zz_last")));
  assert!(followers.contains(&user("follower")));
}

#[tokio::test]
async fn resolving_twice_returns_same_event_without_reseeding() {
  let (n, _) = setup().await;
  let first = register(&n, "x_e_random1", "c_random").await;
  for _ in 0..4 {
    let again = n
      .resolve_or_create(NewEvent::new("x_e_random1", "changed", "elsewhere"))
      .await
      .unwrap();
    assert_eq!(again, first);
  }

  let subs = n
    .store()
    .list_subscriptions(&SubscriptionQuery {
      event_id: Some(first.event_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(subs.len(), 3);
}

#[tokio::test]
async fn concurrent_registration_creates_one_event() {
  let (n, _) = setup().await;
  let (a, b) = tokio::join!(
    n.resolve_or_create(NewEvent::new("race", "d", "c")),
    n.resolve_or_create(NewEvent::new("race", "d", "c")),
  );
  let (a, b) = (a.unwrap(), b.unwrap());
  assert_eq!(a.event_id, b.event_id);

  assert_eq!(n.events(Some("c".into())).await.unwrap().len(), 1);
  let subs = n
    .store()
    .list_subscriptions(&SubscriptionQuery {
      event_id: Some(a.event_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(subs.len(), 3);
}

#[tokio::test]
async fn new_event_inherits_minimum_period_of_category() {
  let (n, _) = setup().await;
  let category = "c_min_period";

  for (name, period) in [("e_random1", 50), ("e_random2", 70), ("e_random3", 2)] {
    let event = register(&n, name, category).await;
    n.update_subscription(
      &user("follower"),
      event.event_id,
      SubscriptionUpdate { period: Some(period), ..Default::default() },
    )
    .await
    .unwrap();
  }

  let fourth = register(&n, "e_random4", category).await;
  let sub = n
    .store()
    .get_subscription(user("follower"), fourth.event_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(sub.period, 2);

  // Users without a configured period in the category start at zero.
  let other = n
    .store()
    .get_subscription(user("follower2"), fourth.event_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(other.period, 0);

  let elsewhere = register(&n, "e_random5", "c_min_period_2").await;
  let sub = n
    .store()
    .get_subscription(user("follower"), elsewhere.event_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(sub.period, 0);
}

#[tokio::test]
async fn auto_subscription_disabled_creates_no_subscriptions() {
  let (n, _) = setup().await;

  let outcome = n
    .emit(post("P_e_random2", "Blog", "actor").auto_subscription(false))
    .await
    .unwrap();
  assert!(outcome.notifications().is_empty());
  assert!(!outcome.event().auto_subscription);

  let quiet = n
    .resolve_or_create(
      NewEvent::new("P_e_random1", "is random", "c_random").without_auto_subscription(),
    )
    .await
    .unwrap();

  for event in [outcome.event(), &quiet] {
    let subs = n
      .store()
      .list_subscriptions(&SubscriptionQuery {
        event_id: Some(event.event_id),
        ..Default::default()
      })
      .await
      .unwrap();
    assert!(subs.is_empty());
  }
}

// ─── Fan-out ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn emit_notifies_every_follower_but_the_actor() {
  let (n, _) = setup().await;
  let mut extra = serde_json::Map::new();
  extra.insert("test".into(), json!("ok"));

  let outcome = n
    .emit(post("new_post", "Blog", "actor").extra_data(extra.clone()))
    .await
    .unwrap();
  let event = outcome.event().clone();
  assert!(matches!(outcome, EmitOutcome::Delivered { .. }));
  assert_eq!(outcome.notifications().len(), 2);

  assert!(all_for(&n, "actor", &event).await.is_empty());
  assert_eq!(all_for(&n, "follower2", &event).await.len(), 1);

  let notes = all_for(&n, "follower", &event).await;
  assert_eq!(notes.len(), 1);
  let note = &notes[0];
  assert_eq!(note.actor, user("actor"));
  assert_eq!(note.object_type, "blog_post");
  assert_eq!(note.object_id, "00");
  assert_eq!(note.extra_data, extra);
  assert_eq!(note.notify_channel, None);
  assert!(!note.read);
  assert_eq!(note.dispatch_time, T0);
}

#[tokio::test]
async fn emit_carries_notify_channel() {
  let (n, _) = setup().await;
  let outcome = n
    .emit(post("channel_post", "Blog", "actor").notify_channel("email"))
    .await
    .unwrap();
  assert!(
    outcome
      .notifications()
      .iter()
      .all(|note| note.notify_channel.as_deref() == Some("email"))
  );
}

#[tokio::test]
async fn repeated_emits_accumulate_notifications() {
  let (n, _) = setup().await;
  let mut event = None;
  for _ in 0..5 {
    event = Some(n.emit(post("repeat", "Blog", "actor")).await.unwrap().event().clone());
  }
  let event = event.unwrap();
  assert_eq!(all_for(&n, "follower", &event).await.len(), 5);
  assert_eq!(all_for(&n, "follower2", &event).await.len(), 5);
  assert!(all_for(&n, "actor", &event).await.is_empty());
}

#[tokio::test]
async fn missing_argument_is_reported() {
  let (n, _) = setup().await;
  let mut req = post("incomplete", "Blog", "actor");
  req.actor = None;
  let err = n.emit(req).await.unwrap_err();
  assert!(matches!(err, CoreError::MissingArgument("actor")));
  assert!(n.events(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn period_delays_delivery() {
  let (n, clock) = setup().await;
  let event = register(&n, "delayed", "c_period").await;
  n.update_subscription(
    &user("follower"),
    event.event_id,
    SubscriptionUpdate { period: Some(3600), ..Default::default() },
  )
  .await
  .unwrap();

  n.emit(post("delayed", "c_period", "actor")).await.unwrap();

  let notes = all_for(&n, "follower", &event).await;
  let note = &notes[0];
  assert_eq!(note.dispatch_time, 4600);

  let follower = DeliveryFilter::for_user("follower");
  assert!(n.deliverable(4000, follower.clone()).await.unwrap().is_empty());

  let due = n.deliverable(4600, follower.clone()).await.unwrap();
  assert_eq!(due.len(), 1);
  assert_eq!(due[0].notification_id, note.notification_id);

  // Still deliverable until marked read, then never again.
  clock.set(5000);
  assert_eq!(n.deliverable_now(follower.clone()).await.unwrap().len(), 1);
  assert_eq!(n.mark_read(vec![note.notification_id]).await.unwrap(), 1);
  assert!(n.deliverable_now(follower).await.unwrap().is_empty());
  assert_eq!(n.mark_read(vec![note.notification_id]).await.unwrap(), 0);
}

#[tokio::test]
async fn filter_can_skip_followers() {
  let (n, _) = setup().await;
  let outcome = n
    .emit(
      post("test_filter", "Blog", "actor")
        .filter(|sub, _| sub.follower.as_str() != "follower"),
    )
    .await
    .unwrap();
  let event = outcome.event().clone();
  assert!(all_for(&n, "follower", &event).await.is_empty());
  assert_eq!(all_for(&n, "follower2", &event).await.len(), 1);
}

#[tokio::test]
async fn filter_without_verdict_aborts_whole_fan_out() {
  let (n, _) = setup().await;
  let err = n
    .emit(post("bad_filter", "Blog", "actor").filter_verdict(|sub, _| {
      (sub.follower.as_str() != "follower2").then_some(true)
    }))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidFilterResult));

  let all = n
    .store()
    .list_notifications(&NotificationQuery::default())
    .await
    .unwrap();
  assert!(all.is_empty());
}

#[tokio::test]
async fn inactive_event_produces_nothing() {
  let (n, _) = setup().await;
  register(&n, "e_inactive", "c_inactive").await;
  register(&n, "e_inactive2", "c_inactive").await;

  assert_eq!(n.deactivate_category("c_inactive").await.unwrap(), 2);
  assert_eq!(n.deactivate_category("c_inactive").await.unwrap(), 2);
  assert!(n.events(Some("c_inactive".into())).await.unwrap().iter().all(|e| !e.active));

  let outcome = n.emit(post("e_inactive", "c_inactive", "actor")).await.unwrap();
  assert!(matches!(outcome, EmitOutcome::Suppressed { .. }));
  for follower in ["follower", "follower2", "actor"] {
    assert!(all_for(&n, follower, outcome.event()).await.is_empty());
  }

  n.activate_category("c_inactive").await.unwrap();
  let outcome = n.emit(post("e_inactive", "c_inactive", "actor")).await.unwrap();
  assert_eq!(outcome.notifications().len(), 2);
}

// ─── Follow / unfollow ───────────────────────────────────────────────────────

#[tokio::test]
async fn unfollow_actor_then_follow_again() {
  let (n, _) = setup().await;
  let event = register(&n, "actor_event", "c_actor").await;
  n.store().add_user("other".into()).await.unwrap();

  n.emit(post("actor_event", "c_actor", "actor")).await.unwrap();
  n.emit(post("actor_event", "c_actor", "follower2")).await.unwrap();
  assert_eq!(pending_for(&n, "follower", &event).await, 2);

  let summary = n
    .unfollow(&user("follower"), FollowTarget::Actor {
      actor: user("actor"),
      event: None,
    })
    .await
    .unwrap();
  assert_eq!(summary.retracted, 1);

  // Only the unfollowed actor's notification was retracted.
  let pending = n
    .deliverable_now(DeliveryFilter::for_user("follower"))
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].actor, user("follower2"));

  let outcome = n.emit(post("actor_event", "c_actor", "actor")).await.unwrap();
  assert_eq!(outcome.notifications().len(), 1);
  assert_eq!(outcome.notifications()[0].user, user("follower2"));

  n.follow(&user("follower"), FollowTarget::Actor {
    actor: user("actor"),
    event: Some(event.event_id),
  })
  .await
  .unwrap();
  let outcome = n.emit(post("actor_event", "c_actor", "actor")).await.unwrap();
  assert!(outcome.notifications().iter().any(|note| note.user == user("follower")));

  // Following never un-reads.
  assert_eq!(pending_for(&n, "follower", &event).await, 2);
}

#[tokio::test]
async fn unfollow_actor_scoped_to_event_leaves_other_events() {
  let (n, _) = setup().await;
  let e1 = register(&n, "scoped1", "c_scoped").await;
  let e2 = register(&n, "scoped2", "c_scoped").await;

  n.unfollow(&user("follower"), FollowTarget::Actor {
    actor: user("actor"),
    event: Some(e1.event_id),
  })
  .await
  .unwrap();

  n.emit(post("scoped1", "c_scoped", "actor")).await.unwrap();
  n.emit(post("scoped2", "c_scoped", "actor")).await.unwrap();
  assert!(all_for(&n, "follower", &e1).await.is_empty());
  assert_eq!(all_for(&n, "follower", &e2).await.len(), 1);
}

#[tokio::test]
async fn object_type_suppression_is_monotone_until_followed() {
  let (n, _) = setup().await;
  let event = register(&n, "typed", "c_typed").await;
  n.emit(post("typed", "c_typed", "actor")).await.unwrap();

  let summary = n
    .unfollow(&user("follower"), FollowTarget::ObjectType {
      object_type: "blog_post".into(),
      event:       Some(event.event_id),
    })
    .await
    .unwrap();
  assert_eq!(summary, herald_core::engine::MutationSummary {
    subscriptions: 1,
    retracted:     1,
  });

  for _ in 0..3 {
    n.emit(post("typed", "c_typed", "actor")).await.unwrap();
  }
  let mut comment = post("typed", "c_typed", "actor");
  comment.object_type = Some("comment".into());
  n.emit(comment).await.unwrap();

  let notes = all_for(&n, "follower", &event).await;
  assert_eq!(notes.len(), 2);
  assert_eq!(notes.iter().filter(|note| note.object_type == "blog_post").count(), 1);
  assert_eq!(pending_for(&n, "follower", &event).await, 1);

  n.follow(&user("follower"), FollowTarget::ObjectType {
    object_type: "blog_post".into(),
    event:       None,
  })
  .await
  .unwrap();
  n.emit(post("typed", "c_typed", "actor")).await.unwrap();
  assert_eq!(pending_for(&n, "follower", &event).await, 2);
}

#[tokio::test]
async fn unfollow_event_deactivates_only_that_subscription() {
  let (n, _) = setup().await;
  let e1 = register(&n, "ev1", "c_event").await;
  let e2 = register(&n, "ev2", "c_event").await;
  n.emit(post("ev1", "c_event", "actor")).await.unwrap();
  n.emit(post("ev2", "c_event", "actor")).await.unwrap();

  let summary = n
    .unfollow(&user("follower"), FollowTarget::All { event: Some(e1.event_id) })
    .await
    .unwrap();
  assert_eq!(summary.subscriptions, 1);
  assert_eq!(summary.retracted, 1);

  n.emit(post("ev1", "c_event", "actor")).await.unwrap();
  n.emit(post("ev2", "c_event", "actor")).await.unwrap();
  assert_eq!(all_for(&n, "follower", &e1).await.len(), 1);
  assert_eq!(pending_for(&n, "follower", &e1).await, 0);
  assert_eq!(pending_for(&n, "follower", &e2).await, 2);

  n.follow(&user("follower"), FollowTarget::All { event: Some(e1.event_id) })
    .await
    .unwrap();
  n.emit(post("ev1", "c_event", "actor")).await.unwrap();
  assert_eq!(pending_for(&n, "follower", &e1).await, 1);
}

#[tokio::test]
async fn unfollow_everything_silences_follower() {
  let (n, _) = setup().await;
  let e1 = register(&n, "all1", "c_all").await;
  let e2 = register(&n, "all2", "c_other").await;
  n.emit(post("all1", "c_all", "actor")).await.unwrap();

  n.unfollow(&user("follower"), FollowTarget::All { event: None })
    .await
    .unwrap();
  n.emit(post("all1", "c_all", "actor")).await.unwrap();
  n.emit(post("all2", "c_other", "actor")).await.unwrap();

  assert_eq!(pending_for(&n, "follower", &e1).await, 0);
  assert_eq!(pending_for(&n, "follower", &e2).await, 0);
  assert_eq!(pending_for(&n, "follower2", &e2).await, 1);
}

#[tokio::test]
async fn unfollow_category_spares_other_categories() {
  let (n, _) = setup().await;
  let e1 = register(&n, "cat1", "c_unfollow").await;
  let e2 = register(&n, "cat2", "c_unfollow").await;
  let e3 = register(&n, "cat3", "c_keep").await;

  for name in ["cat1", "cat2"] {
    n.emit(post(name, "c_unfollow", "actor")).await.unwrap();
  }
  n.emit(post("cat3", "c_keep", "actor")).await.unwrap();

  let summary = n
    .unfollow(&user("follower"), FollowTarget::Category {
      category: "c_unfollow".into(),
    })
    .await
    .unwrap();
  assert_eq!(summary.subscriptions, 2);
  assert_eq!(summary.retracted, 2);

  n.emit(post("cat3", "c_keep", "actor")).await.unwrap();
  for name in ["cat1", "cat2"] {
    n.emit(post(name, "c_unfollow", "actor")).await.unwrap();
  }

  assert_eq!(pending_for(&n, "follower", &e3).await, 2);
  assert_eq!(all_for(&n, "follower", &e3).await.len(), 2);
  for event in [&e1, &e2] {
    assert_eq!(pending_for(&n, "follower", event).await, 0);
    assert_eq!(all_for(&n, "follower", event).await.len(), 1);
    assert_eq!(pending_for(&n, "follower2", event).await, 2);
  }

  let inactive = n
    .store()
    .list_subscriptions(&SubscriptionQuery {
      follower: Some(user("follower")),
      active: Some(false),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(inactive.len(), 2);

  n.follow(&user("follower"), FollowTarget::Category {
    category: "c_unfollow".into(),
  })
  .await
  .unwrap();
  n.emit(post("cat3", "c_keep", "actor")).await.unwrap();
  for name in ["cat1", "cat2"] {
    n.emit(post(name, "c_unfollow", "actor")).await.unwrap();
  }
  assert_eq!(pending_for(&n, "follower", &e3).await, 3);
  assert_eq!(pending_for(&n, "follower", &e1).await, 1);
  assert_eq!(all_for(&n, "follower", &e2).await.len(), 2);
}

#[tokio::test]
async fn unfollow_retracts_pending_not_yet_due() {
  let (n, clock) = setup().await;
  let event = register(&n, "slow", "c_slow").await;
  n.update_subscription(
    &user("follower"),
    event.event_id,
    SubscriptionUpdate { period: Some(600), ..Default::default() },
  )
  .await
  .unwrap();
  n.emit(post("slow", "c_slow", "actor")).await.unwrap();

  n.unfollow(&user("follower"), FollowTarget::Category { category: "c_slow".into() })
    .await
    .unwrap();
  clock.advance(600);
  assert_eq!(pending_for(&n, "follower", &event).await, 0);
}

#[tokio::test]
async fn oversized_period_is_rejected_before_reaching_the_store() {
  let (n, _) = setup().await;
  let event = register(&n, "huge_period", "c").await;

  let err = n
    .update_subscription(&user("follower"), event.event_id, SubscriptionUpdate {
      period: Some(u64::MAX),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::BadArguments(_)), "{err}");
  assert!(err.is_caller_error());

  let sub = n
    .store()
    .get_subscription(user("follower"), event.event_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(sub.period, 0);
}

#[tokio::test]
async fn scoped_mutation_of_missing_subscription_is_not_found() {
  let (n, _) = setup().await;
  let quiet = n
    .resolve_or_create(NewEvent::new("quiet", "d", "c").without_auto_subscription())
    .await
    .unwrap();

  let err = n
    .unfollow(&user("follower"), FollowTarget::Actor {
      actor: user("actor"),
      event: Some(quiet.event_id),
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    CoreError::SubscriptionNotFound { ref follower, event }
      if *follower == user("follower") && event == quiet.event_id
  ));
}

#[tokio::test]
async fn loose_arguments_are_resolved_before_mutation() {
  let (n, _) = setup().await;
  register(&n, "loose", "c_loose").await;

  let target = FollowTarget::try_from(FollowArgs {
    category: Some("c_loose".into()),
    ..Default::default()
  })
  .unwrap();
  let summary = n.unfollow(&user("follower"), target).await.unwrap();
  assert_eq!(summary.subscriptions, 1);

  let err = FollowTarget::try_from(FollowArgs {
    actor: Some(user("actor")),
    object_id: Some("1".into()),
    ..Default::default()
  })
  .unwrap_err();
  assert!(matches!(err, CoreError::BadArguments(_)));
}

#[tokio::test]
async fn object_rules_edited_directly_suppress_single_objects() {
  let (n, _) = setup().await;
  let event = register(&n, "objects", "c_objects").await;
  n.update_subscription(
    &user("follower"),
    event.event_id,
    SubscriptionUpdate {
      add_rules: vec![SuppressionRule::Object {
        object_type: "blog_post".into(),
        object_id:   "00".into(),
      }],
      ..Default::default()
    },
  )
  .await
  .unwrap();

  n.emit(post("objects", "c_objects", "actor")).await.unwrap();
  let mut other = post("objects", "c_objects", "actor");
  other.object_id = Some("01".into());
  n.emit(other).await.unwrap();

  let notes = all_for(&n, "follower", &event).await;
  assert_eq!(notes.len(), 1);
  assert_eq!(notes[0].object_id, "01");
}

// ─── Delivery ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deliverable_filters_by_category_and_actor() {
  let (n, _) = setup().await;
  n.emit(post("d1", "c_news", "actor")).await.unwrap();
  n.emit(post("d2", "c_sports", "actor")).await.unwrap();
  n.emit(post("d3", "c_news", "follower2")).await.unwrap();

  let news = n
    .deliverable_now(DeliveryFilter {
      user: Some(user("follower")),
      category: Some("c_news".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(news.len(), 2);

  let by_actor = n
    .deliverable_now(DeliveryFilter {
      user: Some(user("follower")),
      actor: Some(user("follower2")),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_actor.len(), 1);
  assert_eq!(by_actor[0].object_type, "blog_post");
}

#[tokio::test]
async fn mark_read_with_no_ids_touches_nothing() {
  let (n, _) = setup().await;
  n.emit(post("noop", "c", "actor")).await.unwrap();
  assert_eq!(n.mark_read(Vec::new()).await.unwrap(), 0);
  assert_eq!(
    n.deliverable_now(DeliveryFilter::default()).await.unwrap().len(),
    2
  );
}

#[tokio::test]
async fn mark_read_accepts_id_sets_beyond_the_parameter_limit() {
  let (n, clock) = setup().await;
  n.emit(post("bulk", "c", "actor")).await.unwrap();
  let due = n.deliverable_now(DeliveryFilter::default()).await.unwrap();
  assert_eq!(due.len(), 2);
  assert!(due.iter().all(|note| note.is_deliverable(clock.now())));

  // SQLite caps host parameters at 32766 per statement.
  let mut ids: Vec<Uuid> = (0..40_000).map(|_| Uuid::new_v4()).collect();
  ids.extend(due.iter().map(|note| note.notification_id));

  let listed = n
    .store()
    .list_notifications(&NotificationQuery { ids: ids.clone(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(listed.len(), 2);

  assert_eq!(n.mark_read(ids).await.unwrap(), 2);
  assert!(n.deliverable_now(DeliveryFilter::default()).await.unwrap().is_empty());
}
