//! Event registry: get-or-create, auto-subscription seeding and category
//! activation.

use tracing::{debug, info};

use super::Notifier;
use crate::{
  Error, Result,
  event::{Event, NewEvent},
  store::NotifyStore,
  subscription::NewSubscription,
};

/// Users fetched from the directory per round trip while seeding.
pub const USER_PAGE_SIZE: usize = 500;

impl<S: NotifyStore> Notifier<S> {
  /// Return the event called `input.name`, creating it if needed.
  ///
  /// An existing event is returned unchanged; description, category and
  /// `auto_subscription` of later calls are ignored. A newly created event
  /// with `auto_subscription` gets one subscription per known user, with the
  /// period that user already uses for the category (0 if none).
  pub async fn resolve_or_create(&self, input: NewEvent) -> Result<Event> {
    if let Some(event) = self.find_event(&input.name).await? {
      return Ok(event);
    }

    let name = input.name.clone();
    let Some(event) = self.store.insert_event(input).await.map_err(Error::store)?
    else {
      // Lost a get-or-create race. The winner does the seeding.
      debug!(event = %name, "event created concurrently, reusing it");
      return self
        .find_event(&name)
        .await?
        .ok_or(Error::EventNotFound(name));
    };

    info!(
      event = %event.name,
      category = %event.category,
      auto_subscription = event.auto_subscription,
      "registered event"
    );

    if event.auto_subscription {
      let seeded = self.seed_subscriptions(&event).await?;
      debug!(event = %event.name, seeded, "seeded subscriptions");
    }

    Ok(event)
  }

  /// Look up a registered event by id.
  pub async fn event(&self, id: uuid::Uuid) -> Result<Event> {
    self
      .store
      .get_event(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::EventNotFound(id.to_string()))
  }

  /// All registered events, optionally restricted to a category.
  pub async fn events(&self, category: Option<String>) -> Result<Vec<Event>> {
    self.store.list_events(category).await.map_err(Error::store)
  }

  /// Re-enable fan-out for every event in `category`.
  pub async fn activate_category(&self, category: &str) -> Result<usize> {
    self.set_category_active(category, true).await
  }

  /// Disable fan-out for every event in `category`. Subscriptions are left
  /// untouched. Idempotent.
  pub async fn deactivate_category(&self, category: &str) -> Result<usize> {
    self.set_category_active(category, false).await
  }

  pub async fn set_category_active(
    &self,
    category: &str,
    active: bool,
  ) -> Result<usize> {
    let touched = self
      .store
      .set_category_active(category.to_owned(), active)
      .await
      .map_err(Error::store)?;
    info!(category, active, events = touched, "set category activity");
    Ok(touched)
  }

  async fn find_event(&self, name: &str) -> Result<Option<Event>> {
    self
      .store
      .get_event_by_name(name.to_owned())
      .await
      .map_err(Error::store)
  }

  /// Subscribe every known user to `event`, streaming the user directory one
  /// page at a time.
  async fn seed_subscriptions(&self, event: &Event) -> Result<usize> {
    let min_periods = self
      .store
      .min_periods_in_category(event.category.clone())
      .await
      .map_err(Error::store)?;

    let mut seeded = 0;
    let mut after = None;
    loop {
      let page = self
        .store
        .list_users(after.take(), USER_PAGE_SIZE)
        .await
        .map_err(Error::store)?;
      let full_page = page.len() == USER_PAGE_SIZE;
      after = page.last().cloned();

      for user in page {
        let period = min_periods.get(&user).copied().unwrap_or(0);
        self
          .store
          .create_subscription(
            NewSubscription::new(user, event.event_id).with_period(period),
          )
          .await
          .map_err(Error::store)?;
        seeded += 1;
      }

      if !full_page {
        return Ok(seeded);
      }
    }
  }
}
