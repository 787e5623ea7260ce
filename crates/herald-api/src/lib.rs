//! JSON REST API for Herald.
//!
//! Exposes an axum [`Router`] backed by a [`Notifier`] over any
//! [`NotifyStore`]. Auth and TLS are left to the caller.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", herald_api::api_router(notifier.clone()))
//! ```

pub mod error;
pub mod events;
pub mod follow;
pub mod notifications;
pub mod subscriptions;

use axum::{
  Router,
  routing::{get, patch, post},
};
use herald_core::{engine::Notifier, store::NotifyStore};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build a fully-materialised API router for `notifier`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(notifier: Notifier<S>) -> Router<()>
where
  S: NotifyStore + 'static,
{
  Router::new()
    // Events
    .route("/emit", post(events::emit::<S>))
    .route("/events", get(events::list::<S>))
    .route("/categories/{category}/activate", post(events::activate::<S>))
    .route("/categories/{category}/deactivate", post(events::deactivate::<S>))
    // Users and their subscriptions
    .route("/users", post(subscriptions::register_user::<S>))
    .route("/users/{user}/follow", post(follow::follow::<S>))
    .route("/users/{user}/unfollow", post(follow::unfollow::<S>))
    .route("/users/{user}/subscriptions", get(subscriptions::list::<S>))
    .route(
      "/users/{user}/subscriptions/{event_id}",
      patch(subscriptions::update::<S>),
    )
    // Delivery
    .route("/notifications/deliverable", get(notifications::deliverable::<S>))
    .route("/notifications/read", post(notifications::mark_read::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(notifier)
}
