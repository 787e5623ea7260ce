//! Handlers for users and their subscriptions.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/users` | Body: `{"user":"alice"}`; registers in the directory |
//! | `GET`   | `/users/:user/subscriptions` | |
//! | `PATCH` | `/users/:user/subscriptions/:event_id` | Body: [`SubscriptionUpdate`] |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use herald_core::{
  engine::Notifier,
  store::NotifyStore,
  subscription::{Subscription, SubscriptionUpdate},
  user::UserId,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub user: UserId,
}

/// `POST /users`
pub async fn register_user<S>(
  State(notifier): State<Notifier<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<StatusCode, ApiError>
where
  S: NotifyStore + 'static,
{
  notifier
    .store()
    .add_user(body.user)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /users/:user/subscriptions`
pub async fn list<S>(
  State(notifier): State<Notifier<S>>,
  Path(user): Path<UserId>,
) -> Result<Json<Vec<Subscription>>, ApiError>
where
  S: NotifyStore + 'static,
{
  Ok(Json(notifier.subscriptions(&user).await?))
}

/// `PATCH /users/:user/subscriptions/:event_id`
pub async fn update<S>(
  State(notifier): State<Notifier<S>>,
  Path((user, event_id)): Path<(UserId, Uuid)>,
  Json(body): Json<SubscriptionUpdate>,
) -> Result<Json<Subscription>, ApiError>
where
  S: NotifyStore + 'static,
{
  Ok(Json(notifier.update_subscription(&user, event_id, body).await?))
}
