//! Handlers for `/users/:user/follow` and `/users/:user/unfollow`.
//!
//! Both accept either a tagged [`FollowTarget`] (`{"target": "actor", ...}`)
//! or loose [`FollowArgs`]; the latter are resolved server-side and rejected
//! with 400 when the combination is unsupported.

use axum::{
  Json,
  extract::{Path, State},
};
use herald_core::{
  engine::{FollowArgs, FollowTarget, MutationSummary, Notifier},
  store::NotifyStore,
  user::UserId,
};
use serde_json::Value;

use crate::error::ApiError;

/// Resolve a request body into a [`FollowTarget`]. Bodies carrying a
/// `target` key must parse as one; anything else is read as [`FollowArgs`].
fn parse_target(body: Value) -> Result<FollowTarget, ApiError> {
  let tagged = body.get("target").is_some();
  if tagged {
    serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))
  } else {
    let args: FollowArgs = serde_json::from_value(body)
      .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(FollowTarget::try_from(args)?)
  }
}

/// `POST /users/:user/follow`
pub async fn follow<S>(
  State(notifier): State<Notifier<S>>,
  Path(user): Path<UserId>,
  Json(body): Json<Value>,
) -> Result<Json<MutationSummary>, ApiError>
where
  S: NotifyStore + 'static,
{
  let target = parse_target(body)?;
  Ok(Json(notifier.follow(&user, target).await?))
}

/// `POST /users/:user/unfollow`
pub async fn unfollow<S>(
  State(notifier): State<Notifier<S>>,
  Path(user): Path<UserId>,
  Json(body): Json<Value>,
) -> Result<Json<MutationSummary>, ApiError>
where
  S: NotifyStore + 'static,
{
  let target = parse_target(body)?;
  Ok(Json(notifier.unfollow(&user, target).await?))
}
