//! Handlers for emitting occurrences and managing event categories.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/emit` | Body: [`EmitRequest`]; returns 201 + [`EmitOutcome`] |
//! | `GET`  | `/events` | Optional `?category=` |
//! | `POST` | `/categories/:category/activate` | Returns `{"events": n}` |
//! | `POST` | `/categories/:category/deactivate` | Returns `{"events": n}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use herald_core::{
  engine::{EmitOutcome, EmitRequest, Notifier},
  event::Event,
  store::NotifyStore,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// `POST /emit`. Missing required keys yield 400.
pub async fn emit<S>(
  State(notifier): State<Notifier<S>>,
  Json(body): Json<EmitRequest>,
) -> Result<(StatusCode, Json<EmitOutcome>), ApiError>
where
  S: NotifyStore + 'static,
{
  let outcome = notifier.emit(body).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub category: Option<String>,
}

/// `GET /events[?category=<category>]`
pub async fn list<S>(
  State(notifier): State<Notifier<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: NotifyStore + 'static,
{
  Ok(Json(notifier.events(params.category).await?))
}

#[derive(Debug, Serialize)]
pub struct CategoryToggled {
  pub category: String,
  pub active:   bool,
  pub events:   usize,
}

/// `POST /categories/:category/activate`
pub async fn activate<S>(
  State(notifier): State<Notifier<S>>,
  Path(category): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NotifyStore + 'static,
{
  let events = notifier.activate_category(&category).await?;
  Ok(Json(CategoryToggled { category, active: true, events }))
}

/// `POST /categories/:category/deactivate`
pub async fn deactivate<S>(
  State(notifier): State<Notifier<S>>,
  Path(category): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NotifyStore + 'static,
{
  let events = notifier.deactivate_category(&category).await?;
  Ok(Json(CategoryToggled { category, active: false, events }))
}
