//! Handlers for the delivery read path.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notifications/deliverable` | Optional `user`, `event_id`, `actor`, `object_type`, `category`, `now` |
//! | `POST` | `/notifications/read` | Body: `{"ids":[...]}`; returns `{"read": n}` |

use axum::{
  Json,
  extract::{Query, State},
};
use herald_core::{
  engine::{DeliveryFilter, Notifier},
  notification::Notification,
  store::NotifyStore,
  user::UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize, Default)]
pub struct DeliverableParams {
  pub user:        Option<UserId>,
  pub event_id:    Option<Uuid>,
  pub actor:       Option<UserId>,
  pub object_type: Option<String>,
  pub category:    Option<String>,
  /// Epoch seconds; defaults to the server clock.
  pub now:         Option<i64>,
}

/// `GET /notifications/deliverable[?user=...][&category=...][&now=...]`
pub async fn deliverable<S>(
  State(notifier): State<Notifier<S>>,
  Query(params): Query<DeliverableParams>,
) -> Result<Json<Vec<Notification>>, ApiError>
where
  S: NotifyStore + 'static,
{
  let filter = DeliveryFilter {
    user:        params.user,
    event_id:    params.event_id,
    actor:       params.actor,
    object_type: params.object_type,
    category:    params.category,
  };
  let now = params.now.unwrap_or_else(|| notifier.now());
  Ok(Json(notifier.deliverable(now, filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
  pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
  pub read: usize,
}

/// `POST /notifications/read`
pub async fn mark_read<S>(
  State(notifier): State<Notifier<S>>,
  Json(body): Json<MarkReadBody>,
) -> Result<Json<MarkedRead>, ApiError>
where
  S: NotifyStore + 'static,
{
  let read = notifier.mark_read(body.ids).await?;
  Ok(Json(MarkedRead { read }))
}
