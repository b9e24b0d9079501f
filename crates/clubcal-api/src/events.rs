//! Handlers for `/clubs/{club_id}/events` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/clubs/{club_id}/events` | `?status`, `starts_from`, `starts_until`, `limit`, `offset` |
//! | `POST`   | `/clubs/{club_id}/events` | Body: [`EventInput`]; returns 201 |
//! | `GET`    | `/clubs/{club_id}/events/{event_id}` | Details plus `ETag` |
//! | `PUT`    | `/clubs/{club_id}/events/{event_id}` | Body: [`EventInput`]; honours `If-Match` |
//! | `DELETE` | `/clubs/{club_id}/events/{event_id}` | |
//! | `PUT`    | `/clubs/{club_id}/events/{event_id}/media` | Body: [`MediaUrls`] |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use clubcal_core::{
  event::MediaUrls,
  input::EventInput,
  service::EventListFilter,
  store::{EventStore, MembershipStore},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  etag::{compute_etag, if_match_satisfied},
  identity::Caller,
};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /clubs/{club_id}/events`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(club_id): Path<Uuid>,
  Query(filter): Query<EventListFilter>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EventStore + MembershipStore + 'static,
{
  let page = state
    .service
    .list_organization_events(caller, club_id, filter)
    .await?;
  Ok(Json(json!({ "ok": true, "events": page.events, "total": page.total })))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /clubs/{club_id}/events`. Returns 201 with the new id and any
/// association warnings.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(club_id): Path<Uuid>,
  Json(body): Json<EventInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EventStore + MembershipStore + 'static,
{
  let outcome = state.service.create_event(caller, club_id, body).await?;
  let warnings = outcome.warnings().to_vec();
  Ok((
    StatusCode::CREATED,
    Json(json!({
      "ok": true,
      "event_id": outcome.into_value(),
      "warnings": warnings,
    })),
  ))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /clubs/{club_id}/events/{event_id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path((club_id, event_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EventStore + MembershipStore + 'static,
{
  let details = state
    .service
    .event_details(caller, club_id, event_id)
    .await?;
  let etag = compute_etag(&details.event);
  Ok((
    [(header::ETAG, etag)],
    Json(json!({ "ok": true, "event": details })),
  ))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /clubs/{club_id}/events/{event_id}`
///
/// With `If-Match`, the tag is checked against the current row and the
/// matching version is forwarded so a concurrent write in between is also
/// caught. The row is only resolved for callers who may update it.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path((club_id, event_id)): Path<(Uuid, Uuid)>,
  headers: HeaderMap,
  Json(body): Json<EventInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EventStore + MembershipStore + 'static,
{
  let if_match = headers
    .get(header::IF_MATCH)
    .map(|v| v.to_str().map(str::to_owned))
    .transpose()
    .map_err(|_| ApiError::BadRequest("If-Match is not valid ASCII".into()))?;

  let expected_version = match if_match.as_deref() {
    None | Some("*") => None,
    Some(tag) => {
      let current = state
        .service
        .editable_event(caller, club_id, event_id)
        .await?;
      if !if_match_satisfied(tag, &compute_etag(&current)) {
        tracing::debug!(%event_id, "If-Match mismatch");
        return Err(ApiError::PreconditionFailed);
      }
      Some(current.version)
    }
  };

  let outcome = state
    .service
    .update_event(caller, club_id, event_id, body, expected_version)
    .await?;
  let warnings = outcome.warnings().to_vec();
  let event = outcome.into_value();
  Ok((
    [(header::ETAG, compute_etag(&event))],
    Json(json!({ "ok": true, "event": event, "warnings": warnings })),
  ))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /clubs/{club_id}/events/{event_id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path((club_id, event_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EventStore + MembershipStore + 'static,
{
  state.service.delete_event(caller, club_id, event_id).await?;
  Ok(Json(json!({ "ok": true })))
}

// ─── Media ───────────────────────────────────────────────────────────────────

/// `PUT /clubs/{club_id}/events/{event_id}/media`
pub async fn attach_media<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path((club_id, event_id)): Path<(Uuid, Uuid)>,
  Json(media): Json<MediaUrls>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EventStore + MembershipStore + 'static,
{
  let event = state
    .service
    .attach_media(caller, club_id, event_id, media)
    .await?;
  Ok((
    [(header::ETAG, compute_etag(&event))],
    Json(json!({ "ok": true, "event": event })),
  ))
}
