//! The `EventStore` and `MembershipStore` traits and supporting types.
//!
//! The traits are implemented by storage backends (e.g.
//! `clubcal-store-sqlite`). [`crate::service::EventService`] depends on this
//! abstraction, not on any concrete backend.

use std::{collections::HashMap, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  event::{Event, EventFields, EventStatus, MediaUrls, Visibility},
  membership::Role,
};

// ─── Write types ─────────────────────────────────────────────────────────────

/// Input to [`EventStore::insert_event`]. The store assigns the id, the
/// timestamps and `version = 1`.
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub organization_id: Uuid,
  pub fields:          EventFields,
  pub created_by:      Uuid,
}

/// What happened to a conditional row write.
#[derive(Debug, Clone)]
pub enum RowUpdate {
  Applied(Event),
  /// No row with that id.
  Missing,
  /// The row exists but its version differs from the expected one. Nothing
  /// was written.
  Stale { current_version: i64 },
}

// ─── Read types ──────────────────────────────────────────────────────────────

/// The association-table contents for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAssociations {
  pub major_ids: Vec<Uuid>,
  pub tags:      Vec<String>,
}

/// Parameters for [`EventStore::list_events`]. All filters are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
  pub organization_id: Option<Uuid>,
  pub status:          Option<EventStatus>,
  pub visibility:      Option<Visibility>,
  /// Inclusive lower bound on `starts_at`.
  pub starts_from:     Option<DateTime<Utc>>,
  /// Inclusive upper bound on `starts_at`.
  pub starts_until:    Option<DateTime<Utc>>,
  /// `None` means no limit.
  pub limit:           Option<usize>,
  pub offset:          Option<usize>,
}

/// One page of events ordered by `starts_at`, plus the unpaged match count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPage {
  pub events: Vec<Event>,
  pub total:  u64,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Persistence for event rows and their two association tables.
///
/// Each method is one round-trip. The event row and the two association
/// tables are written by separate calls; no method spans more than one of
/// them, and deleting an event row must cascade to both association tables.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Rows ──────────────────────────────────────────────────────────────

  /// Retrieve an event by id. Returns `None` if not found.
  fn get_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Insert a new event row and return it as persisted.
  fn insert_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Overwrite the caller-controlled columns of an event and bump its
  /// version.
  ///
  /// With `expected_version = Some(v)` the write only happens while the
  /// stored version is still `v`; otherwise it is last-write-wins.
  fn update_event(
    &self,
    event_id: Uuid,
    fields: EventFields,
    updated_by: Uuid,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<RowUpdate, Self::Error>> + Send + '_;

  /// Set the media URL columns. A `None` field leaves that column unchanged.
  /// Never returns [`RowUpdate::Stale`].
  fn set_media(
    &self,
    event_id: Uuid,
    media: MediaUrls,
    updated_by: Uuid,
  ) -> impl Future<Output = Result<RowUpdate, Self::Error>> + Send + '_;

  /// Delete an event row (and, by cascade, its associations). Returns
  /// `false` if there was nothing to delete.
  fn delete_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// List events matching `query`, ordered by `starts_at` ascending.
  fn list_events<'a>(
    &'a self,
    query: &'a EventQuery,
  ) -> impl Future<Output = Result<EventPage, Self::Error>> + Send + 'a;

  // ── Associations ──────────────────────────────────────────────────────

  /// Delete every major association of the event, then insert `major_ids`.
  fn replace_majors(
    &self,
    event_id: Uuid,
    major_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete every tag association of the event, then insert `tags`.
  fn replace_tags(
    &self,
    event_id: Uuid,
    tags: Vec<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Fetch associations for a batch of events. Events without any
  /// association rows may be absent from the map.
  fn get_associations(
    &self,
    event_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<HashMap<Uuid, EventAssociations>, Self::Error>>
  + Send
  + '_;
}

/// Read-only access to club memberships, which are owned elsewhere.
pub trait MembershipStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The user's role in the organization, or `None` for non-members.
  fn role_of(
    &self,
    organization_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + '_;
}
