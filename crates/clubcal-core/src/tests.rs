//! Service tests against an in-memory store with injectable faults.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::{
  Action, Error,
  calendar::CalendarFilter,
  event::{Event, EventFields, EventStatus, LocationType, MediaUrls, Visibility},
  input::EventInput,
  membership::Role,
  service::{
    AssociationKind, EventListFilter, EventService, ListingInvalidator, MAX_CALENDAR_EVENTS,
    WriteOutcome,
  },
  store::{
    EventAssociations, EventPage, EventQuery, EventStore, MembershipStore, NewEvent,
    RowUpdate,
  },
};

// ─── Test doubles ────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MemoryError(&'static str);

#[derive(Default)]
struct State {
  events:      HashMap<Uuid, Event>,
  majors:      HashMap<Uuid, Vec<Uuid>>,
  tags:        HashMap<Uuid, Vec<String>>,
  roles:       HashMap<(Uuid, Uuid), Role>,
  row_writes:  usize,
  fail_rows:   bool,
  fail_majors: bool,
  fail_tags:   bool,
}

#[derive(Clone, Default)]
struct MemoryStore(Arc<Mutex<State>>);

impl MemoryStore {
  fn state(&self) -> std::sync::MutexGuard<'_, State> { self.0.lock().unwrap() }

  fn grant(&self, organization_id: Uuid, user_id: Uuid, role: Role) {
    self.state().roles.insert((organization_id, user_id), role);
  }

  /// Insert a row directly, bypassing every gate.
  fn seed(&self, event: Event) { self.state().events.insert(event.event_id, event); }

  fn event(&self, event_id: Uuid) -> Option<Event> {
    self.state().events.get(&event_id).cloned()
  }

  fn majors_of(&self, event_id: Uuid) -> Vec<Uuid> {
    self.state().majors.get(&event_id).cloned().unwrap_or_default()
  }

  fn tags_of(&self, event_id: Uuid) -> Vec<String> {
    self.state().tags.get(&event_id).cloned().unwrap_or_default()
  }

  fn row_writes(&self) -> usize { self.state().row_writes }
}

impl EventStore for MemoryStore {
  type Error = MemoryError;

  async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, MemoryError> {
    Ok(self.event(event_id))
  }

  async fn insert_event(&self, input: NewEvent) -> Result<Event, MemoryError> {
    let mut s = self.state();
    if s.fail_rows {
      return Err(MemoryError("disk I/O error"));
    }
    let now = Utc::now();
    let event = Event {
      event_id:        Uuid::new_v4(),
      organization_id: input.organization_id,
      fields:          input.fields,
      created_by:      Some(input.created_by),
      updated_by:      Some(input.created_by),
      created_at:      now,
      updated_at:      now,
      version:         1,
    };
    s.row_writes += 1;
    s.events.insert(event.event_id, event.clone());
    Ok(event)
  }

  async fn update_event(
    &self,
    event_id: Uuid,
    fields: EventFields,
    updated_by: Uuid,
    expected_version: Option<i64>,
  ) -> Result<RowUpdate, MemoryError> {
    let mut s = self.state();
    if s.fail_rows {
      return Err(MemoryError("disk I/O error"));
    }
    let Some(event) = s.events.get_mut(&event_id) else {
      return Ok(RowUpdate::Missing);
    };
    if expected_version.is_some_and(|v| v != event.version) {
      return Ok(RowUpdate::Stale { current_version: event.version });
    }
    event.fields = fields;
    event.updated_by = Some(updated_by);
    event.updated_at = Utc::now();
    event.version += 1;
    let event = event.clone();
    s.row_writes += 1;
    Ok(RowUpdate::Applied(event))
  }

  async fn set_media(
    &self,
    event_id: Uuid,
    media: MediaUrls,
    updated_by: Uuid,
  ) -> Result<RowUpdate, MemoryError> {
    let mut s = self.state();
    let Some(event) = s.events.get_mut(&event_id) else {
      return Ok(RowUpdate::Missing);
    };
    if media.banner_url.is_some() {
      event.fields.media.banner_url = media.banner_url;
    }
    if media.thumbnail_url.is_some() {
      event.fields.media.thumbnail_url = media.thumbnail_url;
    }
    event.updated_by = Some(updated_by);
    event.version += 1;
    let event = event.clone();
    s.row_writes += 1;
    Ok(RowUpdate::Applied(event))
  }

  async fn delete_event(&self, event_id: Uuid) -> Result<bool, MemoryError> {
    let mut s = self.state();
    s.majors.remove(&event_id);
    s.tags.remove(&event_id);
    Ok(s.events.remove(&event_id).is_some())
  }

  async fn list_events<'a>(
    &'a self,
    query: &'a EventQuery,
  ) -> Result<EventPage, MemoryError> {
    let s = self.state();
    let mut events: Vec<Event> = s
      .events
      .values()
      .filter(|e| query.organization_id.is_none_or(|o| e.organization_id == o))
      .filter(|e| query.status.is_none_or(|st| e.fields.status == st))
      .filter(|e| query.visibility.is_none_or(|v| e.fields.visibility == v))
      .filter(|e| query.starts_from.is_none_or(|f| e.fields.starts_at >= f))
      .filter(|e| query.starts_until.is_none_or(|u| e.fields.starts_at <= u))
      .cloned()
      .collect();
    events.sort_by_key(|e| e.fields.starts_at);
    let total = events.len() as u64;
    let events = events
      .into_iter()
      .skip(query.offset.unwrap_or(0))
      .take(query.limit.unwrap_or(usize::MAX))
      .collect();
    Ok(EventPage { events, total })
  }

  async fn replace_majors(
    &self,
    event_id: Uuid,
    major_ids: Vec<Uuid>,
  ) -> Result<(), MemoryError> {
    let mut s = self.state();
    // The delete half always lands; the insert half is what fails.
    s.majors.remove(&event_id);
    if s.fail_majors && !major_ids.is_empty() {
      return Err(MemoryError("FOREIGN KEY constraint failed"));
    }
    if !major_ids.is_empty() {
      s.majors.insert(event_id, major_ids);
    }
    Ok(())
  }

  async fn replace_tags(
    &self,
    event_id: Uuid,
    tags: Vec<String>,
  ) -> Result<(), MemoryError> {
    let mut s = self.state();
    s.tags.remove(&event_id);
    if s.fail_tags {
      return Err(MemoryError("database is locked"));
    }
    if !tags.is_empty() {
      s.tags.insert(event_id, tags);
    }
    Ok(())
  }

  async fn get_associations(
    &self,
    event_ids: Vec<Uuid>,
  ) -> Result<HashMap<Uuid, EventAssociations>, MemoryError> {
    let s = self.state();
    Ok(
      event_ids
        .into_iter()
        .map(|id| {
          let assoc = EventAssociations {
            major_ids: s.majors.get(&id).cloned().unwrap_or_default(),
            tags:      s.tags.get(&id).cloned().unwrap_or_default(),
          };
          (id, assoc)
        })
        .collect(),
    )
  }
}

impl MembershipStore for MemoryStore {
  type Error = MemoryError;

  async fn role_of(
    &self,
    organization_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<Role>, MemoryError> {
    Ok(self.state().roles.get(&(organization_id, user_id)).copied())
  }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Uuid>>>);

impl Recorder {
  fn signals(&self) -> Vec<Uuid> { self.0.lock().unwrap().clone() }
}

impl ListingInvalidator for Recorder {
  fn invalidate(&self, organization_id: Uuid) {
    self.0.lock().unwrap().push(organization_id);
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

type Service = EventService<MemoryStore, MemoryStore, Recorder, DateTime<Utc>>;

struct Club {
  store:       MemoryStore,
  invalidated: Recorder,
  service:     Service,
  org:         Uuid,
  admin:       Uuid,
  officer:     Uuid,
  member:      Uuid,
  stranger:    Uuid,
}

fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2030, 3, 1, 12, 0, 0).unwrap() }

fn club() -> Club {
  let store = MemoryStore::default();
  let invalidated = Recorder::default();
  let org = Uuid::new_v4();
  let (admin, officer, member) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  store.grant(org, admin, Role::Admin);
  store.grant(org, officer, Role::Officer);
  store.grant(org, member, Role::Member);

  let service = EventService::new(store.clone(), store.clone(), invalidated.clone())
    .with_clock(now());

  Club {
    store,
    invalidated,
    service,
    org,
    admin,
    officer,
    member,
    stranger: Uuid::new_v4(),
  }
}

/// A valid, all-majors, on-campus event starting tomorrow.
fn input() -> EventInput {
  EventInput {
    title: "Game Night".into(),
    starts_at: now() + Duration::days(1),
    ends_at: Some(now() + Duration::days(1) + Duration::hours(3)),
    location_type: LocationType::OnCampus,
    location_name: Some("Student Union 204".into()),
    status: EventStatus::Published,
    is_all_majors: true,
    ..Default::default()
  }
}

fn past_event(org: Uuid) -> Event {
  let starts_at = now() - Duration::days(2);
  let mut raw = input();
  raw.starts_at = starts_at;
  raw.ends_at = Some(starts_at + Duration::hours(2));
  let fields = raw.normalize().unwrap().fields;
  Event {
    event_id: Uuid::new_v4(),
    organization_id: org,
    fields,
    created_by: None,
    updated_by: None,
    created_at: starts_at - Duration::days(7),
    updated_at: starts_at - Duration::days(7),
    version: 1,
  }
}

async fn create(c: &Club, input: EventInput) -> Uuid {
  c.service
    .create_event(c.officer, c.org, input)
    .await
    .unwrap()
    .into_value()
}

// ─── Authorization ───────────────────────────────────────────────────────────

#[tokio::test]
async fn non_member_cannot_create_and_nothing_is_written() {
  let c = club();
  let err = c.service.create_event(c.stranger, c.org, input()).await.unwrap_err();

  assert!(matches!(err, Error::NotAMember));
  assert_eq!(err.to_string(), "You are not a member of this club");
  assert_eq!(c.store.row_writes(), 0);
  assert!(c.invalidated.signals().is_empty());
}

#[tokio::test]
async fn plain_member_cannot_create() {
  let c = club();
  let err = c.service.create_event(c.member, c.org, input()).await.unwrap_err();

  assert!(matches!(err, Error::InsufficientRole { action: Action::Create }));
  assert_eq!(err.to_string(), "Only club admins and officers can create events");
  assert_eq!(c.store.row_writes(), 0);
}

#[tokio::test]
async fn plain_member_cannot_update() {
  let c = club();
  let event_id = create(&c, input()).await;
  let before = c.store.event(event_id).unwrap();
  let (writes, signals) = (c.store.row_writes(), c.invalidated.signals());

  let mut edit = input();
  edit.title = "Renamed".into();
  let err = c
    .service
    .update_event(c.member, c.org, event_id, edit, Some(before.version))
    .await
    .unwrap_err();

  assert!(matches!(err, Error::InsufficientRole { action: Action::Update }));
  assert_eq!(err.to_string(), "Only club admins and officers can update events");
  assert_eq!(c.store.event(event_id).unwrap(), before);
  assert_eq!(c.store.row_writes(), writes);
  assert_eq!(c.invalidated.signals(), signals);
}

#[tokio::test]
async fn plain_member_cannot_delete() {
  let c = club();
  let event_id = create(&c, input()).await;
  let (writes, signals) = (c.store.row_writes(), c.invalidated.signals());

  let err = c
    .service
    .delete_event(c.member, c.org, event_id)
    .await
    .unwrap_err();

  assert!(matches!(err, Error::InsufficientRole { action: Action::Delete }));
  assert!(c.store.event(event_id).is_some());
  assert_eq!(c.store.row_writes(), writes);
  assert_eq!(c.invalidated.signals(), signals);
}

#[tokio::test]
async fn editable_event_is_gated_like_an_update() {
  let c = club();
  let mut draft = input();
  draft.status = EventStatus::Draft;
  let event_id = create(&c, draft).await;

  // A member learns nothing about the event, not even whether it exists.
  let err = c
    .service
    .editable_event(c.member, c.org, event_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InsufficientRole { action: Action::Update }));

  let err = c
    .service
    .editable_event(c.member, c.org, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InsufficientRole { action: Action::Update }));

  let event = c
    .service
    .editable_event(c.officer, c.org, event_id)
    .await
    .unwrap();
  assert_eq!(event.event_id, event_id);
}

#[tokio::test]
async fn officers_and_admins_can_create() {
  let c = club();
  for caller in [c.officer, c.admin] {
    let outcome = c.service.create_event(caller, c.org, input()).await.unwrap();
    assert!(outcome.is_complete());
    let event = c.store.event(*outcome.value()).unwrap();
    assert_eq!(event.organization_id, c.org);
    assert_eq!(event.created_by, Some(caller));
  }
  assert_eq!(c.invalidated.signals(), [c.org, c.org]);
}

#[tokio::test]
async fn membership_in_another_club_does_not_count() {
  let c = club();
  let other_org = Uuid::new_v4();
  c.store.grant(other_org, c.stranger, Role::Admin);

  let err = c.service.create_event(c.stranger, c.org, input()).await.unwrap_err();
  assert!(matches!(err, Error::NotAMember));
}

// ─── Ownership ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn cross_organization_update_is_rejected() {
  let c = club();
  let event_id = create(&c, input()).await;
  let before = c.store.event(event_id).unwrap();

  // Officer of club B targets club A's event while claiming club B.
  let other_org = Uuid::new_v4();
  let other_officer = Uuid::new_v4();
  c.store.grant(other_org, other_officer, Role::Officer);

  let mut edit = input();
  edit.title = "Hijacked".into();
  let err = c
    .service
    .update_event(other_officer, other_org, event_id, edit, None)
    .await
    .unwrap_err();

  assert!(matches!(err, Error::EventNotInOrganization));
  assert_eq!(c.store.event(event_id).unwrap(), before);
}

#[tokio::test]
async fn cross_organization_delete_is_rejected() {
  let c = club();
  let event_id = create(&c, input()).await;

  let other_org = Uuid::new_v4();
  c.store.grant(other_org, c.officer, Role::Officer);

  let err = c
    .service
    .delete_event(c.officer, other_org, event_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EventNotInOrganization));
  assert!(c.store.event(event_id).is_some());
}

#[tokio::test]
async fn missing_event_is_not_found() {
  let c = club();
  let err = c
    .service
    .update_event(c.officer, c.org, Uuid::new_v4(), input(), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EventNotFound));

  let err = c
    .service
    .delete_event(c.officer, c.org, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EventNotFound));
}

// ─── Temporal policy ─────────────────────────────────────────────────────────

#[tokio::test]
async fn past_event_is_immutable_but_deletable() {
  let c = club();
  let past = past_event(c.org);
  let event_id = past.event_id;
  c.store.seed(past.clone());

  let err = c
    .service
    .update_event(c.officer, c.org, event_id, input(), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EventHasPassed { action: Action::Update }));
  assert_eq!(err.to_string(), "Cannot edit events that have already passed");
  assert_eq!(c.store.event(event_id).unwrap(), past);

  c.service.delete_event(c.officer, c.org, event_id).await.unwrap();
  assert!(c.store.event(event_id).is_none());
  assert_eq!(c.invalidated.signals(), [c.org]);
}

#[tokio::test]
async fn creating_an_already_finished_event_is_rejected() {
  let c = club();
  let mut raw = input();
  raw.starts_at = now() - Duration::hours(3);
  raw.ends_at = Some(now() - Duration::hours(1));

  let err = c.service.create_event(c.officer, c.org, raw).await.unwrap_err();
  assert!(matches!(err, Error::EventHasPassed { action: Action::Create }));
  assert_eq!(c.store.row_writes(), 0);
}

#[tokio::test]
async fn ongoing_event_can_still_be_edited() {
  let c = club();
  let mut raw = input();
  raw.starts_at = now() - Duration::hours(1);
  raw.ends_at = Some(now() + Duration::hours(1));
  let event_id = create(&c, raw.clone()).await;

  raw.title = "Game Night (moved rooms)".into();
  let outcome = c
    .service
    .update_event(c.officer, c.org, event_id, raw, None)
    .await
    .unwrap();
  assert_eq!(outcome.value().fields.title, "Game Night (moved rooms)");
}

#[tokio::test]
async fn update_cannot_move_an_event_into_the_past() {
  let c = club();
  let event_id = create(&c, input()).await;

  let mut raw = input();
  raw.starts_at = now() - Duration::days(1);
  raw.ends_at = None;
  let err = c
    .service
    .update_event(c.officer, c.org, event_id, raw, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EventHasPassed { action: Action::Update }));
}

#[tokio::test]
async fn end_before_start_is_rejected_before_any_write() {
  let c = club();
  let mut raw = input();
  raw.ends_at = Some(raw.starts_at - Duration::minutes(30));

  let err = c.service.create_event(c.officer, c.org, raw).await.unwrap_err();
  assert!(matches!(err, Error::InvalidTimeWindow));
  assert_eq!(c.store.row_writes(), 0);
  assert!(c.invalidated.signals().is_empty());
}

// ─── Associations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn all_majors_event_stores_no_major_rows() {
  let c = club();
  let mut raw = input();
  raw.major_ids = vec![Uuid::new_v4(), Uuid::new_v4()];

  let event_id = create(&c, raw).await;
  assert!(c.store.majors_of(event_id).is_empty());
}

#[tokio::test]
async fn switching_to_all_majors_clears_existing_targets() {
  let c = club();
  let mut raw = input();
  raw.is_all_majors = false;
  raw.major_ids = vec![Uuid::new_v4()];
  let event_id = create(&c, raw.clone()).await;
  assert_eq!(c.store.majors_of(event_id).len(), 1);

  raw.is_all_majors = true;
  c.service
    .update_event(c.officer, c.org, event_id, raw, None)
    .await
    .unwrap();
  assert!(c.store.majors_of(event_id).is_empty());
}

#[tokio::test]
async fn tags_are_normalised_on_write() {
  let c = club();
  let mut raw = input();
  raw.tags = vec!["  Tech ".into(), "tech".into(), "SOCIAL".into()];

  let event_id = create(&c, raw).await;
  assert_eq!(c.store.tags_of(event_id), ["tech", "social"]);
}

#[tokio::test]
async fn update_replaces_tags_wholesale() {
  let c = club();
  let mut raw = input();
  raw.tags = vec!["food".into(), "social".into()];
  let event_id = create(&c, raw.clone()).await;

  raw.tags = vec!["career".into()];
  c.service
    .update_event(c.officer, c.org, event_id, raw, None)
    .await
    .unwrap();
  assert_eq!(c.store.tags_of(event_id), ["career"]);
}

#[tokio::test]
async fn failed_major_insert_yields_partial_success() {
  let c = club();
  c.store.state().fail_majors = true;

  let mut raw = input();
  raw.is_all_majors = false;
  raw.major_ids = vec![Uuid::new_v4()];
  raw.tags = vec!["workshop".into()];

  let outcome = c.service.create_event(c.officer, c.org, raw).await.unwrap();
  let WriteOutcome::Partial { value: event_id, warnings } = &outcome else {
    panic!("expected partial outcome, got {outcome:?}");
  };

  assert_eq!(warnings.len(), 1);
  assert_eq!(warnings[0].association, AssociationKind::Majors);
  assert!(c.store.event(*event_id).is_some());
  assert!(c.store.majors_of(*event_id).is_empty());
  // Tags are reconciled independently.
  assert_eq!(c.store.tags_of(*event_id), ["workshop"]);
  // The write still counts as a change.
  assert_eq!(c.invalidated.signals(), [c.org]);
}

#[tokio::test]
async fn failed_tag_reconciliation_on_update_keeps_the_row() {
  let c = club();
  let mut raw = input();
  raw.tags = vec!["social".into()];
  let event_id = create(&c, raw.clone()).await;

  c.store.state().fail_tags = true;
  raw.title = "Game Night II".into();
  let outcome = c
    .service
    .update_event(c.officer, c.org, event_id, raw, None)
    .await
    .unwrap();

  assert!(!outcome.is_complete());
  assert_eq!(outcome.warnings()[0].association, AssociationKind::Tags);
  assert_eq!(c.store.event(event_id).unwrap().fields.title, "Game Night II");
}

#[tokio::test]
async fn row_failure_is_a_storage_error_without_invalidation() {
  let c = club();
  c.store.state().fail_rows = true;

  let err = c.service.create_event(c.officer, c.org, input()).await.unwrap_err();
  assert!(matches!(err, Error::Storage { action: Action::Create, .. }));
  assert_eq!(err.to_string(), "disk I/O error");
  assert!(c.invalidated.signals().is_empty());
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn stale_expected_version_is_rejected() {
  let c = club();
  let event_id = create(&c, input()).await;

  let mut first = input();
  first.title = "First".into();
  let v2 = c
    .service
    .update_event(c.officer, c.org, event_id, first, Some(1))
    .await
    .unwrap()
    .into_value();
  assert_eq!(v2.version, 2);

  let mut second = input();
  second.title = "Second".into();
  let err = c
    .service
    .update_event(c.admin, c.org, event_id, second.clone(), Some(1))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::VersionConflict));
  assert_eq!(c.store.event(event_id).unwrap().fields.title, "First");

  // Without a precondition the last write wins.
  let v3 = c
    .service
    .update_event(c.admin, c.org, event_id, second, None)
    .await
    .unwrap()
    .into_value();
  assert_eq!(v3.fields.title, "Second");
  assert_eq!(v3.version, 3);
}

// ─── Media ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn attach_media_keeps_unset_urls() {
  let c = club();
  let event_id = create(&c, input()).await;

  let banner = MediaUrls {
    banner_url:    Some("https://cdn.example/banner.png".into()),
    thumbnail_url: None,
  };
  c.service
    .attach_media(c.officer, c.org, event_id, banner)
    .await
    .unwrap();

  let thumb = MediaUrls {
    banner_url:    None,
    thumbnail_url: Some(" https://cdn.example/thumb.png ".into()),
  };
  let event = c
    .service
    .attach_media(c.officer, c.org, event_id, thumb)
    .await
    .unwrap();

  assert_eq!(event.fields.media.banner_url.as_deref(), Some("https://cdn.example/banner.png"));
  assert_eq!(event.fields.media.thumbnail_url.as_deref(), Some("https://cdn.example/thumb.png"));
  assert_eq!(event.version, 3);
}

#[tokio::test]
async fn attach_media_runs_the_same_gates() {
  let c = club();
  let past = past_event(c.org);
  c.store.seed(past.clone());
  let media = MediaUrls {
    banner_url:    Some("https://cdn.example/b.png".into()),
    thumbnail_url: None,
  };

  let err = c
    .service
    .attach_media(c.member, c.org, past.event_id, media.clone())
    .await
    .unwrap_err();
  assert_eq!(err.to_string(), "Only club admins and officers can attach media to events");

  let err = c
    .service
    .attach_media(c.officer, c.org, past.event_id, media)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EventHasPassed { action: Action::AttachMedia }));
  assert_eq!(c.store.event(past.event_id).unwrap(), past);
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn members_only_see_published_details() {
  let c = club();
  let mut draft = input();
  draft.status = EventStatus::Draft;
  draft.tags = vec!["planning".into()];
  let event_id = create(&c, draft).await;

  let err = c
    .service
    .event_details(c.member, c.org, event_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EventNotFound));

  let details = c
    .service
    .event_details(c.officer, c.org, event_id)
    .await
    .unwrap();
  assert_eq!(details.tags, ["planning"]);
  assert!(!details.has_passed);

  let err = c
    .service
    .event_details(c.stranger, c.org, event_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotAMember));
}

#[tokio::test]
async fn listing_hides_drafts_from_members() {
  let c = club();
  let mut draft = input();
  draft.status = EventStatus::Draft;
  create(&c, draft).await;
  create(&c, input()).await;

  let page = c
    .service
    .list_organization_events(c.member, c.org, EventListFilter::default())
    .await
    .unwrap();
  assert_eq!(page.total, 1);

  let page = c
    .service
    .list_organization_events(c.officer, c.org, EventListFilter::default())
    .await
    .unwrap();
  assert_eq!(page.total, 2);

  // A member asking for drafts still only gets published events.
  let filter = EventListFilter { status: Some(EventStatus::Draft), ..Default::default() };
  let page = c
    .service
    .list_organization_events(c.member, c.org, filter)
    .await
    .unwrap();
  assert!(page.events.iter().all(|e| e.fields.status == EventStatus::Published));
}

#[tokio::test]
async fn listing_pages_in_start_order() {
  let c = club();
  for days in [3, 1, 2] {
    let mut raw = input();
    raw.title = format!("Day {days}");
    raw.starts_at = now() + Duration::days(days);
    raw.ends_at = None;
    create(&c, raw).await;
  }

  let filter = EventListFilter { limit: Some(2), offset: Some(1), ..Default::default() };
  let page = c
    .service
    .list_organization_events(c.officer, c.org, filter)
    .await
    .unwrap();
  assert_eq!(page.total, 3);
  let titles: Vec<_> = page.events.iter().map(|e| e.fields.title.as_str()).collect();
  assert_eq!(titles, ["Day 2", "Day 3"]);
}

#[tokio::test]
async fn calendar_shows_published_public_events_in_range() {
  let c = club();
  let mut hidden = input();
  hidden.visibility = Visibility::MembersOnly;
  create(&c, hidden).await;

  let mut draft = input();
  draft.status = EventStatus::Draft;
  create(&c, draft).await;

  let mut far = input();
  far.starts_at = now() + Duration::days(60);
  far.ends_at = None;
  create(&c, far).await;

  let mut tagged = input();
  tagged.tags = vec!["Food".into()];
  let visible = create(&c, tagged).await;

  let from = now();
  let until = now() + Duration::days(7);
  let all = c
    .service
    .calendar(from, until, &CalendarFilter::default())
    .await
    .unwrap();
  let ids: Vec<_> = all.iter().map(|d| d.event.event_id).collect();
  assert_eq!(ids, [visible]);
  assert_eq!(all[0].tags, ["food"]);

  let filter = CalendarFilter { tags: vec!["career".into()], ..Default::default() };
  assert!(c.service.calendar(from, until, &filter).await.unwrap().is_empty());
}

#[tokio::test]
async fn calendar_reads_a_bounded_number_of_rows() {
  let c = club();
  let base = input().normalize().unwrap().fields;
  for i in 0..MAX_CALENDAR_EVENTS + 5 {
    let mut fields = base.clone();
    fields.starts_at = now() + Duration::minutes(i as i64 + 1);
    fields.ends_at = None;
    c.store.seed(Event {
      event_id: Uuid::new_v4(),
      organization_id: c.org,
      fields,
      created_by: None,
      updated_by: None,
      created_at: now(),
      updated_at: now(),
      version: 1,
    });
  }

  let events = c
    .service
    .calendar(now(), now() + Duration::days(7), &CalendarFilter::default())
    .await
    .unwrap();
  assert_eq!(events.len(), MAX_CALENDAR_EVENTS);
  assert!(
    events
      .windows(2)
      .all(|w| w[0].event.fields.starts_at <= w[1].event.fields.starts_at)
  );
}
