//! [`EventService`]: the event writer, remover and media coordinator, plus
//! the read operations built on the same gates.
//!
//! A write runs its gates in a fixed order (membership, ownership, temporal
//! policy, window, normalisation) and only then touches storage. The event
//! row is authoritative: once it is written the operation has happened, and
//! the two association tables are reconciled best-effort afterwards. A
//! failed reconciliation is reported through [`WriteOutcome::Partial`] and a
//! `warn!` record, never by rolling the row back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Action, Error, Result,
  calendar::CalendarFilter,
  event::{Event, EventDetails, EventStatus, MediaUrls, Visibility},
  input::{EventInput, NormalizedEvent, clean_media},
  membership::{Role, require_role},
  store::{EventPage, EventQuery, EventStore, MembershipStore, NewEvent, RowUpdate},
  temporal,
};

/// Page size used by [`EventService::list_organization_events`] when the
/// caller gives none.
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Upper bound on a single listing page.
pub const MAX_PAGE_SIZE: usize = 200;
/// Upper bound on the rows one calendar request reads before filtering.
pub const MAX_CALENDAR_EVENTS: usize = 1_000;

// ─── Collaborators ───────────────────────────────────────────────────────────

/// Receives "this organization's event listing changed" after every
/// successful write or delete.
pub trait ListingInvalidator: Send + Sync {
  fn invalidate(&self, organization_id: Uuid);
}

/// Discards every signal.
impl ListingInvalidator for () {
  fn invalidate(&self, _organization_id: Uuid) {}
}

/// Source of "now" for the temporal policy.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A frozen clock.
impl Clock for DateTime<Utc> {
  fn now(&self) -> DateTime<Utc> { *self }
}

// ─── Write outcome ───────────────────────────────────────────────────────────

/// Which association table a warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
  Majors,
  Tags,
}

/// A best-effort reconciliation step that failed after the row was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationWarning {
  pub association: AssociationKind,
  pub message:     String,
}

/// The result of a successful create or update.
///
/// `Partial` means the event row was written but at least one association
/// table may still hold the previous (or no) state.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
  Complete(T),
  Partial {
    value:    T,
    warnings: Vec<AssociationWarning>,
  },
}

impl<T> WriteOutcome<T> {
  fn new(value: T, warnings: Vec<AssociationWarning>) -> Self {
    if warnings.is_empty() {
      Self::Complete(value)
    } else {
      Self::Partial { value, warnings }
    }
  }

  pub fn is_complete(&self) -> bool { matches!(self, Self::Complete(_)) }

  pub fn value(&self) -> &T {
    match self {
      Self::Complete(v) | Self::Partial { value: v, .. } => v,
    }
  }

  pub fn into_value(self) -> T {
    match self {
      Self::Complete(v) | Self::Partial { value: v, .. } => v,
    }
  }

  pub fn warnings(&self) -> &[AssociationWarning] {
    match self {
      Self::Complete(_) => &[],
      Self::Partial { warnings, .. } => warnings,
    }
  }
}

// ─── Read parameters ─────────────────────────────────────────────────────────

/// Filters for a club's own event list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListFilter {
  pub status:       Option<EventStatus>,
  pub starts_from:  Option<DateTime<Utc>>,
  pub starts_until: Option<DateTime<Utc>>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Event lifecycle operations over an [`EventStore`] and a
/// [`MembershipStore`].
///
/// Stateless between calls; concurrent requests only share the store.
pub struct EventService<E, M, I = (), C = SystemClock> {
  events:      E,
  members:     M,
  invalidator: I,
  clock:       C,
}

impl<E, M, I> EventService<E, M, I, SystemClock> {
  pub fn new(events: E, members: M, invalidator: I) -> Self {
    Self { events, members, invalidator, clock: SystemClock }
  }
}

impl<E, M, I, C> EventService<E, M, I, C> {
  /// Replace the clock, e.g. with a fixed instant in tests.
  pub fn with_clock<C2>(self, clock: C2) -> EventService<E, M, I, C2> {
    EventService {
      events: self.events,
      members: self.members,
      invalidator: self.invalidator,
      clock,
    }
  }
}

impl<E, M, I, C> EventService<E, M, I, C>
where
  E: EventStore,
  M: MembershipStore,
  I: ListingInvalidator,
  C: Clock,
{
  // ── Writer ────────────────────────────────────────────────────────────

  /// Create an event owned by `organization_id` and return its id.
  pub async fn create_event(
    &self,
    caller_id: Uuid,
    organization_id: Uuid,
    input: EventInput,
  ) -> Result<WriteOutcome<Uuid>> {
    let action = Action::Create;
    self.require_manager(caller_id, organization_id, action).await?;

    temporal::validate_window(input.starts_at, input.ends_at)?;
    let NormalizedEvent { fields, major_ids, tags } = input.normalize()?;
    if temporal::has_passed(fields.effective_end(), self.clock.now()) {
      return Err(Error::EventHasPassed { action });
    }

    let is_all_majors = fields.is_all_majors;
    let event = self
      .events
      .insert_event(NewEvent { organization_id, fields, created_by: caller_id })
      .await
      .map_err(|e| self.storage_failure(action, &e))?;

    tracing::info!(
      event_id = %event.event_id, %organization_id, %caller_id,
      "event created"
    );

    let warnings =
      self.reconcile(event.event_id, is_all_majors, major_ids, tags).await;
    self.invalidator.invalidate(organization_id);

    Ok(WriteOutcome::new(event.event_id, warnings))
  }

  /// Overwrite an existing event.
  ///
  /// `expected_version` opts into optimistic concurrency: when given and the
  /// stored row has moved on, nothing is written and
  /// [`Error::VersionConflict`] is returned. Without it the last write wins.
  pub async fn update_event(
    &self,
    caller_id: Uuid,
    organization_id: Uuid,
    event_id: Uuid,
    input: EventInput,
    expected_version: Option<i64>,
  ) -> Result<WriteOutcome<Event>> {
    let action = Action::Update;
    self.require_manager(caller_id, organization_id, action).await?;

    let existing = self.owned_event(organization_id, event_id, action).await?;
    let now = self.clock.now();
    if existing.has_passed(now) {
      tracing::debug!(%event_id, "refusing to edit a past event");
      return Err(Error::EventHasPassed { action });
    }

    temporal::validate_window(input.starts_at, input.ends_at)?;
    let NormalizedEvent { fields, major_ids, tags } = input.normalize()?;
    if temporal::has_passed(fields.effective_end(), now) {
      return Err(Error::EventHasPassed { action });
    }

    let is_all_majors = fields.is_all_majors;
    let updated = match self
      .events
      .update_event(event_id, fields, caller_id, expected_version)
      .await
      .map_err(|e| self.storage_failure(action, &e))?
    {
      RowUpdate::Applied(event) => event,
      RowUpdate::Missing => return Err(Error::EventNotFound),
      RowUpdate::Stale { current_version } => {
        tracing::debug!(
          %event_id, ?expected_version, current_version,
          "stale update rejected"
        );
        return Err(Error::VersionConflict);
      }
    };

    tracing::info!(
      %event_id, %organization_id, %caller_id, version = updated.version,
      "event updated"
    );

    let warnings = self.reconcile(event_id, is_all_majors, major_ids, tags).await;
    self.invalidator.invalidate(organization_id);

    Ok(WriteOutcome::new(updated, warnings))
  }

  // ── Remover ───────────────────────────────────────────────────────────

  /// Permanently delete an event. Past events may be deleted.
  pub async fn delete_event(
    &self,
    caller_id: Uuid,
    organization_id: Uuid,
    event_id: Uuid,
  ) -> Result<()> {
    let action = Action::Delete;
    self.require_manager(caller_id, organization_id, action).await?;
    self.owned_event(organization_id, event_id, action).await?;

    let deleted = self
      .events
      .delete_event(event_id)
      .await
      .map_err(|e| self.storage_failure(action, &e))?;
    if !deleted {
      return Err(Error::EventNotFound);
    }

    tracing::info!(%event_id, %organization_id, %caller_id, "event deleted");
    self.invalidator.invalidate(organization_id);
    Ok(())
  }

  // ── Media ─────────────────────────────────────────────────────────────

  /// Record already-uploaded banner and/or thumbnail URLs on an event.
  ///
  /// Runs the same membership and ownership gates as an update, since it can
  /// be called on its own. Fields left `None` keep their current value.
  pub async fn attach_media(
    &self,
    caller_id: Uuid,
    organization_id: Uuid,
    event_id: Uuid,
    media: MediaUrls,
  ) -> Result<Event> {
    let action = Action::AttachMedia;
    self.require_manager(caller_id, organization_id, action).await?;

    let existing = self.owned_event(organization_id, event_id, action).await?;
    if existing.has_passed(self.clock.now()) {
      return Err(Error::EventHasPassed { action });
    }

    let media = clean_media(media);
    if media.is_empty() {
      return Ok(existing);
    }

    let event = match self
      .events
      .set_media(event_id, media, caller_id)
      .await
      .map_err(|e| self.storage_failure(action, &e))?
    {
      RowUpdate::Applied(event) => event,
      RowUpdate::Missing | RowUpdate::Stale { .. } => {
        return Err(Error::EventNotFound);
      }
    };

    tracing::info!(%event_id, %organization_id, "event media attached");
    self.invalidator.invalidate(organization_id);
    Ok(event)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The stored event, for a caller allowed to update it.
  ///
  /// Runs the officer and ownership gates of [`Self::update_event`], so a
  /// transport can resolve preconditions without leaking anything to a
  /// caller who may not write.
  pub async fn editable_event(
    &self,
    caller_id: Uuid,
    organization_id: Uuid,
    event_id: Uuid,
  ) -> Result<Event> {
    let action = Action::Update;
    self.require_manager(caller_id, organization_id, action).await?;
    self.owned_event(organization_id, event_id, action).await
  }

  /// One event with its associations, for any member of the owning club.
  ///
  /// Members below officer only see published events.
  pub async fn event_details(
    &self,
    caller_id: Uuid,
    organization_id: Uuid,
    event_id: Uuid,
  ) -> Result<EventDetails> {
    let action = Action::View;
    let role =
      require_role(&self.members, caller_id, organization_id, Role::Member, action)
        .await?;

    let event = self.owned_event(organization_id, event_id, action).await?;
    if !role.can_manage_events() && event.fields.status != EventStatus::Published {
      return Err(Error::EventNotFound);
    }

    let mut associations = self
      .events
      .get_associations(vec![event_id])
      .await
      .map_err(|e| self.storage_failure(action, &e))?;
    let assoc = associations.remove(&event_id).unwrap_or_default();

    Ok(EventDetails {
      has_passed: event.has_passed(self.clock.now()),
      event,
      major_ids: assoc.major_ids,
      tags: assoc.tags,
    })
  }

  /// A page of the club's own events, ordered by start time.
  ///
  /// Members below officer only see published events.
  pub async fn list_organization_events(
    &self,
    caller_id: Uuid,
    organization_id: Uuid,
    filter: EventListFilter,
  ) -> Result<EventPage> {
    let action = Action::View;
    let role =
      require_role(&self.members, caller_id, organization_id, Role::Member, action)
        .await?;

    let status = if role.can_manage_events() {
      filter.status
    } else {
      Some(EventStatus::Published)
    };

    let query = EventQuery {
      organization_id: Some(organization_id),
      status,
      visibility: None,
      starts_from: filter.starts_from,
      starts_until: filter.starts_until,
      limit: Some(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)),
      offset: filter.offset,
    };

    self
      .events
      .list_events(&query)
      .await
      .map_err(|e| self.storage_failure(action, &e))
  }

  /// Published, public events starting within `[from, until]`, across all
  /// clubs. Needs no caller.
  ///
  /// Reads at most [`MAX_CALENDAR_EVENTS`] rows, earliest first; a wider
  /// range is cut off at the end.
  pub async fn calendar(
    &self,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    filter: &CalendarFilter,
  ) -> Result<Vec<EventDetails>> {
    let action = Action::View;
    let query = EventQuery {
      status: Some(EventStatus::Published),
      visibility: Some(Visibility::Public),
      starts_from: Some(from),
      starts_until: Some(until),
      limit: Some(MAX_CALENDAR_EVENTS),
      ..Default::default()
    };

    let page = self
      .events
      .list_events(&query)
      .await
      .map_err(|e| self.storage_failure(action, &e))?;
    if page.total > page.events.len() as u64 {
      tracing::debug!(
        total = page.total, returned = page.events.len(),
        "calendar range truncated"
      );
    }
    let ids = page.events.iter().map(|e| e.event_id).collect();
    let mut associations = self
      .events
      .get_associations(ids)
      .await
      .map_err(|e| self.storage_failure(action, &e))?;

    let now = self.clock.now();
    Ok(
      page
        .events
        .into_iter()
        .map(|event| {
          let assoc = associations.remove(&event.event_id).unwrap_or_default();
          EventDetails {
            has_passed: event.has_passed(now),
            event,
            major_ids: assoc.major_ids,
            tags: assoc.tags,
          }
        })
        .filter(|details| filter.matches(details))
        .collect(),
    )
  }

  // ── Gates ─────────────────────────────────────────────────────────────

  async fn require_manager(
    &self,
    caller_id: Uuid,
    organization_id: Uuid,
    action: Action,
  ) -> Result<Role> {
    require_role(&self.members, caller_id, organization_id, Role::Officer, action)
      .await
  }

  /// Fetch an event and confirm it belongs to `organization_id`.
  async fn owned_event(
    &self,
    organization_id: Uuid,
    event_id: Uuid,
    action: Action,
  ) -> Result<Event> {
    let event = self
      .events
      .get_event(event_id)
      .await
      .map_err(|e| self.storage_failure(action, &e))?
      .ok_or(Error::EventNotFound)?;

    if event.organization_id != organization_id {
      tracing::debug!(
        %event_id, claimed = %organization_id, owner = %event.organization_id,
        "cross-organization access rejected"
      );
      return Err(Error::EventNotInOrganization);
    }
    Ok(event)
  }

  // ── Reconciliation ────────────────────────────────────────────────────

  /// Replace both association sets. Each table is attempted independently;
  /// failures come back as warnings.
  async fn reconcile(
    &self,
    event_id: Uuid,
    is_all_majors: bool,
    major_ids: Vec<Uuid>,
    tags: Vec<String>,
  ) -> Vec<AssociationWarning> {
    let mut warnings = Vec::new();

    let major_ids = if is_all_majors { Vec::new() } else { major_ids };
    if let Err(e) = self.events.replace_majors(event_id, major_ids).await {
      tracing::warn!(
        %event_id, association = "majors", error = %e,
        "event row written but major associations were not reconciled"
      );
      warnings.push(AssociationWarning {
        association: AssociationKind::Majors,
        message:     format!("Failed to save target majors: {e}"),
      });
    }

    if let Err(e) = self.events.replace_tags(event_id, tags).await {
      tracing::warn!(
        %event_id, association = "tags", error = %e,
        "event row written but tag associations were not reconciled"
      );
      warnings.push(AssociationWarning {
        association: AssociationKind::Tags,
        message:     format!("Failed to save tags: {e}"),
      });
    }

    warnings
  }

  fn storage_failure(&self, action: Action, source: &dyn std::error::Error) -> Error {
    tracing::error!(?action, error = %source, "storage call failed");
    Error::storage(action, source)
  }
}
