//! Event types: the record a club publishes to the calendar.
//!
//! An event row carries its own content and placement. Audience targeting
//! (majors) and free-text tags live in two association tables and are
//! reconciled separately from the row; see [`crate::service`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::temporal;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Where an event takes place.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LocationType {
  #[default]
  OnCampus,
  OffCampus,
  Online,
  Hybrid,
}

impl LocationType {
  /// In-person and hybrid events need a named location.
  pub fn needs_location_name(self) -> bool { !matches!(self, Self::Online) }

  /// Off-campus and hybrid events need a street address.
  pub fn needs_address(self) -> bool {
    matches!(self, Self::OffCampus | Self::Hybrid)
  }

  /// Online and hybrid events need a joinable URL.
  pub fn needs_online_url(self) -> bool {
    matches!(self, Self::Online | Self::Hybrid)
  }
}

/// Who can see an event.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Visibility {
  #[default]
  Public,
  MembersOnly,
  Unlisted,
}

/// Publication state.
///
/// The usual progression is `draft → published → cancelled`. Moving back to
/// `draft` is allowed for as long as the event can be edited at all.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventStatus {
  #[default]
  Draft,
  Published,
  Cancelled,
}

// ─── Media ───────────────────────────────────────────────────────────────────

/// Public URLs of already-uploaded images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUrls {
  #[serde(default)]
  pub banner_url:    Option<String>,
  #[serde(default)]
  pub thumbnail_url: Option<String>,
}

impl MediaUrls {
  pub fn is_empty(&self) -> bool {
    self.banner_url.is_none() && self.thumbnail_url.is_none()
  }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The caller-controlled columns of an event row, already normalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFields {
  pub title:            String,
  pub description:      String,
  pub starts_at:        DateTime<Utc>,
  pub ends_at:          Option<DateTime<Utc>>,
  /// Free-text label such as `America/Los_Angeles`; display only.
  pub timezone:         Option<String>,
  pub location_type:    LocationType,
  pub location_name:    Option<String>,
  pub location_address: Option<String>,
  pub online_url:       Option<String>,
  pub visibility:       Visibility,
  pub status:           EventStatus,
  #[serde(flatten)]
  pub media:            MediaUrls,
  pub is_all_majors:    bool,
  pub capacity:         Option<u32>,
  pub requires_rsvp:    bool,
  pub rsvp_url:         Option<String>,
  pub is_featured:      bool,
  pub contact_email:    Option<String>,
}

impl EventFields {
  /// `ends_at` if present, else `starts_at`.
  pub fn effective_end(&self) -> DateTime<Utc> {
    temporal::effective_end(self.starts_at, self.ends_at)
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A persisted event row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:        Uuid,
  pub organization_id: Uuid,
  #[serde(flatten)]
  pub fields:          EventFields,
  pub created_by:      Option<Uuid>,
  pub updated_by:      Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
  /// Incremented by the store on every row write.
  pub version:         i64,
}

impl Event {
  pub fn effective_end(&self) -> DateTime<Utc> { self.fields.effective_end() }

  /// Computed on every call; "passed" is never stored.
  pub fn has_passed(&self, now: DateTime<Utc>) -> bool {
    temporal::has_passed(self.effective_end(), now)
  }
}

/// An event together with its associations, as shown on edit screens and in
/// the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
  #[serde(flatten)]
  pub event:      Event,
  pub major_ids:  Vec<Uuid>,
  pub tags:       Vec<String>,
  pub has_passed: bool,
}
