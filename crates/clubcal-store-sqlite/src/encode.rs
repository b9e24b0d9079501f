//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 UTC strings with microsecond precision. Enums are
//! stored by their snake_case names. UUIDs are hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use clubcal_core::event::{Event, EventFields, MediaUrls};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &'static str, s: String) -> Result<T> {
  T::from_str(&s).map_err(|_| Error::UnknownValue { column, value: s })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "
  event_id, organization_id, title, description, starts_at, ends_at,
  timezone, location_type, location_name, location_address, online_url,
  visibility, status, banner_url, thumbnail_url, is_all_majors, capacity,
  requires_rsvp, rsvp_url, is_featured, contact_email,
  created_by, updated_by, created_at, updated_at, version";

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub event_id:         String,
  pub organization_id:  String,
  pub title:            String,
  pub description:      String,
  pub starts_at:        String,
  pub ends_at:          Option<String>,
  pub timezone:         Option<String>,
  pub location_type:    String,
  pub location_name:    Option<String>,
  pub location_address: Option<String>,
  pub online_url:       Option<String>,
  pub visibility:       String,
  pub status:           String,
  pub banner_url:       Option<String>,
  pub thumbnail_url:    Option<String>,
  pub is_all_majors:    bool,
  pub capacity:         Option<u32>,
  pub requires_rsvp:    bool,
  pub rsvp_url:         Option<String>,
  pub is_featured:      bool,
  pub contact_email:    Option<String>,
  pub created_by:       Option<String>,
  pub updated_by:       Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
  pub version:          i64,
}

impl RawEvent {
  /// Read a row selected with [`EVENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:         row.get(0)?,
      organization_id:  row.get(1)?,
      title:            row.get(2)?,
      description:      row.get(3)?,
      starts_at:        row.get(4)?,
      ends_at:          row.get(5)?,
      timezone:         row.get(6)?,
      location_type:    row.get(7)?,
      location_name:    row.get(8)?,
      location_address: row.get(9)?,
      online_url:       row.get(10)?,
      visibility:       row.get(11)?,
      status:           row.get(12)?,
      banner_url:       row.get(13)?,
      thumbnail_url:    row.get(14)?,
      is_all_majors:    row.get(15)?,
      capacity:         row.get(16)?,
      requires_rsvp:    row.get(17)?,
      rsvp_url:         row.get(18)?,
      is_featured:      row.get(19)?,
      contact_email:    row.get(20)?,
      created_by:       row.get(21)?,
      updated_by:       row.get(22)?,
      created_at:       row.get(23)?,
      updated_at:       row.get(24)?,
      version:          row.get(25)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    let fields = EventFields {
      title:            self.title,
      description:      self.description,
      starts_at:        decode_dt(&self.starts_at)?,
      ends_at:          self.ends_at.as_deref().map(decode_dt).transpose()?,
      timezone:         self.timezone,
      location_type:    decode_enum("location_type", self.location_type)?,
      location_name:    self.location_name,
      location_address: self.location_address,
      online_url:       self.online_url,
      visibility:       decode_enum("visibility", self.visibility)?,
      status:           decode_enum("status", self.status)?,
      media:            MediaUrls {
        banner_url:    self.banner_url,
        thumbnail_url: self.thumbnail_url,
      },
      is_all_majors:    self.is_all_majors,
      capacity:         self.capacity,
      requires_rsvp:    self.requires_rsvp,
      rsvp_url:         self.rsvp_url,
      is_featured:      self.is_featured,
      contact_email:    self.contact_email,
    };

    Ok(Event {
      event_id: decode_uuid(&self.event_id)?,
      organization_id: decode_uuid(&self.organization_id)?,
      fields,
      created_by: self.created_by.as_deref().map(decode_uuid).transpose()?,
      updated_by: self.updated_by.as_deref().map(decode_uuid).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      version: self.version,
    })
  }
}

/// The caller-controlled columns of an event, ready to bind.
///
/// Bound in the order of [`FIELD_COLUMNS`].
pub struct FieldParams {
  pub title:            String,
  pub description:      String,
  pub starts_at:        String,
  pub ends_at:          Option<String>,
  pub timezone:         Option<String>,
  pub location_type:    &'static str,
  pub location_name:    Option<String>,
  pub location_address: Option<String>,
  pub online_url:       Option<String>,
  pub visibility:       &'static str,
  pub status:           &'static str,
  pub banner_url:       Option<String>,
  pub thumbnail_url:    Option<String>,
  pub is_all_majors:    bool,
  pub capacity:         Option<u32>,
  pub requires_rsvp:    bool,
  pub rsvp_url:         Option<String>,
  pub is_featured:      bool,
  pub contact_email:    Option<String>,
}

/// Column names matching [`FieldParams`], in bind order.
pub const FIELD_COLUMNS: [&str; 19] = [
  "title",
  "description",
  "starts_at",
  "ends_at",
  "timezone",
  "location_type",
  "location_name",
  "location_address",
  "online_url",
  "visibility",
  "status",
  "banner_url",
  "thumbnail_url",
  "is_all_majors",
  "capacity",
  "requires_rsvp",
  "rsvp_url",
  "is_featured",
  "contact_email",
];

impl FieldParams {
  pub fn new(fields: EventFields) -> Self {
    Self {
      title:            fields.title,
      description:      fields.description,
      starts_at:        encode_dt(fields.starts_at),
      ends_at:          fields.ends_at.map(encode_dt),
      timezone:         fields.timezone,
      location_type:    fields.location_type.into(),
      location_name:    fields.location_name,
      location_address: fields.location_address,
      online_url:       fields.online_url,
      visibility:       fields.visibility.into(),
      status:           fields.status.into(),
      banner_url:       fields.media.banner_url,
      thumbnail_url:    fields.media.thumbnail_url,
      is_all_majors:    fields.is_all_majors,
      capacity:         fields.capacity,
      requires_rsvp:    fields.requires_rsvp,
      rsvp_url:         fields.rsvp_url,
      is_featured:      fields.is_featured,
      contact_email:    fields.contact_email,
    }
  }

  /// Borrow every field as a bind parameter, in [`FIELD_COLUMNS`] order.
  pub fn as_params(&self) -> [&dyn rusqlite::ToSql; 19] {
    [
      &self.title,
      &self.description,
      &self.starts_at,
      &self.ends_at,
      &self.timezone,
      &self.location_type,
      &self.location_name,
      &self.location_address,
      &self.online_url,
      &self.visibility,
      &self.status,
      &self.banner_url,
      &self.thumbnail_url,
      &self.is_all_majors,
      &self.capacity,
      &self.requires_rsvp,
      &self.rsvp_url,
      &self.is_featured,
      &self.contact_email,
    ]
  }
}
