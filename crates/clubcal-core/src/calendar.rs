//! Filters for the public calendar feed.

use chrono::{DateTime, FixedOffset, Offset as _, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{EventDetails, LocationType};

/// Coarse bucket of an event's local start hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
  /// 05:00–11:59
  Morning,
  /// 12:00–16:59
  Afternoon,
  /// 17:00–04:59
  Evening,
}

impl TimeOfDay {
  pub fn of(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
    match instant.with_timezone(&offset).hour() {
      5..=11 => Self::Morning,
      12..=16 => Self::Afternoon,
      _ => Self::Evening,
    }
  }
}

/// Narrows a calendar range. Empty lists do not filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarFilter {
  /// Events targeting any of these majors; all-majors events always match.
  #[serde(default)]
  pub majors:             Vec<Uuid>,
  /// Events carrying any of these tags.
  #[serde(default)]
  pub tags:               Vec<String>,
  #[serde(default)]
  pub clubs:              Vec<Uuid>,
  #[serde(default)]
  pub location_types:     Vec<LocationType>,
  #[serde(default)]
  pub time_of_day:        Vec<TimeOfDay>,
  /// Case-insensitive substring over title, description and tags.
  #[serde(default)]
  pub search:             Option<String>,
  /// Offset used to bucket [`TimeOfDay`]; defaults to UTC.
  #[serde(default)]
  pub utc_offset_minutes: i32,
}

impl CalendarFilter {
  pub fn matches(&self, details: &EventDetails) -> bool {
    let fields = &details.event.fields;

    if !self.majors.is_empty()
      && !fields.is_all_majors
      && !self.majors.iter().any(|m| details.major_ids.contains(m))
    {
      return false;
    }

    if !self.tags.is_empty()
      && !self
        .tags
        .iter()
        .any(|t| details.tags.contains(&t.trim().to_lowercase()))
    {
      return false;
    }

    if !self.clubs.is_empty()
      && !self.clubs.contains(&details.event.organization_id)
    {
      return false;
    }

    if !self.location_types.is_empty()
      && !self.location_types.contains(&fields.location_type)
    {
      return false;
    }

    if !self.time_of_day.is_empty() {
      let bucket = TimeOfDay::of(fields.starts_at, self.offset());
      if !self.time_of_day.contains(&bucket) {
        return false;
      }
    }

    match self.search.as_deref().map(str::trim) {
      Some(q) if !q.is_empty() => {
        let q = q.to_lowercase();
        fields.title.to_lowercase().contains(&q)
          || fields.description.to_lowercase().contains(&q)
          || details.tags.iter().any(|t| t.contains(&q))
      }
      _ => true,
    }
  }

  /// Out-of-range offsets fall back to UTC.
  fn offset(&self) -> FixedOffset {
    FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or(Utc.fix())
  }
}
