//! Handler for the public `/calendar` feed.
//!
//! `GET /calendar?from=<rfc3339>&until=<rfc3339>` with optional
//! comma-separated `majors`, `tags`, `clubs`, `location_types` and
//! `time_of_day`, a free-text `search`, and `utc_offset_minutes` for
//! time-of-day bucketing. No caller identity is required.

use std::str::FromStr;

use axum::{
  Json,
  extract::{Query, State},
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use clubcal_core::{
  calendar::{CalendarFilter, TimeOfDay},
  event::LocationType,
  store::{EventStore, MembershipStore},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
  pub from:               DateTime<Utc>,
  pub until:              DateTime<Utc>,
  pub majors:             Option<String>,
  pub tags:               Option<String>,
  pub clubs:              Option<String>,
  pub location_types:     Option<String>,
  pub time_of_day:        Option<String>,
  pub search:             Option<String>,
  #[serde(default)]
  pub utc_offset_minutes: i32,
}

impl CalendarParams {
  fn into_filter(self) -> Result<CalendarFilter, ApiError> {
    Ok(CalendarFilter {
      majors:             split(self.majors.as_deref(), "majors", Uuid::from_str)?,
      tags:               split(self.tags.as_deref(), "tags", |s| Ok::<_, ()>(s.to_owned()))?,
      clubs:              split(self.clubs.as_deref(), "clubs", Uuid::from_str)?,
      location_types:     split(
        self.location_types.as_deref(),
        "location_types",
        LocationType::from_str,
      )?,
      time_of_day:        split(self.time_of_day.as_deref(), "time_of_day", parse_time_of_day)?,
      search:             self.search,
      utc_offset_minutes: self.utc_offset_minutes,
    })
  }
}

/// Parse a comma-separated list, skipping blank entries.
fn split<T, E>(
  raw: Option<&str>,
  name: &str,
  parse: impl Fn(&str) -> Result<T, E>,
) -> Result<Vec<T>, ApiError> {
  raw
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| parse(s).map_err(|_| ApiError::BadRequest(format!("invalid {name} value: {s}"))))
    .collect()
}

fn parse_time_of_day(s: &str) -> Result<TimeOfDay, ()> {
  match s.to_ascii_lowercase().as_str() {
    "morning" => Ok(TimeOfDay::Morning),
    "afternoon" => Ok(TimeOfDay::Afternoon),
    "evening" => Ok(TimeOfDay::Evening),
    _ => Err(()),
  }
}

/// `GET /calendar`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<CalendarParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EventStore + MembershipStore + 'static,
{
  if params.until < params.from {
    return Err(ApiError::BadRequest("`until` must not be before `from`".into()));
  }
  let (from, until) = (params.from, params.until);
  let filter = params.into_filter()?;

  let events = state.service.calendar(from, until, &filter).await?;
  Ok(Json(json!({ "ok": true, "events": events })))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params() -> CalendarParams {
    CalendarParams {
      from:               Utc::now(),
      until:              Utc::now(),
      majors:             None,
      tags:               None,
      clubs:              None,
      location_types:     None,
      time_of_day:        None,
      search:             None,
      utc_offset_minutes: 0,
    }
  }

  #[test]
  fn lists_are_comma_separated() {
    let club = Uuid::new_v4();
    let mut p = params();
    p.clubs = Some(format!("{club}, "));
    p.tags = Some("food,career".into());
    p.location_types = Some("online,hybrid".into());
    p.time_of_day = Some("Evening".into());

    let filter = p.into_filter().unwrap();
    assert_eq!(filter.clubs, [club]);
    assert_eq!(filter.tags, ["food", "career"]);
    assert_eq!(filter.location_types, [LocationType::Online, LocationType::Hybrid]);
    assert_eq!(filter.time_of_day, [TimeOfDay::Evening]);
    assert!(filter.majors.is_empty());
  }

  #[test]
  fn bad_entries_are_rejected() {
    let mut p = params();
    p.majors = Some("not-a-uuid".into());
    let err = p.into_filter().unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("majors")));
  }
}
