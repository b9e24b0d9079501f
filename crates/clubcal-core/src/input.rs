//! Caller-supplied event input and its normalisation.
//!
//! [`EventInput`] is accepted as-is from transports. [`EventInput::normalize`]
//! trims strings, lowercases and de-duplicates tags, drops major ids when the
//! event targets everyone, and rejects content that can never be stored.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  event::{EventFields, EventStatus, LocationType, MediaUrls, Visibility},
};

/// The fields of a create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventInput {
  pub title:            String,
  #[serde(default)]
  pub description:      String,
  pub starts_at:        DateTime<Utc>,
  #[serde(default)]
  pub ends_at:          Option<DateTime<Utc>>,
  #[serde(default)]
  pub timezone:         Option<String>,
  pub location_type:    LocationType,
  #[serde(default)]
  pub location_name:    Option<String>,
  #[serde(default)]
  pub location_address: Option<String>,
  #[serde(default)]
  pub online_url:       Option<String>,
  pub visibility:       Visibility,
  pub status:           EventStatus,
  #[serde(default)]
  pub banner_url:       Option<String>,
  #[serde(default)]
  pub thumbnail_url:    Option<String>,
  pub is_all_majors:    bool,
  #[serde(default)]
  pub major_ids:        Vec<Uuid>,
  #[serde(default)]
  pub tags:             Vec<String>,
  #[serde(default)]
  pub capacity:         Option<u32>,
  #[serde(default)]
  pub requires_rsvp:    bool,
  #[serde(default)]
  pub rsvp_url:         Option<String>,
  #[serde(default)]
  pub is_featured:      bool,
  #[serde(default)]
  pub contact_email:    Option<String>,
}

/// The result of [`EventInput::normalize`]: a row plus the association sets
/// to reconcile.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
  pub fields:    EventFields,
  /// Empty whenever `fields.is_all_majors` is set.
  pub major_ids: Vec<Uuid>,
  pub tags:      Vec<String>,
}

impl EventInput {
  /// Normalise the input.
  ///
  /// Does not look at the time window; see [`crate::temporal`].
  pub fn normalize(self) -> Result<NormalizedEvent> {
    let title = self.title.trim().to_owned();
    if title.is_empty() {
      return Err(Error::MissingTitle);
    }

    let major_ids = if self.is_all_majors {
      Vec::new()
    } else {
      let ids = dedupe(self.major_ids);
      if ids.is_empty() {
        return Err(Error::NoTargetMajors);
      }
      ids
    };

    let location_name = clean(self.location_name);
    let location_address = clean(self.location_address);
    let online_url = clean(self.online_url);
    if self.location_type.needs_location_name() && location_name.is_none() {
      return Err(Error::MissingLocation);
    }
    if self.location_type.needs_address() && location_address.is_none() {
      return Err(Error::MissingAddress);
    }
    if self.location_type.needs_online_url() && online_url.is_none() {
      return Err(Error::MissingOnlineUrl);
    }

    let fields = EventFields {
      title,
      description: self.description.trim().to_owned(),
      starts_at: self.starts_at,
      ends_at: self.ends_at,
      timezone: clean(self.timezone),
      location_type: self.location_type,
      location_name,
      location_address,
      online_url,
      visibility: self.visibility,
      status: self.status,
      media: clean_media(MediaUrls {
        banner_url:    self.banner_url,
        thumbnail_url: self.thumbnail_url,
      }),
      is_all_majors: self.is_all_majors,
      capacity: self.capacity.filter(|c| *c > 0),
      requires_rsvp: self.requires_rsvp,
      rsvp_url: clean(self.rsvp_url),
      is_featured: self.is_featured,
      contact_email: clean(self.contact_email),
    };

    Ok(NormalizedEvent { fields, major_ids, tags: normalize_tags(self.tags) })
  }
}

/// Trim, lowercase, drop empties and de-duplicate, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let cleaned = tags
    .into_iter()
    .map(|t| t.as_ref().trim().to_lowercase())
    .filter(|t| !t.is_empty());
  dedupe(cleaned)
}

/// Trim both URLs; blank becomes `None`.
pub fn clean_media(media: MediaUrls) -> MediaUrls {
  MediaUrls {
    banner_url:    clean(media.banner_url),
    thumbnail_url: clean(media.thumbnail_url),
  }
}

fn clean(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

fn dedupe<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
  T: Eq + std::hash::Hash + Clone,
{
  let mut seen = HashSet::new();
  items
    .into_iter()
    .filter(|item| seen.insert(item.clone()))
    .collect()
}
