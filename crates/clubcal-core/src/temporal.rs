//! Temporal policy: when an event counts as "passed", and which start/end
//! pairs are acceptable.
//!
//! All comparisons happen on [`DateTime<Utc>`], i.e. on absolute instants.
//! Callers holding a local or offset time convert with
//! [`DateTime::with_timezone`] before asking; `now` is always a parameter so
//! the policy never reads the clock itself.

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// `ends_at` if present, else `starts_at`.
pub fn effective_end(
  starts_at: DateTime<Utc>,
  ends_at: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
  ends_at.unwrap_or(starts_at)
}

/// An event has passed once its effective end is strictly before `now`.
pub fn has_passed(effective_end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
  effective_end < now
}

/// Reject an `ends_at` strictly earlier than `starts_at`. Zero-length events
/// and events without an end are fine.
pub fn validate_window(
  starts_at: DateTime<Utc>,
  ends_at: Option<DateTime<Utc>>,
) -> Result<()> {
  match ends_at {
    Some(end) if end < starts_at => Err(Error::InvalidTimeWindow),
    _ => Ok(()),
  }
}
