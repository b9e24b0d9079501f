//! ETag computation for event resources.
//!
//! ETags are SHA-256 hashes over the event id, its row version and its
//! `updated_at` timestamp, so any row write yields a new tag.

use clubcal_core::event::Event;
use sha2::{Digest, Sha256};

/// Compute a strong, quoted ETag for `event`.
pub fn compute_etag(event: &Event) -> String {
  let mut hasher = Sha256::new();
  hasher.update(event.event_id.as_bytes());
  hasher.update(event.version.to_le_bytes());
  hasher.update(event.updated_at.timestamp_micros().to_le_bytes());
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Whether an `If-Match` header value admits `etag`.
///
/// Accepts `*`, comma-separated lists and bare (unquoted) tags.
pub fn if_match_satisfied(header: &str, etag: &str) -> bool {
  let wanted = strip_quotes(etag);
  header
    .split(',')
    .map(str::trim)
    .any(|candidate| candidate == "*" || strip_quotes(candidate) == wanted)
}

fn strip_quotes(s: &str) -> &str { s.trim_matches('"') }
