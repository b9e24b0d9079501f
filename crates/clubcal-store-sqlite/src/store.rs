//! [`SqliteStore`], the SQLite implementation of [`EventStore`] and
//! [`MembershipStore`].

use std::{collections::HashMap, path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use clubcal_core::{
  event::{Event, EventFields, MediaUrls},
  membership::Role,
  store::{
    EventAssociations, EventPage, EventQuery, EventStore, MembershipStore, NewEvent,
    RowUpdate,
  },
};

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, FIELD_COLUMNS, FieldParams, RawEvent, decode_enum, decode_uuid,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

/// Outcome of a conditional write before decoding.
enum RawUpdate {
  Applied(RawEvent),
  Missing,
  Stale(i64),
}

impl RawUpdate {
  fn decode(self) -> Result<RowUpdate> {
    Ok(match self {
      Self::Applied(raw) => RowUpdate::Applied(raw.into_event()?),
      Self::Missing => RowUpdate::Missing,
      Self::Stale(current_version) => RowUpdate::Stale { current_version },
    })
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An event store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  timeout: Option<Duration>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, timeout: None };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, timeout: None };
    store.init_schema().await?;
    Ok(store)
  }

  /// Fail any single database call that takes longer than `limit`.
  pub fn with_timeout(mut self, limit: Duration) -> Self {
    self.timeout = Some(limit);
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the connection thread, bounded by the configured timeout.
  async fn call<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, tokio_rusqlite::Error>
      + Send
      + 'static,
    R: Send + 'static,
  {
    let fut = self.conn.call(f);
    Ok(match self.timeout {
      Some(limit) => tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| {
          tracing::warn!(?limit, "storage call timed out");
          Error::Timeout(limit)
        })??,
      None => fut.await?,
    })
  }

  async fn fetch(&self, event_id: Uuid) -> Result<Option<Event>> {
    let id_str = encode_uuid(event_id);

    let raw: Option<RawEvent> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
              rusqlite::params![id_str],
              RawEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  // ── Membership administration ─────────────────────────────────────────

  /// Insert or change a user's role in a club.
  pub async fn grant_role(
    &self,
    club_id: Uuid,
    user_id: Uuid,
    role: Role,
  ) -> Result<()> {
    let club_str = encode_uuid(club_id);
    let user_str = encode_uuid(user_id);
    let role_str = role.as_ref().to_owned();
    let at_str = encode_dt(Utc::now());

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO club_memberships (club_id, user_id, role, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (club_id, user_id) DO UPDATE SET role = excluded.role",
          rusqlite::params![club_str, user_str, role_str, at_str],
        )?;
        Ok(())
      })
      .await
  }

  /// Remove a membership. Returns `false` if there was none.
  pub async fn revoke_membership(&self, club_id: Uuid, user_id: Uuid) -> Result<bool> {
    let club_str = encode_uuid(club_id);
    let user_str = encode_uuid(user_id);

    self
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM club_memberships WHERE club_id = ?1 AND user_id = ?2",
          rusqlite::params![club_str, user_str],
        )?;
        Ok(n > 0)
      })
      .await
  }

  /// Register a major that events can target and return its id.
  pub async fn add_major(&self, name: impl Into<String>) -> Result<Uuid> {
    let major_id = Uuid::new_v4();
    let id_str = encode_uuid(major_id);
    let name = name.into();

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO majors (major_id, name) VALUES (?1, ?2)",
          rusqlite::params![id_str, name],
        )?;
        Ok(())
      })
      .await?;

    Ok(major_id)
  }
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = Error;

  // ── Rows ──────────────────────────────────────────────────────────────

  async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>> {
    self.fetch(event_id).await
  }

  async fn insert_event(&self, input: NewEvent) -> Result<Event> {
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

    let id_str = encode_uuid(event.event_id);
    let org_str = encode_uuid(event.organization_id);
    let by_str = encode_uuid(input.created_by);
    let at_str = encode_dt(now);
    let params = FieldParams::new(event.fields.clone());

    self
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO events (
             event_id, organization_id, {},
             created_by, updated_by, created_at, updated_at, version
           ) VALUES (?, ?, {}, ?, ?, ?, ?, 1)",
          FIELD_COLUMNS.join(", "),
          vec!["?"; FIELD_COLUMNS.len()].join(", "),
        );

        let mut bind: Vec<&dyn rusqlite::ToSql> = vec![&id_str, &org_str];
        bind.extend(params.as_params());
        bind.extend([&by_str as &dyn rusqlite::ToSql, &by_str, &at_str, &at_str]);

        conn.execute(&sql, bind.as_slice())?;
        Ok(())
      })
      .await?;

    // Round-trip through the text encoding so the returned value matches
    // what a later read sees.
    Ok(self.fetch(event.event_id).await?.unwrap_or(event))
  }

  async fn update_event(
    &self,
    event_id: Uuid,
    fields: EventFields,
    updated_by: Uuid,
    expected_version: Option<i64>,
  ) -> Result<RowUpdate> {
    let id_str = encode_uuid(event_id);
    let by_str = encode_uuid(updated_by);
    let at_str = encode_dt(Utc::now());
    let params = FieldParams::new(fields);

    let raw = self
      .call(move |conn| {
        let assignments = FIELD_COLUMNS
          .iter()
          .map(|c| format!("{c} = ?"))
          .collect::<Vec<_>>()
          .join(", ");
        let sql = format!(
          "UPDATE events
           SET {assignments}, updated_by = ?, updated_at = ?, version = version + 1
           WHERE event_id = ? AND (? IS NULL OR version = ?)"
        );

        let mut bind: Vec<&dyn rusqlite::ToSql> = params.as_params().to_vec();
        bind.extend([
          &by_str as &dyn rusqlite::ToSql,
          &at_str,
          &id_str,
          &expected_version,
          &expected_version,
        ]);

        let tx = conn.transaction()?;
        let changed = tx.execute(&sql, bind.as_slice())?;
        let outcome = if changed == 0 {
          let current: Option<i64> = tx
            .query_row(
              "SELECT version FROM events WHERE event_id = ?1",
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?;
          match current {
            Some(v) => RawUpdate::Stale(v),
            None => RawUpdate::Missing,
          }
        } else {
          RawUpdate::Applied(tx.query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
            rusqlite::params![id_str],
            RawEvent::from_row,
          )?)
        };
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    raw.decode()
  }

  async fn set_media(
    &self,
    event_id: Uuid,
    media: MediaUrls,
    updated_by: Uuid,
  ) -> Result<RowUpdate> {
    let id_str = encode_uuid(event_id);
    let by_str = encode_uuid(updated_by);
    let at_str = encode_dt(Utc::now());

    let raw = self
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE events
           SET banner_url    = COALESCE(?1, banner_url),
               thumbnail_url = COALESCE(?2, thumbnail_url),
               updated_by    = ?3,
               updated_at    = ?4,
               version       = version + 1
           WHERE event_id = ?5",
          rusqlite::params![
            media.banner_url,
            media.thumbnail_url,
            by_str,
            at_str,
            id_str,
          ],
        )?;
        let outcome = if changed == 0 {
          RawUpdate::Missing
        } else {
          RawUpdate::Applied(tx.query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
            rusqlite::params![id_str],
            RawEvent::from_row,
          )?)
        };
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    raw.decode()
  }

  async fn delete_event(&self, event_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(event_id);

    self
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM events WHERE event_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(n > 0)
      })
      .await
  }

  async fn list_events<'a>(&'a self, query: &'a EventQuery) -> Result<EventPage> {
    // Build WHERE clause dynamically.
    let mut conds: Vec<&'static str> = vec![];
    let mut params: Vec<Value> = vec![];
    if let Some(org) = query.organization_id {
      conds.push("organization_id = ?");
      params.push(Value::Text(encode_uuid(org)));
    }
    if let Some(status) = query.status {
      conds.push("status = ?");
      params.push(Value::Text(status.as_ref().to_owned()));
    }
    if let Some(visibility) = query.visibility {
      conds.push("visibility = ?");
      params.push(Value::Text(visibility.as_ref().to_owned()));
    }
    if let Some(from) = query.starts_from {
      conds.push("starts_at >= ?");
      params.push(Value::Text(encode_dt(from)));
    }
    if let Some(until) = query.starts_until {
      conds.push("starts_at <= ?");
      params.push(Value::Text(encode_dt(until)));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val = query.limit.map_or(-1, |l| l as i64);
    let offset_val = query.offset.unwrap_or(0) as i64;

    let (total, raws): (i64, Vec<RawEvent>) = self
      .call(move |conn| {
        let total = conn.query_row(
          &format!("SELECT COUNT(*) FROM events {where_clause}"),
          rusqlite::params_from_iter(params.iter()),
          |r| r.get(0),
        )?;

        let sql = format!(
          "SELECT {EVENT_COLUMNS} FROM events {where_clause}
           ORDER BY starts_at ASC, event_id ASC
           LIMIT ? OFFSET ?"
        );
        params.push(Value::Integer(limit_val));
        params.push(Value::Integer(offset_val));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, rows))
      })
      .await?;

    Ok(EventPage {
      events: raws.into_iter().map(RawEvent::into_event).collect::<Result<_>>()?,
      total:  total as u64,
    })
  }

  // ── Associations ──────────────────────────────────────────────────────

  async fn replace_majors(&self, event_id: Uuid, major_ids: Vec<Uuid>) -> Result<()> {
    let id_str = encode_uuid(event_id);
    let majors: Vec<String> = major_ids.into_iter().map(encode_uuid).collect();

    self
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM event_majors WHERE event_id = ?1",
          rusqlite::params![id_str],
        )?;
        {
          let mut stmt =
            tx.prepare("INSERT INTO event_majors (event_id, major_id) VALUES (?1, ?2)")?;
          for major in &majors {
            stmt.execute(rusqlite::params![id_str, major])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await
  }

  async fn replace_tags(&self, event_id: Uuid, tags: Vec<String>) -> Result<()> {
    let id_str = encode_uuid(event_id);

    self
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM event_tags WHERE event_id = ?1",
          rusqlite::params![id_str],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO event_tags (event_id, tag) VALUES (?1, ?2)",
          )?;
          for tag in &tags {
            stmt.execute(rusqlite::params![id_str, tag])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await
  }

  async fn get_associations(
    &self,
    event_ids: Vec<Uuid>,
  ) -> Result<HashMap<Uuid, EventAssociations>> {
    if event_ids.is_empty() {
      return Ok(HashMap::new());
    }
    let ids: Vec<String> = event_ids.into_iter().map(encode_uuid).collect();

    let (major_rows, tag_rows): (Vec<(String, String)>, Vec<(String, String)>) = self
      .call(move |conn| {
        let placeholders = vec!["?"; ids.len()].join(", ");
        let pairs = |sql: String| -> rusqlite::Result<Vec<(String, String)>> {
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), |r| {
              Ok((r.get(0)?, r.get(1)?))
            })?
            .collect()
        };

        let majors = pairs(format!(
          "SELECT event_id, major_id FROM event_majors
           WHERE event_id IN ({placeholders}) ORDER BY rowid"
        ))?;
        let tags = pairs(format!(
          "SELECT event_id, tag FROM event_tags
           WHERE event_id IN ({placeholders}) ORDER BY rowid"
        ))?;
        Ok((majors, tags))
      })
      .await?;

    let mut out: HashMap<Uuid, EventAssociations> = HashMap::new();
    for (event_id, major_id) in major_rows {
      out
        .entry(decode_uuid(&event_id)?)
        .or_default()
        .major_ids
        .push(decode_uuid(&major_id)?);
    }
    for (event_id, tag) in tag_rows {
      out.entry(decode_uuid(&event_id)?).or_default().tags.push(tag);
    }
    Ok(out)
  }
}

// ─── MembershipStore impl ────────────────────────────────────────────────────

impl MembershipStore for SqliteStore {
  type Error = Error;

  async fn role_of(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<Role>> {
    let club_str = encode_uuid(organization_id);
    let user_str = encode_uuid(user_id);

    let role: Option<String> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT role FROM club_memberships WHERE club_id = ?1 AND user_id = ?2",
              rusqlite::params![club_str, user_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    role.map(|r| decode_enum("role", r)).transpose()
  }
}
