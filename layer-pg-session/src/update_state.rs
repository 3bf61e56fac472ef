//! Per-entity update cursors.
//!
//! The server numbers updates with **pts** (per channel, or the common box
//! under entity id `0`), **qts** (secret chats) and **seq** (the combined
//! container). Persisting the last seen values lets a restarted client ask
//! for exactly the updates it missed.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::errors::{Result, SessionError};

// ─── UpdateState ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateState {
    pub pts:  i32,
    pub qts:  i32,
    /// Date of the last known update. Stored with second precision.
    pub date: DateTime<Utc>,
    pub seq:  i32,
}

impl UpdateState {
    /// `date` is truncated to whole seconds.
    pub fn new(pts: i32, qts: i32, date: DateTime<Utc>, seq: i32) -> Self {
        Self { pts, qts, date, seq }.normalized()
    }

    /// The state as it reads back from storage: sub-second precision dropped.
    pub fn normalized(self) -> Self {
        let date = DateTime::from_timestamp(self.date.timestamp(), 0).unwrap_or(self.date);
        Self { date, ..self }
    }

    /// Build from the raw `updates.state` fields (date as Unix seconds).
    pub fn from_unix(pts: i32, qts: i32, date: i64, seq: i32) -> Result<Self> {
        let date = DateTime::from_timestamp(date, 0)
            .ok_or_else(|| SessionError::Corrupt(format!("update date {date} is out of range")))?;
        Ok(Self { pts, qts, date, seq })
    }

    pub fn unix_date(&self) -> i64 {
        self.date.timestamp()
    }
}

// ─── PostgreSQL ───────────────────────────────────────────────────────────────

type StateRow = (i64, i32, i32, i64, i32);

fn from_row((_, pts, qts, date, seq): StateRow) -> Result<UpdateState> {
    UpdateState::from_unix(pts, qts, date, seq)
}

pub(crate) async fn select(conn: &mut PgConnection, session_id: &str, entity_id: i64) -> Result<Option<UpdateState>> {
    let row: Option<StateRow> = sqlx::query_as(
        "select id, pts, qts, date, seq from layer_session.update_state
         where session_id = $1 and id = $2",
    )
    .bind(session_id)
    .bind(entity_id)
    .fetch_optional(conn)
    .await?;
    row.map(from_row).transpose()
}

pub(crate) async fn select_all(conn: &mut PgConnection, session_id: &str) -> Result<Vec<(i64, UpdateState)>> {
    let rows: Vec<StateRow> = sqlx::query_as(
        "select id, pts, qts, date, seq from layer_session.update_state
         where session_id = $1
         order by id",
    )
    .bind(session_id)
    .fetch_all(conn)
    .await?;
    rows.into_iter()
        .map(|row| {
            let entity_id = row.0;
            from_row(row).map(|state| (entity_id, state))
        })
        .collect()
}

pub(crate) async fn upsert(
    conn:       &mut PgConnection,
    session_id: &str,
    entity_id:  i64,
    state:      &UpdateState,
) -> Result<()> {
    sqlx::query(
        "insert into layer_session.update_state (session_id, id, pts, qts, date, seq)
         values ($1, $2, $3, $4, $5, $6)
         on conflict (session_id, id) do update set
            pts  = excluded.pts,
            qts  = excluded.qts,
            date = excluded.date,
            seq  = excluded.seq",
    )
    .bind(session_id)
    .bind(entity_id)
    .bind(state.pts)
    .bind(state.qts)
    .bind(state.unix_date())
    .bind(state.seq)
    .execute(conn)
    .await?;
    Ok(())
}
