//! The `sessions` table: which DC the client is bound to and its auth key.
//!
//! Every setter rewrites the whole `(dc_id, server_address, port, auth_key,
//! takeout_id)` row: each setter re-sends the full current tuple.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use sqlx::{PgConnection, Row};
use sqlx::postgres::PgRow;

use crate::errors::{Result, SessionError};

/// Length of an MTProto authorization key.
pub const AUTH_KEY_LEN: usize = 256;

// ─── AuthKey ──────────────────────────────────────────────────────────────────

/// 256-byte shared secret negotiated with a DC.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthKey {
    data: [u8; AUTH_KEY_LEN],
}

impl AuthKey {
    pub const fn from_bytes(data: [u8; AUTH_KEY_LEN]) -> Self {
        Self { data }
    }

    /// `None` unless `bytes` is exactly [`AUTH_KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self::from_bytes)
    }

    pub const fn to_bytes(&self) -> [u8; AUTH_KEY_LEN] { self.data }

    pub const fn as_bytes(&self) -> &[u8] { &self.data }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthKey(..)")
    }
}

// ─── SessionRecord ────────────────────────────────────────────────────────────

/// One row of the `sessions` table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionRecord {
    pub dc_id:          i32,
    pub server_address: Option<String>,
    pub port:           Option<i32>,
    pub auth_key:       Option<AuthKey>,
    /// Set while a takeout (data export) session is active.
    pub takeout_id:     Option<i64>,
}

impl SessionRecord {
    /// An absent key is stored as an empty blob.
    fn auth_key_blob(&self) -> &[u8] {
        self.auth_key.as_ref().map(AuthKey::as_bytes).unwrap_or_default()
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        let blob: Option<Vec<u8>> = row.try_get("auth_key")?;
        let auth_key = match blob.as_deref() {
            None | Some([]) => None,
            Some(bytes) => Some(AuthKey::from_slice(bytes).ok_or_else(|| {
                SessionError::Corrupt(format!("auth key is {} bytes, expected {AUTH_KEY_LEN}", bytes.len()))
            })?),
        };
        Ok(Self {
            dc_id:          row.try_get("dc_id")?,
            server_address: row.try_get("server_address")?,
            port:           row.try_get("port")?,
            auth_key,
            takeout_id:     row.try_get("takeout_id")?,
        })
    }
}

// ─── SessionState ─────────────────────────────────────────────────────────────

/// The in-memory copy of the current row.
///
/// The lock is only ever held for a field update or a clone, never across
/// an `.await`.
#[derive(Debug, Default)]
pub(crate) struct SessionState(Mutex<SessionRecord>);

impl SessionState {
    pub(crate) fn snapshot(&self) -> SessionRecord {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn update(&self, f: impl FnOnce(&mut SessionRecord)) -> SessionRecord {
        let mut record = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut record);
        record.clone()
    }

    /// Switch to `dc_id`. The auth key is bound to the DC row, so the key
    /// previously stored for `dc_id` (if any) replaces the current one.
    pub(crate) fn set_dc(
        &self,
        dc_id:          i32,
        server_address: &str,
        port:           i32,
        stored_key:     Option<AuthKey>,
    ) -> SessionRecord {
        self.update(|r| {
            r.dc_id          = dc_id;
            r.server_address = Some(server_address.to_owned());
            r.port           = Some(port);
            r.auth_key       = stored_key;
        })
    }

    pub(crate) fn set_auth_key(&self, auth_key: Option<AuthKey>) -> SessionRecord {
        self.update(|r| r.auth_key = auth_key)
    }

    pub(crate) fn set_takeout_id(&self, takeout_id: Option<i64>) -> SessionRecord {
        self.update(|r| r.takeout_id = takeout_id)
    }
}

// ─── PostgreSQL ───────────────────────────────────────────────────────────────

pub(crate) async fn upsert(conn: &mut PgConnection, session_id: &str, record: &SessionRecord) -> Result<()> {
    sqlx::query(
        "insert into layer_session.sessions
            (session_id, dc_id, server_address, port, auth_key, takeout_id)
         values ($1, $2, $3, $4, $5, $6)
         on conflict (session_id, dc_id) do update set
            server_address = excluded.server_address,
            port           = excluded.port,
            auth_key       = excluded.auth_key,
            takeout_id     = excluded.takeout_id",
    )
    .bind(session_id)
    .bind(record.dc_id)
    .bind(record.server_address.as_deref())
    .bind(record.port)
    .bind(record.auth_key_blob())
    .bind(record.takeout_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// All rows of the session, or only the one for `dc_id`.
pub(crate) async fn select(
    conn:       &mut PgConnection,
    session_id: &str,
    dc_id:      Option<i32>,
) -> Result<Vec<SessionRecord>> {
    let rows = sqlx::query(
        "select dc_id, server_address, port, auth_key, takeout_id
         from layer_session.sessions
         where session_id = $1 and ($2::integer is null or dc_id = $2)
         order by dc_id",
    )
    .bind(session_id)
    .bind(dc_id)
    .fetch_all(conn)
    .await?;

    rows.iter().map(SessionRecord::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_key_requires_exact_length() {
        assert!(AuthKey::from_slice(&[1; AUTH_KEY_LEN]).is_some());
        assert!(AuthKey::from_slice(&[1; 255]).is_none());
        assert!(AuthKey::from_slice(&[]).is_none());
    }

    #[test]
    fn auth_key_debug_hides_bytes() {
        let key = AuthKey::from_bytes([0xAB; AUTH_KEY_LEN]);
        assert_eq!(format!("{key:?}"), "AuthKey(..)");
    }

    #[test]
    fn missing_key_is_empty_blob() {
        assert!(SessionRecord::default().auth_key_blob().is_empty());
    }

    #[test]
    fn setters_keep_the_rest_of_the_row() {
        let state = SessionState::default();
        state.set_dc(2, "149.154.167.51", 443, None);
        let record = state.set_takeout_id(Some(9));
        assert_eq!(record.dc_id, 2);
        assert_eq!(record.server_address.as_deref(), Some("149.154.167.51"));
        assert_eq!(record.takeout_id, Some(9));
    }

    #[test]
    fn switching_dc_replaces_the_key() {
        let state = SessionState::default();
        state.set_dc(2, "149.154.167.51", 443, None);
        state.set_auth_key(Some(AuthKey::from_bytes([2; AUTH_KEY_LEN])));

        let record = state.set_dc(4, "149.154.167.91", 443, None);
        assert_eq!(record.auth_key, None);

        let back = state.set_dc(2, "149.154.167.51", 443, Some(AuthKey::from_bytes([2; AUTH_KEY_LEN])));
        assert_eq!(back.auth_key, Some(AuthKey::from_bytes([2; AUTH_KEY_LEN])));
    }
}
