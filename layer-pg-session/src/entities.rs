//! The entity directory: every user, chat and channel the client has seen.
//!
//! Rows are keyed by marked id and refreshed (last write wins) each time an
//! entity shows up in a response.

use std::fmt;
use std::str::FromStr;

use layer_peer::{InputPeer, Object, PeerId};
use sqlx::{Connection, PgConnection};

use crate::errors::{Result, SessionError};

// ─── EntityRecord ─────────────────────────────────────────────────────────────

/// One row of the `entities` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRecord {
    /// Marked id, see [`PeerId::marked`].
    pub id:       i64,
    /// Access hash; always `0` for basic groups.
    pub hash:     i64,
    /// Lower-cased.
    pub username: Option<String>,
    pub phone:    Option<String>,
    pub name:     Option<String>,
}

impl EntityRecord {
    /// Extract the directory row for `obj`.
    ///
    /// Objects that cannot be addressed later are skipped: anything that is
    /// not a user, chat or channel, `min` objects, and objects without an
    /// access hash.
    pub fn from_object(obj: &Object) -> Option<Self> {
        let (id, hash) = match obj.to_input_peer(false).ok()? {
            InputPeer::User(u)    => (PeerId::User(u.user_id), u.access_hash),
            InputPeer::Chat(c)    => (PeerId::Chat(c.chat_id), 0),
            InputPeer::Channel(c) => (PeerId::Channel(c.channel_id), c.access_hash),
            InputPeer::Empty | InputPeer::PeerSelf => return None,
        };
        Some(Self {
            id:       id.marked(),
            hash,
            username: obj.username().map(str::to_lowercase),
            phone:    obj.phone().map(str::to_owned),
            name:     obj.display_name(),
        })
    }

    pub const fn peer_id(&self) -> PeerId {
        PeerId::from_marked(self.id)
    }
}

// ─── EntitySource ─────────────────────────────────────────────────────────────

/// The entity-carrying fields of a response (`users.getFullUser`,
/// `messages.getDialogs`, `contacts.resolveUsername`, …).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseEntities {
    pub user:  Option<Object>,
    pub chats: Vec<Object>,
    pub users: Vec<Object>,
}

/// What [`crate::SessionStore::process_entities`] accepts: a response, or a
/// flat list of entities.
#[derive(Clone, Copy, Debug)]
pub enum EntitySource<'a> {
    Response(&'a ResponseEntities),
    List(&'a [Object]),
}

impl<'a> EntitySource<'a> {
    /// Every candidate object, `user` first, then `chats`, then `users`.
    pub fn objects(&self) -> Vec<&'a Object> {
        match *self {
            Self::List(list) => list.iter().collect(),
            Self::Response(r) => r.user.iter().chain(&r.chats).chain(&r.users).collect(),
        }
    }

    /// Directory rows for every object that can be stored.
    pub fn records(&self) -> Vec<EntityRecord> {
        self.objects().into_iter().filter_map(EntityRecord::from_object).collect()
    }
}

impl<'a> From<&'a ResponseEntities> for EntitySource<'a> {
    fn from(r: &'a ResponseEntities) -> Self { Self::Response(r) }
}

impl<'a> From<&'a [Object]> for EntitySource<'a> {
    fn from(list: &'a [Object]) -> Self { Self::List(list) }
}

impl<'a> From<&'a Vec<Object>> for EntitySource<'a> {
    fn from(list: &'a Vec<Object>) -> Self { Self::List(list) }
}

// ─── Lookups ──────────────────────────────────────────────────────────────────

/// The columns entities may be looked up by. Column names are spliced into
/// SQL, so nothing outside this list ever reaches a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupColumn {
    Phone,
    Username,
    Name,
}

impl LookupColumn {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phone    => "phone",
            Self::Username => "username",
            Self::Name     => "name",
        }
    }

    /// The column's value in `record`.
    pub fn value_of(self, record: &EntityRecord) -> Option<&str> {
        match self {
            Self::Phone    => record.phone.as_deref(),
            Self::Username => record.username.as_deref(),
            Self::Name     => record.name.as_deref(),
        }
    }
}

impl FromStr for LookupColumn {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "phone"    => Ok(Self::Phone),
            "username" => Ok(Self::Username),
            "name"     => Ok(Self::Name),
            other      => Err(SessionError::InvalidLookupColumn(other.to_owned())),
        }
    }
}

impl fmt::Display for LookupColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(id, hash)` pair returned by directory lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityRow {
    /// Marked id.
    pub id:   i64,
    pub hash: i64,
}

impl EntityRow {
    pub const fn input_peer(&self) -> InputPeer {
        InputPeer::from_peer_id(PeerId::from_marked(self.id), self.hash)
    }
}

impl From<&EntityRecord> for EntityRow {
    fn from(r: &EntityRecord) -> Self {
        Self { id: r.id, hash: r.hash }
    }
}

/// Marked ids a lookup by `id` may match.
///
/// Exact lookups take `id` as already marked; the rest try it as a user, a
/// chat and a channel.
pub fn lookup_ids(id: i64, exact: bool) -> Vec<i64> {
    if exact { vec![id] } else { PeerId::candidates(id).to_vec() }
}

// ─── PostgreSQL ───────────────────────────────────────────────────────────────

/// Upsert a batch in one transaction.
pub(crate) async fn upsert(conn: &mut PgConnection, session_id: &str, records: &[EntityRecord]) -> Result<()> {
    let mut tx = conn.begin().await?;
    for r in records {
        sqlx::query(
            "insert into layer_session.entities (session_id, id, hash, username, phone, name)
             values ($1, $2, $3, $4, $5, $6)
             on conflict (session_id, id) do update set
                hash     = excluded.hash,
                username = excluded.username,
                phone    = excluded.phone,
                name     = excluded.name",
        )
        .bind(session_id)
        .bind(r.id)
        .bind(r.hash)
        .bind(r.username.as_deref())
        .bind(r.phone.as_deref())
        .bind(r.name.as_deref())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub(crate) async fn select_by_column(
    conn:       &mut PgConnection,
    session_id: &str,
    column:     LookupColumn,
    value:      &str,
) -> Result<Vec<EntityRow>> {
    let sql = format!(
        "select id, hash from layer_session.entities
         where session_id = $1 and {column} = $2
         order by id"
    );
    let rows: Vec<(i64, i64)> = sqlx::query_as(&sql)
        .bind(session_id)
        .bind(value)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(|(id, hash)| EntityRow { id, hash }).collect())
}

pub(crate) async fn select_by_id(
    conn:       &mut PgConnection,
    session_id: &str,
    id:         i64,
    exact:      bool,
) -> Result<Vec<EntityRow>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "select id, hash from layer_session.entities
         where session_id = $1 and id = any($2)
         order by id",
    )
    .bind(session_id)
    .bind(lookup_ids(id, exact))
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(id, hash)| EntityRow { id, hash }).collect())
}
