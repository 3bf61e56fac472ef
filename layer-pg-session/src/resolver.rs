//! Turning loose identifiers into [`InputPeer`]s.
//!
//! A caller may know a peer as a protocol object, a bare id, a phone number,
//! a `@username`, a `t.me` link or a display name. [`resolve_input_peer`]
//! tries, in a fixed order, to answer from the object itself and then from
//! the entity directory.

use std::fmt;
use std::future::Future;

use layer_peer::{InputPeer, Object, PeerError, UsernameOrInvite};

use crate::entities::{EntityRow, LookupColumn};
use crate::errors::{Result, SessionError};

// ─── EntityDirectory ──────────────────────────────────────────────────────────

/// Read access to a session's entity directory.
///
/// Rows come back ordered by id; the resolver takes the first one.
pub trait EntityDirectory: Sync {
    fn entity_rows_by_phone(&self, phone: &str) -> impl Future<Output = Result<Vec<EntityRow>>> + Send;

    /// `username` must already be lower-cased.
    fn entity_rows_by_username(&self, username: &str) -> impl Future<Output = Result<Vec<EntityRow>>> + Send;

    fn entity_rows_by_name(&self, name: &str) -> impl Future<Output = Result<Vec<EntityRow>>> + Send;

    /// With `exact`, `id` is a marked id. Otherwise it is a bare id that may
    /// belong to a user, a chat or a channel.
    fn entity_rows_by_id(&self, id: i64, exact: bool) -> impl Future<Output = Result<Vec<EntityRow>>> + Send;

    /// Dispatch on an allow-listed column.
    fn entity_rows_by_column(
        &self,
        column: LookupColumn,
        value:  &str,
    ) -> impl Future<Output = Result<Vec<EntityRow>>> + Send {
        async move {
            match column {
                LookupColumn::Phone    => self.entity_rows_by_phone(value).await,
                LookupColumn::Username => self.entity_rows_by_username(value).await,
                LookupColumn::Name     => self.entity_rows_by_name(value).await,
            }
        }
    }
}

// ─── EntityKey ────────────────────────────────────────────────────────────────

/// Anything [`resolve_input_peer`] accepts.
#[derive(Clone, Copy, Debug)]
pub enum EntityKey<'a> {
    InputPeer(InputPeer),
    Object(&'a Object),
    /// Phone number, username, invite link or display name.
    Text(&'a str),
    /// Marked id when negative; any of user / chat / channel otherwise.
    Id(i64),
}

impl From<InputPeer> for EntityKey<'_> {
    fn from(p: InputPeer) -> Self { Self::InputPeer(p) }
}

impl<'a> From<&'a Object> for EntityKey<'a> {
    fn from(o: &'a Object) -> Self { Self::Object(o) }
}

impl<'a> From<&'a str> for EntityKey<'a> {
    fn from(s: &'a str) -> Self { Self::Text(s) }
}

impl<'a> From<&'a String> for EntityKey<'a> {
    fn from(s: &'a String) -> Self { Self::Text(s) }
}

impl From<i64> for EntityKey<'_> {
    fn from(id: i64) -> Self { Self::Id(id) }
}

impl fmt::Display for EntityKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputPeer(p) => write!(f, "{p:?}"),
            Self::Object(o)    => write!(f, "{o:?}"),
            Self::Text(s)      => write!(f, "{s:?}"),
            Self::Id(id)       => write!(f, "{id}"),
        }
    }
}

// ─── Resolution ───────────────────────────────────────────────────────────────

/// Resolve `key` to an input peer, looking in `dir` only when the key itself
/// does not carry an access hash.
///
/// Returns [`SessionError::EntityNotFound`] when every strategy comes up
/// empty.
pub async fn resolve_input_peer<D>(dir: &D, key: EntityKey<'_>) -> Result<InputPeer>
where
    D: EntityDirectory + ?Sized,
{
    let rows = match key {
        EntityKey::InputPeer(peer) => return Ok(peer),
        EntityKey::Object(obj) => match obj.to_input_peer(true) {
            Ok(peer) => return Ok(peer),
            // Known peer, unknown hash: the directory may have it.
            Err(PeerError::UnusableHash(peer)) => dir.entity_rows_by_id(peer.marked(), true).await?,
            Err(PeerError::NotPeer(_)) => Vec::new(),
        },
        EntityKey::Id(id) => dir.entity_rows_by_id(id, id < 0).await?,
        EntityKey::Text(text) => {
            let rows = rows_for_text(dir, text).await?;
            if rows.is_empty() {
                dir.entity_rows_by_name(text).await?
            } else {
                rows
            }
        }
    };

    match rows.first() {
        Some(row) => Ok(row.input_peer()),
        None => {
            tracing::debug!("[layer-pg] no entity for key {key}");
            Err(SessionError::EntityNotFound(key.to_string()))
        }
    }
}

async fn rows_for_text<D>(dir: &D, text: &str) -> Result<Vec<EntityRow>>
where
    D: EntityDirectory + ?Sized,
{
    if let Some(phone) = layer_peer::parse_phone(text) {
        return dir.entity_rows_by_phone(&phone).await;
    }
    match layer_peer::parse_username(text) {
        Some(UsernameOrInvite::Username(username)) => dir.entity_rows_by_username(&username).await,
        _ => match layer_peer::resolve_invite_link(text) {
            Some(link) => dir.entity_rows_by_id(i64::from(link.chat_id), false).await,
            None => Ok(Vec::new()),
        },
    }
}
