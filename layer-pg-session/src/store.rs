//! The capability a protocol client needs from its session storage.
//!
//! Clients take any [`SessionStore`] by generic parameter; [`crate::PgSession`]
//! and [`crate::MemorySession`] are the two implementations shipped here.

use std::future::Future;

use layer_peer::{InputPeer, Object};

use crate::entities::EntitySource;
use crate::errors::Result;
use crate::files::{FileKind, InputFile};
use crate::resolver::EntityKey;
use crate::sessions::{AuthKey, SessionRecord};
use crate::update_state::UpdateState;

// ─── Setting ──────────────────────────────────────────────────────────────────

/// One deferred setter call, replayed by [`SessionStore::start`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Setting {
    Dc { dc_id: i32, server_address: String, port: i32 },
    AuthKey(Option<AuthKey>),
    TakeoutId(Option<i64>),
    UpdateState { entity_id: i64, state: UpdateState },
}

impl Setting {
    pub fn dc(dc_id: i32, server_address: impl Into<String>, port: i32) -> Self {
        Self::Dc { dc_id, server_address: server_address.into(), port }
    }

    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::Dc { .. }          => "dc",
            Self::AuthKey(_)         => "auth_key",
            Self::TakeoutId(_)       => "takeout_id",
            Self::UpdateState { .. } => "update_state",
        }
    }
}

// ─── SessionStore ─────────────────────────────────────────────────────────────

/// Durable session state: DC binding and auth key, the entity directory, the
/// sent-file cache and update cursors.
///
/// Every method except [`SessionStore::start`] assumes the store was started.
pub trait SessionStore: Send + Sync {
    /// Partition key of every row this store writes.
    fn session_id(&self) -> &str;

    fn is_started(&self) -> bool;

    /// In-memory copy of the current session row.
    fn current_session(&self) -> SessionRecord;

    /// Bootstrap storage, then apply `settings` in order.
    ///
    /// A no-op on a started store. On a storage failure the store is closed
    /// and the error returned.
    fn start(&self, settings: Vec<Setting>) -> impl Future<Output = Result<()>> + Send;

    fn set_dc(&self, dc_id: i32, server_address: &str, port: i32) -> impl Future<Output = Result<()>> + Send;

    fn set_auth_key(&self, auth_key: Option<AuthKey>) -> impl Future<Output = Result<()>> + Send;

    fn set_takeout_id(&self, takeout_id: Option<i64>) -> impl Future<Output = Result<()>> + Send;

    /// `None` until a state has been stored for `entity_id`.
    fn get_update_state(&self, entity_id: i64) -> impl Future<Output = Result<Option<UpdateState>>> + Send;

    fn set_update_state(&self, entity_id: i64, state: &UpdateState) -> impl Future<Output = Result<()>> + Send;

    /// Record every addressable entity in `source`.
    fn process_entities(&self, source: EntitySource<'_>) -> impl Future<Output = Result<()>> + Send;

    fn get_input_entity(&self, key: EntityKey<'_>) -> impl Future<Output = Result<InputPeer>> + Send;

    fn get_file(
        &self,
        md5_digest: &[u8],
        file_size:  i64,
        kind:       FileKind,
    ) -> impl Future<Output = Result<Option<InputFile>>> + Send;

    /// Remember an upload. `instance` must be an input document or photo.
    fn cache_file(
        &self,
        md5_digest: &[u8],
        file_size:  i64,
        instance:   &Object,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove everything stored under this session id.
    fn delete(&self) -> impl Future<Output = Result<()>> + Send;

    /// Release resources. The store can be started again afterwards only if
    /// its pool is borrowed.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Writes are immediate, so there is nothing to flush.
    fn save(&self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Apply `setting` through the regular setters.
pub(crate) async fn apply<S: SessionStore + ?Sized>(store: &S, setting: Setting) -> Result<()> {
    match setting {
        Setting::Dc { dc_id, server_address, port } => store.set_dc(dc_id, &server_address, port).await,
        Setting::AuthKey(key)                       => store.set_auth_key(key).await,
        Setting::TakeoutId(id)                      => store.set_takeout_id(id).await,
        Setting::UpdateState { entity_id, state }   => store.set_update_state(entity_id, &state).await,
    }
}
