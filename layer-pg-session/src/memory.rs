//! In-process [`SessionStore`].
//!
//! Same semantics as [`crate::PgSession`] with nothing written to disk.
//! Useful for tests, or for bots that should always start fresh.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use layer_peer::{InputPeer, Object};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::default_session_id;
use crate::entities::{EntityRecord, EntityRow, EntitySource, LookupColumn, lookup_ids};
use crate::errors::Result;
use crate::files::{FileKind, InputFile, SentFileKey};
use crate::resolver::{EntityDirectory, EntityKey, resolve_input_peer};
use crate::sessions::{AuthKey, SessionRecord, SessionState};
use crate::store::{self, SessionStore, Setting};
use crate::update_state::UpdateState;

#[derive(Debug, Default)]
struct Tables {
    sessions:     BTreeMap<i32, SessionRecord>,
    entities:     BTreeMap<i64, EntityRecord>,
    sent_files:   HashMap<SentFileKey, (i64, i64)>,
    update_state: BTreeMap<i64, UpdateState>,
}

#[derive(Debug)]
pub struct MemorySession {
    session_id:    String,
    save_entities: bool,
    state:         SessionState,
    tables:        Mutex<Tables>,
    /// Serialises the settings replayed by `start`.
    bootstrap:     AsyncMutex<()>,
    started:       AtomicBool,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::with_session_id(default_session_id())
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id:    session_id.into(),
            save_entities: true,
            state:         SessionState::default(),
            tables:        Mutex::new(Tables::default()),
            bootstrap:     AsyncMutex::new(()),
            started:       AtomicBool::new(false),
        }
    }

    pub fn save_entities(mut self, enabled: bool) -> Self {
        self.save_entities = enabled;
        self
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session_record(&self, dc_id: i32) -> Option<SessionRecord> {
        self.tables().sessions.get(&dc_id).cloned()
    }

    pub fn session_records(&self) -> Vec<SessionRecord> {
        self.tables().sessions.values().cloned().collect()
    }

    pub fn update_states(&self) -> Vec<(i64, UpdateState)> {
        self.tables().update_state.iter().map(|(id, s)| (*id, *s)).collect()
    }

    /// The directory row stored under marked id `id`.
    pub fn entity(&self, id: i64) -> Option<EntityRecord> {
        self.tables().entities.get(&id).cloned()
    }

    pub fn entity_count(&self) -> usize {
        self.tables().entities.len()
    }

    /// See [`crate::PgSession::entity_rows_by`].
    pub fn entity_rows_by(&self, column: &str, value: &str) -> Result<Vec<EntityRow>> {
        let column: LookupColumn = column.parse()?;
        Ok(self.select_entities(column, value))
    }

    fn select_entities(&self, column: LookupColumn, value: &str) -> Vec<EntityRow> {
        self.tables()
            .entities
            .values()
            .filter(|r| column.value_of(r) == Some(value))
            .map(EntityRow::from)
            .collect()
    }

    fn write_record(&self, record: SessionRecord) {
        self.tables().sessions.insert(record.dc_id, record);
    }
}

impl Default for MemorySession {
    fn default() -> Self { Self::new() }
}

impl SessionStore for MemorySession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn current_session(&self) -> SessionRecord {
        self.state.snapshot()
    }

    async fn start(&self, settings: Vec<Setting>) -> Result<()> {
        if self.is_started() {
            return Ok(());
        }
        let _guard = self.bootstrap.lock().await;
        if self.is_started() {
            return Ok(());
        }
        for setting in settings {
            store::apply(self, setting).await?;
        }
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    async fn set_dc(&self, dc_id: i32, server_address: &str, port: i32) -> Result<()> {
        let stored_key = self.session_record(dc_id).and_then(|r| r.auth_key);
        self.write_record(self.state.set_dc(dc_id, server_address, port, stored_key));
        Ok(())
    }

    async fn set_auth_key(&self, auth_key: Option<AuthKey>) -> Result<()> {
        self.write_record(self.state.set_auth_key(auth_key));
        Ok(())
    }

    async fn set_takeout_id(&self, takeout_id: Option<i64>) -> Result<()> {
        self.write_record(self.state.set_takeout_id(takeout_id));
        Ok(())
    }

    async fn get_update_state(&self, entity_id: i64) -> Result<Option<UpdateState>> {
        Ok(self.tables().update_state.get(&entity_id).copied())
    }

    async fn set_update_state(&self, entity_id: i64, state: &UpdateState) -> Result<()> {
        self.tables().update_state.insert(entity_id, state.normalized());
        Ok(())
    }

    async fn process_entities(&self, source: EntitySource<'_>) -> Result<()> {
        if !self.save_entities {
            return Ok(());
        }
        let mut tables = self.tables();
        for record in source.records() {
            tables.entities.insert(record.id, record);
        }
        Ok(())
    }

    async fn get_input_entity(&self, key: EntityKey<'_>) -> Result<InputPeer> {
        resolve_input_peer(self, key).await
    }

    async fn get_file(&self, md5_digest: &[u8], file_size: i64, kind: FileKind) -> Result<Option<InputFile>> {
        let key = SentFileKey { md5_digest: md5_digest.to_vec(), file_size, kind };
        Ok(self.tables().sent_files.get(&key).map(|&(id, hash)| InputFile::new(kind, id, hash)))
    }

    async fn cache_file(&self, md5_digest: &[u8], file_size: i64, instance: &Object) -> Result<()> {
        let file = InputFile::from_object(instance)?;
        let key = SentFileKey { md5_digest: md5_digest.to_vec(), file_size, kind: file.kind() };
        self.tables().sent_files.insert(key, (file.id(), file.access_hash()));
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        *self.tables() = Tables::default();
        Ok(())
    }

    async fn close(&self) {
        self.started.store(false, Ordering::Release);
    }
}

impl EntityDirectory for MemorySession {
    async fn entity_rows_by_phone(&self, phone: &str) -> Result<Vec<EntityRow>> {
        Ok(self.select_entities(LookupColumn::Phone, phone))
    }

    async fn entity_rows_by_username(&self, username: &str) -> Result<Vec<EntityRow>> {
        Ok(self.select_entities(LookupColumn::Username, username))
    }

    async fn entity_rows_by_name(&self, name: &str) -> Result<Vec<EntityRow>> {
        Ok(self.select_entities(LookupColumn::Name, name))
    }

    async fn entity_rows_by_id(&self, id: i64, exact: bool) -> Result<Vec<EntityRow>> {
        let ids = lookup_ids(id, exact);
        Ok(self
            .tables()
            .entities
            .values()
            .filter(|r| ids.contains(&r.id))
            .map(EntityRow::from)
            .collect())
    }
}
