//! PostgreSQL-backed [`SessionStore`].

use std::sync::atomic::{AtomicBool, Ordering};

use layer_peer::{InputPeer, Object};
use sqlx::PgConnection;
use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::entities::{self, EntityRow, EntitySource, LookupColumn};
use crate::errors::Result;
use crate::files::{self, FileKind, InputFile};
use crate::pool::ConnectionPool;
use crate::resolver::{EntityDirectory, EntityKey, resolve_input_peer};
use crate::schema;
use crate::sessions::{self, AuthKey, SessionRecord, SessionState};
use crate::store::{SessionStore, Setting};
use crate::update_state::{self, UpdateState};

/// Session state stored in the `layer_session` schema of a PostgreSQL
/// database.
///
/// Each operation checks out one pooled connection for its own duration, so
/// a single `PgSession` can be shared (behind an `Arc`) by every task of a
/// client.
///
/// ```rust,no_run
/// use layer_pg_session::{PgSession, SessionConfig, SessionStore, Setting};
///
/// # async fn demo() -> layer_pg_session::Result<()> {
/// let session = PgSession::new(SessionConfig::from_env()?)?;
/// session.start(vec![Setting::dc(2, "149.154.167.51", 443)]).await?;
/// assert!(session.is_started());
/// session.close().await;
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct PgSession {
    session_id:    String,
    save_entities: bool,
    pool:          ConnectionPool,
    state:         SessionState,
    /// Serialises schema bootstrap and the settings replayed by `start`.
    bootstrap:     Mutex<()>,
    started:       AtomicBool,
}

impl PgSession {
    /// Build a store from `config`. No connection is opened until
    /// [`SessionStore::start`].
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let pool = ConnectionPool::from_config(&config)?;
        let session_id = (config.session_id_factory)();
        tracing::debug!(
            session_id = %session_id,
            owned_pool = pool.is_owned(),
            "[layer-pg] session store created"
        );
        Ok(Self {
            session_id,
            save_entities: config.save_entities,
            pool,
            state:         SessionState::default(),
            bootstrap:     Mutex::new(()),
            started:       AtomicBool::new(false),
        })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// True if all four session tables exist.
    pub async fn tables_exist(&self) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        schema::tables_exist(&mut conn).await
    }

    /// Create the schema and tables if missing. Safe to call repeatedly.
    pub async fn create_tables(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        schema::create_tables(&mut conn, &self.bootstrap).await
    }

    /// The stored row for `dc_id`, if any.
    pub async fn session_record(&self, dc_id: i32) -> Result<Option<SessionRecord>> {
        let mut conn = self.pool.acquire().await?;
        Ok(sessions::select(&mut conn, &self.session_id, Some(dc_id)).await?.into_iter().next())
    }

    /// Every stored row of this session, ordered by DC.
    pub async fn session_records(&self) -> Result<Vec<SessionRecord>> {
        let mut conn = self.pool.acquire().await?;
        sessions::select(&mut conn, &self.session_id, None).await
    }

    /// Every stored update cursor, ordered by entity id.
    pub async fn update_states(&self) -> Result<Vec<(i64, UpdateState)>> {
        let mut conn = self.pool.acquire().await?;
        update_state::select_all(&mut conn, &self.session_id).await
    }

    /// Look entities up by a column given by name.
    ///
    /// Fails with [`crate::SessionError::InvalidLookupColumn`] before touching
    /// the database unless `column` is `phone`, `username` or `name`.
    pub async fn entity_rows_by(&self, column: &str, value: &str) -> Result<Vec<EntityRow>> {
        let column: LookupColumn = column.parse()?;
        self.entity_rows_by_column(column, value).await
    }

    async fn select_entities(&self, column: LookupColumn, value: &str) -> Result<Vec<EntityRow>> {
        let mut conn = self.pool.acquire().await?;
        entities::select_by_column(&mut conn, &self.session_id, column, value).await
    }

    async fn bootstrap(&self, settings: Vec<Setting>) -> Result<()> {
        let _guard = self.bootstrap.lock().await;
        if self.is_started() {
            return Ok(());
        }
        let mut conn = self.pool.acquire().await?;
        if schema::ensure_schema_locked(&mut conn).await? {
            tracing::info!(session_id = %self.session_id, "[layer-pg] created session tables");
        }
        for setting in settings {
            self.apply_on(&mut conn, setting).await?;
        }
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    async fn apply_on(&self, conn: &mut PgConnection, setting: Setting) -> Result<()> {
        tracing::debug!(session_id = %self.session_id, "[layer-pg] applying {} setting", setting.name());
        let record = match setting {
            Setting::Dc { dc_id, server_address, port } => {
                let stored_key = self.stored_key(conn, dc_id).await?;
                self.state.set_dc(dc_id, &server_address, port, stored_key)
            }
            Setting::AuthKey(key)                       => self.state.set_auth_key(key),
            Setting::TakeoutId(id)                      => self.state.set_takeout_id(id),
            Setting::UpdateState { entity_id, state } => {
                return update_state::upsert(conn, &self.session_id, entity_id, &state).await;
            }
        };
        sessions::upsert(conn, &self.session_id, &record).await
    }

    /// The auth key already stored for `dc_id`.
    async fn stored_key(&self, conn: &mut PgConnection, dc_id: i32) -> Result<Option<AuthKey>> {
        let rows = sessions::select(conn, &self.session_id, Some(dc_id)).await?;
        Ok(rows.into_iter().next().and_then(|r| r.auth_key))
    }

    async fn write_record(&self, record: SessionRecord) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sessions::upsert(&mut conn, &self.session_id, &record).await
    }
}

impl SessionStore for PgSession {
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
        match self.bootstrap(settings).await {
            Ok(()) => {
                tracing::info!(session_id = %self.session_id, "[layer-pg] session started");
                Ok(())
            }
            Err(e) if e.is_database() => {
                tracing::warn!(session_id = %self.session_id, "[layer-pg] bootstrap failed, closing store: {e}");
                self.close().await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn set_dc(&self, dc_id: i32, server_address: &str, port: i32) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let stored_key = self.stored_key(&mut conn, dc_id).await?;
        let record = self.state.set_dc(dc_id, server_address, port, stored_key);
        sessions::upsert(&mut conn, &self.session_id, &record).await
    }

    async fn set_auth_key(&self, auth_key: Option<AuthKey>) -> Result<()> {
        self.write_record(self.state.set_auth_key(auth_key)).await
    }

    async fn set_takeout_id(&self, takeout_id: Option<i64>) -> Result<()> {
        self.write_record(self.state.set_takeout_id(takeout_id)).await
    }

    async fn get_update_state(&self, entity_id: i64) -> Result<Option<UpdateState>> {
        let mut conn = self.pool.acquire().await?;
        update_state::select(&mut conn, &self.session_id, entity_id).await
    }

    async fn set_update_state(&self, entity_id: i64, state: &UpdateState) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        update_state::upsert(&mut conn, &self.session_id, entity_id, state).await
    }

    async fn process_entities(&self, source: EntitySource<'_>) -> Result<()> {
        if !self.save_entities {
            return Ok(());
        }
        let records = source.records();
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.acquire().await?;
        entities::upsert(&mut conn, &self.session_id, &records).await
    }

    async fn get_input_entity(&self, key: EntityKey<'_>) -> Result<InputPeer> {
        resolve_input_peer(self, key).await
    }

    async fn get_file(&self, md5_digest: &[u8], file_size: i64, kind: FileKind) -> Result<Option<InputFile>> {
        let mut conn = self.pool.acquire().await?;
        files::select(&mut conn, &self.session_id, md5_digest, file_size, kind).await
    }

    async fn cache_file(&self, md5_digest: &[u8], file_size: i64, instance: &Object) -> Result<()> {
        let file = InputFile::from_object(instance)?;
        let mut conn = self.pool.acquire().await?;
        files::upsert(&mut conn, &self.session_id, md5_digest, file_size, &file).await
    }

    async fn delete(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        schema::delete_session(&mut conn, &self.session_id).await?;
        tracing::info!(session_id = %self.session_id, "[layer-pg] session deleted");
        Ok(())
    }

    async fn close(&self) {
        self.started.store(false, Ordering::Release);
        self.pool.close().await;
        tracing::info!(session_id = %self.session_id, "[layer-pg] session closed");
    }
}

impl EntityDirectory for PgSession {
    async fn entity_rows_by_phone(&self, phone: &str) -> Result<Vec<EntityRow>> {
        self.select_entities(LookupColumn::Phone, phone).await
    }

    async fn entity_rows_by_username(&self, username: &str) -> Result<Vec<EntityRow>> {
        self.select_entities(LookupColumn::Username, username).await
    }

    async fn entity_rows_by_name(&self, name: &str) -> Result<Vec<EntityRow>> {
        self.select_entities(LookupColumn::Name, name).await
    }

    async fn entity_rows_by_id(&self, id: i64, exact: bool) -> Result<Vec<EntityRow>> {
        let mut conn = self.pool.acquire().await?;
        entities::select_by_id(&mut conn, &self.session_id, id, exact).await
    }
}
