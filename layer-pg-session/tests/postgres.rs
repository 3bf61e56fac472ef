//! Runs against a real database when `LAYER_PG_TEST_DSN` is set; every test
//! returns early otherwise.

use chrono::{TimeZone, Utc};
use layer_pg_session::layer_peer::{InputDocument, InputPeer, InputPeerUser, Object, PeerId, User};
use layer_pg_session::{
    AuthKey, EntitySource, FileKind, PgSession, SessionConfig, SessionError, SessionStore, Setting,
    UpdateState, schema,
};

const ENV_TEST_DSN: &str = "LAYER_PG_TEST_DSN";

async fn session() -> Option<PgSession> {
    let dsn = std::env::var(ENV_TEST_DSN).ok()?;
    let session = PgSession::new(SessionConfig::dsn(dsn).max_connections(2)).unwrap();
    session.start(Vec::new()).await.unwrap();
    Some(session)
}

async fn finish(session: PgSession) {
    session.delete().await.unwrap();
    session.close().await;
}

fn bob(hash: i64) -> Object {
    Object::User(User {
        id:          55,
        access_hash: Some(hash),
        first_name:  Some("Bob".into()),
        username:    Some("bob".into()),
        phone:       Some("1555".into()),
        ..Default::default()
    })
}

#[tokio::test]
async fn create_tables_is_idempotent() {
    let Some(session) = session().await else { return };
    assert!(session.tables_exist().await.unwrap());
    session.create_tables().await.unwrap();
    session.create_tables().await.unwrap();
    assert!(session.tables_exist().await.unwrap());
    finish(session).await;
}

#[tokio::test]
async fn ensure_schema_reports_existing_tables() {
    let Some(session) = session().await else { return };
    let mut conn = session.pool().acquire().await.unwrap();
    let created = schema::ensure_schema(&mut conn, &tokio::sync::Mutex::new(())).await.unwrap();
    assert!(!created);
    drop(conn);
    finish(session).await;
}

#[tokio::test]
async fn concurrent_create_tables_succeed() {
    let Some(session) = session().await else { return };
    let (a, b) = tokio::join!(session.create_tables(), session.create_tables());
    a.unwrap();
    b.unwrap();
    assert!(session.tables_exist().await.unwrap());
    finish(session).await;
}

#[tokio::test]
async fn session_record_round_trips() {
    let Some(session) = session().await else { return };
    let key = AuthKey::from_bytes([3; 256]);

    session.set_dc(2, "149.154.167.51", 443).await.unwrap();
    session.set_auth_key(Some(key.clone())).await.unwrap();

    let record = session.session_record(2).await.unwrap().unwrap();
    assert_eq!(record.server_address.as_deref(), Some("149.154.167.51"));
    assert_eq!(record.port, Some(443));
    assert_eq!(record.auth_key, Some(key));
    assert_eq!(record.takeout_id, None);

    session.set_auth_key(None).await.unwrap();
    assert_eq!(session.session_record(2).await.unwrap().unwrap().auth_key, None);
    finish(session).await;
}

#[tokio::test]
async fn switching_dc_binds_keys_per_dc() {
    let Some(session) = session().await else { return };
    let key = AuthKey::from_bytes([2; 256]);
    session.set_dc(2, "149.154.167.51", 443).await.unwrap();
    session.set_auth_key(Some(key.clone())).await.unwrap();

    session.set_dc(4, "149.154.167.91", 443).await.unwrap();
    assert_eq!(session.current_session().auth_key, None);
    assert_eq!(session.session_record(4).await.unwrap().unwrap().auth_key, None);
    assert_eq!(session.session_record(2).await.unwrap().unwrap().auth_key, Some(key.clone()));

    session.set_dc(2, "149.154.167.51", 443).await.unwrap();
    assert_eq!(session.current_session().auth_key, Some(key));
    finish(session).await;
}

#[tokio::test]
async fn start_replays_settings() {
    let Some(dsn) = std::env::var(ENV_TEST_DSN).ok() else { return };
    let session = PgSession::new(SessionConfig::dsn(dsn)).unwrap();
    let date = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    session
        .start(vec![
            Setting::dc(4, "149.154.167.91", 443),
            Setting::TakeoutId(Some(77)),
            Setting::UpdateState { entity_id: 0, state: UpdateState::new(1, 2, date, 3) },
        ])
        .await
        .unwrap();

    assert!(session.is_started());
    assert_eq!(session.session_records().await.unwrap().len(), 1);
    assert_eq!(session.session_record(4).await.unwrap().unwrap().takeout_id, Some(77));
    assert_eq!(
        session.get_update_state(0).await.unwrap(),
        Some(UpdateState::new(1, 2, date, 3))
    );
    finish(session).await;
}

#[tokio::test]
async fn concurrent_starts_replay_settings_once() {
    let Some(dsn) = std::env::var(ENV_TEST_DSN).ok() else { return };
    let key = AuthKey::from_bytes([1; 256]);
    let settings = vec![
        Setting::dc(1, "149.154.175.53", 443),
        Setting::AuthKey(Some(key.clone())),
        Setting::dc(2, "149.154.167.51", 443),
    ];

    let a = PgSession::new(SessionConfig::dsn(dsn.clone()).max_connections(2)).unwrap();
    let b = PgSession::new(SessionConfig::dsn(dsn).max_connections(2)).unwrap();
    let (first, second, other) = tokio::join!(
        a.start(settings.clone()),
        a.start(settings.clone()),
        b.start(settings),
    );
    first.unwrap();
    second.unwrap();
    other.unwrap();

    for session in [&a, &b] {
        assert!(session.is_started());
        assert_eq!(session.current_session().dc_id, 2);
        assert_eq!(session.session_records().await.unwrap().len(), 2);
        assert_eq!(session.session_record(1).await.unwrap().unwrap().auth_key, Some(key.clone()));
        assert_eq!(session.session_record(2).await.unwrap().unwrap().auth_key, None);
    }
    finish(a).await;
    finish(b).await;
}

#[tokio::test]
async fn entities_upsert_and_resolve() {
    let Some(session) = session().await else { return };
    session.process_entities(EntitySource::from(&vec![bob(1)])).await.unwrap();
    session.process_entities(EntitySource::from(&vec![bob(2)])).await.unwrap();

    let expected = InputPeer::User(InputPeerUser { user_id: 55, access_hash: 2 });
    for key in ["1555", "bob", "@BOB", "Bob"] {
        assert_eq!(session.get_input_entity(key.into()).await.unwrap(), expected, "{key}");
    }
    assert_eq!(session.get_input_entity(55_i64.into()).await.unwrap(), expected);

    let peer = Object::Peer(PeerId::User(55));
    assert_eq!(session.get_input_entity((&peer).into()).await.unwrap(), expected);

    assert!(matches!(
        session.get_input_entity("somebody_else".into()).await,
        Err(SessionError::EntityNotFound(_))
    ));
    assert!(matches!(
        session.entity_rows_by("hash; drop table x", "1").await,
        Err(SessionError::InvalidLookupColumn(_))
    ));
    finish(session).await;
}

#[tokio::test]
async fn file_cache_miss_then_hit() {
    let Some(session) = session().await else { return };
    let md5 = [0x5A; 16];
    assert_eq!(session.get_file(&md5, 2048, FileKind::Document).await.unwrap(), None);

    let doc = Object::InputDocument(InputDocument { id: 11, access_hash: 22, file_reference: Vec::new() });
    session.cache_file(&md5, 2048, &doc).await.unwrap();

    let hit = session.get_file(&md5, 2048, FileKind::Document).await.unwrap().unwrap();
    assert_eq!((hit.id(), hit.access_hash()), (11, 22));
    assert_eq!(session.get_file(&md5, 2048, FileKind::Photo).await.unwrap(), None);
    assert!(matches!(
        session.cache_file(&md5, 2048, &bob(1)).await,
        Err(SessionError::UnsupportedFileInstance(_))
    ));
    finish(session).await;
}

#[tokio::test]
async fn delete_removes_every_row() {
    let Some(session) = session().await else { return };
    session.set_dc(2, "149.154.167.51", 443).await.unwrap();
    session.process_entities(EntitySource::from(&vec![bob(1)])).await.unwrap();
    session.cache_file(b"md5", 1, &Object::InputDocument(InputDocument::default())).await.unwrap();
    session
        .set_update_state(0, &UpdateState::from_unix(1, 1, 1_700_000_000, 1).unwrap())
        .await
        .unwrap();

    session.delete().await.unwrap();

    assert!(session.session_records().await.unwrap().is_empty());
    assert!(session.update_states().await.unwrap().is_empty());
    assert_eq!(session.get_file(b"md5", 1, FileKind::Document).await.unwrap(), None);
    assert!(session.get_input_entity(55_i64.into()).await.is_err());
    session.close().await;
}

fn refused_id() -> String {
    format!("delete-fails-{}", uuid::Uuid::new_v4())
}

/// Makes deleting any `update_state` row of a `delete-fails-*` session raise.
async fn refuse_update_state_deletes(session: &PgSession) {
    let pool = session.pool().inner();
    sqlx::query(
        "create or replace function layer_session.refuse_delete() returns trigger as $$
         begin
            if old.session_id like 'delete-fails-%' then
                raise exception 'delete refused for %', old.session_id;
            end if;
            return old;
         end
         $$ language plpgsql",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("drop trigger if exists refuse_delete on layer_session.update_state")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "create trigger refuse_delete before delete on layer_session.update_state
         for each row execute function layer_session.refuse_delete()",
    )
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn failed_delete_leaves_every_row() {
    let Some(dsn) = std::env::var(ENV_TEST_DSN).ok() else { return };
    let config = SessionConfig::dsn(dsn).max_connections(2).session_id_factory(refused_id);
    let session = PgSession::new(config).unwrap();
    session.start(Vec::new()).await.unwrap();

    session.set_dc(2, "149.154.167.51", 443).await.unwrap();
    session.process_entities(EntitySource::from(&vec![bob(1)])).await.unwrap();
    session.cache_file(b"md5", 1, &Object::InputDocument(InputDocument::default())).await.unwrap();
    session
        .set_update_state(0, &UpdateState::from_unix(1, 1, 1_700_000_000, 1).unwrap())
        .await
        .unwrap();
    refuse_update_state_deletes(&session).await;

    assert!(session.delete().await.is_err());

    assert_eq!(session.session_records().await.unwrap().len(), 1);
    assert_eq!(session.update_states().await.unwrap().len(), 1);
    assert!(session.get_file(b"md5", 1, FileKind::Document).await.unwrap().is_some());
    assert_eq!(
        session.get_input_entity(55_i64.into()).await.unwrap(),
        InputPeer::User(InputPeerUser { user_id: 55, access_hash: 1 })
    );

    sqlx::query("drop trigger if exists refuse_delete on layer_session.update_state")
        .execute(session.pool().inner())
        .await
        .unwrap();
    finish(session).await;
}

#[tokio::test]
async fn sessions_are_isolated() {
    let Some(a) = session().await else { return };
    let Some(b) = session().await else { return };
    a.process_entities(EntitySource::from(&vec![bob(1)])).await.unwrap();

    assert_ne!(a.session_id(), b.session_id());
    assert!(b.get_input_entity("bob".into()).await.is_err());
    finish(a).await;
    finish(b).await;
}
