//! Schema bootstrap.
//!
//! All tables live in their own PostgreSQL schema so the session store can
//! share a database with anything else. Creation is idempotent
//! (`if not exists` everywhere), serialised per store by an async mutex and
//! across processes by a transaction-scoped advisory lock.

use sqlx::{Connection, PgConnection};
use tokio::sync::Mutex;

use crate::errors::Result;

/// The PostgreSQL schema holding every session table.
pub const SCHEMA: &str = "layer_session";

/// Tables owned by the store, in creation order.
pub const TABLES: [&str; 4] = ["sessions", "entities", "sent_files", "update_state"];

const CREATE_TABLES: [&str; 4] = [
    "sessions (
        session_id     varchar(255),
        dc_id          integer,
        server_address text,
        port           integer,
        auth_key       bytea,
        takeout_id     bigint,
        primary key (session_id, dc_id)
    )",
    "entities (
        session_id varchar(255),
        id         bigint,
        hash       bigint not null,
        username   text,
        phone      text,
        name       text,
        primary key (session_id, id)
    )",
    "sent_files (
        session_id varchar(255),
        md5_digest bytea,
        file_size  bigint,
        type       integer,
        id         bigint,
        hash       bigint,
        primary key (session_id, md5_digest, file_size, type)
    )",
    "update_state (
        session_id varchar(255),
        id         bigint,
        pts        integer,
        qts        integer,
        date       bigint,
        seq        integer,
        primary key (session_id, id)
    )",
];

/// Advisory lock key taken while creating the schema.
const BOOTSTRAP_LOCK_KEY: i64 = 0x6c61_7965_725f_7067;

/// Secondary indexes for the entity lookups by phone, username and name.
const CREATE_INDEXES: [&str; 3] = [
    "entities_phone_idx on layer_session.entities (session_id, phone)",
    "entities_username_idx on layer_session.entities (session_id, username)",
    "entities_name_idx on layer_session.entities (session_id, name)",
];

/// True only if every table in [`TABLES`] exists in [`SCHEMA`].
pub async fn tables_exist(conn: &mut PgConnection) -> Result<bool> {
    for table in TABLES {
        let exists: bool = sqlx::query_scalar(
            "select exists(
                select 1 from pg_tables
                where schemaname = $1 and tablename = $2
            )",
        )
        .bind(SCHEMA)
        .bind(table)
        .fetch_one(&mut *conn)
        .await?;

        if !exists {
            tracing::debug!("[layer-pg] table {SCHEMA}.{table} does not exist");
            return Ok(false);
        }
    }
    Ok(true)
}

/// Create the schema and all tables, holding `lock` for the duration.
///
/// Safe to call repeatedly.
pub async fn create_tables(conn: &mut PgConnection, lock: &Mutex<()>) -> Result<()> {
    let _guard = lock.lock().await;
    create_tables_locked(conn).await
}

/// Check-then-create under `lock`. Returns `true` if the tables were created.
pub async fn ensure_schema(conn: &mut PgConnection, lock: &Mutex<()>) -> Result<bool> {
    if tables_exist(conn).await? {
        return Ok(false);
    }
    let _guard = lock.lock().await;
    ensure_schema_locked(conn).await
}

/// [`ensure_schema`] for a caller already holding the bootstrap lock.
pub(crate) async fn ensure_schema_locked(conn: &mut PgConnection) -> Result<bool> {
    // A concurrent bootstrap on this store may have finished while we waited.
    if tables_exist(conn).await? {
        return Ok(false);
    }
    create_tables_locked(conn).await?;
    Ok(true)
}

/// Remove every row of `session_id`, in all tables or in none.
pub(crate) async fn delete_session(conn: &mut PgConnection, session_id: &str) -> Result<()> {
    let mut tx = conn.begin().await?;
    for table in TABLES {
        sqlx::query(&format!("delete from {SCHEMA}.{table} where session_id = $1"))
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

async fn create_tables_locked(conn: &mut PgConnection) -> Result<()> {
    tracing::debug!("[layer-pg] creating schema {SCHEMA} and tables {TABLES:?}");

    let mut tx = conn.begin().await?;
    sqlx::query("set transaction isolation level read committed")
        .execute(&mut *tx)
        .await?;
    // `create ... if not exists` still conflicts with a concurrent create.
    sqlx::query("select pg_advisory_xact_lock($1)")
        .bind(BOOTSTRAP_LOCK_KEY)
        .execute(&mut *tx)
        .await?;
    sqlx::query(&format!("create schema if not exists {SCHEMA}"))
        .execute(&mut *tx)
        .await?;
    for ddl in CREATE_TABLES {
        sqlx::query(&format!("create table if not exists {SCHEMA}.{ddl}"))
            .execute(&mut *tx)
            .await?;
    }
    for ddl in CREATE_INDEXES {
        sqlx::query(&format!("create index if not exists {ddl}"))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!("[layer-pg] schema {SCHEMA} ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_has_ddl() {
        for (table, ddl) in TABLES.iter().zip(CREATE_TABLES) {
            assert!(ddl.starts_with(&format!("{table} (")), "{ddl}");
            assert!(ddl.contains("primary key (session_id,"), "{table} not partitioned by session");
        }
    }

    #[test]
    fn indexes_target_the_schema() {
        for ddl in CREATE_INDEXES {
            assert!(ddl.contains(&format!(" on {SCHEMA}.entities ")), "{ddl}");
        }
    }
}
