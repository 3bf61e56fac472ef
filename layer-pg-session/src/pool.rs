//! Connection pool with explicit ownership.
//!
//! A store either creates its pool from configuration (and then owns it) or
//! borrows one the application already runs. Only an owned pool is closed by
//! [`ConnectionPool::close`].

use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPoolOptions, Postgres};

use crate::config::{SessionConfig, StoreTarget, parse_dsn};
use crate::errors::Result;

/// Scoped database connection; returned to the pool when dropped, including
/// when the future holding it is cancelled.
pub type PgConn = PoolConnection<Postgres>;

#[derive(Clone, Debug)]
pub enum ConnectionPool {
    /// Created by the store; closed on [`ConnectionPool::close`].
    Owned(PgPool),
    /// Supplied by the caller; never closed by the store.
    Borrowed(PgPool),
}

impl ConnectionPool {
    /// Build the pool described by `config`.
    ///
    /// Owned pools are created lazily, so no connection is opened before the
    /// first [`ConnectionPool::acquire`]. Must be called inside a tokio
    /// runtime.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let options = match &config.target {
            StoreTarget::Pool(pool)  => return Ok(Self::Borrowed(pool.clone())),
            StoreTarget::Dsn(dsn)    => parse_dsn(dsn)?,
            StoreTarget::Params(p)   => p.to_options(),
        };
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(options);
        Ok(Self::Owned(pool))
    }

    pub const fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    pub const fn inner(&self) -> &PgPool {
        match self {
            Self::Owned(pool) | Self::Borrowed(pool) => pool,
        }
    }

    /// Check out one connection for the duration of an operation.
    pub async fn acquire(&self) -> Result<PgConn> {
        Ok(self.inner().acquire().await?)
    }

    /// Close the pool if it is ours. Calling this twice is harmless.
    pub async fn close(&self) {
        match self {
            Self::Owned(pool) => {
                if !pool.is_closed() {
                    pool.close().await;
                }
            }
            Self::Borrowed(_) => {
                tracing::debug!("[layer-pg] leaving borrowed pool open");
            }
        }
    }
}
