//! Error type for the session stores.

/// The error type returned by every [`crate::SessionStore`] operation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A file-cache kind other than document / photo.
    #[error("invalid sent-file kind {0}; expected a document or a photo")]
    InvalidFileKind(i64),

    /// An entity lookup on a column outside the allow-list.
    #[error("{0:?} is not a valid entity lookup column")]
    InvalidLookupColumn(String),

    /// `cache_file` was handed something that is not an input document/photo.
    #[error("cannot cache {0} instance")]
    UnsupportedFileInstance(&'static str),

    /// Every resolution strategy came up empty.
    #[error("could not find input entity with key {0}")]
    EntityNotFound(String),

    /// The store configuration is unusable.
    #[error("invalid session store configuration: {0}")]
    Config(String),

    /// A stored row could not be decoded.
    #[error("corrupt session row: {0}")]
    Corrupt(String),

    /// Round-trip to the database failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SessionError {
    /// True when the error came from talking to the database, as opposed to
    /// rejected input.
    pub const fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
