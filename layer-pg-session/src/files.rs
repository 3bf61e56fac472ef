//! Sent-file cache: uploading identical content twice is wasted bandwidth.
//!
//! Entries map `(md5 digest, size, kind)` to the `(id, access_hash)` the
//! server assigned on first upload. They never expire.

use layer_peer::{Identifiable, InputDocument, InputPhoto, Object};
use sqlx::PgConnection;

use crate::errors::{Result, SessionError};

// ─── FileKind ─────────────────────────────────────────────────────────────────

/// The two kinds of remote files the cache knows about.
///
/// The discriminant is the value stored in the `type` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    Document = 0,
    Photo    = 1,
}

impl FileKind {
    pub const fn tag(self) -> i32 {
        self as i32
    }

    /// Decode a stored `type` value.
    pub const fn from_tag(tag: i64) -> Result<Self> {
        match tag {
            0 => Ok(Self::Document),
            1 => Ok(Self::Photo),
            _ => Err(SessionError::InvalidFileKind(tag)),
        }
    }

    /// Map a TL constructor id to a kind; only `inputDocument` and
    /// `inputPhoto` are accepted.
    pub const fn from_constructor_id(id: u32) -> Result<Self> {
        match id {
            InputDocument::CONSTRUCTOR_ID => Ok(Self::Document),
            InputPhoto::CONSTRUCTOR_ID    => Ok(Self::Photo),
            other => Err(SessionError::InvalidFileKind(other as i64)),
        }
    }
}

impl TryFrom<i32> for FileKind {
    type Error = SessionError;

    fn try_from(tag: i32) -> Result<Self> {
        Self::from_tag(i64::from(tag))
    }
}

impl TryFrom<u32> for FileKind {
    type Error = SessionError;

    fn try_from(constructor_id: u32) -> Result<Self> {
        Self::from_constructor_id(constructor_id)
    }
}

// ─── InputFile ────────────────────────────────────────────────────────────────

/// A cached upload, ready to be sent again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputFile {
    Document(InputDocument),
    Photo(InputPhoto),
}

impl InputFile {
    /// Rebuild the input object for a cache hit. The file reference is left
    /// empty; the server refreshes it on first use.
    pub fn new(kind: FileKind, id: i64, access_hash: i64) -> Self {
        match kind {
            FileKind::Document => Self::Document(InputDocument { id, access_hash, file_reference: Vec::new() }),
            FileKind::Photo    => Self::Photo(InputPhoto { id, access_hash, file_reference: Vec::new() }),
        }
    }

    /// Accept only input documents and photos; the kind comes from the
    /// object itself.
    pub fn from_object(instance: &Object) -> Result<Self> {
        match instance {
            Object::InputDocument(d) => Ok(Self::Document(d.clone())),
            Object::InputPhoto(p)    => Ok(Self::Photo(p.clone())),
            other => Err(SessionError::UnsupportedFileInstance(other.name())),
        }
    }

    pub const fn kind(&self) -> FileKind {
        match self {
            Self::Document(_) => FileKind::Document,
            Self::Photo(_)    => FileKind::Photo,
        }
    }

    pub const fn id(&self) -> i64 {
        match self {
            Self::Document(d) => d.id,
            Self::Photo(p)    => p.id,
        }
    }

    pub const fn access_hash(&self) -> i64 {
        match self {
            Self::Document(d) => d.access_hash,
            Self::Photo(p)    => p.access_hash,
        }
    }
}

impl From<InputFile> for Object {
    fn from(f: InputFile) -> Self {
        match f {
            InputFile::Document(d) => Self::InputDocument(d),
            InputFile::Photo(p)    => Self::InputPhoto(p),
        }
    }
}

/// Primary key of a cache entry (minus the session id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SentFileKey {
    pub md5_digest: Vec<u8>,
    pub file_size:  i64,
    pub kind:       FileKind,
}

// ─── PostgreSQL ───────────────────────────────────────────────────────────────

pub(crate) async fn select(
    conn:       &mut PgConnection,
    session_id: &str,
    md5_digest: &[u8],
    file_size:  i64,
    kind:       FileKind,
) -> Result<Option<InputFile>> {
    let row: Option<(i64, i64)> = sqlx::query_as(
        "select id, hash from layer_session.sent_files
         where session_id = $1 and md5_digest = $2 and file_size = $3 and type = $4",
    )
    .bind(session_id)
    .bind(md5_digest)
    .bind(file_size)
    .bind(kind.tag())
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|(id, hash)| InputFile::new(kind, id, hash)))
}

pub(crate) async fn upsert(
    conn:       &mut PgConnection,
    session_id: &str,
    md5_digest: &[u8],
    file_size:  i64,
    file:       &InputFile,
) -> Result<()> {
    sqlx::query(
        "insert into layer_session.sent_files (session_id, md5_digest, file_size, type, id, hash)
         values ($1, $2, $3, $4, $5, $6)
         on conflict (session_id, md5_digest, file_size, type) do update set
            id   = excluded.id,
            hash = excluded.hash",
    )
    .bind(session_id)
    .bind(md5_digest)
    .bind(file_size)
    .bind(file.kind().tag())
    .bind(file.id())
    .bind(file.access_hash())
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer_peer::{InputPeer, User};

    #[test]
    fn tags_round_trip() {
        for kind in [FileKind::Document, FileKind::Photo] {
            assert_eq!(FileKind::from_tag(i64::from(kind.tag())).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!(matches!(FileKind::from_tag(2), Err(SessionError::InvalidFileKind(2))));
        assert!(matches!(FileKind::from_tag(-1), Err(SessionError::InvalidFileKind(-1))));
    }

    #[test]
    fn constructor_ids() {
        assert_eq!(FileKind::from_constructor_id(0x1abf_b575).unwrap(), FileKind::Document);
        assert_eq!(FileKind::from_constructor_id(0x3bb3_b94a).unwrap(), FileKind::Photo);
        assert!(FileKind::from_constructor_id(0xdead_beef).is_err());
    }

    #[test]
    fn only_documents_and_photos_are_cacheable() {
        let doc = Object::InputDocument(InputDocument { id: 7, access_hash: 99, file_reference: vec![1] });
        let file = InputFile::from_object(&doc).unwrap();
        assert_eq!((file.kind(), file.id(), file.access_hash()), (FileKind::Document, 7, 99));

        for bad in [Object::User(User::default()), Object::InputPeer(InputPeer::Empty)] {
            assert!(matches!(
                InputFile::from_object(&bad),
                Err(SessionError::UnsupportedFileInstance(_))
            ));
        }
    }
}
