//! Marked peer ids.
//!
//! A marked id folds the peer kind into the sign of the id so that users,
//! basic groups and channels share one `i64` namespace:
//!
//! | Kind    | Bare id `n` is stored as       |
//! |---------|--------------------------------|
//! | user    | `n`                            |
//! | chat    | `-n`                           |
//! | channel | `-(1_000_000_000_000 + n)`     |

use std::fmt;

/// Offset separating channel ids from basic group ids in the marked space.
pub const CHANNEL_OFFSET: i64 = 1_000_000_000_000;

// ─── PeerKind ─────────────────────────────────────────────────────────────────

/// The three kinds of addressable peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeerKind {
    User,
    Chat,
    Channel,
}

// ─── PeerId ───────────────────────────────────────────────────────────────────

/// A bare peer id tagged with its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeerId {
    User(i64),
    Chat(i64),
    Channel(i64),
}

impl PeerId {
    /// Build a peer id from its kind and bare id.
    pub const fn new(kind: PeerKind, id: i64) -> Self {
        match kind {
            PeerKind::User    => Self::User(id),
            PeerKind::Chat    => Self::Chat(id),
            PeerKind::Channel => Self::Channel(id),
        }
    }

    pub const fn kind(&self) -> PeerKind {
        match self {
            Self::User(_)    => PeerKind::User,
            Self::Chat(_)    => PeerKind::Chat,
            Self::Channel(_) => PeerKind::Channel,
        }
    }

    /// The id without the kind mark.
    pub const fn bare(&self) -> i64 {
        match *self {
            Self::User(id) | Self::Chat(id) | Self::Channel(id) => id,
        }
    }

    /// Encode into the marked `i64` form.
    ///
    /// Out-of-range bare ids wrap instead of panicking; such ids never match
    /// a stored entity anyway.
    pub const fn marked(&self) -> i64 {
        match *self {
            Self::User(id)    => id,
            Self::Chat(id)    => id.wrapping_neg(),
            Self::Channel(id) => CHANNEL_OFFSET.wrapping_add(id).wrapping_neg(),
        }
    }

    /// Decode a marked id.
    pub const fn from_marked(marked: i64) -> Self {
        if marked >= 0 {
            Self::User(marked)
        } else if marked <= -CHANNEL_OFFSET {
            Self::Channel(-(marked + CHANNEL_OFFSET))
        } else {
            Self::Chat(-marked)
        }
    }

    /// The marked ids `id` would have as a user, a chat and a channel.
    ///
    /// Used when a caller hands over a bare id without saying what it is.
    pub const fn candidates(id: i64) -> [i64; 3] {
        [
            Self::User(id).marked(),
            Self::Chat(id).marked(),
            Self::Channel(id).marked(),
        ]
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id)    => write!(f, "user {id}"),
            Self::Chat(id)    => write!(f, "chat {id}"),
            Self::Channel(id) => write!(f, "channel {id}"),
        }
    }
}

impl From<PeerId> for i64 {
    fn from(peer: PeerId) -> Self { peer.marked() }
}
