//! The protocol objects a session store has to look at.
//!
//! Field names follow the TL schema (`access_hash`, `first_name`, …) so that
//! converting from the generated `layer-tl-types` structs is a field-by-field
//! copy.

use crate::errors::PeerError;
use crate::peer::PeerId;

/// Every TL constructor has a unique 32-bit id.
pub trait Identifiable {
    /// The constructor ID as specified in the TL schema.
    const CONSTRUCTOR_ID: u32;
}

// ─── Entities ─────────────────────────────────────────────────────────────────

/// `user#…`: a user or bot account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct User {
    pub id:          i64,
    /// Absent when the server did not send one.
    pub access_hash: Option<i64>,
    /// This is the logged-in account.
    pub is_self:     bool,
    /// Partial object; its access hash is only valid where it was received.
    pub min:         bool,
    pub first_name:  Option<String>,
    pub last_name:   Option<String>,
    pub username:    Option<String>,
    pub phone:       Option<String>,
}

/// `chat#…`: a basic group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chat {
    pub id:    i64,
    pub title: String,
}

/// `chatForbidden#…`: a basic group the account was removed from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatForbidden {
    pub id:    i64,
    pub title: String,
}

/// `channel#…`: a channel or supergroup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    pub id:          i64,
    pub access_hash: Option<i64>,
    pub min:         bool,
    pub title:       String,
    pub username:    Option<String>,
}

/// `channelForbidden#…`: a channel the account was banned from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelForbidden {
    pub id:          i64,
    pub access_hash: i64,
    pub title:       String,
}

// ─── Input peers ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputPeerUser {
    pub user_id:     i64,
    pub access_hash: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputPeerChat {
    pub chat_id: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputPeerChannel {
    pub channel_id:  i64,
    pub access_hash: i64,
}

/// The hash-carrying reference outgoing requests use to address a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputPeer {
    Empty,
    PeerSelf,
    User(InputPeerUser),
    Chat(InputPeerChat),
    Channel(InputPeerChannel),
}

impl InputPeer {
    /// Build the input peer for a directory row.
    ///
    /// Basic groups have no access hash, so `access_hash` is ignored for them.
    pub const fn from_peer_id(peer: PeerId, access_hash: i64) -> Self {
        match peer {
            PeerId::User(user_id) => Self::User(InputPeerUser { user_id, access_hash }),
            PeerId::Chat(chat_id) => Self::Chat(InputPeerChat { chat_id }),
            PeerId::Channel(channel_id) => Self::Channel(InputPeerChannel { channel_id, access_hash }),
        }
    }

    /// The peer this refers to; `None` for `Empty` and `PeerSelf`.
    pub const fn peer_id(&self) -> Option<PeerId> {
        match self {
            Self::User(u)    => Some(PeerId::User(u.user_id)),
            Self::Chat(c)    => Some(PeerId::Chat(c.chat_id)),
            Self::Channel(c) => Some(PeerId::Channel(c.channel_id)),
            Self::Empty | Self::PeerSelf => None,
        }
    }
}

/// `inputUser#…`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputUser {
    pub user_id:     i64,
    pub access_hash: i64,
}

/// `inputChannel#…`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputChannel {
    pub channel_id:  i64,
    pub access_hash: i64,
}

// ─── Input files ──────────────────────────────────────────────────────────────

/// `inputDocument#1abfb575`: a previously uploaded document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputDocument {
    pub id:             i64,
    pub access_hash:    i64,
    pub file_reference: Vec<u8>,
}

impl Identifiable for InputDocument {
    const CONSTRUCTOR_ID: u32 = 0x1abf_b575;
}

/// `inputPhoto#3bb3b94a`: a previously uploaded photo.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputPhoto {
    pub id:             i64,
    pub access_hash:    i64,
    pub file_reference: Vec<u8>,
}

impl Identifiable for InputPhoto {
    const CONSTRUCTOR_ID: u32 = 0x3bb3_b94a;
}

// ─── Object ───────────────────────────────────────────────────────────────────

/// Any protocol object a session store may be handed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    User(User),
    UserEmpty(i64),
    Chat(Chat),
    ChatEmpty(i64),
    ChatForbidden(ChatForbidden),
    Channel(Channel),
    ChannelForbidden(ChannelForbidden),
    InputPeer(InputPeer),
    InputUser(InputUser),
    InputChannel(InputChannel),
    /// A bare `peerUser` / `peerChat` / `peerChannel` reference.
    Peer(PeerId),
    InputDocument(InputDocument),
    InputPhoto(InputPhoto),
}

impl Object {
    /// TL constructor name, for diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::User(_)             => "User",
            Self::UserEmpty(_)        => "UserEmpty",
            Self::Chat(_)             => "Chat",
            Self::ChatEmpty(_)        => "ChatEmpty",
            Self::ChatForbidden(_)    => "ChatForbidden",
            Self::Channel(_)          => "Channel",
            Self::ChannelForbidden(_) => "ChannelForbidden",
            Self::InputPeer(_)        => "InputPeer",
            Self::InputUser(_)        => "InputUser",
            Self::InputChannel(_)     => "InputChannel",
            Self::Peer(_)             => "Peer",
            Self::InputDocument(_)    => "InputDocument",
            Self::InputPhoto(_)       => "InputPhoto",
        }
    }

    /// True for `InputPeer`, `InputUser` and `InputChannel`, objects that
    /// already are what outgoing requests need.
    pub const fn is_input_peer(&self) -> bool {
        matches!(self, Self::InputPeer(_) | Self::InputUser(_) | Self::InputChannel(_))
    }

    /// Project into an [`InputPeer`].
    ///
    /// With `allow_self` the logged-in user becomes [`InputPeer::PeerSelf`];
    /// without it the user's real id and hash are kept, which is what a
    /// directory wants to store.
    pub fn to_input_peer(&self, allow_self: bool) -> Result<InputPeer, PeerError> {
        match self {
            Self::User(u) => {
                if u.is_self && allow_self {
                    return Ok(InputPeer::PeerSelf);
                }
                match u.access_hash {
                    Some(access_hash) if !u.min => Ok(InputPeer::User(InputPeerUser {
                        user_id: u.id, access_hash,
                    })),
                    _ => Err(PeerError::UnusableHash(PeerId::User(u.id))),
                }
            }
            Self::UserEmpty(_) => Ok(InputPeer::Empty),
            Self::Chat(Chat { id, .. })
            | Self::ChatForbidden(ChatForbidden { id, .. })
            | Self::ChatEmpty(id) => Ok(InputPeer::Chat(InputPeerChat { chat_id: *id })),
            Self::Channel(c) => match c.access_hash {
                Some(access_hash) if !c.min => Ok(InputPeer::Channel(InputPeerChannel {
                    channel_id: c.id, access_hash,
                })),
                _ => Err(PeerError::UnusableHash(PeerId::Channel(c.id))),
            },
            Self::ChannelForbidden(c) => Ok(InputPeer::Channel(InputPeerChannel {
                channel_id: c.id, access_hash: c.access_hash,
            })),
            Self::InputPeer(p) => Ok(*p),
            Self::InputUser(u) => Ok(InputPeer::User(InputPeerUser {
                user_id: u.user_id, access_hash: u.access_hash,
            })),
            Self::InputChannel(c) => Ok(InputPeer::Channel(InputPeerChannel {
                channel_id: c.channel_id, access_hash: c.access_hash,
            })),
            Self::Peer(peer) => Err(PeerError::UnusableHash(*peer)),
            Self::InputDocument(_) | Self::InputPhoto(_) => Err(PeerError::NotPeer(self.name())),
        }
    }

    /// The peer this object describes, whether or not it carries a hash.
    pub const fn peer_id(&self) -> Option<PeerId> {
        match self {
            Self::User(User { id, .. }) | Self::UserEmpty(id) => Some(PeerId::User(*id)),
            Self::Chat(Chat { id, .. })
            | Self::ChatForbidden(ChatForbidden { id, .. })
            | Self::ChatEmpty(id) => Some(PeerId::Chat(*id)),
            Self::Channel(Channel { id, .. })
            | Self::ChannelForbidden(ChannelForbidden { id, .. }) => Some(PeerId::Channel(*id)),
            Self::InputPeer(p) => p.peer_id(),
            Self::InputUser(u) => Some(PeerId::User(u.user_id)),
            Self::InputChannel(c) => Some(PeerId::Channel(c.channel_id)),
            Self::Peer(peer) => Some(*peer),
            Self::InputDocument(_) | Self::InputPhoto(_) => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        let username = match self {
            Self::User(u)    => u.username.as_deref(),
            Self::Channel(c) => c.username.as_deref(),
            _ => None,
        };
        username.filter(|u| !u.is_empty())
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            Self::User(u) => u.phone.as_deref().filter(|p| !p.is_empty()),
            _ => None,
        }
    }

    /// Human-readable name: "first last" for users, the title for groups.
    ///
    /// `None` when the object has no name or the name is blank.
    pub fn display_name(&self) -> Option<String> {
        let name = match self {
            Self::User(u) => {
                let first = u.first_name.as_deref().unwrap_or("");
                let last  = u.last_name.as_deref().unwrap_or("");
                format!("{first} {last}").trim().to_owned()
            }
            Self::Chat(Chat { title, .. })
            | Self::ChatForbidden(ChatForbidden { title, .. })
            | Self::Channel(Channel { title, .. })
            | Self::ChannelForbidden(ChannelForbidden { title, .. }) => title.clone(),
            _ => String::new(),
        };
        if name.is_empty() { None } else { Some(name) }
    }
}

impl From<User> for Object {
    fn from(u: User) -> Self { Self::User(u) }
}

impl From<Chat> for Object {
    fn from(c: Chat) -> Self { Self::Chat(c) }
}

impl From<Channel> for Object {
    fn from(c: Channel) -> Self { Self::Channel(c) }
}

impl From<InputPeer> for Object {
    fn from(p: InputPeer) -> Self { Self::InputPeer(p) }
}

impl From<InputDocument> for Object {
    fn from(d: InputDocument) -> Self { Self::InputDocument(d) }
}

impl From<InputPhoto> for Object {
    fn from(p: InputPhoto) -> Self { Self::InputPhoto(p) }
}
