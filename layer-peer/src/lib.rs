//! Peer model shared by the layer session stores.
//!
//! Telegram addresses users, basic groups and channels by a numeric id plus,
//! for users and channels, an access hash. This crate holds the small subset
//! of the protocol objects a session store has to understand:
//!
//! | Module     | Contents                                                        |
//! |------------|-----------------------------------------------------------------|
//! | [`peer`]   | [`PeerId`], the "marked" id encoding peer kind in its sign      |
//! | [`object`] | Users, chats, channels, input peers and input files             |
//! | [`parse`]  | Phone number, username and invite-link parsing                  |
//!
//! # Marked ids
//!
//! ```rust
//! use layer_peer::PeerId;
//!
//! let channel = PeerId::Channel(1234);
//! assert_eq!(channel.marked(), -1_000_000_001_234);
//! assert_eq!(PeerId::from_marked(channel.marked()), channel);
//! ```

#![deny(unsafe_code)]

mod errors;
pub mod object;
pub mod parse;
pub mod peer;

pub use errors::PeerError;
pub use object::{
    Channel, ChannelForbidden, Chat, ChatForbidden, Identifiable, InputChannel, InputDocument,
    InputPeer, InputPeerChannel, InputPeerChat, InputPeerUser, InputPhoto, InputUser, Object, User,
};
pub use parse::{InviteLink, UsernameOrInvite, parse_phone, parse_username, resolve_invite_link};
pub use peer::{PeerId, PeerKind};
