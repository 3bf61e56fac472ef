//! Error type for peer projection.

use crate::peer::PeerId;

/// Why an object could not be turned into an [`crate::InputPeer`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PeerError {
    /// The object does not describe a peer at all (e.g. an input document).
    #[error("{0} cannot be used as an input peer")]
    NotPeer(&'static str),

    /// The peer is known but carries no usable access hash.
    ///
    /// Happens for `min` users and channels (their hash only works in the
    /// context they were received in) and for bare `Peer` references.
    #[error("no usable access hash for {0:?}")]
    UnusableHash(PeerId),
}
