use layer_peer::{
    Channel, Chat, InputChannel, InputDocument, InputPeer, InputPeerChannel, InputPeerChat,
    InputPeerUser, Object, PeerError, PeerId, PeerKind, User,
};

fn user(id: i64, hash: Option<i64>) -> User {
    User { id, access_hash: hash, first_name: Some("Bob".into()), ..Default::default() }
}

// ── Marked ids ────────────────────────────────────────────────────────────────

#[test]
fn marked_ids_encode_kind_in_sign() {
    assert_eq!(PeerId::User(55).marked(), 55);
    assert_eq!(PeerId::Chat(55).marked(), -55);
    assert_eq!(PeerId::Channel(55).marked(), -1_000_000_000_055);
}

#[test]
fn marked_ids_decode_back() {
    for peer in [PeerId::User(7), PeerId::Chat(7), PeerId::Channel(7), PeerId::Channel(999_999_999_999)] {
        assert_eq!(PeerId::from_marked(peer.marked()), peer);
    }
    assert_eq!(PeerId::from_marked(0), PeerId::User(0));
    assert_eq!(PeerId::from_marked(-999_999_999_999).kind(), PeerKind::Chat);
    assert_eq!(PeerId::from_marked(-1_000_000_000_000), PeerId::Channel(0));
}

#[test]
fn extreme_marked_ids_do_not_panic() {
    let peer = PeerId::from_marked(i64::MIN);
    assert_eq!(peer.kind(), PeerKind::Channel);
    let _ = PeerId::candidates(i64::MAX);
    let _ = PeerId::candidates(i64::MIN);
}

#[test]
fn kind_and_bare_id_rebuild_the_peer() {
    assert_eq!(PeerId::new(PeerKind::User, 5), PeerId::User(5));
    assert_eq!(PeerId::new(PeerKind::Chat, 5), PeerId::Chat(5));
    assert_eq!(PeerId::new(PeerKind::Channel, 5), PeerId::Channel(5));
    for marked in [55, -55, -1_000_000_000_055] {
        let peer = PeerId::from_marked(marked);
        assert_eq!(peer.bare(), 55);
        assert_eq!(PeerId::new(peer.kind(), peer.bare()), peer);
    }
}

#[test]
fn candidates_cover_all_kinds() {
    assert_eq!(PeerId::candidates(12), [12, -12, -1_000_000_000_012]);
}

// ── Input peer projection ─────────────────────────────────────────────────────

#[test]
fn user_with_hash_projects() {
    let obj = Object::User(user(1, Some(99)));
    assert_eq!(
        obj.to_input_peer(false),
        Ok(InputPeer::User(InputPeerUser { user_id: 1, access_hash: 99 }))
    );
}

#[test]
fn self_user_only_becomes_peer_self_when_allowed() {
    let obj = Object::User(User { is_self: true, ..user(1, Some(99)) });
    assert_eq!(obj.to_input_peer(true), Ok(InputPeer::PeerSelf));
    assert!(matches!(obj.to_input_peer(false), Ok(InputPeer::User(_))));
}

#[test]
fn min_and_hashless_users_are_rejected() {
    let min = Object::User(User { min: true, ..user(3, Some(1)) });
    assert_eq!(min.to_input_peer(false), Err(PeerError::UnusableHash(PeerId::User(3))));
    let bare = Object::User(user(4, None));
    assert_eq!(bare.to_input_peer(false), Err(PeerError::UnusableHash(PeerId::User(4))));
}

#[test]
fn chats_need_no_hash() {
    let obj = Object::Chat(Chat { id: 8, title: "g".into() });
    assert_eq!(obj.to_input_peer(false), Ok(InputPeer::Chat(InputPeerChat { chat_id: 8 })));
}

#[test]
fn input_channel_converts_to_input_peer() {
    let obj = Object::InputChannel(InputChannel { channel_id: 5, access_hash: 6 });
    assert!(obj.is_input_peer());
    assert_eq!(
        obj.to_input_peer(false),
        Ok(InputPeer::Channel(InputPeerChannel { channel_id: 5, access_hash: 6 }))
    );
}

#[test]
fn peer_reference_has_id_but_no_hash() {
    let obj = Object::Peer(PeerId::Channel(5));
    assert!(obj.to_input_peer(false).is_err());
    assert_eq!(obj.peer_id(), Some(PeerId::Channel(5)));
}

#[test]
fn documents_are_not_peers() {
    let obj = Object::InputDocument(InputDocument::default());
    assert_eq!(obj.to_input_peer(false), Err(PeerError::NotPeer("InputDocument")));
    assert_eq!(obj.peer_id(), None);
}

// ── Names ─────────────────────────────────────────────────────────────────────

#[test]
fn display_names() {
    let full = Object::User(User {
        first_name: Some("Ada".into()),
        last_name:  Some("Lovelace".into()),
        ..Default::default()
    });
    assert_eq!(full.display_name().as_deref(), Some("Ada Lovelace"));

    let last_only = Object::User(User { last_name: Some("Byron".into()), ..Default::default() });
    assert_eq!(last_only.display_name().as_deref(), Some("Byron"));

    let nameless = Object::User(User::default());
    assert_eq!(nameless.display_name(), None);

    let channel = Object::Channel(Channel { title: "News".into(), ..Default::default() });
    assert_eq!(channel.display_name().as_deref(), Some("News"));
}

#[test]
fn empty_username_is_none() {
    let obj = Object::User(User { username: Some(String::new()), ..Default::default() });
    assert_eq!(obj.username(), None);
}
