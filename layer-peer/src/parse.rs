//! Parsing loose, user-supplied peer identifiers.
//!
//! Three textual forms are understood:
//! - phone numbers: `+1 (555) 010-99` → `"155501099"`
//! - usernames: `@Durov`, `t.me/durov`, `https://telegram.me/durov/` → `"durov"`
//! - invite links: `t.me/+HASH`, `t.me/joinchat/HASH`, `tg://join?invite=HASH`

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Invite hashes are URL-safe base64, usually without padding.
const INVITE_HASH: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const LINK_HOSTS: [&str; 3] = ["t.me/", "telegram.me/", "telegram.dog/"];

// ─── Phone ────────────────────────────────────────────────────────────────────

/// Normalise a phone number to its digits.
///
/// `+`, parentheses, dashes and whitespace are dropped; whatever is left must
/// be a non-empty run of ASCII digits.
pub fn parse_phone(input: &str) -> Option<String> {
    let digits: String = input
        .chars()
        .filter(|c| !matches!(c, '+' | '(' | ')' | '-') && !c.is_whitespace())
        .collect();
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

// ─── Username / invite ────────────────────────────────────────────────────────

/// What [`parse_username`] found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsernameOrInvite {
    /// A valid username, lower-cased.
    Username(String),
    /// The hash part of an invite link.
    Invite(String),
}

/// Parse a username or invite link.
///
/// Returns `None` when the input is neither a valid username nor an
/// invite link.
pub fn parse_username(input: &str) -> Option<UsernameOrInvite> {
    let input = input.trim();
    let (rest, is_invite) = strip_link(input).unwrap_or((input, false));

    if is_invite {
        return if rest.is_empty() {
            None
        } else {
            Some(UsernameOrInvite::Invite(rest.to_owned()))
        };
    }

    let rest = rest.trim_end_matches('/');
    if is_valid_username(rest) {
        Some(UsernameOrInvite::Username(rest.to_ascii_lowercase()))
    } else {
        None
    }
}

/// Strip `@`, `t.me/…` style prefixes and `tg://join?invite=`.
///
/// Returns the remainder and whether the prefix marks an invite link.
fn strip_link(s: &str) -> Option<(&str, bool)> {
    if let Some(rest) = s.strip_prefix('@') {
        return Some((rest, false));
    }
    if let Some(rest) = strip_prefix_ci(s, "tg://join?invite=") {
        return Some((rest, true));
    }

    let s = strip_prefix_ci(s, "https://")
        .or_else(|| strip_prefix_ci(s, "http://"))
        .unwrap_or(s);
    let s = strip_prefix_ci(s, "www.").unwrap_or(s);
    let rest = LINK_HOSTS.iter().find_map(|host| strip_prefix_ci(s, host))?;

    if let Some(hash) = rest.strip_prefix('+') {
        Some((hash, true))
    } else if let Some(hash) = strip_prefix_ci(rest, "joinchat/") {
        Some((hash, true))
    } else {
        Some((rest.strip_prefix('@').unwrap_or(rest), false))
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

/// 3–32 characters: a letter, then letters / digits / single underscores,
/// ending in a letter or digit.
fn is_valid_username(s: &str) -> bool {
    let bytes = s.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    (3..=32).contains(&bytes.len())
        && first.is_ascii_alphabetic()
        && last.is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
        && !s.contains("__")
}

// ─── Invite links ─────────────────────────────────────────────────────────────

/// The payload embedded in an old-style invite hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InviteLink {
    /// Only present in the 16-byte form.
    pub creator_id: Option<u32>,
    pub chat_id:    u32,
    pub random:     u64,
}

/// Decode the chat an invite link points to.
///
/// Only hashes that embed the chat id can be resolved offline; anything else
/// (including links that are not invite links) yields `None`.
pub fn resolve_invite_link(link: &str) -> Option<InviteLink> {
    let UsernameOrInvite::Invite(hash) = parse_username(link)? else {
        return None;
    };
    let payload = INVITE_HASH.decode(hash.trim_end_matches('/')).ok()?;

    let be_u32 = |at: usize| -> Option<u32> {
        Some(u32::from_be_bytes(payload.get(at..at + 4)?.try_into().ok()?))
    };
    let be_u64 = |at: usize| -> Option<u64> {
        Some(u64::from_be_bytes(payload.get(at..at + 8)?.try_into().ok()?))
    };

    match payload.len() {
        12 => Some(InviteLink { creator_id: None, chat_id: be_u32(0)?, random: be_u64(4)? }),
        16 => Some(InviteLink {
            creator_id: Some(be_u32(0)?),
            chat_id:    be_u32(4)?,
            random:     be_u64(8)?,
        }),
        _ => None,
    }
}
