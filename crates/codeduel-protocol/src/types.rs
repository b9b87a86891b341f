//! Core value types shared by both ends of the wire.
//!
//! Everything here is plain data: identities, the difficulty [`Mode`],
//! the opaque [`Symbol`] a code is made of, and the [`Feedback`] a guess
//! earns. Clients and server must agree on these exactly, so the JSON shape
//! of each type is pinned down by the tests at the bottom of the file.

use std::fmt;

use codeduel_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The wire identity of a player.
///
/// A player *is* a connection: there is no account system, so the id is
/// the connection's id and dies with it. `#[serde(transparent)]` keeps it
/// a bare number in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

/// The short, human-typeable code that identifies a room.
///
/// Codes are [`RoomCode::LEN`] characters drawn from
/// [`RoomCode::ALPHABET`]. Players type them by hand, so anything coming
/// in from a client is trimmed and upper-cased before it is compared;
/// `"ab12cd "` and `"AB12CD"` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in a generated code.
    pub const LEN: usize = 6;

    /// Characters a generated code is made of.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Normalizes user input into a room code.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    /// Returns `true` if the code has the shape of a generated code.
    ///
    /// Lookups don't require this (an ill-formed code simply isn't found);
    /// it exists for generators and tests.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == Self::LEN
            && self.0.bytes().all(|b| Self::ALPHABET.contains(&b))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomCode {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Difficulty tier of a room.
///
/// The mode is the only thing the two ends agree on up front: the secret
/// length is always computed from it with [`Mode::code_length`] and is
/// never sent as its own field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Easy,
    #[default]
    Normal,
    Hard,
    Extreme,
}

impl Mode {
    /// Required length of every secret and guess in this mode.
    pub const fn code_length(self) -> usize {
        match self {
            Self::Hard => 6,
            Self::Easy | Self::Normal | Self::Extreme => 4,
        }
    }

    /// Number of distinct symbols the stock client offers in this mode.
    ///
    /// Informational only. The server scores any symbols it is given.
    pub const fn palette_size(self) -> usize {
        match self {
            Self::Hard => 8,
            Self::Easy | Self::Normal | Self::Extreme => 6,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
            Self::Extreme => "extreme",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Symbols and feedback
// ---------------------------------------------------------------------------

/// One position of a secret or guess.
///
/// Opaque on purpose: the stock client sends colour names (`"red"`) or
/// theme slots (`"theme-ocean-3"`), but the server only ever compares
/// symbols for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub String);

impl Symbol {
    /// Creates a symbol from anything string-like.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How close a guess came to the secret.
///
/// `exact` counts symbols right in value and position; `misplaced` counts
/// the remaining symbols that occur elsewhere in the secret. A symbol is
/// never counted twice, so `exact + misplaced <= code_length`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct Feedback {
    pub exact: usize,
    pub misplaced: usize,
}

impl Feedback {
    /// Returns `true` if every position matched.
    pub fn is_solved(&self, code_length: usize) -> bool {
        self.exact == code_length
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who inside a room should receive a server event.
///
/// Room logic returns `(Recipient, RoomEvent)` pairs and the room actor
/// fans them out to the subscribed connections. Server-side only; it
/// never travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection currently in the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone except the given player (e.g. an opponent's progress).
    AllExcept(PlayerId),
}

impl Recipient {
    /// Returns `true` if `player` is addressed by this recipient.
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(p) => *p == player,
            Self::AllExcept(p) => *p != player,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
