//! Messages that travel between a player's client and the server.
//!
//! Traffic is request/reply plus push:
//!
//! ```text
//! client ── ClientEnvelope { id, request } ──────────────→ server
//! client ←─ ServerEnvelope { payload: Reply { id, .. } } ── server
//! client ←─ ServerEnvelope { payload: Event(..) } ───────── server  (push)
//! ```
//!
//! Every request carries a client-chosen `id` that is echoed back on its
//! [`Reply`], so clients can match replies to requests even while room
//! events are streaming in between them. `LeaveRoom` and `Disconnect` are
//! fire-and-forget and never get a reply.

use serde::{Deserialize, Serialize};

use crate::{Feedback, Mode, PlayerId, RoomCode, Symbol};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// A request wrapped with the client's correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Echoed back in the matching [`Reply`].
    pub id: u64,
    /// What the client wants done.
    pub request: ClientRequest,
}

/// Everything a client can ask for.
///
/// Internally tagged, so a join looks like
/// `{ "type": "JoinRoom", "room_code": "AB12CD", "name": "Zoé" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Open a new room and become its host.
    CreateRoom {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        mode: Mode,
    },

    /// Join an existing room as a guest. Joining again renames you.
    JoinRoom {
        room_code: RoomCode,
        #[serde(default)]
        name: Option<String>,
    },

    /// Host only: commit the secret for the current round.
    SetSecret {
        room_code: RoomCode,
        secret: Vec<Symbol>,
    },

    /// Guess the current secret.
    SubmitGuess {
        room_code: RoomCode,
        guess: Vec<Symbol>,
    },

    /// Reset the round: clear every history and the secret.
    RequestRematch { room_code: RoomCode },

    /// Leave a room. No reply.
    LeaveRoom { room_code: RoomCode },

    /// Leave every room and close the connection. No reply.
    Disconnect,
}

impl ClientRequest {
    /// Short name of the request, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "CreateRoom",
            Self::JoinRoom { .. } => "JoinRoom",
            Self::SetSecret { .. } => "SetSecret",
            Self::SubmitGuess { .. } => "SubmitGuess",
            Self::RequestRematch { .. } => "RequestRematch",
            Self::LeaveRoom { .. } => "LeaveRoom",
            Self::Disconnect => "Disconnect",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// The top-level wrapper of every server message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    /// Per-connection sequence number, starting at 1.
    pub seq: u64,
    /// Milliseconds since the server started.
    pub timestamp: u64,
    pub payload: ServerPayload,
}

/// What a server message carries.
///
/// Adjacently tagged: `{ "type": "Event", "data": { "type": "SecretSet", .. } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerPayload {
    /// The answer to one [`ClientEnvelope`].
    Reply(Reply),
    /// A room-wide push.
    Event(RoomEvent),
    /// The frame could not be decoded as a [`ClientEnvelope`], so there is
    /// no id to reply to.
    Rejected { reason: String },
}

/// The answer to a single request.
///
/// `outcome` serializes as `{"Ok": {..}}` or `{"Err": {"kind": .., "message": ..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: u64,
    pub outcome: Result<ReplyBody, ErrorReply>,
}

/// Successful reply payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReplyBody {
    RoomCreated {
        room_code: RoomCode,
        mode: Mode,
        player_id: PlayerId,
    },
    RoomJoined {
        room_code: RoomCode,
        mode: Mode,
        player_id: PlayerId,
    },
    SecretAccepted,
    /// Only the guesser ever sees the feedback paired with its guess.
    GuessScored { feedback: Feedback },
    RematchAccepted,
}

/// A failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub kind: ErrorKind,
    /// Human-readable detail, for logs and debugging only.
    pub message: String,
}

/// Machine-readable failure reasons.
///
/// Request-scoped: an error goes back to the connection that caused it and
/// nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No live room has that code.
    NotFound,
    /// Only the host may set the secret.
    NotHost,
    /// Secret or guess length differs from the mode's code length.
    InvalidLength,
    /// No secret has been set for the current round.
    NoActiveGame,
    /// Someone already cracked the code this round.
    RoundAlreadyOver,
    /// The secret is fixed until the next rematch.
    SecretAlreadySet,
    /// The host knows the secret and may not guess it.
    HostCannotGuess,
    /// The connection is not a member of the room.
    NotInRoom,
    /// The room has reached its guest cap.
    RoomFull,
    /// The server hit an unexpected fault handling this request.
    Internal,
}

// ---------------------------------------------------------------------------
// Room events
// ---------------------------------------------------------------------------

/// Where a room is in its round, as shown to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase")]
pub enum RoomStatus {
    /// Nobody has joined the host yet.
    AwaitingGuest,
    /// Waiting for the host to commit a secret.
    AwaitingSecret,
    /// Guesses are being accepted.
    Playing,
    /// Someone cracked the code; waiting for a rematch.
    RoundOver { winner_id: PlayerId },
}

/// One row of a room roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub name: String,
    pub is_host: bool,
    /// Guesses made this round. Raw guesses are never shared.
    pub attempts: usize,
}

/// Public view of a room. Never contains the secret or any guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_code: RoomCode,
    pub mode: Mode,
    pub host_id: PlayerId,
    pub status: RoomStatus,
    /// In join order.
    pub players: Vec<PlayerSummary>,
}

/// Pushes from a room to its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    /// Someone joined, left, or renamed.
    RosterUpdated(RoomSnapshot),

    /// The host committed a secret; guessing may begin.
    SecretSet { room_code: RoomCode },

    /// Another player guessed. Carries their attempt count and that
    /// attempt's feedback, never the guess itself.
    OpponentProgress {
        room_code: RoomCode,
        player_id: PlayerId,
        name: String,
        attempts: usize,
        last_feedback: Feedback,
    },

    /// A guess matched every position.
    RoundOver {
        room_code: RoomCode,
        winner_id: PlayerId,
        winner_name: String,
    },

    /// Histories and secret were cleared; the host must set a new secret.
    RematchStarted {
        room_code: RoomCode,
        host_id: PlayerId,
    },

    /// The host left. The room no longer exists.
    RoomClosed { room_code: RoomCode },
}

impl RoomEvent {
    /// The room this event belongs to.
    pub fn room_code(&self) -> &RoomCode {
        match self {
            Self::RosterUpdated(snapshot) => &snapshot.room_code,
            Self::SecretSet { room_code }
            | Self::OpponentProgress { room_code, .. }
            | Self::RoundOver { room_code, .. }
            | Self::RematchStarted { room_code, .. }
            | Self::RoomClosed { room_code } => room_code,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
