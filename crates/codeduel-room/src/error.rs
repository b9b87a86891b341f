//! Error types for the room layer.

use codeduel_protocol::{ErrorKind, PlayerId, RoomCode};

use crate::FeedbackError;

/// Errors that can occur during room operations.
///
/// Every variant is request-scoped: it goes back to the caller that
/// triggered it and never affects other rooms or other players.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code (never existed, or already closed).
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// A non-host tried a host-only operation.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// A secret or guess has the wrong number of symbols for the mode.
    #[error("expected {expected} symbols, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A guess arrived before the host set a secret for this round.
    #[error("no secret has been set for this round")]
    NoActiveGame,

    /// A guess arrived after someone already won this round.
    #[error("the round is already over")]
    RoundAlreadyOver,

    /// The host tried to change the secret mid-round.
    #[error("the secret is already set for this round")]
    SecretAlreadySet,

    /// The host tried to guess its own secret.
    #[error("the host cannot guess")]
    HostCannotGuess,

    /// The player is not a member of the room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomCode),

    /// The room has reached its configured guest cap.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// Every generated code collided with a live room.
    #[error("no free room code after {0} attempts")]
    CodeSpaceExhausted(usize),
}

impl RoomError {
    /// The wire-level kind reported to the client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotHost(_) => ErrorKind::NotHost,
            Self::InvalidLength { .. } => ErrorKind::InvalidLength,
            Self::NoActiveGame => ErrorKind::NoActiveGame,
            Self::RoundAlreadyOver => ErrorKind::RoundAlreadyOver,
            Self::SecretAlreadySet => ErrorKind::SecretAlreadySet,
            Self::HostCannotGuess => ErrorKind::HostCannotGuess,
            Self::NotInRoom(..) => ErrorKind::NotInRoom,
            Self::RoomFull(_) => ErrorKind::RoomFull,
            Self::CodeSpaceExhausted(_) => ErrorKind::Internal,
        }
    }
}

impl From<FeedbackError> for RoomError {
    fn from(e: FeedbackError) -> Self {
        match e {
            FeedbackError::InvalidLength { expected, actual } => {
                Self::InvalidLength { expected, actual }
            }
        }
    }
}
