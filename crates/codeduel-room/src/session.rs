//! The per-room round state machine.
//!
//! [`RoomSession`] is plain synchronous data: no channels, no tasks. The
//! room actor owns one and feeds it commands one at a time, which is what
//! makes every transition of a room atomic. Each transition returns the
//! events it produced as `(Recipient, RoomEvent)` pairs for the actor to
//! fan out.
//!
//! ```text
//!                 set_secret (host)           winning guess
//! AwaitingSecret ─────────────────→ Playing ────────────────→ RoundOver
//!       ↑                                                        │
//!       └──────────────────── request_rematch ──────────────────┘
//! ```
//!
//! Joining and leaving are orthogonal to the phase. The one exception is
//! the host leaving, which closes the room whatever the phase.

use codeduel_protocol::{
    Feedback, Mode, PlayerId, PlayerSummary, Recipient, RoomCode, RoomEvent,
    RoomSnapshot, RoomStatus, Symbol,
};

use crate::{RoomConfig, RoomError, feedback};

/// Events produced by one transition, in delivery order.
pub type Outbound = Vec<(Recipient, RoomEvent)>;

const DEFAULT_HOST_NAME: &str = "Host";
const DEFAULT_GUEST_NAME: &str = "Guest";

/// Round phase.
///
/// The secret lives inside the variants that need it, so "playing without
/// a secret" cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No secret yet; guesses are refused.
    AwaitingSecret,
    /// Secret committed; guesses are scored.
    Playing { secret: Vec<Symbol> },
    /// `winner` matched every position; guesses are refused until rematch.
    RoundOver {
        secret: Vec<Symbol>,
        winner: PlayerId,
    },
}

/// One scored guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessRecord {
    pub guess: Vec<Symbol>,
    pub feedback: Feedback,
}

/// A member of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// This round's guesses, oldest first. Cleared on rematch.
    pub history: Vec<GuessRecord>,
}

/// What a [`RoomSession::leave`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The player wasn't in the room. Nothing changed.
    NotMember,
    /// A guest left; the room carries on.
    Left,
    /// The host left; the room is gone.
    Closed,
}

/// State of one room.
#[derive(Debug, Clone)]
pub struct RoomSession {
    code: RoomCode,
    mode: Mode,
    host: PlayerId,
    /// Join order. Rooms hold a handful of players, so lookups are linear.
    players: Vec<Player>,
    phase: Phase,
    config: RoomConfig,
}

impl RoomSession {
    /// Opens a room with `host` as its only member.
    pub fn new(
        code: RoomCode,
        mode: Mode,
        host: PlayerId,
        host_name: Option<&str>,
        config: RoomConfig,
    ) -> Self {
        Self {
            code,
            mode,
            host,
            players: vec![Player {
                id: host,
                name: display_name(host_name, DEFAULT_HOST_NAME),
                history: Vec::new(),
            }],
            phase: Phase::AwaitingSecret,
            config,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Required secret/guess length, fixed by the mode.
    pub fn code_length(&self) -> usize {
        self.mode.code_length()
    }

    pub fn host(&self) -> PlayerId {
        self.host
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    pub fn guest_count(&self) -> usize {
        self.players.iter().filter(|p| p.id != self.host).count()
    }

    /// Adds a player, or renames one that is already here.
    ///
    /// Allowed in every phase. A late joiner can start guessing straight
    /// away if a round is in progress.
    ///
    /// # Errors
    /// [`RoomError::RoomFull`] if a guest cap is configured and reached.
    pub fn join(
        &mut self,
        id: PlayerId,
        name: Option<&str>,
    ) -> Result<Outbound, RoomError> {
        let host = self.host;
        if let Some(existing) = self.players.iter_mut().find(|p| p.id == id) {
            let fallback = if id == host {
                DEFAULT_HOST_NAME
            } else {
                DEFAULT_GUEST_NAME
            };
            existing.name = display_name(name, fallback);
            tracing::debug!(
                room_code = %self.code, player_id = %id, "player rejoined"
            );
            return Ok(vec![self.roster()]);
        }

        if !self.config.has_guest_slot(self.guest_count()) {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        self.players.push(Player {
            id,
            name: display_name(name, DEFAULT_GUEST_NAME),
            history: Vec::new(),
        });
        tracing::info!(
            room_code = %self.code,
            player_id = %id,
            players = self.players.len(),
            "player joined"
        );
        Ok(vec![self.roster()])
    }

    /// Host commits the round's secret.
    ///
    /// # Errors
    /// - [`RoomError::NotHost`] if `caller` isn't the host, in any phase
    /// - [`RoomError::SecretAlreadySet`] if this round already has one
    /// - [`RoomError::InvalidLength`] if the length doesn't fit the mode
    pub fn set_secret(
        &mut self,
        caller: PlayerId,
        secret: Vec<Symbol>,
    ) -> Result<Outbound, RoomError> {
        if caller != self.host {
            return Err(RoomError::NotHost(caller));
        }
        if !matches!(self.phase, Phase::AwaitingSecret) {
            return Err(RoomError::SecretAlreadySet);
        }
        self.check_length(&secret)?;

        self.phase = Phase::Playing { secret };
        tracing::info!(room_code = %self.code, "secret set, round started");

        Ok(vec![(
            Recipient::All,
            RoomEvent::SecretSet {
                room_code: self.code.clone(),
            },
        )])
    }

    /// Scores a guest's guess.
    ///
    /// The feedback is returned to the caller only; everyone else gets an
    /// `OpponentProgress` carrying the attempt count and that feedback. A
    /// full match ends the round and announces the winner to the room.
    ///
    /// # Errors
    /// In the order they are checked: [`RoomError::NotInRoom`],
    /// [`RoomError::HostCannotGuess`], [`RoomError::NoActiveGame`],
    /// [`RoomError::RoundAlreadyOver`], [`RoomError::InvalidLength`].
    pub fn submit_guess(
        &mut self,
        caller: PlayerId,
        guess: Vec<Symbol>,
    ) -> Result<(Feedback, Outbound), RoomError> {
        if !self.contains(caller) {
            return Err(RoomError::NotInRoom(caller, self.code.clone()));
        }
        if caller == self.host {
            return Err(RoomError::HostCannotGuess);
        }
        let secret = match &self.phase {
            Phase::AwaitingSecret => return Err(RoomError::NoActiveGame),
            Phase::RoundOver { .. } => return Err(RoomError::RoundAlreadyOver),
            Phase::Playing { secret } => secret,
        };
        self.check_length(&guess)?;

        let feedback = feedback::score(&guess, secret)?;
        let solved = feedback.is_solved(self.code_length());

        let Some(player) = self.players.iter_mut().find(|p| p.id == caller)
        else {
            return Err(RoomError::NotInRoom(caller, self.code.clone()));
        };
        player.history.push(GuessRecord { guess, feedback });
        let attempts = player.history.len();
        let name = player.name.clone();

        tracing::debug!(
            room_code = %self.code,
            player_id = %caller,
            attempts,
            exact = feedback.exact,
            misplaced = feedback.misplaced,
            "guess scored"
        );

        let mut out = vec![(
            Recipient::AllExcept(caller),
            RoomEvent::OpponentProgress {
                room_code: self.code.clone(),
                player_id: caller,
                name: name.clone(),
                attempts,
                last_feedback: feedback,
            },
        )];

        if solved {
            if let Phase::Playing { secret } =
                std::mem::replace(&mut self.phase, Phase::AwaitingSecret)
            {
                self.phase = Phase::RoundOver {
                    secret,
                    winner: caller,
                };
            }
            tracing::info!(
                room_code = %self.code,
                winner = %caller,
                attempts,
                "round won"
            );
            out.push((
                Recipient::All,
                RoomEvent::RoundOver {
                    room_code: self.code.clone(),
                    winner_id: caller,
                    winner_name: name,
                },
            ));
        }

        Ok((feedback, out))
    }

    /// Starts a new round: clears every history and the secret.
    ///
    /// Any connection may ask, in any phase. The host stays the host and
    /// has to set a fresh secret before guessing resumes.
    pub fn request_rematch(&mut self, caller: PlayerId) -> Outbound {
        for player in &mut self.players {
            player.history.clear();
        }
        self.phase = Phase::AwaitingSecret;
        tracing::info!(
            room_code = %self.code,
            requested_by = %caller,
            "rematch started"
        );

        vec![(
            Recipient::All,
            RoomEvent::RematchStarted {
                room_code: self.code.clone(),
                host_id: self.host,
            },
        )]
    }

    /// Removes a player.
    ///
    /// A guest leaving updates the roster. The host leaving closes the
    /// room: the remaining players are told, and the caller must discard
    /// this session.
    pub fn leave(&mut self, id: PlayerId) -> (LeaveOutcome, Outbound) {
        let Some(index) = self.players.iter().position(|p| p.id == id) else {
            return (LeaveOutcome::NotMember, Vec::new());
        };
        self.players.remove(index);

        if id == self.host {
            tracing::info!(room_code = %self.code, "host left, closing room");
            return (LeaveOutcome::Closed, self.close());
        }

        tracing::info!(
            room_code = %self.code,
            player_id = %id,
            players = self.players.len(),
            "player left"
        );
        (LeaveOutcome::Left, vec![self.roster()])
    }

    /// The notice sent to everyone still subscribed when the room goes away.
    pub fn close(&self) -> Outbound {
        vec![(
            Recipient::All,
            RoomEvent::RoomClosed {
                room_code: self.code.clone(),
            },
        )]
    }

    /// Where the room stands, as shown to players.
    pub fn status(&self) -> RoomStatus {
        if self.guest_count() == 0 {
            return RoomStatus::AwaitingGuest;
        }
        match &self.phase {
            Phase::AwaitingSecret => RoomStatus::AwaitingSecret,
            Phase::Playing { .. } => RoomStatus::Playing,
            Phase::RoundOver { winner, .. } => RoomStatus::RoundOver {
                winner_id: *winner,
            },
        }
    }

    /// Public view of the room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_code: self.code.clone(),
            mode: self.mode,
            host_id: self.host,
            status: self.status(),
            players: self
                .players
                .iter()
                .map(|p| PlayerSummary {
                    player_id: p.id,
                    name: p.name.clone(),
                    is_host: p.id == self.host,
                    attempts: p.history.len(),
                })
                .collect(),
        }
    }

    /// The roster broadcast.
    pub fn roster(&self) -> (Recipient, RoomEvent) {
        (Recipient::All, RoomEvent::RosterUpdated(self.snapshot()))
    }

    fn check_length(&self, symbols: &[Symbol]) -> Result<(), RoomError> {
        let expected = self.code_length();
        if symbols.len() != expected {
            return Err(RoomError::InvalidLength {
                expected,
                actual: symbols.len(),
            });
        }
        Ok(())
    }
}

/// Trims the requested name, falling back when it's missing or blank.
fn display_name(requested: Option<&str>, fallback: &str) -> String {
    match requested.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => fallback.to_owned(),
    }
}

// =========================================================================
// Tests
// =========================================================================
