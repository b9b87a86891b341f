//! Room actor: an isolated Tokio task that owns one [`RoomSession`].
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. Commands are applied one at a time, so two
//! guesses racing each other (or a guess racing a rematch) land as a strict
//! sequence. Rooms share nothing, so a busy room never slows another one.

use std::collections::HashMap;

use codeduel_protocol::{
    Feedback, Mode, PlayerId, Recipient, RoomCode, RoomEvent, RoomSnapshot,
    ServerPayload, Symbol,
};
use tokio::sync::{mpsc, oneshot};

use crate::{LeaveOutcome, RoomError, RoomSession, session::Outbound};

/// Channel for delivering server payloads to one connection.
///
/// The room pushes its events here; the connection's gateway pushes its
/// replies into the same channel, which is what keeps a reply behind the
/// events its request produced.
pub type PlayerOutbox = mpsc::UnboundedSender<ServerPayload>;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel: the caller
/// sends a command and waits for the response on it.
pub(crate) enum RoomCommand {
    /// Add (or rename) a player and subscribe its outbox.
    Join {
        player_id: PlayerId,
        name: Option<String>,
        outbox: PlayerOutbox,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    SetSecret {
        player_id: PlayerId,
        secret: Vec<Symbol>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    SubmitGuess {
        player_id: PlayerId,
        guess: Vec<Symbol>,
        reply: oneshot::Sender<Result<Feedback, RoomError>>,
    },

    RequestRematch {
        player_id: PlayerId,
        reply: oneshot::Sender<()>,
    },

    /// Remove a player. The actor stops if it was the host.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<LeaveOutcome>,
    },

    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },

    /// Tell everyone the room is closed and stop.
    Close { reply: oneshot::Sender<()> },
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone: a room code, a mode and an `mpsc::Sender`. The
/// [`RoomStore`](crate::RoomStore) holds one of these per room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    mode: Mode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Returns the room's mode, fixed for its lifetime.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns `true` if both handles talk to the same actor.
    ///
    /// Codes can be reused once a room is gone, so the code alone doesn't
    /// identify an actor.
    pub fn is_same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Returns `true` once the actor has stopped taking commands. This
    /// flips before the room's closed notice goes out.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Adds a player to the room, or renames one already in it.
    ///
    /// `outbox` replaces any earlier outbox for the same player.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: Option<String>,
        outbox: PlayerOutbox,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            outbox,
            reply,
        })
        .await?
    }

    pub async fn set_secret(
        &self,
        player_id: PlayerId,
        secret: Vec<Symbol>,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SetSecret {
            player_id,
            secret,
            reply,
        })
        .await?
    }

    /// Scores a guess. The feedback is for the caller alone.
    pub async fn submit_guess(
        &self,
        player_id: PlayerId,
        guess: Vec<Symbol>,
    ) -> Result<Feedback, RoomError> {
        self.request(|reply| RoomCommand::SubmitGuess {
            player_id,
            guess,
            reply,
        })
        .await?
    }

    pub async fn request_rematch(
        &self,
        player_id: PlayerId,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::RequestRematch { player_id, reply })
            .await
    }

    /// Removes a player. [`LeaveOutcome::Closed`] means the actor has
    /// stopped; the caller is responsible for unregistering the room.
    pub async fn leave(
        &self,
        player_id: PlayerId,
    ) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Closes the room, notifying every subscriber.
    pub async fn close(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Close { reply }).await
    }

    /// Sends a command and waits for the actor's answer. A stopped actor
    /// reads as a room that no longer exists.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::NotFound(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::NotFound(self.code.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    session: RoomSession,
    /// Per-player outbound channels.
    subscribers: HashMap<PlayerId, PlayerOutbox>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until the room closes or every handle is gone.
    async fn run(mut self) {
        tracing::debug!(room_code = %self.session.code(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    name,
                    outbox,
                    reply,
                } => {
                    let result =
                        self.handle_join(player_id, name.as_deref(), outbox);
                    let _ = reply.send(result);
                }
                RoomCommand::SetSecret {
                    player_id,
                    secret,
                    reply,
                } => {
                    let result = self
                        .session
                        .set_secret(player_id, secret)
                        .map(|out| self.dispatch(out));
                    let _ = reply.send(result);
                }
                RoomCommand::SubmitGuess {
                    player_id,
                    guess,
                    reply,
                } => {
                    let result = self.session.submit_guess(player_id, guess).map(
                        |(feedback, out)| {
                            self.dispatch(out);
                            feedback
                        },
                    );
                    let _ = reply.send(result);
                }
                RoomCommand::RequestRematch { player_id, reply } => {
                    let out = self.session.request_rematch(player_id);
                    self.dispatch(out);
                    let _ = reply.send(());
                }
                RoomCommand::Leave { player_id, reply } => {
                    let outcome = self.handle_leave(player_id);
                    let _ = reply.send(outcome);
                    if outcome == LeaveOutcome::Closed {
                        break;
                    }
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.session.snapshot());
                }
                RoomCommand::Close { reply } => {
                    tracing::info!(
                        room_code = %self.session.code(),
                        "room shutting down"
                    );
                    self.receiver.close();
                    let out = self.session.close();
                    self.dispatch(out);
                    let _ = reply.send(());
                    break;
                }
            }
        }

        tracing::debug!(room_code = %self.session.code(), "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: Option<&str>,
        outbox: PlayerOutbox,
    ) -> Result<(), RoomError> {
        let out = self.session.join(player_id, name)?;
        // Subscribe before dispatching so the joiner sees its own roster.
        self.subscribers.insert(player_id, outbox);
        self.dispatch(out);
        Ok(())
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> LeaveOutcome {
        // The leaver is unsubscribed first: it gets neither its own roster
        // update nor, if it was the host, the closed notice.
        self.subscribers.remove(&player_id);
        let (outcome, out) = self.session.leave(player_id);
        if outcome == LeaveOutcome::Closed {
            // Handles must read as closed before anyone hears the room closed.
            self.receiver.close();
        }
        self.dispatch(out);
        outcome
    }

    /// Dispatches room events to their recipients, in join order.
    fn dispatch(&self, out: Outbound) {
        for (recipient, event) in out {
            match recipient {
                Recipient::Player(pid) => self.send_to(pid, event),
                Recipient::All | Recipient::AllExcept(_) => {
                    for player in self.session.players() {
                        if recipient.includes(player.id) {
                            self.send_to(player.id, event.clone());
                        }
                    }
                }
            }
        }
    }

    /// Sends an event to a single player. Silently drops it if the
    /// connection is already gone; its disconnect will reach us shortly.
    fn send_to(&self, player_id: PlayerId, event: RoomEvent) {
        if let Some(outbox) = self.subscribers.get(&player_id) {
            let _ = outbox.send(ServerPayload::Event(event));
        }
    }
}

/// Spawns a room actor for `session`, subscribing `host_outbox` for the
/// host, and returns a handle to it.
///
/// The host's first roster is queued before this returns, ahead of
/// anything the caller sends the host afterwards.
///
/// `channel_size` controls backpressure: if the channel fills up, senders
/// wait (bounded channel).
pub(crate) fn spawn_room(
    session: RoomSession,
    host_outbox: PlayerOutbox,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));

    let mut subscribers = HashMap::new();
    subscribers.insert(session.host(), host_outbox);

    let handle = RoomHandle {
        code: session.code().clone(),
        mode: session.mode(),
        sender: tx,
    };

    let actor = RoomActor {
        session,
        subscribers,
        receiver: rx,
    };
    actor.dispatch(vec![actor.session.roster()]);

    tokio::spawn(actor.run());
    handle
}
