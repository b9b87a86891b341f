//! Per-connection gateway: request routing, replies, and cleanup.
//!
//! Each accepted connection gets two Tokio tasks:
//!   1. The reader (this handler) decodes `ClientEnvelope`s and forwards
//!      them to the room store.
//!   2. The writer drains the connection's outbox, stamping each payload
//!      with a sequence number before it goes on the wire.
//!
//! Rooms push their events into the same outbox the reader pushes replies
//! into. A room queues its events before it answers, so a reply always
//! trails the broadcasts its request caused.
//!
//! When the peer goes away (cleanly or not) or sends `Disconnect`, the
//! handler leaves every room the connection joined. A host leaving closes
//! its room.

use std::collections::HashMap;
use std::sync::Arc;

use codeduel_protocol::{
    ClientEnvelope, ClientRequest, Codec, ErrorReply, PlayerId, Reply,
    ReplyBody, RoomCode, ServerEnvelope, ServerPayload,
};
use codeduel_room::{LeaveOutcome, PlayerOutbox, RoomError, RoomHandle};
use codeduel_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::CodeduelError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), CodeduelError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbox, inbox) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        inbox,
        Arc::clone(&state),
    ));

    let mut gateway = Gateway {
        conn_id,
        player_id: PlayerId::from(conn_id),
        state,
        outbox,
        rooms: HashMap::new(),
    };

    let result = gateway.read_loop(&conn).await;
    gateway.leave_all().await;

    // Every room we were in has dropped our outbox by now; dropping ours
    // lets the writer flush what's queued and stop.
    drop(gateway);
    if let Err(e) = writer.await {
        tracing::warn!(%conn_id, error = %e, "writer task failed");
    }
    let _ = conn.close().await;

    tracing::debug!(%conn_id, "connection handler finished");
    result
}

/// Drains `inbox` onto the wire until every sender is gone or the peer
/// stops accepting frames.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut inbox: mpsc::UnboundedReceiver<ServerPayload>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    let mut seq: u64 = 1;

    while let Some(payload) = inbox.recv().await {
        let envelope = ServerEnvelope {
            seq: next_seq(&mut seq),
            timestamp: state.timestamp(),
            payload,
        };
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode envelope");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// What to do after a request.
enum Flow {
    Continue,
    Disconnect,
}

/// Reader-side state of one connection.
struct Gateway<C: Codec> {
    conn_id: ConnectionId,
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
    outbox: PlayerOutbox,
    /// Rooms this connection created or joined and hasn't left. Holding
    /// the handle pins the exact room, since a code outlives its room.
    rooms: HashMap<RoomCode, RoomHandle>,
}

impl<C: Codec> Gateway<C> {
    async fn read_loop(
        &mut self,
        conn: &WebSocketConnection,
    ) -> Result<(), CodeduelError> {
        let conn_id = self.conn_id;
        loop {
            let data = match conn.recv().await {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed cleanly");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    return Err(e.into());
                }
            };

            let envelope: ClientEnvelope = match self.state.codec.decode(&data)
            {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::debug!(
                        %conn_id, error = %e, "failed to decode envelope"
                    );
                    self.push(ServerPayload::Rejected {
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if let Flow::Disconnect = self.dispatch(envelope).await {
                tracing::info!(%conn_id, "client disconnected");
                return Ok(());
            }
        }
    }

    /// Routes one request and queues its reply.
    async fn dispatch(&mut self, envelope: ClientEnvelope) -> Flow {
        let ClientEnvelope { id, request } = envelope;
        let request_name = request.name();
        let player_id = self.player_id;
        forget_closed_rooms(&mut self.rooms);
        let rooms = &self.state.rooms;

        let outcome = match request {
            ClientRequest::CreateRoom { name, mode } => rooms
                .create_room(
                    player_id,
                    name.as_deref(),
                    mode,
                    self.outbox.clone(),
                )
                .map(|room_code| {
                    self.track(&room_code);
                    ReplyBody::RoomCreated {
                        room_code,
                        mode,
                        player_id,
                    }
                }),
            ClientRequest::JoinRoom { room_code, name } => rooms
                .join_room(
                    &room_code,
                    player_id,
                    name.as_deref(),
                    self.outbox.clone(),
                )
                .await
                .map(|mode| {
                    self.track(&room_code);
                    ReplyBody::RoomJoined {
                        room_code,
                        mode,
                        player_id,
                    }
                }),
            ClientRequest::SetSecret { room_code, secret } => rooms
                .set_secret(&room_code, player_id, secret)
                .await
                .map(|()| ReplyBody::SecretAccepted),
            ClientRequest::SubmitGuess { room_code, guess } => rooms
                .submit_guess(&room_code, player_id, guess)
                .await
                .map(|feedback| ReplyBody::GuessScored { feedback }),
            ClientRequest::RequestRematch { room_code } => rooms
                .request_rematch(&room_code, player_id)
                .await
                .map(|()| ReplyBody::RematchAccepted),
            ClientRequest::LeaveRoom { room_code } => {
                if let Some(handle) = self.rooms.remove(&room_code) {
                    self.leave(&handle).await;
                }
                return Flow::Continue;
            }
            ClientRequest::Disconnect => return Flow::Disconnect,
        };

        if let Err(e) = &outcome {
            tracing::debug!(
                conn_id = %self.conn_id,
                request = request_name,
                error = %e,
                "request rejected"
            );
        }
        self.push(ServerPayload::Reply(Reply {
            id,
            outcome: outcome.map_err(error_reply),
        }));
        Flow::Continue
    }

    /// Remembers the live room behind `room_code`. A room that closed
    /// in the meantime isn't worth remembering.
    fn track(&mut self, room_code: &RoomCode) {
        if let Ok(handle) = self.state.rooms.get_room(room_code) {
            self.rooms.insert(room_code.clone(), handle);
        }
    }

    /// Leaves one room. Failures only mean there's nothing left to leave.
    async fn leave(&self, handle: &RoomHandle) {
        let room_code = handle.code();
        match self.state.rooms.leave_handle(handle, self.player_id).await {
            Ok(LeaveOutcome::Closed) => tracing::debug!(
                conn_id = %self.conn_id,
                %room_code,
                "host left, room closed"
            ),
            Ok(LeaveOutcome::Left | LeaveOutcome::NotMember) => {}
            Err(e) => tracing::debug!(
                conn_id = %self.conn_id,
                %room_code,
                error = %e,
                "leave skipped"
            ),
        }
    }

    /// Leaves every tracked room. Safe to call more than once.
    async fn leave_all(&mut self) {
        forget_closed_rooms(&mut self.rooms);
        for handle in std::mem::take(&mut self.rooms).into_values() {
            self.leave(&handle).await;
        }
    }

    /// Queues a payload for the writer. A closed outbox means the writer
    /// already stopped because the peer is gone.
    fn push(&self, payload: ServerPayload) {
        let _ = self.outbox.send(payload);
    }
}

/// Drops rooms whose host has closed them.
fn forget_closed_rooms(rooms: &mut HashMap<RoomCode, RoomHandle>) {
    rooms.retain(|_, handle| !handle.is_closed());
}

fn error_reply(e: RoomError) -> ErrorReply {
    ErrorReply {
        kind: e.kind(),
        message: e.to_string(),
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
