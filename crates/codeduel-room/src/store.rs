//! Room store: creates, tracks, and routes requests to rooms.

use codeduel_protocol::{
    Feedback, Mode, PlayerId, RoomCode, RoomSnapshot, Symbol,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::room::spawn_room;
use crate::{
    LeaveOutcome, PlayerOutbox, RoomConfig, RoomError, RoomHandle,
    RoomSession, generate_room_code,
};

/// How many fresh codes [`RoomStore::create_room`] tries before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 64;

/// Registry of every live room, keyed by code.
///
/// Backed by a sharded map: looking up one room never waits on another, and
/// the map locks are only held for the lookup itself. All room state lives
/// in the room actors; the store only holds their handles.
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: DashMap<RoomCode, RoomHandle>,
    config: RoomConfig,
}

impl RoomStore {
    /// Creates an empty store with the default [`RoomConfig`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose rooms use `config`.
    pub fn with_config(config: RoomConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a room with `host` as its host and returns its code.
    ///
    /// The host is subscribed through `outbox` and is sent the room's first
    /// roster before this returns.
    ///
    /// # Errors
    /// [`RoomError::CodeSpaceExhausted`] if every generated code was taken.
    pub fn create_room(
        &self,
        host: PlayerId,
        name: Option<&str>,
        mode: Mode,
        outbox: PlayerOutbox,
    ) -> Result<RoomCode, RoomError> {
        let mut rng = rand::rng();
        self.create_room_with(host, name, mode, outbox, || {
            generate_room_code(&mut rng)
        })
    }

    /// Like [`create_room`](Self::create_room), drawing codes from
    /// `next_code` instead of the thread RNG.
    pub fn create_room_with(
        &self,
        host: PlayerId,
        name: Option<&str>,
        mode: Mode,
        outbox: PlayerOutbox,
        mut next_code: impl FnMut() -> RoomCode,
    ) -> Result<RoomCode, RoomError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = next_code();
            // The vacancy check and the insert happen under the same shard
            // lock, so two creators can never claim one code.
            // A closed room still waiting to be unregistered counts as vacant.
            match self.rooms.entry(code) {
                Entry::Occupied(taken) if !taken.get().is_closed() => {
                    tracing::debug!(room_code = %taken.key(), "room code collision");
                }
                slot => {
                    let code = slot.key().clone();
                    let session = RoomSession::new(
                        code.clone(),
                        mode,
                        host,
                        name,
                        self.config.clone(),
                    );
                    let handle =
                        spawn_room(session, outbox, self.config.command_buffer);
                    slot.insert(handle);
                    tracing::info!(
                        room_code = %code,
                        %mode,
                        host = %host,
                        "room created"
                    );
                    return Ok(code);
                }
            }
        }

        tracing::warn!(
            attempts = MAX_CODE_ATTEMPTS,
            rooms = self.rooms.len(),
            "no free room code"
        );
        Err(RoomError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS))
    }

    /// Looks up a live room.
    ///
    /// A room whose actor has stopped is gone even if its entry hasn't been
    /// dropped yet; the lookup drops it.
    pub fn get_room(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        let handle = self.rooms.get(code).map(|entry| entry.value().clone());
        match handle {
            Some(handle) if !handle.is_closed() => Ok(handle),
            Some(stale) => {
                self.unregister(&stale);
                Err(RoomError::NotFound(code.clone()))
            }
            None => Err(RoomError::NotFound(code.clone())),
        }
    }

    /// Adds `player` to a room and returns the room's mode.
    ///
    /// Joining a room you're already in just updates your name and outbox.
    pub async fn join_room(
        &self,
        code: &RoomCode,
        player: PlayerId,
        name: Option<&str>,
        outbox: PlayerOutbox,
    ) -> Result<Mode, RoomError> {
        let handle = self.get_room(code)?;
        handle.join(player, name.map(str::to_owned), outbox).await?;
        Ok(handle.mode())
    }

    pub async fn set_secret(
        &self,
        code: &RoomCode,
        player: PlayerId,
        secret: Vec<Symbol>,
    ) -> Result<(), RoomError> {
        self.get_room(code)?.set_secret(player, secret).await
    }

    pub async fn submit_guess(
        &self,
        code: &RoomCode,
        player: PlayerId,
        guess: Vec<Symbol>,
    ) -> Result<Feedback, RoomError> {
        self.get_room(code)?.submit_guess(player, guess).await
    }

    pub async fn request_rematch(
        &self,
        code: &RoomCode,
        player: PlayerId,
    ) -> Result<(), RoomError> {
        self.get_room(code)?.request_rematch(player).await
    }

    /// Removes `player` from a room.
    ///
    /// When the host leaves, the room is unregistered before this returns,
    /// so a lookup right after sees [`RoomError::NotFound`]. Leaving a room
    /// you aren't in is a no-op ([`LeaveOutcome::NotMember`]).
    pub async fn leave_room(
        &self,
        code: &RoomCode,
        player: PlayerId,
    ) -> Result<LeaveOutcome, RoomError> {
        let handle = self.get_room(code)?;
        self.leave_handle(&handle, player).await
    }

    /// Like [`leave_room`](Self::leave_room), for a room the caller already
    /// holds a handle to. A code reused since then is left alone.
    pub async fn leave_handle(
        &self,
        handle: &RoomHandle,
        player: PlayerId,
    ) -> Result<LeaveOutcome, RoomError> {
        let outcome = handle.leave(player).await?;
        if outcome == LeaveOutcome::Closed {
            self.unregister(handle);
        }
        Ok(outcome)
    }

    /// Shuts a room down, telling everyone still in it.
    pub async fn remove_room(&self, code: &RoomCode) -> Result<(), RoomError> {
        let (_, handle) = self
            .rooms
            .remove(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        if handle.is_closed() {
            return Err(RoomError::NotFound(code.clone()));
        }
        // Stopped in the meantime means already closed; nothing left to tell.
        let _ = handle.close().await;
        tracing::info!(room_code = %code, "room removed");
        Ok(())
    }

    /// Public view of a room.
    pub async fn snapshot(
        &self,
        code: &RoomCode,
    ) -> Result<RoomSnapshot, RoomError> {
        self.get_room(code)?.snapshot().await
    }

    /// Returns the number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .count()
    }

    /// Lists all live room codes.
    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Drops the registry entry for `handle`'s room, unless the code has
    /// since been taken by a different room.
    fn unregister(&self, handle: &RoomHandle) {
        let removed = self
            .rooms
            .remove_if(handle.code(), |_, current| current.is_same_room(handle));
        if removed.is_some() {
            tracing::info!(room_code = %handle.code(), "room closed");
        }
    }
}
