//! Integration tests for the room store and room actors.
//!
//! Outboxes are plain in-memory channels. A room pushes its events before
//! it answers the request that caused them, so once a store call returns,
//! everything it triggered is already waiting in the receivers.

use codeduel_protocol::{
    Feedback, Mode, PlayerId, RoomCode, RoomEvent, RoomStatus, ServerPayload,
    Symbol,
};
use codeduel_room::{
    LeaveOutcome, MAX_CODE_ATTEMPTS, PlayerOutbox, RoomConfig, RoomError,
    RoomStore,
};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

const HOST: PlayerId = PlayerId(1);
const GUEST: PlayerId = PlayerId(2);
const THIRD: PlayerId = PlayerId(3);

type Inbox = mpsc::UnboundedReceiver<ServerPayload>;

fn outbox() -> (PlayerOutbox, Inbox) {
    mpsc::unbounded_channel()
}

fn symbols(names: &[&str]) -> Vec<Symbol> {
    names.iter().map(|s| Symbol::from(*s)).collect()
}

fn secret() -> Vec<Symbol> {
    symbols(&["red", "green", "blue", "yellow"])
}

/// Everything queued so far, events only.
fn drain(inbox: &mut Inbox) -> Vec<RoomEvent> {
    let mut events = Vec::new();
    while let Ok(payload) = inbox.try_recv() {
        if let ServerPayload::Event(event) = payload {
            events.push(event);
        }
    }
    events
}

/// A room with a host and one guest, inboxes already drained.
async fn duel(store: &RoomStore) -> (RoomCode, Inbox, Inbox) {
    let (host_tx, mut host_rx) = outbox();
    let (guest_tx, mut guest_rx) = outbox();
    let code = store
        .create_room(HOST, Some("Ana"), Mode::Normal, host_tx)
        .unwrap();
    store
        .join_room(&code, GUEST, Some("Bo"), guest_tx)
        .await
        .unwrap();
    drain(&mut host_rx);
    drain(&mut guest_rx);
    (code, host_rx, guest_rx)
}

// =========================================================================
// Creation and lookup
// =========================================================================

#[tokio::test]
async fn test_create_room_registers_and_sends_roster_to_host() {
    let store = RoomStore::new();
    let (tx, mut rx) = outbox();

    let code = store.create_room(HOST, None, Mode::Hard, tx).unwrap();

    assert!(code.is_well_formed());
    assert_eq!(store.room_count(), 1);
    assert_eq!(store.room_codes(), vec![code.clone()]);
    assert_eq!(store.get_room(&code).unwrap().mode(), Mode::Hard);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        RoomEvent::RosterUpdated(snap) => {
            assert_eq!(snap.room_code, code);
            assert_eq!(snap.host_id, HOST);
            assert_eq!(snap.status, RoomStatus::AwaitingGuest);
            assert_eq!(snap.players[0].name, "Host");
        }
        other => panic!("expected roster, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_room_codes_are_unique() {
    let store = RoomStore::new();
    let mut codes = Vec::new();
    for i in 0..50 {
        let code = store
            .create_room(PlayerId(i), None, Mode::Normal, outbox().0)
            .unwrap();
        assert!(!codes.contains(&code));
        codes.push(code);
    }
    assert_eq!(store.room_count(), 50);
}

#[tokio::test]
async fn test_create_room_retries_on_collision() {
    let store = RoomStore::new();
    let taken = RoomCode::new("AAAAAA");
    store
        .create_room_with(HOST, None, Mode::Normal, outbox().0, || {
            taken.clone()
        })
        .unwrap();

    let mut candidates =
        vec![RoomCode::new("BBBBBB"), taken.clone(), taken.clone()];
    let code = store
        .create_room_with(GUEST, None, Mode::Normal, outbox().0, || {
            candidates.pop().unwrap()
        })
        .unwrap();

    assert_eq!(code, RoomCode::new("BBBBBB"));
    assert_eq!(store.room_count(), 2);
}

#[tokio::test]
async fn test_create_room_gives_up_when_codes_exhausted() {
    let store = RoomStore::new();
    let taken = RoomCode::new("AAAAAA");
    store
        .create_room_with(HOST, None, Mode::Normal, outbox().0, || {
            taken.clone()
        })
        .unwrap();

    let mut attempts = 0;
    let result =
        store.create_room_with(GUEST, None, Mode::Normal, outbox().0, || {
            attempts += 1;
            taken.clone()
        });

    assert_eq!(result, Err(RoomError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS)));
    assert_eq!(attempts, MAX_CODE_ATTEMPTS);
    assert_eq!(store.room_count(), 1);
}

#[tokio::test]
async fn test_unknown_code_is_not_found_everywhere() {
    let store = RoomStore::new();
    let code = RoomCode::new("ZZZZZZ");
    let not_found = RoomError::NotFound(code.clone());

    assert_eq!(store.get_room(&code).unwrap_err(), not_found);
    assert_eq!(
        store.join_room(&code, GUEST, None, outbox().0).await,
        Err(not_found.clone())
    );
    assert_eq!(
        store.set_secret(&code, HOST, secret()).await,
        Err(not_found.clone())
    );
    assert_eq!(
        store.submit_guess(&code, GUEST, secret()).await,
        Err(not_found.clone())
    );
    assert_eq!(
        store.request_rematch(&code, GUEST).await,
        Err(not_found.clone())
    );
    assert_eq!(store.leave_room(&code, GUEST).await, Err(not_found));
}

#[tokio::test]
async fn test_lookup_normalizes_typed_codes() {
    let store = RoomStore::new();
    let code = store
        .create_room(HOST, None, Mode::Normal, outbox().0)
        .unwrap();
    let typed = RoomCode::new(format!(" {} ", code.as_str().to_lowercase()));
    assert!(store.get_room(&typed).is_ok());
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_join_returns_mode_and_broadcasts_roster() {
    let store = RoomStore::new();
    let (host_tx, mut host_rx) = outbox();
    let (guest_tx, mut guest_rx) = outbox();
    let code = store.create_room(HOST, None, Mode::Hard, host_tx).unwrap();
    drain(&mut host_rx);

    let mode = store
        .join_room(&code, GUEST, Some("Bo"), guest_tx)
        .await
        .unwrap();
    assert_eq!(mode, Mode::Hard);

    for events in [drain(&mut host_rx), drain(&mut guest_rx)] {
        assert_eq!(events.len(), 1);
        match &events[0] {
            RoomEvent::RosterUpdated(snap) => {
                assert_eq!(snap.players.len(), 2);
                assert_eq!(snap.status, RoomStatus::AwaitingSecret);
            }
            other => panic!("expected roster, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_join_twice_is_idempotent() {
    let store = RoomStore::new();
    let (code, _host_rx, _guest_rx) = duel(&store).await;

    store
        .join_room(&code, GUEST, Some("Bobby"), outbox().0)
        .await
        .unwrap();

    let snap = store.snapshot(&code).await.unwrap();
    assert_eq!(snap.players.len(), 2);
    assert_eq!(snap.players[1].name, "Bobby");
}

#[tokio::test]
async fn test_many_guests_by_default() {
    let store = RoomStore::new();
    let (code, _host_rx, _guest_rx) = duel(&store).await;
    for i in 10..20 {
        store
            .join_room(&code, PlayerId(i), None, outbox().0)
            .await
            .unwrap();
    }
    assert_eq!(store.snapshot(&code).await.unwrap().players.len(), 12);
}

#[tokio::test]
async fn test_duel_config_caps_guests() {
    let store = RoomStore::with_config(RoomConfig::duel());
    let (code, _host_rx, _guest_rx) = duel(&store).await;

    let result = store.join_room(&code, THIRD, None, outbox().0).await;
    assert_eq!(result, Err(RoomError::RoomFull(code)));
}

// =========================================================================
// Playing a round
// =========================================================================

#[tokio::test]
async fn test_full_round_event_flow() {
    let store = RoomStore::new();
    let (code, mut host_rx, mut guest_rx) = duel(&store).await;

    store.set_secret(&code, HOST, secret()).await.unwrap();
    let secret_set = RoomEvent::SecretSet {
        room_code: code.clone(),
    };
    assert_eq!(drain(&mut host_rx), vec![secret_set.clone()]);
    assert_eq!(drain(&mut guest_rx), vec![secret_set]);

    let feedback = store
        .submit_guess(&code, GUEST, symbols(&["green", "red", "blue", "x"]))
        .await
        .unwrap();
    assert_eq!(feedback, Feedback { exact: 1, misplaced: 2 });

    // The guesser learns its feedback from the reply, not from a broadcast.
    assert!(drain(&mut guest_rx).is_empty());
    assert_eq!(
        drain(&mut host_rx),
        vec![RoomEvent::OpponentProgress {
            room_code: code.clone(),
            player_id: GUEST,
            name: "Bo".into(),
            attempts: 1,
            last_feedback: feedback,
        }]
    );

    let winning = store.submit_guess(&code, GUEST, secret()).await.unwrap();
    assert!(winning.is_solved(4));

    let round_over = RoomEvent::RoundOver {
        room_code: code.clone(),
        winner_id: GUEST,
        winner_name: "Bo".into(),
    };
    assert_eq!(drain(&mut guest_rx), vec![round_over.clone()]);
    let host_events = drain(&mut host_rx);
    assert_eq!(host_events.len(), 2);
    assert!(matches!(
        host_events[0],
        RoomEvent::OpponentProgress { attempts: 2, .. }
    ));
    assert_eq!(host_events[1], round_over);

    let snap = store.snapshot(&code).await.unwrap();
    assert_eq!(snap.status, RoomStatus::RoundOver { winner_id: GUEST });
}

#[tokio::test]
async fn test_rejected_requests_broadcast_nothing() {
    let store = RoomStore::new();
    let (code, mut host_rx, mut guest_rx) = duel(&store).await;

    assert_eq!(
        store.submit_guess(&code, GUEST, secret()).await,
        Err(RoomError::NoActiveGame)
    );
    assert_eq!(
        store.set_secret(&code, HOST, symbols(&["red"])).await,
        Err(RoomError::InvalidLength {
            expected: 4,
            actual: 1
        })
    );

    assert!(drain(&mut host_rx).is_empty());
    assert!(drain(&mut guest_rx).is_empty());
}

#[tokio::test]
async fn test_host_exclusivity_in_every_phase() {
    let store = RoomStore::new();
    let (code, _host_rx, _guest_rx) = duel(&store).await;
    let not_host = Err(RoomError::NotHost(GUEST));

    // AwaitingSecret
    assert_eq!(store.set_secret(&code, GUEST, secret()).await, not_host);

    // Playing
    store.set_secret(&code, HOST, secret()).await.unwrap();
    assert_eq!(store.set_secret(&code, GUEST, secret()).await, not_host);

    // RoundOver
    store.submit_guess(&code, GUEST, secret()).await.unwrap();
    assert_eq!(store.set_secret(&code, GUEST, secret()).await, not_host);

    // AwaitingSecret again, after a rematch
    store.request_rematch(&code, GUEST).await.unwrap();
    assert_eq!(store.set_secret(&code, GUEST, secret()).await, not_host);
}

#[tokio::test]
async fn test_round_lock_after_win() {
    let store = RoomStore::new();
    let (code, _host_rx, _guest_rx) = duel(&store).await;
    store
        .join_room(&code, THIRD, None, outbox().0)
        .await
        .unwrap();
    store.set_secret(&code, HOST, secret()).await.unwrap();
    store.submit_guess(&code, GUEST, secret()).await.unwrap();

    for player in [GUEST, THIRD] {
        for guess in [secret(), symbols(&["a", "b", "c", "d"])] {
            assert_eq!(
                store.submit_guess(&code, player, guess).await,
                Err(RoomError::RoundAlreadyOver)
            );
        }
    }

    store.request_rematch(&code, HOST).await.unwrap();
    store.set_secret(&code, HOST, secret()).await.unwrap();
    assert!(store.submit_guess(&code, THIRD, secret()).await.is_ok());
}

#[tokio::test]
async fn test_rematch_reset() {
    let store = RoomStore::new();
    let (code, mut host_rx, mut guest_rx) = duel(&store).await;
    store.set_secret(&code, HOST, secret()).await.unwrap();
    store
        .submit_guess(&code, GUEST, symbols(&["x", "x", "x", "x"]))
        .await
        .unwrap();
    store.submit_guess(&code, GUEST, secret()).await.unwrap();
    drain(&mut host_rx);
    drain(&mut guest_rx);

    store.request_rematch(&code, GUEST).await.unwrap();

    let started = RoomEvent::RematchStarted {
        room_code: code.clone(),
        host_id: HOST,
    };
    assert_eq!(drain(&mut host_rx), vec![started.clone()]);
    assert_eq!(drain(&mut guest_rx), vec![started]);

    let snap = store.snapshot(&code).await.unwrap();
    assert!(snap.players.iter().all(|p| p.attempts == 0));
    assert_eq!(snap.status, RoomStatus::AwaitingSecret);
    assert_eq!(snap.host_id, HOST);
    assert_eq!(
        store.submit_guess(&code, GUEST, secret()).await,
        Err(RoomError::NoActiveGame)
    );
}

#[tokio::test]
async fn test_concurrent_guesses_apply_in_sequence() {
    let store = std::sync::Arc::new(RoomStore::new());
    let (host_tx, mut host_rx) = outbox();
    let code = store
        .create_room(HOST, None, Mode::Normal, host_tx)
        .unwrap();
    for i in 10..30 {
        store
            .join_room(&code, PlayerId(i), None, outbox().0)
            .await
            .unwrap();
    }
    store.set_secret(&code, HOST, secret()).await.unwrap();
    drain(&mut host_rx);

    // Every guest guesses the secret at once. Exactly one can win.
    let mut tasks = Vec::new();
    for i in 10..30 {
        let store = std::sync::Arc::clone(&store);
        let code = code.clone();
        tasks.push(tokio::spawn(async move {
            store.submit_guess(&code, PlayerId(i), secret()).await
        }));
    }

    let mut wins = 0;
    let mut locked_out = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(feedback) => {
                assert!(feedback.is_solved(4));
                wins += 1;
            }
            Err(RoomError::RoundAlreadyOver) => locked_out += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(locked_out, 19);

    let round_overs = drain(&mut host_rx)
        .into_iter()
        .filter(|e| matches!(e, RoomEvent::RoundOver { .. }))
        .count();
    assert_eq!(round_overs, 1);
}

// =========================================================================
// Leaving and teardown
// =========================================================================

#[tokio::test]
async fn test_host_disconnect_teardown() {
    let store = RoomStore::new();
    let (code, mut host_rx, mut guest_rx) = duel(&store).await;
    store.set_secret(&code, HOST, secret()).await.unwrap();
    drain(&mut host_rx);
    drain(&mut guest_rx);

    let outcome = store.leave_room(&code, HOST).await.unwrap();

    assert_eq!(outcome, LeaveOutcome::Closed);
    assert_eq!(
        store.get_room(&code).unwrap_err(),
        RoomError::NotFound(code.clone())
    );
    assert_eq!(store.room_count(), 0);
    assert_eq!(
        drain(&mut guest_rx),
        vec![RoomEvent::RoomClosed {
            room_code: code.clone()
        }]
    );
    assert!(drain(&mut host_rx).is_empty());

    // The guest's own cleanup afterwards changes nothing.
    assert_eq!(
        store.leave_room(&code, GUEST).await,
        Err(RoomError::NotFound(code))
    );
    assert!(drain(&mut guest_rx).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_room_is_gone_by_the_time_guests_hear_it_closed() {
    let store = std::sync::Arc::new(RoomStore::new());

    for _ in 0..100 {
        let (code, _host_rx, mut guest_rx) = duel(&store).await;

        let leaver = std::sync::Arc::clone(&store);
        let leave_code = code.clone();
        let leave = tokio::spawn(async move {
            leaver.leave_room(&leave_code, HOST).await
        });

        // Race the host's leave: look the room up the moment the guest
        // hears it closed, before the leave call has returned.
        loop {
            match guest_rx.recv().await {
                Some(ServerPayload::Event(RoomEvent::RoomClosed { .. })) => {
                    break;
                }
                Some(_) => continue,
                None => panic!("guest outbox dropped before RoomClosed"),
            }
        }
        assert_eq!(
            store.get_room(&code).unwrap_err(),
            RoomError::NotFound(code.clone())
        );
        assert!(!store.room_codes().contains(&code));

        assert_eq!(leave.await.unwrap(), Ok(LeaveOutcome::Closed));
    }

    assert_eq!(store.room_count(), 0);
}

#[tokio::test]
async fn test_closed_room_code_can_be_reused() {
    let store = RoomStore::new();
    let code = RoomCode::new("REUSE1");
    store
        .create_room_with(HOST, None, Mode::Normal, outbox().0, || code.clone())
        .unwrap();
    let stale = store.get_room(&code).unwrap();
    store.leave_room(&code, HOST).await.unwrap();
    assert!(stale.is_closed());

    let (tx, mut rx) = outbox();
    store
        .create_room_with(GUEST, None, Mode::Hard, tx, || code.clone())
        .unwrap();
    let fresh = store.get_room(&code).unwrap();
    assert!(!fresh.is_same_room(&stale));
    assert_eq!(fresh.mode(), Mode::Hard);

    // Leaving through the old handle never reaches the new room.
    assert_eq!(
        store.leave_handle(&stale, GUEST).await,
        Err(RoomError::NotFound(code.clone()))
    );
    assert_eq!(store.room_count(), 1);
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn test_remove_room_after_close_is_not_found() {
    let store = RoomStore::new();
    let (code, _host_rx, _guest_rx) = duel(&store).await;
    store.remove_room(&code).await.unwrap();
    assert_eq!(
        store.remove_room(&code).await,
        Err(RoomError::NotFound(code))
    );
}

#[tokio::test]
async fn test_guest_leave_keeps_room_and_phase() {
    let store = RoomStore::new();
    let (code, mut host_rx, mut guest_rx) = duel(&store).await;
    store.set_secret(&code, HOST, secret()).await.unwrap();
    drain(&mut host_rx);

    let outcome = store.leave_room(&code, GUEST).await.unwrap();
    assert_eq!(outcome, LeaveOutcome::Left);

    let events = drain(&mut host_rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        RoomEvent::RosterUpdated(snap) => {
            assert_eq!(snap.players.len(), 1);
            assert_eq!(snap.status, RoomStatus::AwaitingGuest);
        }
        other => panic!("expected roster, got {other:?}"),
    }
    // The leaver is unsubscribed before the roster goes out.
    assert!(drain(&mut guest_rx).iter().all(|e| !matches!(
        e,
        RoomEvent::RosterUpdated(_)
    )));

    // The round is still live for a new guest.
    store
        .join_room(&code, THIRD, None, outbox().0)
        .await
        .unwrap();
    assert!(store.submit_guess(&code, THIRD, secret()).await.is_ok());
}

#[tokio::test]
async fn test_leave_twice_is_noop() {
    let store = RoomStore::new();
    let (code, mut host_rx, _guest_rx) = duel(&store).await;

    store.leave_room(&code, GUEST).await.unwrap();
    drain(&mut host_rx);

    let outcome = store.leave_room(&code, GUEST).await.unwrap();
    assert_eq!(outcome, LeaveOutcome::NotMember);
    assert!(drain(&mut host_rx).is_empty());
    assert_eq!(store.room_count(), 1);
}

#[tokio::test]
async fn test_remove_room_notifies_everyone() {
    let store = RoomStore::new();
    let (code, mut host_rx, mut guest_rx) = duel(&store).await;

    store.remove_room(&code).await.unwrap();

    let closed = RoomEvent::RoomClosed {
        room_code: code.clone(),
    };
    assert_eq!(drain(&mut host_rx), vec![closed.clone()]);
    assert_eq!(drain(&mut guest_rx), vec![closed]);
    assert_eq!(store.room_count(), 0);
    assert_eq!(
        store.remove_room(&code).await,
        Err(RoomError::NotFound(code))
    );
}

#[tokio::test]
async fn test_stale_handle_reads_as_not_found() {
    let store = RoomStore::new();
    let (code, _host_rx, _guest_rx) = duel(&store).await;
    let handle = store.get_room(&code).unwrap();

    store.leave_room(&code, HOST).await.unwrap();

    assert_eq!(
        handle.snapshot().await.unwrap_err(),
        RoomError::NotFound(code)
    );
}

#[tokio::test]
async fn test_rooms_are_independent() {
    let store = RoomStore::new();
    let (a, mut a_host, _a_guest) = duel(&store).await;
    let (b_tx, mut b_host) = outbox();
    let b = store
        .create_room(THIRD, None, Mode::Normal, b_tx)
        .unwrap();
    drain(&mut b_host);

    store.set_secret(&a, HOST, secret()).await.unwrap();
    store.leave_room(&a, HOST).await.unwrap();

    assert!(drain(&mut b_host).is_empty());
    assert!(store.get_room(&b).is_ok());
    drain(&mut a_host);
}
