//! Scoring a guess against a secret.
//!
//! Two passes, each symbol consumed at most once:
//!
//! 1. Positions where guess and secret agree are counted as `exact` and
//!    taken out of play on both sides.
//! 2. Each remaining guess symbol looks for an equal, still-unconsumed
//!    secret symbol. If one exists it is consumed and counted as
//!    `misplaced`.
//!
//! Without the consumption step a secret `[A, B, C, D]` would score a guess
//! `[B, B, B, B]` as one exact plus three misplaced, although the secret
//! holds a single `B`.

use codeduel_protocol::Feedback;

/// Errors from [`score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackError {
    /// Guess and secret differ in length.
    #[error("expected {expected} symbols, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Scores `guess` against `secret`.
///
/// Works over any symbol type that can be compared for equality; symbols
/// carry no order or numeric meaning.
///
/// # Errors
/// [`FeedbackError::InvalidLength`] if the slices differ in length. Rooms
/// check lengths against the mode before calling this, so hitting it
/// means a caller skipped that check.
pub fn score<T: PartialEq>(
    guess: &[T],
    secret: &[T],
) -> Result<Feedback, FeedbackError> {
    if guess.len() != secret.len() {
        return Err(FeedbackError::InvalidLength {
            expected: secret.len(),
            actual: guess.len(),
        });
    }

    let mut exact = 0;
    let mut unmatched_guess = Vec::with_capacity(guess.len());
    let mut unmatched_secret = Vec::with_capacity(secret.len());

    for (g, s) in guess.iter().zip(secret) {
        if g == s {
            exact += 1;
        } else {
            unmatched_guess.push(g);
            unmatched_secret.push(Some(s));
        }
    }

    let mut misplaced = 0;
    for g in unmatched_guess {
        let slot = unmatched_secret
            .iter_mut()
            .find(|slot| matches!(slot, Some(s) if *s == g));
        if let Some(slot) = slot {
            *slot = None;
            misplaced += 1;
        }
    }

    Ok(Feedback { exact, misplaced })
}
