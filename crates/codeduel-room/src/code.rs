//! Room code generation.

use codeduel_protocol::RoomCode;
use rand::Rng;

/// Generates a random [`RoomCode`].
///
/// 36^6 (about 2.2 billion) codes, so collisions among live rooms are rare
/// but possible. [`RoomStore`](crate::RoomStore) retries on collision.
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    let alphabet = RoomCode::ALPHABET;
    let code: String = (0..RoomCode::LEN)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect();
    RoomCode::new(code)
}
