//! Wire protocol for Codeduel.
//!
//! This crate defines the "language" that duel clients and the server speak:
//!
//! - **Types** ([`Mode`], [`Symbol`], [`Feedback`], [`RoomCode`],
//!   [`PlayerId`]): the values both ends must agree on.
//! - **Messages** ([`ClientEnvelope`], [`ServerEnvelope`], [`RoomEvent`],
//!   etc.): requests, replies, and room pushes.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong encoding/decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEnvelope) → Gateway → Room
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    ClientEnvelope, ClientRequest, ErrorKind, ErrorReply, PlayerSummary,
    Reply, ReplyBody, RoomEvent, RoomSnapshot, RoomStatus, ServerEnvelope,
    ServerPayload,
};
pub use types::{Feedback, Mode, PlayerId, Recipient, RoomCode, Symbol};
