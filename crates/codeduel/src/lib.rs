//! # Codeduel
//!
//! Real-time code-breaking duels over WebSocket.
//!
//! A host opens a room and commits a hidden sequence of symbols; guests
//! join by room code and race to crack it, each guess scored with exact and
//! misplaced counts. Every room runs as its own actor, so rooms never wait
//! on each other.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codeduel::prelude::*;
//!
//! # async fn run() -> Result<(), CodeduelError> {
//! let server = CodeduelServer::builder()
//!     .bind("0.0.0.0:3001")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::CodeduelError;
pub use server::{CodeduelServer, CodeduelServerBuilder, DEFAULT_BIND_ADDR};

/// Everything needed to run a server or write a client against it.
pub mod prelude {
    pub use crate::{
        CodeduelError, CodeduelServer, CodeduelServerBuilder,
        DEFAULT_BIND_ADDR,
    };
    pub use codeduel_protocol::{
        ClientEnvelope, ClientRequest, Codec, ErrorKind, ErrorReply,
        Feedback, JsonCodec, Mode, PlayerId, PlayerSummary, Reply, ReplyBody,
        RoomCode, RoomEvent, RoomSnapshot, RoomStatus, ServerEnvelope,
        ServerPayload, Symbol,
    };
    pub use codeduel_room::{RoomConfig, RoomError};
}
