//! Command-line arguments.

use clap::{ArgAction, Parser, ValueEnum};
use codeduel::DEFAULT_BIND_ADDR;
use codeduel::prelude::RoomConfig;

/// Real-time code-breaking duel server.
#[derive(Debug, Parser)]
#[command(name = "codeduel-server", version, about)]
pub struct Cli {
    /// Address to listen on for WebSocket connections.
    #[arg(long, default_value = DEFAULT_BIND_ADDR, env = "CODEDUEL_BIND")]
    pub bind: String,

    /// Maximum guests per room (host not counted). Unlimited when unset.
    #[arg(long, env = "CODEDUEL_MAX_GUESTS")]
    pub max_guests: Option<usize>,

    /// Log output format.
    #[arg(long, value_enum, default_value = "human", env = "CODEDUEL_LOG_FORMAT")]
    pub log_format: LogFormatArg,

    /// Increase verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Room settings derived from the flags.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            max_guests: self.max_guests,
            ..RoomConfig::default()
        }
    }
}

/// `--log-format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Human,
    Json,
}
