//! gen7scbd: decoder for the Colorado Time Systems Gen7 scoreboard protocol
//!
//! This library turns the scrambled byte stream a Gen7 timing console emits
//! over its RS-485 serial link into structured scoreboard state: a per-pool
//! grid of display modules and digits, swim-meet metadata (meet/event/heat
//! titles and swimmer rosters), and a stream of state-change events
//! (start, reset, blank, event/heat changes).
//!
//! Feed raw bytes to [`Gen7Decoder::feed`] as they arrive; subscribe to
//! decoded events with [`Gen7Decoder::subscribe`] before decoding starts.
//! [`transport::SerialConnection`] handles the serial link itself, including
//! the console handshake.

pub mod core;
pub mod protocol;
pub mod transport;

// Re-export commonly used items
pub use self::core::{Error, Result};
pub use self::core::types::{
    Board, DecoderConfig, Heat, Lane, Meet, ScoreboardEvent, ScoreboardState, SerialConfig, Sport,
    SwimEvent,
};
pub use protocol::decoder::Gen7Decoder;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
