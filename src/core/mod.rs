//! Core types and constants for the Gen7 scoreboard decoder
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;

pub use self::error::{Error, Result};
pub use self::types::{
    Board, DecoderConfig, Digit, Heat, Lane, Meet, Module, ScoreboardEvent, ScoreboardState,
    SerialConfig, Sport, SwimEvent,
};

/// Number of display modules on a board
pub const MODULES_PER_BOARD: usize = 31;

/// Number of digit positions in a module
pub const DIGITS_PER_MODULE: usize = 31;

/// Maximum number of independently timed pools
pub const MAX_POOLS: usize = 4;

/// Lanes in a heat, always preallocated
pub const LANES_PER_HEAT: usize = 12;

/// Module index reserved for command blocks (carries no digits)
pub const COMMAND_MODULE: u8 = 31;

/// Digit value the console uses for a blank position
pub const BLANK_VALUE: u8 = 15;

/// Alternate blank sentinel (a zero value byte is normalized to this)
pub const BLANK_VALUE_ALT: u8 = 32;

/// Bytes written to the console once when the connection opens
pub const HANDSHAKE: [u8; 4] = [0x80, 0x1F, 0x0F, 0x02];

/// Returns true for either of the two blank digit sentinels.
pub fn is_blank_value(value: u8) -> bool {
    value == BLANK_VALUE || value == BLANK_VALUE_ALT
}
