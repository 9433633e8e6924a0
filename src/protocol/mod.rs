//! Gen7 wire protocol decoding
//!
//! The console stream is processed in three layers: the [`descrambler`]
//! undoes the keyed byte transform applied on the wire, the [`framer`]
//! reassembles length-delimited checksummed frames from the descrambled
//! bytes, and the [`decoder`] applies validated frames to the digit grid,
//! routing command blocks to the [`command`] interpreter. [`format`] holds
//! the read-only helpers that render the grid as display strings.

pub mod command;
pub mod decoder;
pub mod descrambler;
pub mod format;
pub(crate) mod framer;

pub use self::decoder::Gen7Decoder;
pub use self::descrambler::Descrambler;
