//! Transport boundary between the console's serial line and the decoder

pub mod serial;

pub use serial::SerialConnection;
