//! Serial connection to the console
//!
//! The console streams continuously on a 115200 8N1 line once it has seen
//! the four-byte handshake. The connection owns the port; decoding stays in
//! [`Gen7Decoder`], which this module only feeds. Read timeouts are part of
//! normal operation between display refreshes and are not errors.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use crate::core::{Error, Result, HANDSHAKE};
use crate::core::types::SerialConfig;
use crate::protocol::Gen7Decoder;

const READ_TIMEOUT: Duration = Duration::from_millis(100);
const READ_CHUNK: usize = 512;

/// An open serial line to a console
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
}

impl SerialConnection {
    /// Opens the port and sends the handshake that starts the stream.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let mut port = serialport::new(&config.device, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| Error::transport(format!("failed to open {}: {}", config.device, e)))?;

        port.write_all(&HANDSHAKE)
            .map_err(|e| Error::transport(format!("handshake write failed: {}", e)))?;
        info!(device = %config.device, baud = config.baud_rate, "console connection open");

        Ok(SerialConnection { port })
    }

    /// Reads one chunk from the port into the decoder.
    ///
    /// Returns the number of bytes fed; zero on a read timeout, which just
    /// means the console had nothing to say within the window.
    pub fn pump(&mut self, decoder: &mut Gen7Decoder) -> Result<usize> {
        let mut buf = [0u8; READ_CHUNK];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(0),
            Ok(n) => {
                decoder.feed(&buf[..n]);
                Ok(n)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Reads forever, feeding every chunk to the decoder. Returns only on a
    /// transport failure.
    pub fn run(&mut self, decoder: &mut Gen7Decoder) -> Result<()> {
        loop {
            if self.pump(decoder)? == 0 {
                debug!("read window elapsed with no data");
            }
        }
    }
}
