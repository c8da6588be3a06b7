//! DyPlayerBuilder -- fluent builder for constructing [`DyPlayer`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! the serial port and timing before the transport is opened.
//!
//! # Example
//!
//! ```no_run
//! use dyplayer::DyPlayerBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> dyplayer_core::Result<()> {
//! let player = DyPlayerBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .command_timeout(Duration::from_millis(500))
//!     .build()
//!     .await?;
//! player.play().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use dyplayer_core::error::{Error, Result};
use dyplayer_core::transport::Transport;
use dyplayer_transport::{DEFAULT_BAUD_RATE, SerialTransport};

use crate::player::DyPlayer;

/// How long the module gets to start answering a query.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(1000);

/// Largest reply frame read from the module. Real replies are 5 or 6 bytes.
pub const DEFAULT_MAX_RESPONSE_LEN: usize = 16;

/// Largest reply the module sends: header, u16 payload, checksum.
pub const MAX_REPLY_LEN: usize = 6;

/// Fluent builder for [`DyPlayer`].
#[derive(Debug, Clone)]
pub struct DyPlayerBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    command_timeout: Duration,
    max_response_len: usize,
}

impl DyPlayerBuilder {
    pub fn new() -> Self {
        DyPlayerBuilder {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default: 9600, the only rate the modules use).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set how long to wait for a query reply (default: 1s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Cap on the number of bytes read for one reply (default: 16).
    pub fn max_response_len(mut self, len: usize) -> Self {
        self.max_response_len = len;
        self
    }

    /// Build a [`DyPlayer`] with a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `dyplayer-test-harness`) and for links other than a local serial port.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<DyPlayer> {
        if self.max_response_len < MAX_REPLY_LEN {
            return Err(Error::InvalidParameter(format!(
                "max_response_len must be at least {MAX_REPLY_LEN} bytes"
            )));
        }
        if self.command_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "command_timeout must be non-zero".into(),
            ));
        }

        Ok(DyPlayer::new(
            transport,
            self.command_timeout,
            self.max_response_len,
        ))
    }

    /// Build a [`DyPlayer`] using a serial transport.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<DyPlayer> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

impl Default for DyPlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
