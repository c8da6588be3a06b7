//! Transport trait for module communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a DY-series
//! module. The driver never opens, configures or closes a serial port on its
//! own; it is handed a `Transport` and only moves bytes through it. This
//! allows real hardware control via `SerialTransport` and deterministic unit
//! testing with `MockTransport` from the `dyplayer-test-harness` crate.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

/// Asynchronous byte-level transport to a module.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the module.
    ///
    /// Implementations should not return until all bytes have been handed
    /// to the underlying link.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the module into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`] if nothing is received
    /// within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Read exactly `n` bytes, or as many as arrive before `timeout` elapses.
    ///
    /// The deadline covers the whole read, not each chunk. A short vector is
    /// returned when the deadline passes first; callers decide whether a
    /// partial read is a truncated frame or no answer at all. Errors other
    /// than [`Error::Timeout`] are propagated.
    async fn receive_exact(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut out = vec![0u8; n];
        let mut filled = 0;

        while filled < n {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.receive(&mut out[filled..], remaining).await {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(Error::Timeout) => break,
                Err(e) => return Err(e),
            }
        }

        out.truncate(filled);
        Ok(out)
    }

    /// Discard any bytes already waiting in the receive buffer.
    ///
    /// Called before each command so a late reply to an earlier command
    /// cannot be mistaken for the next one. The default does nothing.
    async fn clear_input(&mut self) -> Result<()> {
        Ok(())
    }

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`].
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
