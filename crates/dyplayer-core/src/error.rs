//! Error types for the DY-series driver.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Parameter validation, transport failures
//! and malformed replies from the module are all captured here.

/// The error type for all driver operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open/write/read failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// The module sent bytes that could not be turned into a response.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Timed out waiting for a reply from the module.
    ///
    /// No byte at all arrived before the deadline. This usually means the
    /// module is unpowered, the baud rate is wrong, or TX/RX are swapped.
    #[error("timeout waiting for response")]
    Timeout,

    /// A caller-supplied value is outside the range the module accepts.
    ///
    /// Always detected before any bytes are written.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No usable link to the module.
    #[error("not connected")]
    NotConnected,

    /// The link to the module was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this error means the physical link can no longer
    /// be trusted.
    ///
    /// A [`Timeout`](Error::Timeout) is not a link failure: the module may
    /// simply not answer a command its firmware does not implement.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::NotConnected | Error::ConnectionLost | Error::Io(_)
        )
    }
}

impl From<FrameError> for Error {
    fn from(err: FrameError) -> Self {
        Error::Protocol(ProtocolError::Frame(err))
    }
}

/// A well-delimited reply that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The bytes do not form a valid frame.
    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    /// The frame is valid but its command code is not a known reply.
    #[error("unknown response code: 0x{0:02X}")]
    UnknownResponseCode(u8),

    /// The module answered a different query than the one issued.
    #[error("unexpected response: expected code 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedResponse {
        /// Code of the query that was sent.
        expected: u8,
        /// Code carried by the reply.
        actual: u8,
    },

    /// A known reply carried a value outside its enumeration.
    #[error("invalid value 0x{value:02X} in response 0x{code:02X}")]
    InvalidValue {
        /// Reply command code.
        code: u8,
        /// Offending payload byte.
        value: u8,
    },
}

/// Framing failures detected while validating received bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The first byte is not the start marker.
    #[error("bad start byte 0x{0:02X}")]
    BadStart(u8),

    /// The declared payload length does not match the bytes present.
    #[error("length mismatch: declared {declared} payload bytes, found {actual}")]
    LengthMismatch {
        /// Payload length according to the length byte (or the reply type).
        declared: usize,
        /// Payload bytes actually present.
        actual: usize,
    },

    /// The trailing checksum byte does not match the computed sum.
    #[error("checksum mismatch: computed 0x{expected:02X}, frame carries 0x{actual:02X}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u8,
        /// Checksum byte carried by the frame.
        actual: u8,
    },

    /// The buffer ends before the frame does.
    #[error("truncated frame: need {needed} bytes, got {actual}")]
    Truncated {
        /// Minimum number of bytes required.
        needed: usize,
        /// Number of bytes available.
        actual: usize,
    },
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
