//! DY-series frame encoder/decoder.
//!
//! Commands and replies share one binary layout. This module handles the
//! pure byte-level encoding and validation of that layout; it knows nothing
//! about what individual command codes mean.
//!
//! # Frame format
//!
//! ```text
//! 0xAA <cmd> <len> [<payload>...] <sum>
//! ```
//!
//! - `0xAA`: start marker
//! - `cmd`: command code (replies echo the code of the query they answer)
//! - `len`: number of payload bytes
//! - `payload`: `len` bytes, multi-byte numbers big-endian
//! - `sum`: low byte of the sum of every preceding byte

use bytes::{BufMut, BytesMut};
use dyplayer_core::{Error, FrameError, Result};

/// Start marker opening every frame.
pub const START: u8 = 0xAA;

/// Bytes before the payload: start marker, command code, length.
pub const HEADER_LEN: usize = 3;

/// Smallest possible frame: header plus checksum, empty payload.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + 1;

/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// A validated frame.
///
/// Only produced by [`decode_frame`] after the start marker, length and
/// checksum have all been checked, or built directly by callers who are
/// about to encode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command code.
    pub cmd: u8,
    /// Payload bytes (may be empty).
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(cmd: u8, payload: Vec<u8>) -> Self {
        Frame { cmd, payload }
    }

    /// Encode this frame into wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_frame(self.cmd, &self.payload)
    }
}

/// Low byte of the sum of `bytes`.
///
/// # Example
///
/// ```
/// use dyplayer::frame::checksum;
///
/// assert_eq!(checksum(&[0xAA, 0x02, 0x00]), 0xAC);
/// assert_eq!(checksum(&[0xAA, 0x13, 0x01, 0x0F]), 0xCD);
/// ```
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Encode a command code and payload into a complete frame.
///
/// Fails with [`Error::InvalidParameter`] only if the payload does not fit
/// the one-byte length field.
///
/// # Example
///
/// ```
/// use dyplayer::frame::encode_frame;
///
/// // Play
/// assert_eq!(encode_frame(0x02, &[]).unwrap(), vec![0xAA, 0x02, 0x00, 0xAC]);
/// ```
pub fn encode_frame(cmd: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::InvalidParameter(format!(
            "payload of {} bytes exceeds the {MAX_PAYLOAD_LEN}-byte frame limit",
            payload.len()
        )));
    }

    let mut buf = BytesMut::with_capacity(MIN_FRAME_LEN + payload.len());
    buf.put_u8(START);
    buf.put_u8(cmd);
    buf.put_u8(payload.len() as u8);
    buf.put_slice(payload);
    let sum = checksum(&buf);
    buf.put_u8(sum);
    Ok(buf.to_vec())
}

/// Total frame size implied by a header, or `None` if `header` is too short
/// to contain the length byte.
pub fn frame_len(header: &[u8]) -> Option<usize> {
    header
        .get(HEADER_LEN - 1)
        .map(|&len| MIN_FRAME_LEN + len as usize)
}

/// Validate `buf` as exactly one frame and return it.
///
/// Checks, in order: enough bytes for a header, the start marker, that the
/// buffer holds exactly `len` payload bytes plus checksum, and the checksum.
///
/// # Example
///
/// ```
/// use dyplayer::frame::decode_frame;
///
/// // Play-state reply: playing
/// let frame = decode_frame(&[0xAA, 0x01, 0x01, 0x01, 0xAD]).unwrap();
/// assert_eq!(frame.cmd, 0x01);
/// assert_eq!(frame.payload, vec![0x01]);
/// ```
pub fn decode_frame(buf: &[u8]) -> std::result::Result<Frame, FrameError> {
    let Some(&first) = buf.first() else {
        return Err(FrameError::Truncated {
            needed: MIN_FRAME_LEN,
            actual: 0,
        });
    };
    if first != START {
        return Err(FrameError::BadStart(first));
    }

    let Some(total) = frame_len(buf) else {
        return Err(FrameError::Truncated {
            needed: MIN_FRAME_LEN,
            actual: buf.len(),
        });
    };
    if buf.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            actual: buf.len(),
        });
    }
    if buf.len() > total {
        return Err(FrameError::LengthMismatch {
            declared: total - MIN_FRAME_LEN,
            actual: buf.len() - MIN_FRAME_LEN,
        });
    }

    let (body, trailer) = buf.split_at(total - 1);
    let expected = checksum(body);
    if expected != trailer[0] {
        return Err(FrameError::ChecksumMismatch {
            expected,
            actual: trailer[0],
        });
    }

    Ok(Frame {
        cmd: buf[1],
        payload: body[HEADER_LEN..].to_vec(),
    })
}
