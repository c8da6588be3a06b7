//! Reply interpretation.
//!
//! Only queries are answered by the module. A reply echoes the query's
//! command code and carries either one byte (state, volume, equalizer,
//! device) or a big-endian u16 (track numbers and counts).

use dyplayer_core::{
    Device, Equalizer, FrameError, OnlineDevices, PlayState, ProtocolError, Volume,
};

use crate::commands::{
    CMD_QUERY_CURRENT_TRACK, CMD_QUERY_EQUALIZER, CMD_QUERY_FOLDER_FIRST_TRACK,
    CMD_QUERY_FOLDER_TRACK_COUNT, CMD_QUERY_ONLINE_DEVICES, CMD_QUERY_PLAY_STATE,
    CMD_QUERY_PLAYING_DEVICE, CMD_QUERY_TRACK_COUNT, CMD_QUERY_VOLUME,
};
use crate::frame::{Frame, decode_frame};

/// Device byte meaning "nothing is playing from any device".
const NO_DEVICE: u8 = 0xFF;

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    PlayState(PlayState),
    Volume(Volume),
    Equalizer(Equalizer),
    /// `None` when the module reports no active device.
    PlayingDevice(Option<Device>),
    OnlineDevices(OnlineDevices),
    TrackCount(u16),
    CurrentTrack(u16),
    FolderFirstTrack(u16),
    FolderTrackCount(u16),
}

impl Response {
    /// Interpret a validated frame.
    pub fn from_frame(frame: &Frame) -> Result<Response, ProtocolError> {
        let code = frame.cmd;
        let invalid = |value: u8| ProtocolError::InvalidValue { code, value };

        let response = match code {
            CMD_QUERY_PLAY_STATE => {
                let b = single_byte(frame)?;
                Response::PlayState(PlayState::from_byte(b).ok_or_else(|| invalid(b))?)
            }
            CMD_QUERY_VOLUME => {
                let b = single_byte(frame)?;
                Response::Volume(Volume::try_from(b).map_err(|_| invalid(b))?)
            }
            CMD_QUERY_EQUALIZER => {
                let b = single_byte(frame)?;
                Response::Equalizer(Equalizer::from_byte(b).ok_or_else(|| invalid(b))?)
            }
            CMD_QUERY_PLAYING_DEVICE => match single_byte(frame)? {
                NO_DEVICE => Response::PlayingDevice(None),
                b => Response::PlayingDevice(Some(
                    Device::from_byte(b).ok_or_else(|| invalid(b))?,
                )),
            },
            CMD_QUERY_ONLINE_DEVICES => {
                Response::OnlineDevices(OnlineDevices::from_bits(single_byte(frame)?))
            }
            CMD_QUERY_TRACK_COUNT => Response::TrackCount(word(frame)?),
            CMD_QUERY_CURRENT_TRACK => Response::CurrentTrack(word(frame)?),
            CMD_QUERY_FOLDER_FIRST_TRACK => Response::FolderFirstTrack(word(frame)?),
            CMD_QUERY_FOLDER_TRACK_COUNT => Response::FolderTrackCount(word(frame)?),
            other => return Err(ProtocolError::UnknownResponseCode(other)),
        };
        Ok(response)
    }

    /// Command code of the query this reply answers.
    pub fn code(&self) -> u8 {
        match self {
            Response::PlayState(_) => CMD_QUERY_PLAY_STATE,
            Response::Volume(_) => CMD_QUERY_VOLUME,
            Response::Equalizer(_) => CMD_QUERY_EQUALIZER,
            Response::PlayingDevice(_) => CMD_QUERY_PLAYING_DEVICE,
            Response::OnlineDevices(_) => CMD_QUERY_ONLINE_DEVICES,
            Response::TrackCount(_) => CMD_QUERY_TRACK_COUNT,
            Response::CurrentTrack(_) => CMD_QUERY_CURRENT_TRACK,
            Response::FolderFirstTrack(_) => CMD_QUERY_FOLDER_FIRST_TRACK,
            Response::FolderTrackCount(_) => CMD_QUERY_FOLDER_TRACK_COUNT,
        }
    }
}

/// Validate `buf` as one complete reply frame and interpret it.
///
/// # Example
///
/// ```
/// use dyplayer::response::{Response, parse};
/// use dyplayer_core::PlayState;
///
/// let reply = parse(&[0xAA, 0x01, 0x01, 0x01, 0xAD]).unwrap();
/// assert_eq!(reply, Response::PlayState(PlayState::Playing));
/// ```
pub fn parse(buf: &[u8]) -> Result<Response, ProtocolError> {
    let frame = decode_frame(buf)?;
    Response::from_frame(&frame)
}

fn single_byte(frame: &Frame) -> Result<u8, FrameError> {
    match frame.payload.as_slice() {
        &[b] => Ok(b),
        other => Err(FrameError::LengthMismatch {
            declared: 1,
            actual: other.len(),
        }),
    }
}

fn word(frame: &Frame) -> Result<u16, FrameError> {
    match frame.payload.as_slice() {
        &[hi, lo] => Ok(u16::from_be_bytes([hi, lo])),
        other => Err(FrameError::LengthMismatch {
            declared: 2,
            actual: other.len(),
        }),
    }
}
