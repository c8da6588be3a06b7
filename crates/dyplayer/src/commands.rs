//! Command set and frame builder.
//!
//! [`Command`] is the closed set of operations the module understands. Each
//! variant carries already-typed parameters; [`Command::encode`] performs the
//! last range checks and produces the wire frame. Encoding is pure: nothing
//! here performs I/O.

use std::fmt;

use dyplayer_core::{Device, Equalizer, Error, FolderEntry, PlayMode, Result, Volume};

use crate::frame::encode_frame;

// ---------------------------------------------------------------
// Command codes
// ---------------------------------------------------------------

pub const CMD_QUERY_PLAY_STATE: u8 = 0x01;
pub const CMD_PLAY: u8 = 0x02;
pub const CMD_PAUSE: u8 = 0x03;
pub const CMD_STOP: u8 = 0x04;
pub const CMD_PREVIOUS: u8 = 0x05;
pub const CMD_NEXT: u8 = 0x06;
/// Play by track number. Data: u16 big-endian.
pub const CMD_PLAY_TRACK: u8 = 0x07;
/// Play by device and path. Data: device byte + encoded path.
pub const CMD_PLAY_PATH: u8 = 0x08;
/// Reply data is a bitmap of present devices.
pub const CMD_QUERY_ONLINE_DEVICES: u8 = 0x09;
pub const CMD_QUERY_PLAYING_DEVICE: u8 = 0x0A;
pub const CMD_SET_PLAYING_DEVICE: u8 = 0x0B;
pub const CMD_QUERY_TRACK_COUNT: u8 = 0x0C;
pub const CMD_QUERY_CURRENT_TRACK: u8 = 0x0D;
/// Previous folder, start at its last track.
pub const CMD_PREVIOUS_FOLDER_LAST: u8 = 0x0E;
/// Previous folder, start at its first track.
pub const CMD_PREVIOUS_FOLDER_FIRST: u8 = 0x0F;
/// Ends an interlude; stops playback if no interlude is active.
pub const CMD_STOP_INTERLUDE: u8 = 0x10;
pub const CMD_QUERY_FOLDER_FIRST_TRACK: u8 = 0x11;
pub const CMD_QUERY_FOLDER_TRACK_COUNT: u8 = 0x12;
pub const CMD_SET_VOLUME: u8 = 0x13;
pub const CMD_VOLUME_UP: u8 = 0x14;
pub const CMD_VOLUME_DOWN: u8 = 0x15;
/// Interlude by device and track number. Data: device, u16 big-endian.
pub const CMD_PLAY_INTERLUDE: u8 = 0x16;
pub const CMD_PLAY_INTERLUDE_PATH: u8 = 0x17;
pub const CMD_SET_PLAY_MODE: u8 = 0x18;
/// Repeat count for the repeat modes. Data: u16 big-endian.
pub const CMD_SET_CYCLE_TIMES: u8 = 0x19;
pub const CMD_SET_EQUALIZER: u8 = 0x1A;
/// Playlist of two-character file names from the `ZH` folder.
pub const CMD_COMBINATION_PLAY: u8 = 0x1B;
pub const CMD_END_COMBINATION_PLAY: u8 = 0x1C;
/// Cue a track by number without starting it.
pub const CMD_SELECT_TRACK: u8 = 0x1F;
/// Volume query. Only on firmware revisions with the extended command table.
pub const CMD_QUERY_VOLUME: u8 = 0x26;
/// Equalizer query. Only on firmware revisions with the extended command table.
pub const CMD_QUERY_EQUALIZER: u8 = 0x27;

/// Maximum directory levels in a [`TrackPath`].
const MAX_PATH_DIRS: usize = 2;
/// Maximum length of a directory name or file stem.
const MAX_NAME_LEN: usize = 8;
/// Maximum length of a file extension.
const MAX_EXT_LEN: usize = 3;
/// Names per combination playlist that still fit the length byte.
pub const MAX_COMBINATION_LEN: usize = 127;

// ---------------------------------------------------------------
// Parameter types
// ---------------------------------------------------------------

/// A validated file path on one of the module's storage devices.
///
/// Paths start at the root, may be nested at most two directories deep,
/// and use 8.3 names: e.g. `/00001.mp3` or `/ADS/MORNING/00002.MP3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackPath(String);

impl TrackPath {
    pub fn new(path: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidParameter(format!("path {path:?}: {reason}"));

        if !path.is_ascii() {
            return Err(invalid("must be ASCII"));
        }
        let Some(rest) = path.strip_prefix('/') else {
            return Err(invalid("must start with '/'"));
        };
        if path.contains('*') {
            return Err(invalid("'*' is reserved by the wire encoding"));
        }

        let mut parts: Vec<&str> = rest.split('/').collect();
        let file = parts.pop().unwrap_or_default();
        if parts.len() > MAX_PATH_DIRS {
            return Err(invalid("more than two directory levels"));
        }
        for dir in &parts {
            if dir.is_empty() || dir.len() > MAX_NAME_LEN || dir.contains('.') {
                return Err(invalid("directory names must be 1 to 8 characters without '.'"));
            }
        }

        let (stem, ext) = match file.split_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (file, None),
        };
        if stem.is_empty() || stem.len() > MAX_NAME_LEN {
            return Err(invalid("file name must be 1 to 8 characters"));
        }
        if let Some(ext) = ext {
            if ext.is_empty() || ext.len() > MAX_EXT_LEN || ext.contains('.') {
                return Err(invalid("extension must be 1 to 3 characters"));
            }
        }

        Ok(TrackPath(path.to_string()))
    }

    /// The path as given by the caller.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wire form of the path.
    ///
    /// The leading byte is kept as-is. After it, `.` becomes `*`, `/`
    /// becomes `*/` and letters are uppercased.
    ///
    /// ```
    /// use dyplayer::commands::TrackPath;
    ///
    /// let path = TrackPath::new("/ads/00001.mp3").unwrap();
    /// assert_eq!(path.encode(), b"/ADS*/00001*MP3".to_vec());
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let bytes = self.0.as_bytes();
        let mut out = Vec::with_capacity(bytes.len() + MAX_PATH_DIRS + 1);
        out.push(bytes[0]);
        for &b in &bytes[1..] {
            match b {
                b'.' => out.push(b'*'),
                b'/' => out.extend_from_slice(b"*/"),
                other => out.push(other.to_ascii_uppercase()),
            }
        }
        out
    }
}

impl fmt::Display for TrackPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A two-character sound name for combination play (`01` for `ZH/01.mp3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CombinationName([u8; 2]);

impl CombinationName {
    pub fn new(name: &str) -> Result<Self> {
        match name.as_bytes() {
            &[a, b] if a.is_ascii_alphanumeric() && b.is_ascii_alphanumeric() => {
                Ok(CombinationName([a.to_ascii_uppercase(), b.to_ascii_uppercase()]))
            }
            _ => Err(Error::InvalidParameter(format!(
                "combination name {name:?} must be exactly two ASCII letters or digits"
            ))),
        }
    }

    pub fn bytes(self) -> [u8; 2] {
        self.0
    }
}

// ---------------------------------------------------------------
// Commands
// ---------------------------------------------------------------

/// Every operation the module accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    QueryPlayState,
    Play,
    Pause,
    Stop,
    Previous,
    Next,
    /// Play a track by number, e.g. `1` for `00001.mp3`.
    PlayTrack(u16),
    /// Play a file by device and path.
    PlayPath { device: Device, path: TrackPath },
    QueryOnlineDevices,
    QueryPlayingDevice,
    SetPlayingDevice(Device),
    QueryTrackCount,
    QueryCurrentTrack,
    PreviousFolder(FolderEntry),
    StopInterlude,
    QueryFolderFirstTrack,
    QueryFolderTrackCount,
    SetVolume(Volume),
    VolumeUp,
    VolumeDown,
    /// Interrupt the current track with another one, then resume.
    PlayInterlude { device: Device, track: u16 },
    PlayInterludePath { device: Device, path: TrackPath },
    SetPlayMode(PlayMode),
    SetCycleTimes(u16),
    SetEqualizer(Equalizer),
    CombinationPlay(Vec<CombinationName>),
    EndCombinationPlay,
    /// Cue a track without playing it.
    SelectTrack(u16),
    QueryVolume,
    QueryEqualizer,
}

impl Command {
    /// Wire command code.
    pub fn code(&self) -> u8 {
        match self {
            Command::QueryPlayState => CMD_QUERY_PLAY_STATE,
            Command::Play => CMD_PLAY,
            Command::Pause => CMD_PAUSE,
            Command::Stop => CMD_STOP,
            Command::Previous => CMD_PREVIOUS,
            Command::Next => CMD_NEXT,
            Command::PlayTrack(_) => CMD_PLAY_TRACK,
            Command::PlayPath { .. } => CMD_PLAY_PATH,
            Command::QueryOnlineDevices => CMD_QUERY_ONLINE_DEVICES,
            Command::QueryPlayingDevice => CMD_QUERY_PLAYING_DEVICE,
            Command::SetPlayingDevice(_) => CMD_SET_PLAYING_DEVICE,
            Command::QueryTrackCount => CMD_QUERY_TRACK_COUNT,
            Command::QueryCurrentTrack => CMD_QUERY_CURRENT_TRACK,
            Command::PreviousFolder(FolderEntry::LastTrack) => CMD_PREVIOUS_FOLDER_LAST,
            Command::PreviousFolder(FolderEntry::FirstTrack) => CMD_PREVIOUS_FOLDER_FIRST,
            Command::StopInterlude => CMD_STOP_INTERLUDE,
            Command::QueryFolderFirstTrack => CMD_QUERY_FOLDER_FIRST_TRACK,
            Command::QueryFolderTrackCount => CMD_QUERY_FOLDER_TRACK_COUNT,
            Command::SetVolume(_) => CMD_SET_VOLUME,
            Command::VolumeUp => CMD_VOLUME_UP,
            Command::VolumeDown => CMD_VOLUME_DOWN,
            Command::PlayInterlude { .. } => CMD_PLAY_INTERLUDE,
            Command::PlayInterludePath { .. } => CMD_PLAY_INTERLUDE_PATH,
            Command::SetPlayMode(_) => CMD_SET_PLAY_MODE,
            Command::SetCycleTimes(_) => CMD_SET_CYCLE_TIMES,
            Command::SetEqualizer(_) => CMD_SET_EQUALIZER,
            Command::CombinationPlay(_) => CMD_COMBINATION_PLAY,
            Command::EndCombinationPlay => CMD_END_COMBINATION_PLAY,
            Command::SelectTrack(_) => CMD_SELECT_TRACK,
            Command::QueryVolume => CMD_QUERY_VOLUME,
            Command::QueryEqualizer => CMD_QUERY_EQUALIZER,
        }
    }

    /// Whether the module answers this command with a reply frame.
    ///
    /// Only queries are answered; control commands are fire-and-forget.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Command::QueryPlayState
                | Command::QueryOnlineDevices
                | Command::QueryPlayingDevice
                | Command::QueryTrackCount
                | Command::QueryCurrentTrack
                | Command::QueryFolderFirstTrack
                | Command::QueryFolderTrackCount
                | Command::QueryVolume
                | Command::QueryEqualizer
        )
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Command::QueryPlayState => "query-play-state",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::Previous => "previous",
            Command::Next => "next",
            Command::PlayTrack(_) => "play-track",
            Command::PlayPath { .. } => "play-path",
            Command::QueryOnlineDevices => "query-online-devices",
            Command::QueryPlayingDevice => "query-playing-device",
            Command::SetPlayingDevice(_) => "set-playing-device",
            Command::QueryTrackCount => "query-track-count",
            Command::QueryCurrentTrack => "query-current-track",
            Command::PreviousFolder(_) => "previous-folder",
            Command::StopInterlude => "stop-interlude",
            Command::QueryFolderFirstTrack => "query-folder-first-track",
            Command::QueryFolderTrackCount => "query-folder-track-count",
            Command::SetVolume(_) => "set-volume",
            Command::VolumeUp => "volume-up",
            Command::VolumeDown => "volume-down",
            Command::PlayInterlude { .. } => "play-interlude",
            Command::PlayInterludePath { .. } => "play-interlude-path",
            Command::SetPlayMode(_) => "set-play-mode",
            Command::SetCycleTimes(_) => "set-cycle-times",
            Command::SetEqualizer(_) => "set-equalizer",
            Command::CombinationPlay(_) => "combination-play",
            Command::EndCombinationPlay => "end-combination-play",
            Command::SelectTrack(_) => "select-track",
            Command::QueryVolume => "query-volume",
            Command::QueryEqualizer => "query-equalizer",
        }
    }

    /// Payload bytes, after validating parameters the types cannot rule out.
    pub fn payload(&self) -> Result<Vec<u8>> {
        let payload = match self {
            Command::PlayTrack(track) | Command::SelectTrack(track) => {
                track_bytes(*track)?.to_vec()
            }
            Command::PlayPath { device, path } | Command::PlayInterludePath { device, path } => {
                let mut payload = vec![device.to_byte()];
                payload.extend(path.encode());
                payload
            }
            Command::SetPlayingDevice(device) => vec![device.to_byte()],
            Command::SetVolume(volume) => vec![volume.level()],
            Command::PlayInterlude { device, track } => {
                let [hi, lo] = track_bytes(*track)?;
                vec![device.to_byte(), hi, lo]
            }
            Command::SetPlayMode(mode) => vec![mode.to_byte()],
            Command::SetCycleTimes(cycles) => cycles.to_be_bytes().to_vec(),
            Command::SetEqualizer(eq) => vec![eq.to_byte()],
            Command::CombinationPlay(names) => {
                if names.is_empty() {
                    return Err(Error::InvalidParameter(
                        "combination play needs at least one sound".into(),
                    ));
                }
                if names.len() > MAX_COMBINATION_LEN {
                    return Err(Error::InvalidParameter(format!(
                        "combination play takes at most {MAX_COMBINATION_LEN} sounds, got {}",
                        names.len()
                    )));
                }
                names.iter().flat_map(|n| n.bytes()).collect()
            }
            _ => Vec::new(),
        };
        Ok(payload)
    }

    /// Build the complete wire frame for this command.
    ///
    /// # Example
    ///
    /// ```
    /// use dyplayer::commands::Command;
    /// use dyplayer_core::Volume;
    ///
    /// let frame = Command::SetVolume(Volume::new(15).unwrap()).encode().unwrap();
    /// assert_eq!(frame, vec![0xAA, 0x13, 0x01, 0x0F, 0xCD]);
    /// ```
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_frame(self.code(), &self.payload()?)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Track numbers start at 1 (`00001.mp3`).
fn track_bytes(track: u16) -> Result<[u8; 2]> {
    if track == 0 {
        return Err(Error::InvalidParameter(
            "track numbers start at 1".into(),
        ));
    }
    Ok(track.to_be_bytes())
}
