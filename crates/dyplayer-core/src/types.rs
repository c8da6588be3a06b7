//! Domain types shared by the protocol engine and its callers.
//!
//! Every enumeration here maps one-to-one onto a byte value defined by the
//! DY-series firmware. Conversions in both directions live next to the type
//! so the protocol crate never hard-codes these numbers twice.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Highest volume step accepted by the module.
pub const MAX_VOLUME: u8 = 30;

/// Volume the module starts with after power-up.
pub const DEFAULT_VOLUME: u8 = 20;

/// Error returned when a string cannot be parsed into one of the enums in
/// this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseValueError {
    kind: &'static str,
    value: String,
}

impl fmt::Display for ParseValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseValueError {}

fn parse_error(kind: &'static str, value: &str) -> ParseValueError {
    ParseValueError {
        kind,
        value: value.to_string(),
    }
}

/// Storage device holding the sound files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    /// USB mass-storage device.
    Usb,
    /// Micro SD card.
    Sd,
    /// On-board SPI flash.
    Flash,
}

impl Device {
    /// Byte sent on the wire when this device is named in a command.
    pub fn to_byte(self) -> u8 {
        match self {
            Device::Usb => 0x00,
            Device::Sd => 0x01,
            Device::Flash => 0x02,
        }
    }

    /// Decode a device byte. `0xFF` (no device) and unknown values yield `None`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Device::Usb),
            0x01 => Some(Device::Sd),
            0x02 => Some(Device::Flash),
            _ => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Device::Usb => "USB",
            Device::Sd => "SD",
            Device::Flash => "FLASH",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Device {
    type Err = ParseValueError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USB" => Ok(Device::Usb),
            "SD" => Ok(Device::Sd),
            "FLASH" => Ok(Device::Flash),
            _ => Err(parse_error("device", s)),
        }
    }
}

/// Set of storage devices currently present, as reported by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OnlineDevices(u8);

impl OnlineDevices {
    /// Wrap the raw bitmap returned by the module (bit 0 USB, bit 1 SD,
    /// bit 2 flash).
    pub fn from_bits(bits: u8) -> Self {
        OnlineDevices(bits)
    }

    /// Raw bitmap.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether the given device is present.
    pub fn contains(self, device: Device) -> bool {
        self.0 & (1 << device.to_byte()) != 0
    }

    /// Present devices in wire order.
    pub fn devices(self) -> Vec<Device> {
        [Device::Usb, Device::Sd, Device::Flash]
            .into_iter()
            .filter(|d| self.contains(*d))
            .collect()
    }
}

/// Playback status reported by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

impl PlayState {
    pub fn to_byte(self) -> u8 {
        match self {
            PlayState::Stopped => 0x00,
            PlayState::Playing => 0x01,
            PlayState::Paused => 0x02,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(PlayState::Stopped),
            0x01 => Some(PlayState::Playing),
            0x02 => Some(PlayState::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayState::Stopped => "stopped",
            PlayState::Playing => "playing",
            PlayState::Paused => "paused",
        };
        write!(f, "{s}")
    }
}

/// Equalizer curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Equalizer {
    Normal,
    Pop,
    Rock,
    Jazz,
    Classic,
    Bass,
}

impl Equalizer {
    pub fn to_byte(self) -> u8 {
        match self {
            Equalizer::Normal => 0x00,
            Equalizer::Pop => 0x01,
            Equalizer::Rock => 0x02,
            Equalizer::Jazz => 0x03,
            Equalizer::Classic => 0x04,
            Equalizer::Bass => 0x05,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Equalizer::Normal),
            0x01 => Some(Equalizer::Pop),
            0x02 => Some(Equalizer::Rock),
            0x03 => Some(Equalizer::Jazz),
            0x04 => Some(Equalizer::Classic),
            0x05 => Some(Equalizer::Bass),
            _ => None,
        }
    }
}

impl fmt::Display for Equalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Equalizer::Normal => "normal",
            Equalizer::Pop => "pop",
            Equalizer::Rock => "rock",
            Equalizer::Jazz => "jazz",
            Equalizer::Classic => "classic",
            Equalizer::Bass => "bass",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Equalizer {
    type Err = ParseValueError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Equalizer::Normal),
            "pop" => Ok(Equalizer::Pop),
            "rock" => Ok(Equalizer::Rock),
            "jazz" => Ok(Equalizer::Jazz),
            "classic" | "classical" => Ok(Equalizer::Classic),
            "bass" => Ok(Equalizer::Bass),
            _ => Err(parse_error("equalizer", s)),
        }
    }
}

/// Track-advance behaviour ("cycle mode" in the module documentation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayMode {
    /// Play every track in order, then start over.
    RepeatAll,
    /// Repeat the current track.
    RepeatOne,
    /// Play the current track once and stop.
    OneOff,
    /// Play tracks in random order.
    Random,
    /// Repeat the current folder.
    RepeatFolder,
    /// Random order within the current folder.
    RandomFolder,
    /// Play the current folder in order, then stop.
    SequenceFolder,
    /// Play every track in order, then stop.
    Sequence,
}

impl PlayMode {
    pub fn to_byte(self) -> u8 {
        match self {
            PlayMode::RepeatAll => 0x00,
            PlayMode::RepeatOne => 0x01,
            PlayMode::OneOff => 0x02,
            PlayMode::Random => 0x03,
            PlayMode::RepeatFolder => 0x04,
            PlayMode::RandomFolder => 0x05,
            PlayMode::SequenceFolder => 0x06,
            PlayMode::Sequence => 0x07,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(PlayMode::RepeatAll),
            0x01 => Some(PlayMode::RepeatOne),
            0x02 => Some(PlayMode::OneOff),
            0x03 => Some(PlayMode::Random),
            0x04 => Some(PlayMode::RepeatFolder),
            0x05 => Some(PlayMode::RandomFolder),
            0x06 => Some(PlayMode::SequenceFolder),
            0x07 => Some(PlayMode::Sequence),
            _ => None,
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayMode::RepeatAll => "repeat-all",
            PlayMode::RepeatOne => "repeat-one",
            PlayMode::OneOff => "one-off",
            PlayMode::Random => "random",
            PlayMode::RepeatFolder => "repeat-folder",
            PlayMode::RandomFolder => "random-folder",
            PlayMode::SequenceFolder => "sequence-folder",
            PlayMode::Sequence => "sequence",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PlayMode {
    type Err = ParseValueError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "repeat-all" | "repeat" => Ok(PlayMode::RepeatAll),
            "repeat-one" => Ok(PlayMode::RepeatOne),
            "one-off" => Ok(PlayMode::OneOff),
            "random" => Ok(PlayMode::Random),
            "repeat-folder" => Ok(PlayMode::RepeatFolder),
            "random-folder" => Ok(PlayMode::RandomFolder),
            "sequence-folder" => Ok(PlayMode::SequenceFolder),
            "sequence" => Ok(PlayMode::Sequence),
            _ => Err(parse_error("play mode", s)),
        }
    }
}

/// Which track to start when stepping back one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderEntry {
    FirstTrack,
    LastTrack,
}

/// A volume step in `0..=30`.
///
/// Only constructible through [`Volume::new`], so a `Volume` held anywhere
/// in the driver is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    /// Silence.
    pub const MIN: Volume = Volume(0);

    /// Loudest setting.
    pub const MAX: Volume = Volume(MAX_VOLUME);

    /// Validate a volume level.
    ///
    /// Accepts a signed value so that negative input is rejected rather
    /// than wrapped.
    pub fn new(level: i32) -> Result<Self> {
        if (0..=i32::from(MAX_VOLUME)).contains(&level) {
            Ok(Volume(level as u8))
        } else {
            Err(Error::InvalidParameter(format!(
                "volume {level} out of range 0..={MAX_VOLUME}"
            )))
        }
    }

    /// Raw level.
    pub fn level(self) -> u8 {
        self.0
    }

    /// One step louder, saturating at [`Volume::MAX`].
    pub fn step_up(self) -> Self {
        Volume((self.0 + 1).min(MAX_VOLUME))
    }

    /// One step quieter, saturating at [`Volume::MIN`].
    pub fn step_down(self) -> Self {
        Volume(self.0.saturating_sub(1))
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume(DEFAULT_VOLUME)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Volume {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self> {
        Volume::new(i32::from(level))
    }
}

/// Reference to the track the module is (believed to be) on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackRef {
    /// Track number, e.g. `1` for `00001.mp3`.
    Index(u16),
    /// Device and file path as given by the caller.
    Path { device: Device, path: String },
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackRef::Index(n) => write!(f, "#{n}"),
            TrackRef::Path { device, path } => write!(f, "{device}:{path}"),
        }
    }
}
