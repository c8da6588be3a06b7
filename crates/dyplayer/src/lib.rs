//! Driver for DY-series UART MP3 playback modules (DY-SV17F, DY-SV5W,
//! DY-HV20T and relatives).
//!
//! This crate implements the modules' binary command protocol. It provides:
//!
//! - **Frame codec** ([`frame`]) -- encode and validate `0xAA`-framed packets
//!   with their additive checksum.
//! - **Commands** ([`commands`]) -- the closed command set with typed
//!   parameters, including 8.3 path encoding for play-by-path.
//! - **Replies** ([`response`]) -- decode query replies into typed values.
//! - **Device state** ([`state`]) -- last-known module state, separating
//!   values implied by commands from values the module reported.
//! - **DyPlayer** ([`player`]) -- the command façade tying the codec to a
//!   [`Transport`](dyplayer_core::Transport).
//! - **DyPlayerBuilder** ([`builder`]) -- fluent builder for `DyPlayer`.
//!
//! # Example
//!
//! ```
//! use dyplayer::commands::Command;
//! use dyplayer::response::{Response, parse};
//! use dyplayer_core::{PlayState, Volume};
//!
//! // Set volume 15
//! let cmd = Command::SetVolume(Volume::new(15).unwrap());
//! assert_eq!(cmd.encode().unwrap(), vec![0xAA, 0x13, 0x01, 0x0F, 0xCD]);
//!
//! // The module answers a play-state query with "playing"
//! let reply = parse(&[0xAA, 0x01, 0x01, 0x01, 0xAD]).unwrap();
//! assert_eq!(reply, Response::PlayState(PlayState::Playing));
//! ```

pub mod builder;
pub mod commands;
pub mod frame;
pub mod player;
pub mod response;
pub mod state;

pub use builder::DyPlayerBuilder;
pub use commands::{CombinationName, Command, TrackPath};
pub use player::DyPlayer;
pub use response::Response;
pub use state::{ConnectionState, DeviceState, Tracked};

pub use dyplayer_core::{
    Device, Equalizer, Error, FolderEntry, FrameError, OnlineDevices, PlayMode, PlayState,
    ProtocolError, Result, TrackRef, Transport, Volume,
};
