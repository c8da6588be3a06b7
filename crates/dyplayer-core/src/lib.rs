//! dyplayer-core: Core traits, types, and error definitions for the
//! DY-series MP3 module driver.
//!
//! The protocol engine in the `dyplayer` crate and every transport
//! implementation depend on these types. Applications that only need to talk
//! about tracks, volumes and equalizer curves can depend on this crate alone.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Volume`], [`Equalizer`], [`PlayMode`], [`PlayState`], [`Device`] -- domain values
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod transport;
pub mod types;

pub use error::{Error, FrameError, ProtocolError, Result};
pub use transport::Transport;
pub use types::*;
