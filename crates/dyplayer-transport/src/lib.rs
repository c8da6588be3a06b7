//! Transport implementations for the DY-series MP3 module driver.
//!
//! This crate provides [`SerialTransport`], the concrete
//! [`Transport`](dyplayer_core::Transport) used to reach a module over a
//! UART or USB-serial adapter.
//!
//! # Example
//!
//! ```no_run
//! use dyplayer_transport::SerialTransport;
//! use dyplayer_core::transport::Transport;
//!
//! # async fn example() -> dyplayer_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//! transport.send(&[0xAA, 0x02, 0x00, 0xAC]).await?; // play
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{
    DEFAULT_BAUD_RATE, DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits,
};
