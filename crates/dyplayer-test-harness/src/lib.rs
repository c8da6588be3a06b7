//! dyplayer-test-harness: Test utilities for the DY-series MP3 module driver.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the protocol engine without a module attached.

pub mod mock_serial;

pub use mock_serial::MockTransport;
