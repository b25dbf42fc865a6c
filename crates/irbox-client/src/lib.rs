//! irbox-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does irbox-client do? (for beginners)
//!
//! The *IR box* is a small networked device that can transmit and capture
//! infrared remote-control codes.  It listens on a TCP port and speaks a
//! line-oriented text protocol: the client writes commands such as `nop` or
//! `tx(0x08,0x04,0x10)`, and the device answers each one with a single line
//! that starts with `+` on success.
//!
//! The client:
//!
//! 1. Opens the TCP connection (immediately, or lazily on the first command)
//!    and waits for the device's `+` greeting.
//! 2. Lets any number of tasks send commands concurrently.  Because the
//!    device's answers carry no request identifier, every answer is matched
//!    to the oldest outstanding request.
//! 3. Reconnects when the socket breaks, and reports timeouts as outcomes
//!    rather than errors.
//! 4. Collects codes the device captures in receive mode.

/// Domain layer: command outcomes, connection state, and errors.
pub mod domain;

/// Application layer: use cases behind the `IrDevice` trait.
pub mod application;

/// Infrastructure layer: TCP client and configuration file.
pub mod infrastructure;

pub use domain::{CommandOutcome, ConnectionCause, ConnectionState, DeviceError};
pub use infrastructure::network::{DeviceConfig, IrBoxClient};
