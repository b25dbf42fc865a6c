//! Infrastructure layer for the IR box client.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain`,
//! and `irbox_core`, but MUST NOT be imported by the `application` or domain
//! layers.
//!
//! # Sub-modules
//!
//! - **`network`** – TCP client that connects to the IR box, completes the
//!   `+` greeting, frames commands, matches response lines to callers in
//!   FIFO order, and reconnects when the socket breaks.
//!
//! - **`config`** – TOML configuration file: device endpoint, timeouts,
//!   log level, and the remote-control catalogue.

pub mod config;
pub mod network;
