//! # irbox-core
//!
//! Shared library for the IR box client containing the text wire protocol,
//! the CRLF line codec, and the domain types used to shape `tx()` commands.
//!
//! It has zero dependencies on sockets, async runtimes, or the file system.
//!
//! # Architecture overview (for beginners)
//!
//! The IR box is a small network appliance that blasts infrared codes on
//! request.  A controller talks to it over a persistent TCP connection using
//! one ASCII command per line (`nop`, `rx`, `tx(0x08,0x04,0x10)`, ...) and the
//! box answers every command, in order, with one line of its own.  A line that
//! starts with `+` means success; anything else is an error message.
//!
//! This crate (`irbox-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How commands and responses travel over the wire: the
//!   [`Command`] enum and its encoding, the CRLF line decoder, response
//!   classification, and the wrapping sequence counter used for bookkeeping.
//!
//! - **`domain`** – Pure rules with no I/O: the Arduino-IRremote protocol
//!   table and the protocol-aware builder that turns a protocol, address,
//!   command, bit count, and repeat count into `tx()` arguments.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `irbox_core::Command` instead of `irbox_core::protocol::command::Command`.
pub use domain::ir_protocol::IrProtocol;
pub use domain::tx_request::{TxRequest, TxRequestError};
pub use protocol::codec::{decode_line, encode_line, LineDecoder, ProtocolError};
pub use protocol::command::Command;
pub use protocol::response::Response;
pub use protocol::sequence::SequenceCounter;
