//! Domain types shared by the client's application and infrastructure layers.
//!
//! - **`outcome`** – what a single command produced: an accepted or rejected
//!   response line, or one of the two timeout results.
//! - **`error`** – failures that prevent a command from being attempted at
//!   all (no device reachable, malformed arguments, broken transport).
//!
//! A timeout is deliberately *not* an error: the device may simply be slow,
//! and the caller decides what a missing answer means.

pub mod error;
pub mod outcome;

pub use error::{ConnectionCause, DeviceError};
pub use outcome::{CommandOutcome, ConnectionState};
