//! Application layer use cases for the IR box client.
//!
//! # What use cases does the client have?
//!
//! - **`commands`** – Runs one command and turns its outcome into a
//!   [`CommandReport`]: the success flag plus the message a user sees.
//!   `send_tx` first shapes the `tx()` arguments from a [`TxRequest`]
//!   according to the IR protocol family.
//!
//! - **`rx_watch`** – Puts the device into receive mode, collects captured
//!   codes, and always takes the device back out with `norx`.
//!
//! Use cases talk to the device through the [`IrDevice`] trait only.  The
//! real implementation is the TCP client in `infrastructure::network`; tests
//! substitute a scripted double.
//!
//! [`TxRequest`]: irbox_core::TxRequest

pub mod commands;
pub mod rx_watch;

use async_trait::async_trait;
use irbox_core::Command;

use crate::domain::{CommandOutcome, DeviceError};

pub use commands::{run_command, send_tx, CommandReport};
pub use rx_watch::{watch_rx, RxWatchLimits, RxWatchReport};

/// Anything that can carry IR box commands.
#[async_trait]
pub trait IrDevice: Send + Sync {
    /// Sends one command and waits for its outcome.
    async fn execute(&self, command: &Command) -> Result<CommandOutcome, DeviceError>;

    /// Waits for the next line the device sends on its own (an `rx`
    /// capture).  `None` when nothing arrived in time.
    async fn next_rx_message(&self) -> Option<String>;
}

#[cfg(test)]
pub(crate) mod test_support;
