//! TCP client for the IR box line protocol.
//!
//! Architecture:
//! - [`IrBoxClient`] owns the write half of the socket (behind an async
//!   mutex) and the public command API.
//! - A background reader task owns the read half, splits the byte stream
//!   into lines, and resolves ledger entries in FIFO order.
//! - The ledger pairs every outstanding request with a `oneshot` sender, so
//!   callers await their own response instead of polling.

mod client;
mod ledger;
mod reader;
mod state;

use std::time::Duration;

use async_trait::async_trait;
use irbox_core::Command;

use crate::application::IrDevice;
use crate::domain::{CommandOutcome, DeviceError};

pub use client::{Endpoint, IrBoxClient};
pub use ledger::UNSOLICITED_CAPACITY;

/// Timeouts and retry policy for an [`IrBoxClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Limit for opening the TCP connection.
    pub connect_timeout: Duration,
    /// Limit for writing one command to the socket.
    pub write_timeout: Duration,
    /// How long a caller waits for its response line (also bounds the
    /// handshake greeting).
    pub response_timeout: Duration,
    /// Retry a failed lazy connect once before reporting the error.
    pub retry_connect: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
            response_timeout: Duration::from_secs(5),
            retry_connect: false,
        }
    }
}

#[async_trait]
impl IrDevice for IrBoxClient {
    async fn execute(&self, command: &Command) -> Result<CommandOutcome, DeviceError> {
        self.send(command).await
    }

    async fn next_rx_message(&self) -> Option<String> {
        self.get_rx_message().await
    }
}
