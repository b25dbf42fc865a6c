//! Run-a-command use cases.
//!
//! Every user-facing action ends in the same pair: did it work, and what
//! should be shown.  Device errors (unreachable box, malformed input) become
//! failed reports instead of propagating, so a front end can render every
//! result the same way.

use irbox_core::{Command, TxRequest};
use tracing::{debug, warn};

use crate::domain::{CommandOutcome, DeviceError};

use super::IrDevice;

/// Success flag and display message for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub success: bool,
    pub message: String,
}

impl CommandReport {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<&CommandOutcome> for CommandReport {
    fn from(outcome: &CommandOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            message: outcome.message().to_string(),
        }
    }
}

impl From<&DeviceError> for CommandReport {
    fn from(err: &DeviceError) -> Self {
        Self::failure(err.to_string())
    }
}

/// Sends `command` and reports the result.
pub async fn run_command(device: &dyn IrDevice, command: &Command) -> CommandReport {
    match device.execute(command).await {
        Ok(outcome) => {
            debug!(%command, outcome = %outcome, "command finished");
            CommandReport::from(&outcome)
        }
        Err(e) => {
            warn!(%command, "command failed: {e}");
            CommandReport::from(&e)
        }
    }
}

/// Shapes `request` into `tx()` arguments and sends them.
///
/// A request that cannot be shaped ("Malformed arguments", "Unsupported
/// protocol") is reported without touching the device.
pub async fn send_tx(device: &dyn IrDevice, request: &TxRequest) -> CommandReport {
    let args = match request.to_args() {
        Ok(args) => args,
        Err(e) => {
            debug!(?request, "tx request rejected: {e}");
            return CommandReport::failure(e.to_string());
        }
    };
    match Command::tx(args) {
        Ok(command) => run_command(device, &command).await,
        Err(e) => CommandReport::from(&DeviceError::from(e)),
    }
}
