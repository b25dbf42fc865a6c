//! Scripted [`IrDevice`] double for use-case tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use irbox_core::{Command, Response};

use crate::domain::{CommandOutcome, DeviceError};

use super::IrDevice;

/// Replays queued outcomes and records every command it is asked to send.
///
/// Once the script runs out every command is accepted with `+`, and every rx
/// poll returns `None`.
#[derive(Default)]
pub(crate) struct ScriptedDevice {
    outcomes: Mutex<VecDeque<Result<CommandOutcome, DeviceError>>>,
    rx_lines: Mutex<VecDeque<Option<String>>>,
    sent: Mutex<Vec<String>>,
    rx_polls: Mutex<usize>,
}

impl ScriptedDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn then(self, outcome: Result<CommandOutcome, DeviceError>) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub(crate) fn with_rx_lines<'a>(self, lines: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        self.rx_lines
            .lock()
            .unwrap()
            .extend(lines.into_iter().map(|l| l.map(str::to_string)));
        self
    }

    /// Wire text of every command sent so far.
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn rx_polls(&self) -> usize {
        *self.rx_polls.lock().unwrap()
    }
}

#[async_trait]
impl IrDevice for ScriptedDevice {
    async fn execute(&self, command: &Command) -> Result<CommandOutcome, DeviceError> {
        self.sent.lock().unwrap().push(command.wire_text());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CommandOutcome::from_response(Response::new("+"))))
    }

    async fn next_rx_message(&self) -> Option<String> {
        *self.rx_polls.lock().unwrap() += 1;
        self.rx_lines.lock().unwrap().pop_front().flatten()
    }
}
