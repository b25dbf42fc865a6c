//! Receive-mode use case.
//!
//! In receive mode the device decodes IR signals it sees and sends each one
//! as an unsolicited line in `tx(...)` form, ready to be replayed.  The
//! watcher ignores polls that time out and the `+rx` / `+norx`
//! acknowledgements that can surface on the same queue.

use irbox_core::Command;
use tracing::{debug, info};

use super::commands::{run_command, CommandReport};
use super::IrDevice;

/// When to stop watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxWatchLimits {
    /// Stop after this many captured codes.
    pub max_messages: usize,
    /// Stop after this many polls, captured or not.  Each poll waits up to
    /// the device's response timeout.
    pub max_polls: usize,
}

impl Default for RxWatchLimits {
    fn default() -> Self {
        Self {
            max_messages: 1,
            max_polls: 12,
        }
    }
}

/// Everything that happened during one watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxWatchReport {
    /// Result of the `rx` command.
    pub entered: CommandReport,
    /// Captured lines, in arrival order.
    pub messages: Vec<String>,
    /// Result of the closing `norx`; `None` when `rx` itself failed.
    pub left: Option<CommandReport>,
}

/// Acknowledgement lines that are not captures.
pub fn is_rx_noise(line: &str) -> bool {
    matches!(line, "+rx" | "+norx")
}

/// Enters receive mode, collects captures until a limit is hit, and leaves
/// receive mode again.  `on_message` sees each capture as it arrives.
pub async fn watch_rx<F>(device: &dyn IrDevice, limits: RxWatchLimits, mut on_message: F) -> RxWatchReport
where
    F: FnMut(&str),
{
    let entered = run_command(device, &Command::Rx).await;
    if !entered.success {
        return RxWatchReport {
            entered,
            messages: Vec::new(),
            left: None,
        };
    }

    let mut messages = Vec::new();
    for poll in 0..limits.max_polls {
        if messages.len() >= limits.max_messages {
            break;
        }
        match device.next_rx_message().await {
            Some(line) if is_rx_noise(&line) => debug!(poll, %line, "ignoring rx acknowledgement"),
            Some(line) => {
                info!(%line, "captured IR code");
                on_message(&line);
                messages.push(line);
            }
            None => debug!(poll, "nothing captured yet"),
        }
    }

    let left = run_command(device, &Command::Norx).await;
    RxWatchReport {
        entered,
        messages,
        left: Some(left),
    }
}

#[cfg(test)]
mod tests {
    use irbox_core::Response;

    use super::*;
    use crate::application::test_support::ScriptedDevice;
    use crate::domain::CommandOutcome;

    #[test]
    fn test_collects_capture_and_leaves_rx_mode() {
        // Arrange
        let device = ScriptedDevice::new()
            .then(Ok(CommandOutcome::from_response(Response::new("+rx"))))
            .then(Ok(CommandOutcome::from_response(Response::new("+norx"))))
            .with_rx_lines([None, Some("+rx"), Some("tx(0x08,0x04,0x10)")]);
        let mut seen = Vec::new();

        // Act
        let report = tokio_test::block_on(watch_rx(
            &device,
            RxWatchLimits::default(),
            |line| seen.push(line.to_string()),
        ));

        // Assert
        assert!(report.entered.success);
        assert_eq!(report.messages, ["tx(0x08,0x04,0x10)"]);
        assert_eq!(seen, report.messages);
        assert_eq!(report.left, Some(CommandReport::success("+norx")));
        assert_eq!(device.sent(), ["rx", "norx"]);
    }

    #[test]
    fn test_gives_up_after_max_polls_and_still_sends_norx() {
        let device = ScriptedDevice::new();
        let limits = RxWatchLimits {
            max_messages: 5,
            max_polls: 3,
        };

        let report = tokio_test::block_on(watch_rx(&device, limits, |_| {}));

        assert!(report.messages.is_empty());
        assert_eq!(device.rx_polls(), 3);
        assert_eq!(device.sent(), ["rx", "norx"]);
    }

    #[test]
    fn test_failed_rx_skips_polling() {
        let device = ScriptedDevice::new().then(Ok(CommandOutcome::MessageTimeout));

        let report = tokio_test::block_on(watch_rx(&device, RxWatchLimits::default(), |_| {}));

        assert!(!report.entered.success);
        assert_eq!(report.left, None);
        assert_eq!(device.rx_polls(), 0);
        assert_eq!(device.sent(), ["rx"]);
    }

    #[test]
    fn test_noise_lines() {
        assert!(is_rx_noise("+rx"));
        assert!(is_rx_noise("+norx"));
        assert!(!is_rx_noise("tx(0x13,0x01,0x15,12)"));
    }
}
