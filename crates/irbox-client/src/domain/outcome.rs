//! Command outcomes and connection state.

use std::fmt;

use irbox_core::Response;

/// Text recorded when a command's ledger entry was never resolved.
pub const MESSAGE_TIMEOUT: &str = "Message timeout";

/// Text recorded when no response arrived within the response timeout.
pub const RESPONSE_TIMEOUT: &str = "Response timeout";

/// Result of one command round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The device answered with a `+` line.
    Accepted(Response),
    /// The device answered with any other line; the whole line is the error.
    Rejected(Response),
    /// The request was abandoned before a response could be matched to it,
    /// e.g. the connection closed while the command was in flight.
    MessageTimeout,
    /// No response arrived within the configured response timeout.
    ResponseTimeout,
}

impl CommandOutcome {
    /// Classifies a response line by its first character.
    pub fn from_response(response: Response) -> Self {
        if response.is_success() {
            Self::Accepted(response)
        } else {
            Self::Rejected(response)
        }
    }

    /// `true` only for [`CommandOutcome::Accepted`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// `true` for either timeout variant.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::MessageTimeout | Self::ResponseTimeout)
    }

    /// The response line, when one arrived.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Accepted(r) | Self::Rejected(r) => Some(r),
            Self::MessageTimeout | Self::ResponseTimeout => None,
        }
    }

    /// The text stored as "last response": the full line, or the timeout
    /// message.
    pub fn message(&self) -> &str {
        match self {
            Self::Accepted(r) | Self::Rejected(r) => r.text(),
            Self::MessageTimeout => MESSAGE_TIMEOUT,
            Self::ResponseTimeout => RESPONSE_TIMEOUT,
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Connection state of an [`IrBoxClient`](crate::infrastructure::network::IrBoxClient).
///
/// ```text
/// Disconnected ──connect(soft)──▶ SoftConnected ──first command──▶ Connected
///      ▲                                                              │
///      └──────────── close() / peer EOF / read error ─────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No endpoint in use and no socket open.
    #[default]
    Disconnected,
    /// Host and port are recorded; the socket opens on the next command.
    SoftConnected,
    /// A socket is open and the handshake completed.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::SoftConnected => "soft-connected",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}
