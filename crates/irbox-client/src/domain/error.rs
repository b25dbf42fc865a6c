//! Errors raised by the IR box client.
//!
//! Connection failures keep a short, user-facing message ("Timeout",
//! "Permission denied", "Connection refused") together with a
//! [`ConnectionCause`] callers can match on, and the underlying I/O error
//! as the `source()` when there is one.

use std::io;

use irbox_core::ProtocolError;
use thiserror::Error;

/// Why a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionCause {
    /// The TCP connect or the greeting did not complete in time.
    Timeout,
    PermissionDenied,
    ConnectionRefused,
    /// The socket opened but the device did not greet with `+`.
    Handshake,
    /// Any other OS-level failure (unreachable host, DNS, ...).
    Other,
}

/// Errors that stop a command from being attempted or delivered.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device could not be reached or did not complete the handshake.
    #[error("{message}")]
    Connection {
        cause: ConnectionCause,
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// The command text cannot be framed; nothing was written.
    #[error("Malformed arguments")]
    MalformedArguments(#[from] ProtocolError),

    /// Writing failed even after one reconnect attempt.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),

    /// A command was issued before any host/port was recorded.
    #[error("no IR box endpoint configured; connect first")]
    NotConfigured,
}

impl DeviceError {
    /// Maps an I/O error from `TcpStream::connect` to a connection error.
    pub fn from_connect_io(err: io::Error) -> Self {
        let (cause, message) = match err.kind() {
            io::ErrorKind::TimedOut => (ConnectionCause::Timeout, "Timeout".to_string()),
            io::ErrorKind::PermissionDenied => (
                ConnectionCause::PermissionDenied,
                "Permission denied".to_string(),
            ),
            io::ErrorKind::ConnectionRefused => (
                ConnectionCause::ConnectionRefused,
                "Connection refused".to_string(),
            ),
            _ => (ConnectionCause::Other, err.to_string()),
        };
        Self::Connection {
            cause,
            message,
            source: Some(err),
        }
    }

    /// Connect or greeting did not finish within the connect timeout.
    pub fn timeout() -> Self {
        Self::Connection {
            cause: ConnectionCause::Timeout,
            message: "Timeout".to_string(),
            source: None,
        }
    }

    /// The device answered the greeting with something other than `+`, or
    /// hung up before answering.
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Connection {
            cause: ConnectionCause::Handshake,
            message: message.into(),
            source: None,
        }
    }

    /// The connection cause, for [`DeviceError::Connection`] only.
    pub fn cause(&self) -> Option<ConnectionCause> {
        match self {
            Self::Connection { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}

/// `true` for write errors that mean the peer went away and a fresh
/// connection may succeed.
pub(crate) fn is_broken_link(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_refused_maps_to_short_message() {
        let err = DeviceError::from_connect_io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(err.cause(), Some(ConnectionCause::ConnectionRefused));
        assert_eq!(err.to_string(), "Connection refused");
        assert!(err.source().is_some(), "the io::Error is kept as source");
    }

    #[test]
    fn test_timed_out_and_permission_denied_map_to_their_causes() {
        let timed_out = DeviceError::from_connect_io(io::Error::from(io::ErrorKind::TimedOut));
        let denied =
            DeviceError::from_connect_io(io::Error::from(io::ErrorKind::PermissionDenied));

        assert_eq!(timed_out.to_string(), "Timeout");
        assert_eq!(denied.cause(), Some(ConnectionCause::PermissionDenied));
        assert_eq!(denied.to_string(), "Permission denied");
    }

    #[test]
    fn test_other_kinds_keep_os_text() {
        let err = DeviceError::from_connect_io(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no route",
        ));
        assert_eq!(err.cause(), Some(ConnectionCause::Other));
        assert_eq!(err.to_string(), "no route");
    }

    #[test]
    fn test_protocol_error_reads_malformed_arguments() {
        let err = DeviceError::from(ProtocolError::NonAscii("é".into()));
        assert_eq!(err.to_string(), "Malformed arguments");
        assert_eq!(err.cause(), None);
    }

    #[test]
    fn test_broken_link_kinds() {
        assert!(is_broken_link(&io::Error::from(io::ErrorKind::BrokenPipe)));
        assert!(is_broken_link(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(!is_broken_link(&io::Error::from(io::ErrorKind::TimedOut)));
    }
}
