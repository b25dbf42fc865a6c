//! The IR box command set.
//!
//! | Command            | Wire text                          |
//! |--------------------|------------------------------------|
//! | [`Command::Handshake`] | *(empty, nothing is written)*  |
//! | [`Command::Nop`]   | `nop`                              |
//! | [`Command::Tx`]    | `tx(protocol,address,command[,..])`|
//! | [`Command::Rx`]    | `rx`                               |
//! | [`Command::Norx`]  | `norx`                             |
//! | [`Command::Invalid`] | `invalid`                        |
//! | [`Command::Raw`]   | caller-supplied text               |
//!
//! The device greets every new connection with a `+` line, so the handshake
//! is an empty command: it occupies a ledger slot for that greeting but puts
//! no bytes on the wire.

use std::fmt;

use crate::protocol::codec::{encode_line, ProtocolError};

/// Characters that would change the shape of a `tx(...)` command if they
/// appeared inside an argument.
const TX_ARG_FORBIDDEN: [char; 5] = [',', '(', ')', '\r', '\n'];

/// One command the controller can send to the IR box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connection probe answered by the device's greeting.
    Handshake,
    /// Liveness check.
    Nop,
    /// Transmit an IR code.  Arguments are opaque strings, already validated
    /// by [`Command::tx`].
    Tx(Vec<String>),
    /// Enter receive mode.
    Rx,
    /// Leave receive mode.
    Norx,
    /// Deliberately unknown command, for diagnostics.
    Invalid,
    /// Arbitrary message text.
    Raw(String),
}

impl Command {
    /// Builds a `tx(...)` command from its argument list.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedArguments`] when the list is empty or
    /// an argument is empty, non-ASCII, or contains `,`, `(`, `)`, CR, or LF.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use irbox_core::Command;
    ///
    /// let cmd = Command::tx(["0x08", "0x04", "0x10"]).unwrap();
    /// assert_eq!(cmd.wire_text(), "tx(0x08,0x04,0x10)");
    /// ```
    pub fn tx<I, S>(args: I) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args
            .into_iter()
            .map(|arg| validate_tx_arg(arg.as_ref()).map(str::to_string))
            .collect::<Result<_, _>>()?;

        if args.is_empty() {
            return Err(ProtocolError::MalformedArguments(
                "tx() needs at least one argument".to_string(),
            ));
        }
        Ok(Command::Tx(args))
    }

    /// Builds a raw command from arbitrary text.  Validation happens when the
    /// command is encoded.
    pub fn raw(message: impl Into<String>) -> Self {
        Command::Raw(message.into())
    }

    /// Returns the command text as it appears on the wire, without `\r\n`.
    pub fn wire_text(&self) -> String {
        match self {
            Command::Handshake => String::new(),
            Command::Nop => "nop".to_string(),
            Command::Tx(args) => format!("tx({})", args.join(",")),
            Command::Rx => "rx".to_string(),
            Command::Norx => "norx".to_string(),
            Command::Invalid => "invalid".to_string(),
            Command::Raw(message) => message.clone(),
        }
    }

    /// Encodes the command into the bytes to write to the socket.
    ///
    /// An empty command encodes to zero bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the text is not a single ASCII line.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let text = self.wire_text();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        encode_line(&text)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_text())
    }
}

fn validate_tx_arg(arg: &str) -> Result<&str, ProtocolError> {
    if arg.is_empty() {
        return Err(ProtocolError::MalformedArguments(
            "tx() argument is empty".to_string(),
        ));
    }
    if !arg.is_ascii() || arg.contains(TX_ARG_FORBIDDEN) {
        return Err(ProtocolError::MalformedArguments(format!(
            "tx() argument {arg:?} cannot be sent"
        )));
    }
    Ok(arg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_joins_three_arguments_with_commas() {
        let cmd = Command::tx(["p", "a", "c"]).unwrap();
        assert_eq!(cmd.wire_text(), "tx(p,a,c)");
    }

    #[test]
    fn test_tx_joins_four_arguments_with_commas() {
        let cmd = Command::tx(vec!["p".to_string(), "a".into(), "c".into(), "r".into()]).unwrap();
        assert_eq!(cmd.wire_text(), "tx(p,a,c,r)");
    }

    #[test]
    fn test_tx_rejects_empty_argument_list() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            Command::tx(empty),
            Err(ProtocolError::MalformedArguments(_))
        ));
    }

    #[test]
    fn test_tx_rejects_empty_argument() {
        assert!(matches!(
            Command::tx(["0x13", "", "0x15"]),
            Err(ProtocolError::MalformedArguments(_))
        ));
    }

    #[test]
    fn test_tx_rejects_arguments_that_change_the_command_shape() {
        for bad in ["a,b", "a)", "(a", "a\r\n", "é"] {
            assert!(
                matches!(
                    Command::tx(["0x08", bad, "0x10"]),
                    Err(ProtocolError::MalformedArguments(_))
                ),
                "argument {bad:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_simple_commands_have_expected_wire_text() {
        assert_eq!(Command::Nop.wire_text(), "nop");
        assert_eq!(Command::Rx.wire_text(), "rx");
        assert_eq!(Command::Norx.wire_text(), "norx");
        assert_eq!(Command::Invalid.wire_text(), "invalid");
        assert_eq!(Command::raw("status").wire_text(), "status");
    }

    #[test]
    fn test_handshake_encodes_to_nothing() {
        assert!(Command::Handshake.encode().unwrap().is_empty());
        assert!(Command::raw("").encode().unwrap().is_empty());
    }

    #[test]
    fn test_encode_appends_crlf() {
        assert_eq!(Command::Norx.encode().unwrap(), b"norx\r\n");
        assert_eq!(
            Command::tx(["0x13", "0x01", "0x15", "12"]).unwrap().encode().unwrap(),
            b"tx(0x13,0x01,0x15,12)\r\n"
        );
    }

    #[test]
    fn test_raw_with_non_ascii_fails_to_encode() {
        assert!(matches!(
            Command::raw("nöp").encode(),
            Err(ProtocolError::NonAscii(_))
        ));
    }

    #[test]
    fn test_display_matches_wire_text() {
        let cmd = Command::tx(["0x08", "0x04", "0x10", "2"]).unwrap();
        assert_eq!(cmd.to_string(), "tx(0x08,0x04,0x10,2)");
    }
}
