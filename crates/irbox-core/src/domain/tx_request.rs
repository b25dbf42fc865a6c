//! Protocol-aware construction of `tx()` arguments.
//!
//! The IR box expects a different argument shape per protocol family:
//!
//! | Protocol      | Arguments                                  |
//! |---------------|--------------------------------------------|
//! | NEC, Apple    | `protocol,address,command[,repeats]`       |
//! | Sony          | `protocol,address,command,bits[,repeats]`  |
//! | anything else | not supported by the firmware              |
//!
//! The values themselves stay opaque strings: the device parses them, and the
//! client only transports them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ir_protocol::IrProtocol;

/// Reasons a [`TxRequest`] cannot be turned into `tx()` arguments.
///
/// The `Display` text is the short message shown to end users.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TxRequestError {
    /// Protocol, address, or command was not supplied.
    #[error("Malformed arguments")]
    MissingField(&'static str),

    /// Sony codes need an explicit bit count.
    #[error("Malformed arguments")]
    MissingBits,

    /// The protocol family has no `tx()` argument shape.
    #[error("Unsupported protocol")]
    UnsupportedProtocol(IrProtocol),
}

/// A transmit request as collected from a user: one IR code plus optional
/// bit count and repeat count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    /// Hexadecimal protocol identifier, e.g. `0x08`.
    pub protocol: Option<String>,
    pub address: Option<String>,
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeats: Option<String>,
}

impl TxRequest {
    /// Creates a request with the three mandatory fields set.
    pub fn new(
        protocol: impl Into<String>,
        address: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            protocol: Some(protocol.into()),
            address: Some(address.into()),
            command: Some(command.into()),
            bits: None,
            repeats: None,
        }
    }

    /// Sets the bit count (Sony).
    pub fn with_bits(mut self, bits: impl Into<String>) -> Self {
        self.bits = Some(bits.into());
        self
    }

    /// Sets the repeat count.
    pub fn with_repeats(mut self, repeats: impl Into<String>) -> Self {
        self.repeats = Some(repeats.into());
        self
    }

    /// Protocol family named by the `protocol` field.
    ///
    /// # Errors
    ///
    /// Returns [`TxRequestError::MissingField`] when no protocol was supplied.
    pub fn protocol_family(&self) -> Result<IrProtocol, TxRequestError> {
        let protocol = self
            .protocol
            .as_deref()
            .ok_or(TxRequestError::MissingField("protocol"))?;
        Ok(IrProtocol::from_hex_arg(protocol))
    }

    /// Builds the ordered `tx()` argument list for this request.
    ///
    /// # Errors
    ///
    /// Returns [`TxRequestError`] when a mandatory field is missing or the
    /// protocol family is not supported.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use irbox_core::TxRequest;
    ///
    /// let args = TxRequest::new("0x13", "0x01", "0x15")
    ///     .with_bits("12")
    ///     .to_args()
    ///     .unwrap();
    /// assert_eq!(args, ["0x13", "0x01", "0x15", "12"]);
    /// ```
    pub fn to_args(&self) -> Result<Vec<String>, TxRequestError> {
        let family = self.protocol_family()?;
        let mut args = vec![
            required(&self.protocol, "protocol")?,
            required(&self.address, "address")?,
            required(&self.command, "command")?,
        ];

        match family {
            IrProtocol::Nec | IrProtocol::Apple => {}
            IrProtocol::Sony => {
                let bits = self.bits.clone().ok_or(TxRequestError::MissingBits)?;
                args.push(bits);
            }
            other => return Err(TxRequestError::UnsupportedProtocol(other)),
        }

        if let Some(repeats) = &self.repeats {
            args.push(repeats.clone());
        }
        Ok(args)
    }
}

fn required(field: &Option<String>, name: &'static str) -> Result<String, TxRequestError> {
    field.clone().ok_or(TxRequestError::MissingField(name))
}
