//! Arduino-IRremote protocol identifiers.
//!
//! The IR box firmware is built on Arduino-IRremote, and the first `tx()`
//! argument is the numeric protocol identifier from that library's
//! `IRProtocol.h`, written in hexadecimal (`0x08` is NEC).

use serde::{Deserialize, Serialize};

/// IRremote protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IrProtocol {
    Unknown = 0,
    PulseDistance = 1,
    PulseWidth = 2,
    Denon = 3,
    Dish = 4,
    Jvc = 5,
    Lg = 6,
    Lg2 = 7,
    Nec = 8,
    Panasonic = 9,
    Kaseikyo = 10,
    KaseikyoJvc = 11,
    KaseikyoDenon = 12,
    KaseikyoSharp = 13,
    KaseikyoMitsubishi = 14,
    Rc5 = 15,
    Rc6 = 16,
    Samsung = 17,
    Sharp = 18,
    Sony = 19,
    Onkyo = 20,
    Apple = 21,
    BoseWave = 22,
    LegoPf = 23,
    MagiQuest = 24,
    Whynter = 25,
}

impl TryFrom<u8> for IrProtocol {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use IrProtocol::*;
        let protocol = match value {
            0 => Unknown,
            1 => PulseDistance,
            2 => PulseWidth,
            3 => Denon,
            4 => Dish,
            5 => Jvc,
            6 => Lg,
            7 => Lg2,
            8 => Nec,
            9 => Panasonic,
            10 => Kaseikyo,
            11 => KaseikyoJvc,
            12 => KaseikyoDenon,
            13 => KaseikyoSharp,
            14 => KaseikyoMitsubishi,
            15 => Rc5,
            16 => Rc6,
            17 => Samsung,
            18 => Sharp,
            19 => Sony,
            20 => Onkyo,
            21 => Apple,
            22 => BoseWave,
            23 => LegoPf,
            24 => MagiQuest,
            25 => Whynter,
            _ => return Err(()),
        };
        Ok(protocol)
    }
}

impl IrProtocol {
    /// Interprets a front-end protocol string such as `0x08`.
    ///
    /// The two-character prefix is skipped unchecked and the rest is read as
    /// hexadecimal.  Text that is not valid hex, or a number outside the
    /// table, maps to [`IrProtocol::Unknown`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use irbox_core::IrProtocol;
    ///
    /// assert_eq!(IrProtocol::from_hex_arg("0x08"), IrProtocol::Nec);
    /// assert_eq!(IrProtocol::from_hex_arg("0xzz"), IrProtocol::Unknown);
    /// ```
    pub fn from_hex_arg(arg: &str) -> Self {
        let digits = arg.get(2..).unwrap_or_default();
        u32::from_str_radix(digits, 16)
            .ok()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(|n| IrProtocol::try_from(n).ok())
            .unwrap_or(IrProtocol::Unknown)
    }

    /// Numeric identifier as used on the wire.
    pub fn id(self) -> u8 {
        self as u8
    }
}
