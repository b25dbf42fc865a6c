//! Domain entities for the IR box.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code has **no** imports from
//! network libraries, file systems, or UI frameworks, so it can be compiled
//! and tested anywhere without setup.
//!
//! For the IR box the domain is small: the device never interprets waveforms
//! for us, but the controller still has to know which IRremote protocol
//! families take which `tx()` arguments.

/// Arduino-IRremote protocol identifiers.
pub mod ir_protocol;

/// Protocol-aware construction of `tx()` argument lists.
pub mod tx_request;
