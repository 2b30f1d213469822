// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Narrow blocking byte-transport interface. Concrete implementations live
//! in `ward-bootloader` (USB CDC, raw bytes, no COBS framing — the wire
//! protocol is unframed) and in `testing::MockTransport` for host-side
//! tests.

use crate::error::BootError;

pub trait SerialTransport {
    /// Block until one byte is available.
    fn read_byte(&mut self) -> Result<u8, BootError>;

    /// Block until `buf.len()` bytes have been read.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), BootError>;

    /// Read bytes one at a time into `buf` until a NUL terminator is seen
    /// (inclusive) or `buf` is exhausted. Used for the update handler's
    /// release-message field, which is a host-supplied, variable-length,
    /// NUL-terminated string.
    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, BootError>;

    fn write_byte(&mut self, byte: u8) -> Result<(), BootError>;

    fn write_exact(&mut self, buf: &[u8]) -> Result<(), BootError>;
}
