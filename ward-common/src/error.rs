// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Internal fallible conditions. Handlers match this exhaustively and
//! convert it into a `FRAME_BAD` ack — never a panic, never a retry.
//! Retry, if any, is the host's responsibility.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// The underlying flash/EEPROM driver reported a fault.
    FlashFault,
    /// Fewer bytes were available than the handler required.
    Truncated,
    /// A caller-supplied size exceeded a region's capacity or a buffer's
    /// fixed contract length.
    Overflow,
}
