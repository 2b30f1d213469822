// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Per-command handler logic, generic over `FlashDriver` and
//! `SerialTransport` so each handler can be driven from host tests with
//! `testing::{ArrayFlash, MockTransport}` instead of real hardware.

pub mod boot;
pub mod configure;
pub mod readback;
pub mod update;

pub use boot::{handle_boot, BootOutcome, Jumper};
pub use configure::{handle_configure, ConfigureOutcome};
pub use readback::{handle_readback, ReadbackOutcome};
pub use update::{handle_update, UpdateOutcome};
