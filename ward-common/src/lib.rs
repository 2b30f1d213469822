// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common protocol, crypto, and handler logic for the ward bootloader.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: enables `std` support for host tools
//! - `embedded` feature: enables the `embedded-hal`-generic `blink` helper
//!
//! Handler logic (`handlers`) is generic over the `FlashDriver`,
//! `SecretStore`, and `SerialTransport` traits so it can be exercised from
//! host tests without real hardware, keeping protocol decision logic
//! independent of the concrete flash/transport drivers.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod crypto;
pub mod error;
pub mod flash_driver;
pub mod flash_region;
pub mod handlers;
pub mod protocol;
pub mod secret_store;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing; // `test-util` is a default feature; see Cargo.toml.

pub use error::BootError;
pub use flash_driver::FlashDriver;
pub use protocol::Command;
pub use secret_store::{SecretStore, Secrets};
pub use transport::SerialTransport;

// Embedded-specific exports (only with embedded feature)
#[cfg(feature = "embedded")]
use embedded_hal::delay::DelayNs;
#[cfg(feature = "embedded")]
use embedded_hal::digital::OutputPin;

/// Blink an LED a specified number of times — used on init and on
/// successful boot/configure/update completion as a bench-visible signal
/// with no serial terminal attached.
#[cfg(feature = "embedded")]
pub fn blink(led: &mut impl OutputPin, timer: &mut impl DelayNs, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        timer.delay_ms(period_ms);
        led.set_low().ok();
        timer.delay_ms(period_ms);
    }
}
