// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host-side CLI for the ward bootloader: update, configure, readback,
//! and boot over a raw-byte serial link.
//!
//! Usage:
//!   ward-host --port /dev/ttyACM0 --key <hex> --iv <hex> --password <hex> \
//!       update firmware.bin --version 2 --message "hello"
//!   ward-host --port /dev/ttyACM0 --key <hex> --iv <hex> --password <hex> \
//!       readback f --size 16385 --out dump.bin
//!   ward-host --port /dev/ttyACM0 --key <hex> --iv <hex> --password <hex> boot

mod cli;
mod commands;
mod error;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
