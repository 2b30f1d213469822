// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ward_common::secret_store::Secrets;

use crate::commands;
use crate::transport::Transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "ward-host")]
#[command(about = "Host-side tool for the ward bootloader")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyACM0)
    #[arg(short, long)]
    pub port: String,

    /// 16-byte AES key, hex-encoded (32 hex chars)
    #[arg(long)]
    pub key: String,

    /// 16-byte AES IV, hex-encoded (32 hex chars)
    #[arg(long)]
    pub iv: String,

    /// 16-byte shared password, hex-encoded (32 hex chars)
    #[arg(long)]
    pub password: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Upload a firmware image.
    Update {
        /// Plaintext firmware binary.
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Firmware version; 0 leaves the stored version unchanged.
        #[arg(short, long, default_value = "0")]
        version: u32,

        /// Release message, stored and printed at boot.
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Upload a configuration blob.
    Configure {
        /// Plaintext configuration file.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Read back a stored region.
    Readback {
        /// Region to read: 'f' (firmware) or 'c' (configuration).
        #[arg(value_name = "REGION")]
        region: char,

        /// Number of bytes to request.
        #[arg(short, long)]
        size: u32,

        /// Output file.
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        /// Decrypt and strip the trailing tag locally (firmware only).
        #[arg(long)]
        decrypt: bool,
    },

    /// Trigger the boot handler.
    Boot,
}

fn parse_secret(name: &str, hex_str: &str) -> Result<[u8; 16]> {
    let bytes = hex::decode(hex_str).with_context(|| format!("{name} is not valid hex"))?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("{name} must decode to exactly 16 bytes"))
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let secrets = Secrets {
        key: parse_secret("--key", &cli.key)?,
        iv: parse_secret("--iv", &cli.iv)?,
        password: parse_secret("--password", &cli.password)?,
    };

    let mut transport = Transport::new(&cli.port)?;

    match cli.command {
        Commands::Update { file, version, message } => {
            commands::update(&mut transport, &secrets, &file, version, &message)
        }
        Commands::Configure { file } => commands::configure(&mut transport, &secrets, &file),
        Commands::Readback { region, size, out, decrypt } => {
            commands::readback(&mut transport, &secrets, region, size, &out, decrypt)
        }
        Commands::Boot => commands::boot(&mut transport),
    }
}
