// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Raw-byte serial transport for the ward wire protocol — no COBS, no
//! postcard, just the fixed-length reads/writes and single-byte acks the
//! device speaks directly.

use std::io::{Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::SerialPort;

use ward_common::protocol::{FRAME_BAD, FRAME_OK};

use crate::error::WardError;

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

pub struct Transport {
    port: Box<dyn SerialPort>,
}

impl Transport {
    pub fn new(port_name: &str) -> Result<Self> {
        Self::with_timeout(port_name, DEFAULT_TIMEOUT_MS)
    }

    pub fn with_timeout(port_name: &str, timeout_ms: u64) -> Result<Self> {
        let port = serialport::new(port_name, 115200)
            .timeout(Duration::from_millis(timeout_ms))
            .open()
            .map_err(|e| WardError::SerialOpen(port_name.to_string(), e.to_string()))
            .with_context(|| format!("failed to open serial port {port_name}"))?;
        Ok(Self { port })
    }

    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "?".to_string())
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_exact(&[byte])
    }

    pub fn write_exact(&mut self, buf: &[u8]) -> Result<()> {
        self.port
            .write_all(buf)
            .map_err(|e| WardError::Io(e.to_string()))?;
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.port.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                WardError::Timeout
            } else {
                WardError::Io(e.to_string())
            }
        })?;
        Ok(())
    }

    /// Every handler emits its command byte as its first reply — confirm
    /// the device dispatched to the handler we expect.
    pub fn expect_echo(&mut self, expected: u8) -> Result<()> {
        let got = self.read_byte()?;
        if got != expected {
            return Err(WardError::Protocol(format!(
                "expected command echo 0x{expected:02x}, got 0x{got:02x}"
            ))
            .into());
        }
        Ok(())
    }

    /// Read one ack byte; turn `FRAME_BAD` and anything else into errors.
    pub fn expect_ack(&mut self) -> Result<()> {
        match self.read_byte()? {
            FRAME_OK => Ok(()),
            FRAME_BAD => Err(WardError::BadAck.into()),
            other => {
                Err(WardError::Protocol(format!("unexpected ack byte 0x{other:02x}")).into())
            }
        }
    }
}
