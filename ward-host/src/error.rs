// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Typed causes for host-side transport failures. `anyhow` wraps these at
//! the CLI boundary for context; library code returns the typed variant
//! so callers can match on it if they need to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardError {
    #[error("failed to open serial port {0}: {1}")]
    SerialOpen(String, String),

    #[error("timed out waiting for a reply from the device")]
    Timeout,

    #[error("device replied with a failure ack (FRAME_BAD)")]
    BadAck,

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("serial i/o error: {0}")]
    Io(String),
}
