// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Readback handler (`R`). Password-gated, region-bounded dump of
//! stored bytes verbatim (firmware is returned as ciphertext; the host
//! decrypts it). Past the region's real capacity the device pads with
//! 0xFF rather than reading out of bounds.

use crate::error::BootError;
use crate::flash_driver::FlashDriver;
use crate::flash_region::FlashRegion;
use crate::protocol::{
    CMD_READBACK, CONFIGURATION_CAPACITY, CONFIGURATION_STORAGE_ADDR, FIRMWARE_READBACK_CAPACITY,
    FIRMWARE_STORAGE_ADDR, FRAME_BAD, FRAME_OK, REGION_CONFIGURATION, REGION_FIRMWARE,
    REGION_UNKNOWN,
};
use crate::secret_store::Secrets;
use crate::transport::SerialTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadbackOutcome {
    WrongPassword,
    UnknownRegion,
    Dumped { region: u8, bytes_emitted: u32 },
}

const READ_CHUNK: usize = 256;

pub fn handle_readback<T: SerialTransport, F: FlashDriver>(
    transport: &mut T,
    flash: &mut F,
    secrets: &Secrets,
) -> Result<ReadbackOutcome, BootError> {
    transport.write_byte(CMD_READBACK)?;

    let mut password = [0u8; 16];
    transport.read_exact(&mut password)?;
    transport.write_byte(FRAME_OK)?;
    if password != secrets.password {
        transport.write_byte(FRAME_BAD)?;
        return Ok(ReadbackOutcome::WrongPassword);
    }
    transport.write_byte(FRAME_OK)?;

    let mut region_byte = [0u8; 1];
    transport.read_exact(&mut region_byte)?;
    let region = region_byte[0];

    let (base, capacity) = match region {
        REGION_FIRMWARE => (FIRMWARE_STORAGE_ADDR, FIRMWARE_READBACK_CAPACITY),
        REGION_CONFIGURATION => (CONFIGURATION_STORAGE_ADDR, CONFIGURATION_CAPACITY),
        _ => {
            transport.write_byte(REGION_UNKNOWN)?;
            return Ok(ReadbackOutcome::UnknownRegion);
        }
    };
    transport.write_byte(region)?;

    let mut size_bytes = [0u8; 4];
    transport.read_exact(&mut size_bytes)?;
    let requested = u32::from_be_bytes(size_bytes);

    let region_view = FlashRegion::new(base, capacity);
    let real_bytes = requested.min(capacity);
    let pad_bytes = requested.saturating_sub(capacity);

    let mut offset = 0u32;
    while offset < real_bytes {
        let take = (real_bytes - offset).min(READ_CHUNK as u32) as usize;
        let mut chunk = [0u8; READ_CHUNK];
        region_view.read(flash, offset, &mut chunk[..take])?;
        transport.write_exact(&chunk[..take])?;
        offset += take as u32;
    }

    let padding = [0xFFu8; READ_CHUNK];
    let mut emitted = 0u32;
    while emitted < pad_bytes {
        let take = (pad_bytes - emitted).min(READ_CHUNK as u32) as usize;
        transport.write_exact(&padding[..take])?;
        emitted += take as u32;
    }

    Ok(ReadbackOutcome::Dumped { region, bytes_emitted: requested })
}
