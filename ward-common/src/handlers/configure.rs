// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Configure handler (`C`). A stream of fixed-size frames, each
//! independently authenticated and committed as it arrives; the first bad
//! tag stops the stream without disturbing pages already written.

use crate::crypto;
use crate::error::BootError;
use crate::flash_driver::FlashDriver;
use crate::flash_region::FlashRegion;
use crate::protocol::{
    CMD_CONFIGURE, CONFIGURATION_METADATA_ADDR, CONFIGURATION_SIZE_OFFSET,
    CONFIGURATION_STORAGE_ADDR, CONFIGURATION_CAPACITY, CONFIG_DATA_FRAME_LEN, CONFIG_FRAME_LEN,
    FLASH_PAGE_SIZE, FRAME_BAD, FRAME_OK,
};
use crate::secret_store::Secrets;
use crate::transport::SerialTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// All frames authenticated and committed; metadata size updated.
    Committed { payload_size: u32 },
    /// A frame failed its tag check. Frames already committed before the
    /// bad one remain in flash; the metadata size is left untouched.
    Aborted,
}

/// `CONFIG_FRAME_LEN` must divide evenly into page-sized commits: each
/// frame's 1024-byte data payload is written to one configuration page.
pub fn handle_configure<T: SerialTransport, F: FlashDriver>(
    transport: &mut T,
    flash: &mut F,
    secrets: &Secrets,
) -> Result<ConfigureOutcome, BootError> {
    transport.write_byte(CMD_CONFIGURE)?;

    let metadata = FlashRegion::new(CONFIGURATION_METADATA_ADDR, FLASH_PAGE_SIZE);
    let storage = FlashRegion::new(CONFIGURATION_STORAGE_ADDR, CONFIGURATION_CAPACITY);

    let mut size_bytes = [0u8; 4];
    transport.read_exact(&mut size_bytes)?;
    let mut remaining = u32::from_be_bytes(size_bytes) as usize;
    transport.write_byte(FRAME_OK)?;

    let mut payload_written = 0u32;
    let mut page_addr = 0u32;

    while remaining > 0 {
        let mut frame = [0u8; CONFIG_FRAME_LEN];
        transport.read_exact(&mut frame[..CONFIG_DATA_FRAME_LEN])?;
        transport.write_byte(FRAME_OK)?;
        transport.read_exact(&mut frame[CONFIG_DATA_FRAME_LEN..])?;

        crypto::decrypt_in_place(&mut frame, &secrets.key, &secrets.iv)?;
        let tag_ok = frame[CONFIG_DATA_FRAME_LEN..] == secrets.password[..];
        if !tag_ok {
            transport.write_byte(FRAME_BAD)?;
            return Ok(ConfigureOutcome::Aborted);
        }
        transport.write_byte(FRAME_OK)?;

        storage.erase_page(flash, page_addr)?;
        storage.program_page(flash, page_addr, &frame[..CONFIG_DATA_FRAME_LEN])?;
        page_addr += FLASH_PAGE_SIZE;

        remaining = remaining.saturating_sub(CONFIG_FRAME_LEN);
        payload_written += CONFIG_DATA_FRAME_LEN as u32;
    }

    metadata.erase_page(flash, 0)?;
    metadata.program_word(flash, CONFIGURATION_SIZE_OFFSET, payload_written)?;

    Ok(ConfigureOutcome::Committed { payload_size: payload_written })
}
