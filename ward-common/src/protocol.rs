// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Wire protocol constants and persisted-region layout.
//!
//! This module centralizes every compile-time parameter the rest of the
//! workspace depends on: flash addresses, wire frame sizes, and ack bytes
//! all live here rather than being scattered across handler files.

/// Host → device command bytes.
pub const CMD_CONFIGURE: u8 = b'C';
pub const CMD_UPDATE: u8 = b'U';
pub const CMD_READBACK: u8 = b'R';
pub const CMD_BOOT: u8 = b'B';

/// Readback region identifiers.
pub const REGION_FIRMWARE: u8 = b'F';
pub const REGION_CONFIGURATION: u8 = b'C';
pub const REGION_UNKNOWN: u8 = b'Q';

/// Device → host ack bytes.
pub const FRAME_OK: u8 = 0x00;
pub const FRAME_BAD: u8 = 0x01;

/// One command byte, decoded from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Configure,
    Update,
    Readback,
    Boot,
    /// Any byte outside `{C, U, R, B}` — silently discarded by the dispatcher.
    Unknown(u8),
}

impl Command {
    pub fn decode(byte: u8) -> Self {
        match byte {
            CMD_CONFIGURE => Command::Configure,
            CMD_UPDATE => Command::Update,
            CMD_READBACK => Command::Readback,
            CMD_BOOT => Command::Boot,
            other => Command::Unknown(other),
        }
    }
}

// --- Flash layout constants ---

/// Logical flash program/erase granularity exposed to handlers. The
/// concrete RP2040 driver chunks this into 256-byte ROM program calls and
/// rounds erases up to the enclosing 4096-byte sector internally.
pub const FLASH_PAGE_SIZE: u32 = 1024;

pub const FLASH_BASE: u32 = 0x1000_0000;

/// Firmware metadata: size@+0 (4B), version@+4 (4B), release message@+8
/// continuing into a second page at `FIRMWARE_METADATA_ADDR + FLASH_PAGE_SIZE`.
pub const FIRMWARE_METADATA_ADDR: u32 = FLASH_BASE + 0x0004_0000;
pub const FIRMWARE_SIZE_OFFSET: u32 = 0;
pub const FIRMWARE_VERSION_OFFSET: u32 = 4;
pub const FIRMWARE_RELEASE_MSG_OFFSET: u32 = 8;

/// Maximum release message length, excluding the null terminator.
pub const MAX_RELEASE_MSG_LEN: usize = 1024;
/// Release message scratch buffer size: message + terminator.
pub const RELEASE_MSG_BUF_LEN: usize = MAX_RELEASE_MSG_LEN + 1;
/// `RELEASE_MSG_BUF_LEN` rounded up to a 4-byte word boundary, for the
/// single page-spanning flash write that commits the message.
pub const RELEASE_MSG_WRITE_LEN: usize = (RELEASE_MSG_BUF_LEN + 3) / 4 * 4;

pub const FIRMWARE_STORAGE_ADDR: u32 = FIRMWARE_METADATA_ADDR + 2 * FLASH_PAGE_SIZE;
/// Capacity staged/written for an update: 16 KiB image + 16-byte tag.
pub const FIRMWARE_STORAGE_CAPACITY: usize = 16 * 1024 + 16;
/// Staging buffer size contract: at least `FIRMWARE_STORAGE_CAPACITY`.
pub const FIRMWARE_STAGING_BUF_LEN: usize = FIRMWARE_STORAGE_CAPACITY;
/// `FIRMWARE_STORAGE_CAPACITY` rounded up to a whole number of flash
/// pages (16400 -> 17408, 17 pages). Erasing and programming both operate
/// on whole pages, so the region passed to those calls must span the
/// full physical extent reserved for firmware storage, not just the
/// logical byte count a staged image can occupy.
pub const FIRMWARE_STORAGE_REGION_CAPACITY: u32 =
    (FIRMWARE_STORAGE_CAPACITY as u32).div_ceil(FLASH_PAGE_SIZE) * FLASH_PAGE_SIZE;
/// Readback clamp for the firmware region — a fixed constant deliberately
/// distinct from the storage capacity above (see DESIGN.md Open
/// Question 1).
pub const FIRMWARE_READBACK_CAPACITY: u32 = 16385;

// round_up(FIRMWARE_STORAGE_CAPACITY, FLASH_PAGE_SIZE) = 17 pages (16400 -> 17408).
pub const CONFIGURATION_METADATA_ADDR: u32 = FIRMWARE_STORAGE_ADDR + 17 * FLASH_PAGE_SIZE;

pub const CONFIGURATION_SIZE_OFFSET: u32 = 0;

pub const CONFIGURATION_STORAGE_ADDR: u32 = CONFIGURATION_METADATA_ADDR + FLASH_PAGE_SIZE;
pub const CONFIGURATION_CAPACITY: u32 = 64 * 1024;

/// Configuration wire frame sizes.
pub const CONFIG_DATA_FRAME_LEN: usize = 1024;
pub const CONFIG_TAG_FRAME_LEN: usize = 16;
pub const CONFIG_FRAME_LEN: usize = CONFIG_DATA_FRAME_LEN + CONFIG_TAG_FRAME_LEN;

/// Update wire frame sizes.
pub const UPDATE_VERSION_RECORD_LEN: usize = 32;
pub const TAG_LEN: usize = 16;

/// Secret store: three 16-byte records at word-addressed offsets, in a
/// dedicated page past the end of the configuration storage region,
/// provisioned once out of band.
pub const SECRET_STORE_ADDR: u32 =
    CONFIGURATION_STORAGE_ADDR + CONFIGURATION_CAPACITY;
pub const SECRET_RECORD_LEN: usize = 16;
pub const SECRET_KEY_OFFSET: u32 = 0;
pub const SECRET_IV_OFFSET: u32 = 16;
pub const SECRET_PASSWORD_OFFSET: u32 = 32;

/// Compile-time firmware version floor.
pub const OLDEST_VERSION: u32 = 1;

/// All-ones sentinel meaning "never written" for a size word.
pub const NEVER_WRITTEN: u32 = 0xFFFF_FFFF;

/// RAM execution address for staged firmware.
pub const FIRMWARE_EXEC_ADDR: u32 = 0x2000_4000;

/// Address the staging buffer itself must be linked at: exactly
/// `FIRMWARE_EXEC_ADDR - TAG_LEN`. The boot handler shifts the
/// authenticated plaintext forward by `TAG_LEN` bytes inside the
/// buffer to drop the trailing tag, so pinning the buffer's base here
/// makes that shift land the image precisely at `FIRMWARE_EXEC_ADDR`.
/// `ward-bootloader`'s linker script places `STAGING` at this address;
/// the two must be kept in sync if either changes.
pub const FIRMWARE_STAGING_BASE_ADDR: u32 = FIRMWARE_EXEC_ADDR - TAG_LEN as u32;
