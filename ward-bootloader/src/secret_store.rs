// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! `SecretStore` over the provisioned secret-store flash page: key,
//! IV, and password, each a 16-byte record read as four little-endian
//! `u32` words whose bytes are unpacked low-to-high. This region is never
//! erased or programmed at runtime — it is provisioned once, out of
//! band, before the bootloader ever runs.

use ward_common::error::BootError;
use ward_common::secret_store::SecretStore;

pub struct FlashSecretStore {
    base: u32,
}

impl FlashSecretStore {
    pub const fn new(base: u32) -> Self {
        Self { base }
    }
}

impl SecretStore for FlashSecretStore {
    fn read_words(&self, offset: u32, buf: &mut [u8]) -> Result<(), BootError> {
        if buf.len() % 4 != 0 {
            return Err(BootError::Overflow);
        }
        let mut addr = self.base + offset;
        for word_buf in buf.chunks_mut(4) {
            let word = unsafe { (addr as *const u32).read_volatile() };
            word_buf.copy_from_slice(&word.to_le_bytes());
            addr += 4;
        }
        Ok(())
    }
}
