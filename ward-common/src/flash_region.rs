// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! `FlashRegion` — a bounds-checked, page-indexed view over a named flash
//! extent, built on top of the narrow `FlashDriver` collaborator.
//!
//! Every raw byte-level flash access a handler needs is expressed as
//! `region.read(offset)` / `region.program_page(offset, &buffer)` rather
//! than a bare pointer-and-length pair. This module does not know about
//! specific named regions (firmware, configuration) — those extents are
//! constants in `protocol.rs` referenced by the handlers.

use crate::error::BootError;
use crate::flash_driver::FlashDriver;
use crate::protocol::FLASH_PAGE_SIZE;

/// A bounds-checked window onto flash: `[base, base + capacity)`.
#[derive(Debug, Clone, Copy)]
pub struct FlashRegion {
    pub base: u32,
    pub capacity: u32,
}

impl FlashRegion {
    pub const fn new(base: u32, capacity: u32) -> Self {
        Self { base, capacity }
    }

    fn check_bounds(&self, offset: u32, len: u32) -> Result<(), BootError> {
        let end = offset.checked_add(len).ok_or(BootError::Overflow)?;
        if end > self.capacity {
            return Err(BootError::Overflow);
        }
        Ok(())
    }

    /// Erase the page at `offset` (must be page-aligned) relative to `base`.
    pub fn erase_page<D: FlashDriver>(&self, driver: &mut D, offset: u32) -> Result<(), BootError> {
        self.check_bounds(offset, FLASH_PAGE_SIZE)?;
        driver.erase_page(self.base + offset)
    }

    /// Program a page-aligned buffer at `offset`. `data.len()` must be a
    /// multiple of 4 bytes; callers pad with 0xFF beforehand.
    pub fn program_page<D: FlashDriver>(
        &self,
        driver: &mut D,
        offset: u32,
        data: &[u8],
    ) -> Result<(), BootError> {
        if data.len() % 4 != 0 {
            return Err(BootError::Overflow);
        }
        self.check_bounds(offset, data.len() as u32)?;
        driver.program_page(self.base + offset, data)
    }

    /// Program a single word at `offset`.
    pub fn program_word<D: FlashDriver>(
        &self,
        driver: &mut D,
        offset: u32,
        value: u32,
    ) -> Result<(), BootError> {
        self.check_bounds(offset, 4)?;
        driver.program_word(self.base + offset, value)
    }

    /// Read `buf.len()` bytes starting at `offset`. Reads past the region
    /// end are rejected — callers that need read-with-padding (readback)
    /// compute the in-bounds length themselves and pad separately.
    pub fn read<D: FlashDriver>(&self, driver: &D, offset: u32, buf: &mut [u8]) -> Result<(), BootError> {
        self.check_bounds(offset, buf.len() as u32)?;
        driver.read(self.base + offset, buf);
        Ok(())
    }

    /// Read up to `buf.len()` bytes, clamped to the region's remaining
    /// capacity from `offset`; returns the number of real bytes read.
    /// Used by handlers that pad the remainder with 0xFF themselves.
    pub fn read_clamped<D: FlashDriver>(&self, driver: &D, offset: u32, buf: &mut [u8]) -> u32 {
        if offset >= self.capacity {
            return 0;
        }
        let available = self.capacity - offset;
        let len = (buf.len() as u32).min(available);
        driver.read(self.base + offset, &mut buf[..len as usize]);
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ArrayFlash;

    #[test]
    fn program_rejects_unaligned_length() {
        let region = FlashRegion::new(0, 4096);
        let mut flash = ArrayFlash::<4096>::new();
        let data = [0u8; 5];
        assert_eq!(
            region.program_page(&mut flash, 0, &data),
            Err(BootError::Overflow)
        );
    }

    #[test]
    fn program_rejects_out_of_bounds_offset() {
        let region = FlashRegion::new(0, 1024);
        let mut flash = ArrayFlash::<1024>::new();
        let data = [0u8; 1024];
        assert_eq!(
            region.program_page(&mut flash, 1024, &data),
            Err(BootError::Overflow)
        );
    }

    #[test]
    fn read_clamped_pads_caller_responsibility() {
        let region = FlashRegion::new(0, 10);
        let flash = ArrayFlash::<10>::new();
        let mut buf = [0u8; 20];
        let n = region.read_clamped(&flash, 0, &mut buf);
        assert_eq!(n, 10);
    }

    #[test]
    fn read_clamped_beyond_capacity_returns_zero() {
        let region = FlashRegion::new(0, 10);
        let flash = ArrayFlash::<10>::new();
        let mut buf = [0u8; 20];
        let n = region.read_clamped(&flash, 15, &mut buf);
        assert_eq!(n, 0);
    }
}
