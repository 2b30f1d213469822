// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! `FlashDriver` implementation over RP2040 ROM routines.
//!
//! On RP2040, flash operations (erase/program) require tearing down XIP
//! first. The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash. We
//! use `#[link_section = ".data"]` to place the critical functions in RAM
//! and pre-resolve all ROM function pointers once at init time.
//!
//! RP2040's erase granularity (one 4096-byte sector) is coarser than the
//! `FLASH_PAGE_SIZE` (1024 bytes) the rest of the workspace treats as the
//! logical program/erase unit (ward_common::protocol documents this
//! split). `erase_page` below hides the mismatch: it reads the enclosing
//! sector into a scratch buffer, blanks only the caller's page-sized
//! window, erases the whole sector, and reprograms everything outside
//! that window — so erasing one logical page never destroys a sibling
//! page already committed earlier in the same sector.
//!
//! `flash_range_program` has a matching constraint of its own: the ROM
//! requires a 256-byte-aligned address and a length that is a multiple
//! of 256 bytes. Callers here pass arbitrary word-aligned addresses and
//! lengths (a 4-byte version word, a 1028-byte release message that can
//! straddle two logical pages). `program_bytes` below chunks any such
//! write into 256-byte ROM pages, read-modify-writing each one exactly
//! like `erase_page` does for sectors.

use ward_common::error::BootError;
use ward_common::flash_driver::FlashDriver;
use ward_common::protocol::FLASH_PAGE_SIZE;

const FLASH_SECTOR_SIZE: u32 = 4096;
const FLASH_BASE: u32 = 0x1000_0000;
/// `flash_range_program`'s required address alignment and length granularity.
const ROM_PROGRAM_ALIGN: u32 = 256;

type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag. The ROM table pointer
/// at 0x14 and the lookup function pointer at 0x18 are 16-bit halfword
/// pointers, per the RP2040 bootrom ABI.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

fn addr_to_offset(abs_addr: u32) -> u32 {
    abs_addr - FLASH_BASE
}

/// Read `buf.len()` bytes from an absolute XIP address via volatile reads.
fn flash_read_raw(abs_addr: u32, buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = unsafe { ((abs_addr + i as u32) as *const u8).read_volatile() };
    }
}

#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_erase_raw(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_SECTOR_SIZE, 0x20);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_program_raw(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// `FlashDriver` over the on-chip XIP flash. Must be constructed once at
/// startup, before any handler touches flash.
pub struct Rp2040Flash;

impl Rp2040Flash {
    /// Resolve the ROM function pointers. Requires XIP to be active, so
    /// this must run before flash_exit_xip is ever called.
    pub fn init() -> Self {
        unsafe {
            ROM_CONNECT_INTERNAL_FLASH =
                core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
            ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
            ROM_FLASH_RANGE_ERASE =
                core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
            ROM_FLASH_RANGE_PROGRAM =
                core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
            ROM_FLASH_FLUSH_CACHE =
                core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
            ROM_FLASH_ENTER_CMD_XIP =
                core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
        }
        Self
    }
}

impl FlashDriver for Rp2040Flash {
    fn erase_page(&mut self, addr: u32) -> Result<(), BootError> {
        let sector_addr = addr & !(FLASH_SECTOR_SIZE - 1);
        let page_off = (addr - sector_addr) as usize;
        if page_off + FLASH_PAGE_SIZE as usize > FLASH_SECTOR_SIZE as usize {
            return Err(BootError::Overflow);
        }

        let mut sector = [0u8; FLASH_SECTOR_SIZE as usize];
        flash_read_raw(sector_addr, &mut sector);
        sector[page_off..page_off + FLASH_PAGE_SIZE as usize].fill(0xFF);

        let offset = addr_to_offset(sector_addr);
        unsafe {
            flash_erase_raw(offset, FLASH_SECTOR_SIZE);
            flash_program_raw(offset, sector.as_ptr(), sector.len());
        }
        Ok(())
    }

    fn program_page(&mut self, addr: u32, data: &[u8]) -> Result<(), BootError> {
        if data.is_empty() || data.len() % 4 != 0 {
            return Err(BootError::Overflow);
        }
        program_bytes(addr, data);
        Ok(())
    }

    fn program_word(&mut self, addr: u32, value: u32) -> Result<(), BootError> {
        self.program_page(addr, &value.to_be_bytes())
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        flash_read_raw(addr, buf);
    }
}

/// Program an arbitrary word-aligned `addr`/`data` pair by chunking it
/// into 256-byte, 256-byte-aligned ROM program calls. Each chunk is
/// read-modify-written: the enclosing ROM page is read back, the
/// caller's bytes are overlaid at their offset within it, and the whole
/// 256-byte page is reprogrammed — bytes outside the caller's window
/// were already committed (or erased to 0xFF) and reprogramming them
/// with their current value is a no-op for the ROM.
fn program_bytes(addr: u32, data: &[u8]) {
    let mut cursor = addr;
    let mut remaining = data;

    while !remaining.is_empty() {
        let rom_page_addr = cursor & !(ROM_PROGRAM_ALIGN - 1);
        let page_off = (cursor - rom_page_addr) as usize;
        let take = remaining.len().min(ROM_PROGRAM_ALIGN as usize - page_off);

        let mut page = [0u8; ROM_PROGRAM_ALIGN as usize];
        flash_read_raw(rom_page_addr, &mut page);
        page[page_off..page_off + take].copy_from_slice(&remaining[..take]);

        unsafe {
            flash_program_raw(addr_to_offset(rom_page_addr), page.as_ptr(), page.len());
        }

        cursor += take as u32;
        remaining = &remaining[take..];
    }
}
