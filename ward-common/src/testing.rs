// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory `FlashDriver` / `SerialTransport` doubles for a
//! hardware-independent test harness. Built on `heapless` only, so these
//! doubles compile under `no_std` and can be linked into the crate's own
//! unit tests as well as its `tests/` integration suite. Gated behind the
//! `test-util` feature, which is on by default.

use crate::error::BootError;
use crate::flash_driver::FlashDriver;
use crate::protocol::FLASH_PAGE_SIZE;
use crate::transport::SerialTransport;

/// A flat, fixed-size byte array standing in for a flash chip. `N` is the
/// size of the simulated device; `base` is the absolute address the first
/// byte of `mem` represents, so callers can simulate a window onto the
/// real address space (e.g. `ArrayFlash::new_at(FIRMWARE_METADATA_ADDR)`)
/// without allocating the whole chip.
pub struct ArrayFlash<const N: usize> {
    base: u32,
    mem: [u8; N],
}

impl<const N: usize> ArrayFlash<N> {
    pub fn new() -> Self {
        Self::new_at(0)
    }

    pub fn new_at(base: u32) -> Self {
        Self { base, mem: [0xFF; N] }
    }

    pub fn contents(&self) -> &[u8; N] {
        &self.mem
    }

    fn index(&self, addr: u32, len: usize) -> Result<(usize, usize), BootError> {
        let start = addr.checked_sub(self.base).ok_or(BootError::Overflow)? as usize;
        let end = start + len;
        if end > N {
            return Err(BootError::Overflow);
        }
        Ok((start, end))
    }
}

impl<const N: usize> Default for ArrayFlash<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FlashDriver for ArrayFlash<N> {
    fn erase_page(&mut self, addr: u32) -> Result<(), BootError> {
        let (start, end) = self.index(addr, FLASH_PAGE_SIZE as usize)?;
        self.mem[start..end].fill(0xFF);
        Ok(())
    }

    fn program_page(&mut self, addr: u32, data: &[u8]) -> Result<(), BootError> {
        let (start, end) = self.index(addr, data.len())?;
        self.mem[start..end].copy_from_slice(data);
        Ok(())
    }

    fn program_word(&mut self, addr: u32, value: u32) -> Result<(), BootError> {
        self.program_page(addr, &value.to_be_bytes())
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        match self.index(addr, buf.len()) {
            Ok((start, end)) => buf.copy_from_slice(&self.mem[start..end]),
            Err(_) => buf.fill(0xFF),
        }
    }
}

/// A `SerialTransport` double: reads come from a pre-loaded inbox, writes
/// accumulate into an outbox. `N` bounds both buffers.
pub struct MockTransport<const N: usize> {
    inbox: heapless::Vec<u8, N>,
    pos: usize,
    outbox: heapless::Vec<u8, N>,
}

impl<const N: usize> MockTransport<N> {
    pub fn with_inbox(bytes: &[u8]) -> Self {
        let mut inbox = heapless::Vec::new();
        inbox.extend_from_slice(bytes).expect("inbox overflow in test fixture");
        Self { inbox, pos: 0, outbox: heapless::Vec::new() }
    }

    pub fn outbox(&self) -> &[u8] {
        &self.outbox
    }

    pub fn remaining(&self) -> usize {
        self.inbox.len() - self.pos
    }
}

impl<const N: usize> SerialTransport for MockTransport<N> {
    fn read_byte(&mut self) -> Result<u8, BootError> {
        let byte = *self.inbox.get(self.pos).ok_or(BootError::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), BootError> {
        if self.remaining() < buf.len() {
            return Err(BootError::Truncated);
        }
        buf.copy_from_slice(&self.inbox[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, BootError> {
        let mut n = 0;
        while n < buf.len() {
            let byte = self.read_byte()?;
            buf[n] = byte;
            n += 1;
            if byte == b'\0' {
                return Ok(n);
            }
        }
        Err(BootError::Overflow)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), BootError> {
        self.outbox.push(byte).map_err(|_| BootError::Overflow)
    }

    fn write_exact(&mut self, buf: &[u8]) -> Result<(), BootError> {
        self.outbox.extend_from_slice(buf).map_err(|_| BootError::Overflow)
    }
}
