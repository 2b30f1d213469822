// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot handler (`B`). Loads, decrypts, and authenticates the stored
//! image, drops its trailing tag by shifting the plaintext forward in
//! place (overlap-safe, back-to-front), emits the release message, and
//! hands off to the firmware. The staging buffer is pinned just below
//! the execution address, so shifting the plaintext forward by 16 bytes
//! inside the buffer is exactly "land the image at the execution
//! address": the concrete offset is a linker concern for
//! `ward-bootloader`, not this crate.

use crate::error::BootError;
use crate::flash_driver::FlashDriver;
use crate::flash_region::FlashRegion;
use crate::protocol::{
    CMD_BOOT, FIRMWARE_EXEC_ADDR, FIRMWARE_METADATA_ADDR, FIRMWARE_RELEASE_MSG_OFFSET,
    FIRMWARE_SIZE_OFFSET, FIRMWARE_STORAGE_ADDR, FIRMWARE_STORAGE_CAPACITY,
    FIRMWARE_STORAGE_REGION_CAPACITY, FLASH_PAGE_SIZE, FRAME_BAD, NEVER_WRITTEN,
    RELEASE_MSG_BUF_LEN, TAG_LEN,
};
use crate::secret_store::Secrets;
use crate::transport::SerialTransport;

/// Transfers control to firmware at an address. The real embedded
/// implementation never returns; this trait leaves the return type `()`
/// so host-side mocks can observe the call rather than diverge.
pub trait Jumper {
    fn jump(&self, exec_addr: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// Size word was all-ones — nothing is staged.
    NoImage,
    /// Size word was written but is not a plausible ciphertext length
    /// for the staging buffer (too short to hold a tag, or too large to
    /// fit) — treated as resource corruption rather than trusted input.
    CorruptSize,
    /// Decryption tag mismatch — the stored image is not trusted.
    BadTag,
    /// Authenticated; control was handed to `exec_addr`.
    HandedOff { exec_addr: u32 },
}

/// `staging` must be at least `FIRMWARE_STORAGE_CAPACITY` bytes — the same
/// RAM the update handler stages into.
pub fn handle_boot<T: SerialTransport, F: FlashDriver, J: Jumper>(
    transport: &mut T,
    flash: &mut F,
    secrets: &Secrets,
    staging: &mut [u8],
    jumper: &J,
) -> Result<BootOutcome, BootError> {
    if staging.len() < FIRMWARE_STORAGE_CAPACITY {
        return Err(BootError::Overflow);
    }

    transport.write_byte(CMD_BOOT)?;

    let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * FLASH_PAGE_SIZE);
    let storage = FlashRegion::new(FIRMWARE_STORAGE_ADDR, FIRMWARE_STORAGE_REGION_CAPACITY);

    let mut size_bytes = [0u8; 4];
    metadata.read(flash, FIRMWARE_SIZE_OFFSET, &mut size_bytes)?;
    let size = u32::from_be_bytes(size_bytes);
    if size == NEVER_WRITTEN {
        transport.write_byte(FRAME_BAD)?;
        return Ok(BootOutcome::NoImage);
    }
    let size = size as usize;
    if size < TAG_LEN || size > staging.len() {
        transport.write_byte(FRAME_BAD)?;
        return Ok(BootOutcome::CorruptSize);
    }

    storage.read(flash, 0, &mut staging[..size])?;
    crate::crypto::decrypt_in_place(&mut staging[..size], &secrets.key, &secrets.iv)?;
    if staging[size - TAG_LEN..size] != secrets.password[..] {
        transport.write_byte(FRAME_BAD)?;
        return Ok(BootOutcome::BadTag);
    }

    // Drop the trailing tag by shifting the image forward 16 bytes,
    // back-to-front so the move is safe despite the overlap.
    let payload_len = size - TAG_LEN;
    for i in (0..payload_len).rev() {
        staging[i + TAG_LEN] = staging[i];
    }

    transport.write_byte(b'M')?;
    let mut msg = [0u8; RELEASE_MSG_BUF_LEN];
    metadata.read(flash, FIRMWARE_RELEASE_MSG_OFFSET, &mut msg)?;
    for &byte in msg.iter() {
        if byte == 0 {
            break;
        }
        transport.write_byte(byte)?;
    }
    transport.write_byte(0)?;

    jumper.jump(FIRMWARE_EXEC_ADDR);
    Ok(BootOutcome::HandedOff { exec_addr: FIRMWARE_EXEC_ADDR })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use crate::testing::{ArrayFlash, MockTransport};
    use core::cell::Cell;

    const KEY: [u8; 16] = *b"0123456789abcdef";
    const IV: [u8; 16] = *b"fedcba9876543210";
    const PASSWORD: [u8; 16] = *b"passwordpassword";

    fn secrets() -> Secrets {
        Secrets { key: KEY, iv: IV, password: PASSWORD }
    }

    struct RecordingJumper {
        called_with: Cell<Option<u32>>,
    }

    impl RecordingJumper {
        fn new() -> Self {
            Self { called_with: Cell::new(None) }
        }
    }

    impl Jumper for RecordingJumper {
        fn jump(&self, exec_addr: u32) {
            self.called_with.set(Some(exec_addr));
        }
    }

    #[test]
    fn corrupt_size_word_refuses_to_boot_instead_of_panicking() {
        let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
        let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * FLASH_PAGE_SIZE);
        // Plausible-looking but corrupted: larger than the staging buffer
        // could ever legitimately hold.
        metadata
            .program_word(&mut flash, FIRMWARE_SIZE_OFFSET, (FIRMWARE_STORAGE_CAPACITY as u32) + 1)
            .unwrap();

        let mut transport = MockTransport::<32>::with_inbox(&[]);
        let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];
        let jumper = RecordingJumper::new();

        let outcome =
            handle_boot(&mut transport, &mut flash, &secrets(), &mut staging, &jumper).unwrap();
        assert_eq!(outcome, BootOutcome::CorruptSize);
        assert_eq!(transport.outbox(), [CMD_BOOT, FRAME_BAD]);
        assert_eq!(jumper.called_with.get(), None);
    }

    #[test]
    fn no_image_refuses_to_boot() {
        let mut transport = MockTransport::<32>::with_inbox(&[]);
        let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
        let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];
        let jumper = RecordingJumper::new();

        let outcome =
            handle_boot(&mut transport, &mut flash, &secrets(), &mut staging, &jumper).unwrap();
        assert_eq!(outcome, BootOutcome::NoImage);
        assert_eq!(transport.outbox(), [CMD_BOOT, FRAME_BAD]);
        assert_eq!(jumper.called_with.get(), None);
    }

    #[test]
    fn authenticated_image_hands_off_and_emits_release_message() {
        let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
        let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * FLASH_PAGE_SIZE);
        let storage = FlashRegion::new(FIRMWARE_STORAGE_ADDR, FIRMWARE_STORAGE_CAPACITY as u32);

        let payload_len = 64;
        let mut plain = heapless::Vec::<u8, 128>::new();
        for i in 0..payload_len {
            plain.push((i as u8).wrapping_add(7)).unwrap();
        }
        plain.extend_from_slice(&PASSWORD).unwrap();
        let size = plain.len();
        let mut ct = plain.clone();
        crypto::encrypt_in_place(&mut ct, &KEY, &IV).unwrap();
        storage.program_page(&mut flash, 0, &ct).unwrap();

        metadata.program_word(&mut flash, FIRMWARE_SIZE_OFFSET, size as u32).unwrap();
        let mut msg = [0xFFu8; RELEASE_MSG_BUF_LEN];
        msg[..6].copy_from_slice(b"hello\0");
        metadata.program_page(&mut flash, FIRMWARE_RELEASE_MSG_OFFSET, &msg[..8]).unwrap();

        let mut transport = MockTransport::<256>::with_inbox(&[]);
        let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];
        let jumper = RecordingJumper::new();

        let outcome =
            handle_boot(&mut transport, &mut flash, &secrets(), &mut staging, &jumper).unwrap();
        assert_eq!(outcome, BootOutcome::HandedOff { exec_addr: FIRMWARE_EXEC_ADDR });
        assert_eq!(jumper.called_with.get(), Some(FIRMWARE_EXEC_ADDR));

        let out = transport.outbox();
        assert_eq!(out[0], CMD_BOOT);
        assert_eq!(out[1], b'M');
        assert_eq!(&out[2..], b"hello\0");

        // Plaintext now begins 16 bytes into the staging buffer.
        assert_eq!(staging[TAG_LEN], 7u8);
        assert_eq!(staging[TAG_LEN + payload_len - 1], (payload_len as u8 - 1).wrapping_add(7));
    }
}
