// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update handler (`U`). Stages a ciphertext image into RAM frame
//! by frame, decrypts and authenticates it as one contiguous CBC chain,
//! then re-encrypts before committing so only ciphertext ever reaches
//! flash.

use crate::crypto;
use crate::error::BootError;
use crate::flash_driver::FlashDriver;
use crate::flash_region::FlashRegion;
use crate::protocol::{
    CMD_UPDATE, FIRMWARE_METADATA_ADDR, FIRMWARE_RELEASE_MSG_OFFSET, FIRMWARE_SIZE_OFFSET,
    FIRMWARE_STORAGE_ADDR, FIRMWARE_STORAGE_CAPACITY, FIRMWARE_STORAGE_REGION_CAPACITY,
    FIRMWARE_VERSION_OFFSET, FLASH_PAGE_SIZE, FRAME_BAD, FRAME_OK, NEVER_WRITTEN,
    RELEASE_MSG_BUF_LEN, RELEASE_MSG_WRITE_LEN, UPDATE_VERSION_RECORD_LEN,
};
use crate::secret_store::Secrets;
use crate::transport::SerialTransport;

/// Result of a completed handler run, for the dispatcher's own bookkeeping.
/// Every outcome has already been communicated to the host over the wire —
/// this value carries no additional acks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Image committed; metadata version left unchanged (host sent 0).
    CommittedKeepVersion,
    /// Image committed with a new stored version.
    CommittedNewVersion(u32),
    /// Rejected — bad tag, rollback violation, or oversized image. The
    /// metadata page was erased (if reached) and left erased: the next
    /// boot sees an all-ones size word and refuses to boot.
    Aborted,
}

/// Run the update handler to completion. `staging` must be at least
/// `FIRMWARE_STORAGE_CAPACITY` bytes — the same RAM the boot handler
/// reuses — aliasing the same RAM for both is intentional.
pub fn handle_update<T: SerialTransport, F: FlashDriver>(
    transport: &mut T,
    flash: &mut F,
    secrets: &Secrets,
    staging: &mut [u8],
) -> Result<UpdateOutcome, BootError> {
    if staging.len() < FIRMWARE_STORAGE_CAPACITY {
        return Err(BootError::Overflow);
    }

    transport.write_byte(CMD_UPDATE)?;

    let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * FLASH_PAGE_SIZE);
    // Erase/program run on whole pages, so the region spans the full
    // page-rounded physical extent rather than the logical byte capacity.
    let storage = FlashRegion::new(FIRMWARE_STORAGE_ADDR, FIRMWARE_STORAGE_REGION_CAPACITY);

    // Step 2-3: version+password record, acked on receipt regardless of
    // validity — the record isn't decrypted until step 6.
    let mut record = [0u8; UPDATE_VERSION_RECORD_LEN];
    transport.read_exact(&mut record)?;
    transport.write_byte(FRAME_OK)?;

    // Step 4-5: declared size and release message, read unconditionally.
    let mut size_bytes = [0u8; 4];
    transport.read_exact(&mut size_bytes)?;
    let size = u32::from_be_bytes(size_bytes) as usize;

    let mut release_msg = [0u8; RELEASE_MSG_BUF_LEN];
    let msg_len = transport.read_line(&mut release_msg)?;

    // Step 6: decrypt the record and validate password tag, rollback, and
    // that the image fits the staging buffer.
    crypto::decrypt_in_place(&mut record, &secrets.key, &secrets.iv)?;
    let tag_ok = record[16..32] == secrets.password[..];

    let mut stored_version_bytes = [0u8; 4];
    metadata.read(flash, FIRMWARE_VERSION_OFFSET, &mut stored_version_bytes)?;
    let stored_version = u32::from_be_bytes(stored_version_bytes);

    let host_version = u16::from_be_bytes([record[0], record[1]]) as u32;
    let rollback_ok = host_version == 0
        || stored_version == NEVER_WRITTEN
        || host_version >= stored_version;
    let size_ok = size > 0 && size <= staging.len();

    if !tag_ok || !rollback_ok || !size_ok {
        transport.write_byte(FRAME_BAD)?;
        return Ok(UpdateOutcome::Aborted);
    }

    // Step 7: validated — ack, erase metadata, stage the image frame by
    // frame. CBC chaining means we cannot pad mid-stream; padding to a
    // full flash page happens only at commit time (see below), on a
    // page-local scratch buffer, never inside `staging` itself.
    transport.write_byte(FRAME_OK)?;
    metadata.erase_page(flash, 0)?;
    metadata.erase_page(flash, FLASH_PAGE_SIZE)?;

    let mut received = 0usize;
    while received < size {
        let take = (size - received).min(FLASH_PAGE_SIZE as usize);
        transport.read_exact(&mut staging[received..received + take])?;
        transport.write_byte(FRAME_OK)?;
        received += take;
    }

    // Step 8: decrypt and authenticate the whole image as one CBC chain.
    crypto::decrypt_in_place(&mut staging[..size], &secrets.key, &secrets.iv)?;
    if staging[size - 16..size] != secrets.password[..] {
        transport.write_byte(FRAME_BAD)?;
        return Ok(UpdateOutcome::Aborted);
    }
    crypto::encrypt_in_place(&mut staging[..size], &secrets.key, &secrets.iv)?;

    // Step 9: commit page by page, padding only the final partial page.
    let mut offset = 0usize;
    while offset < size {
        let take = (size - offset).min(FLASH_PAGE_SIZE as usize);
        let mut page_buf = [0xFFu8; FLASH_PAGE_SIZE as usize];
        page_buf[..take].copy_from_slice(&staging[offset..offset + take]);
        let page_addr = (offset as u32 / FLASH_PAGE_SIZE) * FLASH_PAGE_SIZE;
        storage.erase_page(flash, page_addr)?;
        storage.program_page(flash, page_addr, &page_buf)?;
        offset += take;
    }
    metadata.program_word(flash, FIRMWARE_SIZE_OFFSET, size as u32)?;

    // Step 10: version (if changed), release message, final ack.
    let outcome = if host_version != 0 {
        metadata.program_word(flash, FIRMWARE_VERSION_OFFSET, host_version)?;
        UpdateOutcome::CommittedNewVersion(host_version)
    } else {
        UpdateOutcome::CommittedKeepVersion
    };

    let mut msg_buf = [0xFFu8; RELEASE_MSG_WRITE_LEN];
    msg_buf[..msg_len].copy_from_slice(&release_msg[..msg_len]);
    metadata.program_page(flash, FIRMWARE_RELEASE_MSG_OFFSET, &msg_buf)?;

    transport.write_byte(FRAME_OK)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ArrayFlash, MockTransport};

    const KEY: [u8; 16] = *b"0123456789abcdef";
    const IV: [u8; 16] = *b"fedcba9876543210";
    const PASSWORD: [u8; 16] = *b"passwordpassword";

    fn secrets() -> Secrets {
        Secrets { key: KEY, iv: IV, password: PASSWORD }
    }

    fn encrypted(mut plaintext: heapless::Vec<u8, 17000>) -> heapless::Vec<u8, 17000> {
        crypto::encrypt_in_place(&mut plaintext, &KEY, &IV).unwrap();
        plaintext
    }

    fn version_record(version: u16) -> [u8; 32] {
        let mut plain = [0u8; 32];
        plain[0..2].copy_from_slice(&version.to_be_bytes());
        plain[16..32].copy_from_slice(&PASSWORD);
        let mut ct = plain;
        crypto::encrypt_in_place(&mut ct, &KEY, &IV).unwrap();
        ct
    }

    fn build_inbox(version: u16, image_plain: &[u8], message: &[u8]) -> heapless::Vec<u8, 17100> {
        let mut inbox: heapless::Vec<u8, 17100> = heapless::Vec::new();
        inbox.extend_from_slice(&version_record(version)).unwrap();
        inbox.extend_from_slice(&(image_plain.len() as u32).to_be_bytes()).unwrap();
        inbox.extend_from_slice(message).unwrap();
        inbox.push(0).unwrap();
        let mut image: heapless::Vec<u8, 17000> = heapless::Vec::new();
        image.extend_from_slice(image_plain).unwrap();
        let ct = encrypted(image);
        inbox.extend_from_slice(&ct).unwrap();
        inbox
    }

    fn image_plaintext(payload_len: usize) -> heapless::Vec<u8, 17000> {
        let mut v: heapless::Vec<u8, 17000> = heapless::Vec::new();
        for i in 0..payload_len {
            v.push((i % 251) as u8).unwrap();
        }
        v.extend_from_slice(&PASSWORD).unwrap();
        v
    }

    #[test]
    fn accepts_a_well_formed_image_and_keeps_version_zero() {
        let image = image_plaintext(FIRMWARE_STORAGE_CAPACITY - 16);
        let inbox = build_inbox(0, &image, b"hello");
        let mut transport = MockTransport::<17100>::with_inbox(&inbox);
        let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
        let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];

        let outcome = handle_update(&mut transport, &mut flash, &secrets(), &mut staging).unwrap();
        assert_eq!(outcome, UpdateOutcome::CommittedKeepVersion);

        let out = transport.outbox();
        assert_eq!(out[0], CMD_UPDATE);
        assert_eq!(out[1], FRAME_OK);
        assert_eq!(out[2], FRAME_OK);
        assert_eq!(*out.last().unwrap(), FRAME_OK);
    }

    #[test]
    fn rejects_rollback_to_an_older_version() {
        let image = image_plaintext(32);
        let inbox = build_inbox(3, &image, b"msg");
        let mut transport = MockTransport::<17100>::with_inbox(&inbox);
        let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
        // Seed stored version to 5 before the handler reads it.
        let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * FLASH_PAGE_SIZE);
        metadata.program_word(&mut flash, FIRMWARE_VERSION_OFFSET, 5).unwrap();
        let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];

        let outcome = handle_update(&mut transport, &mut flash, &secrets(), &mut staging).unwrap();
        assert_eq!(outcome, UpdateOutcome::Aborted);
        assert_eq!(transport.outbox(), [CMD_UPDATE, FRAME_OK, FRAME_BAD]);
    }

    #[test]
    fn rejects_a_bad_image_tag() {
        let mut image = image_plaintext(32);
        // Corrupt the trailing password so the image tag check fails.
        let last = image.len() - 1;
        image[last] ^= 0xFF;
        let inbox = build_inbox(0, &image, b"msg");
        let mut transport = MockTransport::<17100>::with_inbox(&inbox);
        let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
        let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];

        let outcome = handle_update(&mut transport, &mut flash, &secrets(), &mut staging).unwrap();
        assert_eq!(outcome, UpdateOutcome::Aborted);
        assert_eq!(*transport.outbox().last().unwrap(), FRAME_BAD);
    }
}
