// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Cross-module update-handler scenarios, driven through the public
//! crate API instead of the handler's own private test module.

use ward_common::crypto;
use ward_common::flash_region::FlashRegion;
use ward_common::handlers::update::{handle_update, UpdateOutcome};
use ward_common::protocol::{
    CMD_UPDATE, FIRMWARE_METADATA_ADDR, FIRMWARE_SIZE_OFFSET, FIRMWARE_STORAGE_ADDR,
    FIRMWARE_STORAGE_CAPACITY, FIRMWARE_STORAGE_REGION_CAPACITY, FIRMWARE_VERSION_OFFSET,
    FRAME_BAD, FRAME_OK,
};
use ward_common::secret_store::Secrets;
use ward_common::testing::{ArrayFlash, MockTransport};

const KEY: [u8; 16] = *b"0123456789abcdef";
const IV: [u8; 16] = *b"fedcba9876543210";
const PASSWORD: [u8; 16] = *b"passwordpassword";

fn secrets() -> Secrets {
    Secrets { key: KEY, iv: IV, password: PASSWORD }
}

fn version_record(version: u16) -> [u8; 32] {
    let mut plain = [0u8; 32];
    plain[0..2].copy_from_slice(&version.to_be_bytes());
    plain[16..32].copy_from_slice(&PASSWORD);
    crypto::encrypt_in_place(&mut plain, &KEY, &IV).unwrap();
    plain
}

fn image_plaintext(payload_len: usize) -> heapless::Vec<u8, 17000> {
    let mut v: heapless::Vec<u8, 17000> = heapless::Vec::new();
    for i in 0..payload_len {
        v.push((i % 251) as u8).unwrap();
    }
    v.extend_from_slice(&PASSWORD).unwrap();
    v
}

fn build_inbox(version: u16, image_plain: &[u8], message: &[u8]) -> heapless::Vec<u8, 17100> {
    let mut inbox: heapless::Vec<u8, 17100> = heapless::Vec::new();
    inbox.extend_from_slice(&version_record(version)).unwrap();
    inbox.extend_from_slice(&(image_plain.len() as u32).to_be_bytes()).unwrap();
    inbox.extend_from_slice(message).unwrap();
    inbox.push(0).unwrap();
    let mut image: heapless::Vec<u8, 17000> = heapless::Vec::new();
    image.extend_from_slice(image_plain).unwrap();
    crypto::encrypt_in_place(&mut image, &KEY, &IV).unwrap();
    inbox.extend_from_slice(&image).unwrap();
    inbox
}

/// S2 update accept: provisioned version = 1, host sends a full-capacity
/// image with a new version and a release message. Expected reply shape:
/// `'U'`, record ack, validation ack, one ack per staged page, final ack.
#[test]
fn full_capacity_image_with_new_version_acks_every_page_and_bumps_version() {
    let image = image_plaintext(FIRMWARE_STORAGE_CAPACITY - 16);
    let inbox = build_inbox(2, &image, b"hello");

    let mut transport = MockTransport::<17100>::with_inbox(&inbox);
    let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
    let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * ward_common::protocol::FLASH_PAGE_SIZE);
    metadata.program_word(&mut flash, FIRMWARE_VERSION_OFFSET, 1).unwrap();
    let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];

    let outcome = handle_update(&mut transport, &mut flash, &secrets(), &mut staging).unwrap();
    assert_eq!(outcome, UpdateOutcome::CommittedNewVersion(2));

    let out = transport.outbox();
    assert_eq!(out[0], CMD_UPDATE);
    assert_eq!(out[1], FRAME_OK);
    assert_eq!(out[2], FRAME_OK);
    // 17 page-sized chunks for 16400 bytes, plus the final ack.
    let page_acks = &out[3..out.len() - 1];
    assert_eq!(page_acks.len(), 17);
    assert!(page_acks.iter().all(|&b| b == FRAME_OK));
    assert_eq!(*out.last().unwrap(), FRAME_OK);

    let mut stored = [0u8; 4];
    metadata.read(&flash, FIRMWARE_VERSION_OFFSET, &mut stored).unwrap();
    assert_eq!(u32::from_be_bytes(stored), 2);
}

/// S3 rollback reject: stored version = 5, host sends version = 3.
/// Expected: `'U'`, record ack, `FRAME_BAD`; no metadata written.
#[test]
fn stale_version_is_rejected_and_leaves_stored_version_untouched() {
    let image = image_plaintext(32);
    let inbox = build_inbox(3, &image, b"msg");

    let mut transport = MockTransport::<17100>::with_inbox(&inbox);
    let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
    let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * ward_common::protocol::FLASH_PAGE_SIZE);
    metadata.program_word(&mut flash, FIRMWARE_VERSION_OFFSET, 5).unwrap();
    let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];

    let outcome = handle_update(&mut transport, &mut flash, &secrets(), &mut staging).unwrap();
    assert_eq!(outcome, UpdateOutcome::Aborted);
    assert_eq!(transport.outbox(), [CMD_UPDATE, FRAME_OK, FRAME_BAD]);

    let mut stored = [0u8; 4];
    metadata.read(&flash, FIRMWARE_VERSION_OFFSET, &mut stored).unwrap();
    assert_eq!(u32::from_be_bytes(stored), 5);
}

/// Equal version is not a rollback: the boundary case of the invariant
/// `host_version >= stored_version`.
#[test]
fn equal_version_is_accepted_not_treated_as_rollback() {
    let image = image_plaintext(32);
    let inbox = build_inbox(5, &image, b"");

    let mut transport = MockTransport::<17100>::with_inbox(&inbox);
    let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
    let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * ward_common::protocol::FLASH_PAGE_SIZE);
    metadata.program_word(&mut flash, FIRMWARE_VERSION_OFFSET, 5).unwrap();
    let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];

    let outcome = handle_update(&mut transport, &mut flash, &secrets(), &mut staging).unwrap();
    assert_eq!(outcome, UpdateOutcome::CommittedNewVersion(5));
}

/// Invariant: only ciphertext ever reaches flash, and whatever was
/// committed decrypts back to a plaintext ending in the pre-shared
/// password — the property the implicit-tag authentication scheme rests
/// on, checked against the exact bytes the mock flash received rather
/// than the plaintext the test built the frames from.
#[test]
fn committed_flash_bytes_decrypt_to_plaintext_ending_in_password() {
    let payload_len = 512;
    let image = image_plaintext(payload_len);
    let size = image.len();
    let inbox = build_inbox(0, &image, b"");

    let mut transport = MockTransport::<17100>::with_inbox(&inbox);
    let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_METADATA_ADDR);
    let mut staging = [0u8; FIRMWARE_STORAGE_CAPACITY];

    let outcome = handle_update(&mut transport, &mut flash, &secrets(), &mut staging).unwrap();
    assert_eq!(outcome, UpdateOutcome::CommittedKeepVersion);

    let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * ward_common::protocol::FLASH_PAGE_SIZE);
    let mut size_bytes = [0u8; 4];
    metadata.read(&flash, FIRMWARE_SIZE_OFFSET, &mut size_bytes).unwrap();
    assert_eq!(u32::from_be_bytes(size_bytes) as usize, size);

    let storage = FlashRegion::new(FIRMWARE_STORAGE_ADDR, FIRMWARE_STORAGE_REGION_CAPACITY);
    let mut committed = vec![0u8; size];
    storage.read(&flash, 0, &mut committed).unwrap();
    assert_ne!(&committed[..], &image[..size], "flash must hold ciphertext, not the plaintext staged from the wire");

    crypto::decrypt_in_place(&mut committed, &KEY, &IV).unwrap();
    assert_eq!(&committed[committed.len() - 16..], &PASSWORD[..]);
}
