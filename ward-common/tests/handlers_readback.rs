// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Cross-module readback-handler scenarios, driven through the public
//! crate API instead of the handler's own private test module.

use ward_common::handlers::readback::{handle_readback, ReadbackOutcome};
use ward_common::protocol::{
    CMD_READBACK, FIRMWARE_READBACK_CAPACITY, FIRMWARE_STORAGE_ADDR, FRAME_BAD, FRAME_OK,
    REGION_FIRMWARE, REGION_UNKNOWN,
};
use ward_common::secret_store::Secrets;
use ward_common::testing::{ArrayFlash, MockTransport};

const PASSWORD: [u8; 16] = *b"passwordpassword";

fn secrets() -> Secrets {
    Secrets { key: [0u8; 16], iv: [0u8; 16], password: PASSWORD }
}

/// S4 readback wrong password: host sends 16 bytes that do not match the
/// provisioned password. Expected: `'R'`, `0x00`, `0x01`; no data.
#[test]
fn wrong_password_is_rejected_before_any_data_is_emitted() {
    let mut inbox: heapless::Vec<u8, 64> = heapless::Vec::new();
    inbox.extend_from_slice(&[0xAAu8; 16]).unwrap();
    let mut transport = MockTransport::<64>::with_inbox(&inbox);
    let mut flash = ArrayFlash::<1024>::new_at(FIRMWARE_STORAGE_ADDR);

    let outcome = handle_readback(&mut transport, &mut flash, &secrets()).unwrap();

    assert_eq!(outcome, ReadbackOutcome::WrongPassword);
    assert_eq!(transport.outbox(), [CMD_READBACK, FRAME_OK, FRAME_BAD]);
}

/// S5 readback oversize firmware: region capacity 16385, host requests
/// 0x5000 bytes. Expected: 16385 stored bytes followed by 0x5000 -
/// 16385 bytes of `0xFF`.
#[test]
fn oversized_firmware_request_is_padded_past_region_capacity() {
    let mut inbox: heapless::Vec<u8, 64> = heapless::Vec::new();
    inbox.extend_from_slice(&PASSWORD).unwrap();
    inbox.push(REGION_FIRMWARE).unwrap();
    let requested: u32 = 0x5000;
    inbox.extend_from_slice(&requested.to_be_bytes()).unwrap();

    let mut transport = MockTransport::<64>::with_inbox(&inbox);
    let mut flash = ArrayFlash::<{ 20 * 1024 }>::new_at(FIRMWARE_STORAGE_ADDR);

    let outcome = handle_readback(&mut transport, &mut flash, &secrets()).unwrap();

    assert_eq!(
        outcome,
        ReadbackOutcome::Dumped { region: REGION_FIRMWARE, bytes_emitted: requested }
    );
    let payload = &transport.outbox()[4..];
    assert_eq!(payload.len(), requested as usize);
    assert_eq!(
        payload[FIRMWARE_READBACK_CAPACITY as usize..]
            .iter()
            .filter(|&&b| b == 0xFF)
            .count(),
        (requested - FIRMWARE_READBACK_CAPACITY) as usize
    );
}

/// An unrecognized region byte is echoed as `REGION_UNKNOWN` and the
/// handler stops without ever reading a requested size.
#[test]
fn unrecognized_region_byte_short_circuits_before_reading_a_size() {
    let mut inbox: heapless::Vec<u8, 64> = heapless::Vec::new();
    inbox.extend_from_slice(&PASSWORD).unwrap();
    inbox.push(b'?').unwrap();
    let mut transport = MockTransport::<64>::with_inbox(&inbox);
    let mut flash = ArrayFlash::<1024>::new_at(FIRMWARE_STORAGE_ADDR);

    let outcome = handle_readback(&mut transport, &mut flash, &secrets()).unwrap();

    assert_eq!(outcome, ReadbackOutcome::UnknownRegion);
    assert_eq!(transport.remaining(), 0);
    assert_eq!(
        transport.outbox(),
        [CMD_READBACK, FRAME_OK, FRAME_OK, REGION_UNKNOWN]
    );
}
