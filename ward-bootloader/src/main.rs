// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Ward bootloader for RP2040: single dispatch loop, four commands
//! (Configure, Update, Readback, Boot).

#![no_std]
#![no_main]

mod flash_driver;
mod jump;
mod peripherals;
mod secret_store;
mod usb_transport;

use defmt_rtt as _;
use panic_probe as _;

use cortex_m_rt::entry;
use rp2040_hal as hal;
use usb_device::class_prelude::UsbBusAllocator;

use flash_driver::Rp2040Flash;
use jump::Rp2040Jumper;
use secret_store::FlashSecretStore;
use usb_transport::UsbTransport;

use ward_common::flash_region::FlashRegion;
use ward_common::handlers::{handle_boot, handle_configure, handle_readback, handle_update};
use ward_common::protocol::{
    Command, FIRMWARE_METADATA_ADDR, FIRMWARE_STAGING_BUF_LEN, FIRMWARE_VERSION_OFFSET,
    FLASH_PAGE_SIZE, NEVER_WRITTEN, OLDEST_VERSION, SECRET_STORE_ADDR,
};

mod _static_assertions {
    // `STAGING` is placed at `FIRMWARE_STAGING_BASE_ADDR` by `memory.x`'s
    // `.staging_ram` section; this only checks the Rust-side constant the
    // linker script was written against still has the expected shape.
    const _: () = assert!(
        ward_common::protocol::FIRMWARE_STAGING_BASE_ADDR + ward_common::protocol::TAG_LEN as u32
            == ward_common::protocol::FIRMWARE_EXEC_ADDR
    );
}
use ward_common::secret_store::Secrets;
use ward_common::transport::SerialTransport;

defmt::timestamp!("{=u64:us}", { 0 });

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

/// Staging RAM for Update and Boot. Neither handler runs concurrently,
/// so aliasing one buffer for both is intentional. `memory.x` places the
/// `.staging_ram` section at `FIRMWARE_STAGING_BASE_ADDR`
/// (`FIRMWARE_EXEC_ADDR - TAG_LEN`), so after the boot handler shifts the
/// authenticated plaintext forward by `TAG_LEN` bytes in place, the
/// image's first byte sits exactly at `FIRMWARE_EXEC_ADDR` and the jump
/// in `jump.rs` lands on it.
#[unsafe(link_section = ".staging_ram")]
static mut STAGING: [u8; FIRMWARE_STAGING_BUF_LEN] = [0u8; FIRMWARE_STAGING_BUF_LEN];

#[entry]
fn main() -> ! {
    defmt::println!("ward bootloader init");

    let mut p = peripherals::init();
    ward_common::blink(&mut p.led_pin, &mut p.timer, 3, 200);

    let mut flash = Rp2040Flash::init();
    let secret_store = FlashSecretStore::new(SECRET_STORE_ADDR);
    let secrets = Secrets::load(&secret_store).expect("secret store read failed");

    seed_version_floor(&mut flash);

    let usb_bus = UsbBusAllocator::new(hal::usb::UsbBus::new(
        p.usb.regs,
        p.usb.dpram,
        p.usb.clock,
        true,
        &mut p.usb.resets,
    ));
    peripherals::store_usb_bus(usb_bus);
    let mut transport = UsbTransport::new(peripherals::usb_bus_ref());
    let jumper = Rp2040Jumper;

    defmt::println!("entering dispatch loop");

    loop {
        let cmd_byte = match transport.read_byte() {
            Ok(b) => b,
            Err(_) => continue,
        };

        // SAFETY: single-threaded dispatch loop, no interrupt touches
        // STAGING, and Update/Boot never run concurrently.
        let staging = unsafe { &mut *core::ptr::addr_of_mut!(STAGING) };

        match Command::decode(cmd_byte) {
            Command::Configure => {
                match handle_configure(&mut transport, &mut flash, &secrets) {
                    Ok(outcome) => defmt::println!("configure: {:?}", defmt::Debug2Format(&outcome)),
                    Err(_) => defmt::println!("configure: transport/flash error"),
                }
            }
            Command::Update => {
                match handle_update(&mut transport, &mut flash, &secrets, staging) {
                    Ok(outcome) => defmt::println!("update: {:?}", defmt::Debug2Format(&outcome)),
                    Err(_) => defmt::println!("update: transport/flash error"),
                }
            }
            Command::Readback => {
                match handle_readback(&mut transport, &mut flash, &secrets) {
                    Ok(outcome) => defmt::println!("readback: {:?}", defmt::Debug2Format(&outcome)),
                    Err(_) => defmt::println!("readback: transport/flash error"),
                }
            }
            Command::Boot => {
                match handle_boot(&mut transport, &mut flash, &secrets, staging, &jumper) {
                    Ok(outcome) => defmt::println!("boot: {:?}", defmt::Debug2Format(&outcome)),
                    Err(_) => defmt::println!("boot: transport/flash error"),
                }
            }
            Command::Unknown(byte) => {
                defmt::println!("unknown command byte 0x{:02x}, discarding", byte);
            }
        }
    }
}

/// First-boot seeding: if the version word has never been written,
/// program it to `OLDEST_VERSION` before entering the loop.
fn seed_version_floor(flash: &mut Rp2040Flash) {
    let metadata = FlashRegion::new(FIRMWARE_METADATA_ADDR, 2 * FLASH_PAGE_SIZE);
    let mut version_bytes = [0u8; 4];
    metadata
        .read(flash, FIRMWARE_VERSION_OFFSET, &mut version_bytes)
        .expect("metadata read failed");
    if u32::from_be_bytes(version_bytes) == NEVER_WRITTEN {
        metadata
            .program_word(flash, FIRMWARE_VERSION_OFFSET, OLDEST_VERSION)
            .expect("version floor seed failed");
    }
}
