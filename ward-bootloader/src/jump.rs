// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The one raw-address jump the design accepts. Once the boot handler
//! has authenticated the staged image and shifted it into place at the
//! execution address, control transfers via a Thumb function pointer at
//! `exec_addr + 1` — no vector-table relocation, no A/B bank bookkeeping,
//! just a literal handoff.
//!
//! # Safety contract
//! Must be called only from the dispatcher, after `handle_boot` has
//! returned `BootOutcome::HandedOff`, with interrupts masked as done here.
//! The call never returns.

use ward_common::handlers::boot::Jumper;

pub struct Rp2040Jumper;

impl Jumper for Rp2040Jumper {
    fn jump(&self, exec_addr: u32) {
        unsafe { jump_to_address(exec_addr) }
    }
}

unsafe fn jump_to_address(exec_addr: u32) -> ! {
    cortex_m::interrupt::disable();

    // Clear and disable every NVIC interrupt so the firmware starts from
    // a known state.
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);
    NVIC_ICER.write_volatile(0xFFFF_FFFF);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();

    let entry: extern "C" fn() -> ! = core::mem::transmute(exec_addr + 1);
    entry()
}
