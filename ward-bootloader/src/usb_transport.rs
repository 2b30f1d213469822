// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! USB CDC transport carrying the raw, unframed wire protocol: no COBS,
//! no postcard — handlers read and write fixed-length byte runs
//! directly, so this transport just needs to block until bytes are
//! available or sent.

use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_serial::SerialPort;
use ward_common::error::BootError;
use ward_common::transport::SerialTransport;

const RX_BUF_SIZE: usize = 256;

pub struct UsbTransport {
    serial: SerialPort<'static, UsbBus>,
    usb_dev: UsbDevice<'static, UsbBus>,
    rx_buf: [u8; RX_BUF_SIZE],
    rx_len: usize,
    rx_pos: usize,
}

impl UsbTransport {
    pub fn new(usb_bus: &'static UsbBusAllocator<UsbBus>) -> Self {
        let serial = SerialPort::new(usb_bus);
        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x2E8A, 0x000B))
            .strings(&[StringDescriptors::default()
                .manufacturer("ADNT")
                .product("Ward Bootloader")
                .serial_number("0001")])
            .unwrap()
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();

        Self {
            serial,
            usb_dev,
            rx_buf: [0u8; RX_BUF_SIZE],
            rx_len: 0,
            rx_pos: 0,
        }
    }

    /// Poll the USB stack. Must be called frequently, including while
    /// blocking inside the `SerialTransport` methods below.
    pub fn poll(&mut self) -> bool {
        self.usb_dev.poll(&mut [&mut self.serial])
    }

    fn fill_rx_buf(&mut self) {
        while self.rx_pos >= self.rx_len {
            self.poll();
            match self.serial.read(&mut self.rx_buf) {
                Ok(count) if count > 0 => {
                    self.rx_len = count;
                    self.rx_pos = 0;
                }
                _ => continue,
            }
        }
    }
}

impl SerialTransport for UsbTransport {
    fn read_byte(&mut self) -> Result<u8, BootError> {
        self.fill_rx_buf();
        let byte = self.rx_buf[self.rx_pos];
        self.rx_pos += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), BootError> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, BootError> {
        let mut n = 0;
        while n < buf.len() {
            let byte = self.read_byte()?;
            buf[n] = byte;
            n += 1;
            if byte == 0 {
                return Ok(n);
            }
        }
        Err(BootError::Overflow)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), BootError> {
        self.write_exact(&[byte])
    }

    fn write_exact(&mut self, buf: &[u8]) -> Result<(), BootError> {
        let mut offset = 0;
        while offset < buf.len() {
            self.poll();
            match self.serial.write(&buf[offset..]) {
                Ok(n) => offset += n,
                Err(UsbError::WouldBlock) => continue,
                Err(_) => return Err(BootError::FlashFault),
            }
        }
        Ok(())
    }
}
