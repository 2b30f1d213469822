// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Pre-shared secret access. The three 16-byte records (AES key, IV,
//! password) are provisioned once at build time into a dedicated,
//! write-protected flash region and are read-only at runtime — there
//! is no handler that writes them.

use crate::error::BootError;
use crate::protocol::{SECRET_IV_OFFSET, SECRET_KEY_OFFSET, SECRET_PASSWORD_OFFSET, SECRET_RECORD_LEN};

/// Word-addressed read access to the secret region. Concrete
/// implementations read directly out of flash; `FlashDriver` is not reused
/// here because the secret region is never erased or programmed at
/// runtime — it is provisioned once, not updated.
pub trait SecretStore {
    /// Read `buf.len()` bytes (a multiple of 4) starting at `offset`.
    fn read_words(&self, offset: u32, buf: &mut [u8]) -> Result<(), BootError>;
}

/// The three pre-shared secrets, decoded from a `SecretStore`.
#[derive(Clone, Copy)]
pub struct Secrets {
    pub key: [u8; 16],
    pub iv: [u8; 16],
    pub password: [u8; 16],
}

impl Secrets {
    pub fn load<S: SecretStore>(store: &S) -> Result<Self, BootError> {
        let mut key = [0u8; SECRET_RECORD_LEN];
        let mut iv = [0u8; SECRET_RECORD_LEN];
        let mut password = [0u8; SECRET_RECORD_LEN];
        store.read_words(SECRET_KEY_OFFSET, &mut key)?;
        store.read_words(SECRET_IV_OFFSET, &mut iv)?;
        store.read_words(SECRET_PASSWORD_OFFSET, &mut password)?;
        Ok(Self { key, iv, password })
    }
}
