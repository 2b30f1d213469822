// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! AES-128-CBC wrapper, used both as the confidentiality layer for staged
//! images and as the implicit authentication mechanism: a frame is
//! "authentic" only if decrypting it under the pre-shared key/IV yields a
//! trailing plaintext block equal to the pre-shared password. This module
//! knows nothing about that comparison — handlers perform it themselves
//! after calling `decrypt_in_place`.

use aes::Aes128;
use cbc::{Decryptor, Encryptor};
use cipher::block_padding::NoPadding;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::BootError;

type Aes128CbcDec = Decryptor<Aes128>;
type Aes128CbcEnc = Encryptor<Aes128>;

/// Decrypt `buf` in place under `key`/`iv`. `buf.len()` must be a positive
/// multiple of 16 (the AES block size) — this is a caller contract; the
/// wire protocol carries no padding byte of its own.
pub fn decrypt_in_place(buf: &mut [u8], key: &[u8; 16], iv: &[u8; 16]) -> Result<(), BootError> {
    if buf.is_empty() || buf.len() % 16 != 0 {
        return Err(BootError::Overflow);
    }
    Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|_| BootError::Overflow)?;
    Ok(())
}

/// Encrypt `buf` in place under `key`/`iv`. Used to re-encrypt a staged
/// image before it is committed to flash, so only ciphertext — never the
/// decrypted plaintext firmware — ever reaches flash.
pub fn encrypt_in_place(buf: &mut [u8], key: &[u8; 16], iv: &[u8; 16]) -> Result<(), BootError> {
    if buf.is_empty() || buf.len() % 16 != 0 {
        return Err(BootError::Overflow);
    }
    let len = buf.len();
    Aes128CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(buf, len)
        .map_err(|_| BootError::Overflow)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = *b"0123456789abcdef";
    const IV: [u8; 16] = *b"fedcba9876543210";

    #[test]
    fn decrypt_then_encrypt_round_trips() {
        let original: [u8; 32] = *b"0123456789ABCDEF0123456789ABCDEF";
        let mut buf = original;
        encrypt_in_place(&mut buf, &KEY, &IV).unwrap();
        assert_ne!(buf, original);
        decrypt_in_place(&mut buf, &KEY, &IV).unwrap();
        assert_eq!(buf, original);
    }

    #[test]
    fn rejects_non_block_multiple_length() {
        let mut buf = [0u8; 17];
        assert_eq!(decrypt_in_place(&mut buf, &KEY, &IV), Err(BootError::Overflow));
        assert_eq!(encrypt_in_place(&mut buf, &KEY, &IV), Err(BootError::Overflow));
    }

    #[test]
    fn rejects_empty_buffer() {
        let mut buf: [u8; 0] = [];
        assert_eq!(decrypt_in_place(&mut buf, &KEY, &IV), Err(BootError::Overflow));
    }
}
