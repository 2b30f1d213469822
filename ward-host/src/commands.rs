// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host-side mirror of the four wire handlers: builds the same
//! ciphertext frames the device expects, drives the ack sequence, and
//! reports the outcome.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use ward_common::crypto;
use ward_common::protocol::{
    CMD_BOOT, CMD_CONFIGURE, CMD_READBACK, CMD_UPDATE, CONFIG_DATA_FRAME_LEN, CONFIG_FRAME_LEN,
    FLASH_PAGE_SIZE, FRAME_BAD, REGION_CONFIGURATION, REGION_FIRMWARE, REGION_UNKNOWN, TAG_LEN,
};
use ward_common::secret_store::Secrets;

use crate::transport::Transport;

/// Upload a firmware image with version `version` (0 = "do not change the
/// stored version") and a release message.
pub fn update(
    transport: &mut Transport,
    secrets: &Secrets,
    firmware_path: &Path,
    version: u32,
    message: &str,
) -> Result<()> {
    if version > u16::MAX as u32 {
        bail!("version must fit in 16 bits (got {version})");
    }
    let firmware = fs::read(firmware_path)
        .with_context(|| format!("failed to read {}", firmware_path.display()))?;

    let mut image = firmware;
    image.extend_from_slice(&secrets.password);
    if image.is_empty() || image.len() % 16 != 0 {
        bail!(
            "firmware + 16-byte tag must be a positive multiple of 16 bytes (got {})",
            image.len()
        );
    }
    crypto::encrypt_in_place(&mut image, &secrets.key, &secrets.iv)
        .map_err(|e| anyhow!("failed to encrypt image: {e:?}"))?;

    let mut record = [0u8; 32];
    record[0..2].copy_from_slice(&(version as u16).to_be_bytes());
    record[16..32].copy_from_slice(&secrets.password);
    crypto::encrypt_in_place(&mut record, &secrets.key, &secrets.iv)
        .map_err(|e| anyhow!("failed to encrypt version record: {e:?}"))?;

    println!(
        "Firmware: {} ({} bytes ciphertext incl. tag)",
        firmware_path.display(),
        image.len()
    );
    println!("Version:  {}", if version == 0 { "unchanged".to_string() } else { version.to_string() });
    println!("Message:  {message:?}");

    transport.write_byte(CMD_UPDATE)?;
    transport.expect_echo(CMD_UPDATE)?;

    transport.write_exact(&record)?;
    transport.expect_ack()?;

    transport.write_exact(&(image.len() as u32).to_be_bytes())?;
    let mut msg_bytes = message.as_bytes().to_vec();
    msg_bytes.push(0);
    transport.write_exact(&msg_bytes)?;

    transport
        .expect_ack()
        .context("device rejected the image (bad password tag or rollback)")?;

    let pb = ProgressBar::new(image.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes}")?
            .progress_chars("#>-"),
    );

    let mut offset = 0usize;
    while offset < image.len() {
        let take = (image.len() - offset).min(FLASH_PAGE_SIZE as usize);
        transport.write_exact(&image[offset..offset + take])?;
        transport.expect_ack()?;
        offset += take;
        pb.set_position(offset as u64);
    }
    pb.finish_with_message("staged");

    transport
        .expect_ack()
        .context("device failed to commit the staged image")?;

    println!("Update committed.");
    Ok(())
}

/// Upload a configuration blob, framed as 1024-byte data + 16-byte tag
/// frames. The final frame is zero-padded up to 1024 bytes.
pub fn configure(transport: &mut Transport, secrets: &Secrets, config_path: &Path) -> Result<()> {
    let payload = fs::read(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;

    let empty_frame: [u8; 0] = [];
    let chunks: Vec<&[u8]> = if payload.is_empty() {
        vec![&empty_frame[..]]
    } else {
        payload.chunks(CONFIG_DATA_FRAME_LEN).collect()
    };
    let frame_count = chunks.len();
    let total_size = (frame_count * CONFIG_FRAME_LEN) as u32;

    println!(
        "Configuration: {} ({} bytes, {} frame(s))",
        config_path.display(),
        payload.len(),
        frame_count
    );

    transport.write_byte(CMD_CONFIGURE)?;
    transport.expect_echo(CMD_CONFIGURE)?;
    transport.write_exact(&total_size.to_be_bytes())?;
    transport.expect_ack()?;

    let pb = ProgressBar::new(frame_count as u64);
    for (i, chunk) in chunks.into_iter().enumerate() {
        let mut frame = [0u8; CONFIG_FRAME_LEN];
        frame[..chunk.len()].copy_from_slice(chunk);
        frame[CONFIG_DATA_FRAME_LEN..].copy_from_slice(&secrets.password);
        crypto::encrypt_in_place(&mut frame, &secrets.key, &secrets.iv)
            .map_err(|e| anyhow!("failed to encrypt frame {i}: {e:?}"))?;

        transport.write_exact(&frame[..CONFIG_DATA_FRAME_LEN])?;
        transport.expect_ack()?;
        transport.write_exact(&frame[CONFIG_DATA_FRAME_LEN..])?;
        transport
            .expect_ack()
            .with_context(|| format!("device rejected frame {i} (bad tag)"))?;
        pb.inc(1);
    }
    pb.finish_with_message("committed");

    println!("Configuration committed.");
    Ok(())
}

/// Dump up to `size` bytes from a named region. Firmware is
/// returned as ciphertext; pass `--decrypt` to strip and verify the tag
/// locally instead of writing the raw bytes.
pub fn readback(
    transport: &mut Transport,
    secrets: &Secrets,
    region: char,
    size: u32,
    out_path: &Path,
    decrypt: bool,
) -> Result<()> {
    let region_byte = match region.to_ascii_uppercase() {
        'F' => REGION_FIRMWARE,
        'C' => REGION_CONFIGURATION,
        other => bail!("unknown region '{other}', expected 'F' or 'C'"),
    };

    transport.write_byte(CMD_READBACK)?;
    transport.expect_echo(CMD_READBACK)?;

    transport.write_exact(&secrets.password)?;
    transport.expect_ack()?;
    transport
        .expect_ack()
        .context("device rejected the readback password")?;

    transport.write_byte(region_byte)?;
    let echoed = transport.read_byte()?;
    if echoed == REGION_UNKNOWN {
        bail!("device reported an unknown region for '{region}'");
    }
    if echoed != region_byte {
        bail!("unexpected region echo 0x{echoed:02x}");
    }

    transport.write_exact(&size.to_be_bytes())?;
    let mut buf = vec![0u8; size as usize];
    transport.read_exact(&mut buf)?;

    if decrypt {
        if region_byte != REGION_FIRMWARE {
            bail!("--decrypt only applies to the firmware region");
        }
        if buf.len() < TAG_LEN || buf.len() % 16 != 0 {
            bail!("readback length {} is not a valid ciphertext length", buf.len());
        }
        crypto::decrypt_in_place(&mut buf, &secrets.key, &secrets.iv)
            .map_err(|e| anyhow!("failed to decrypt readback: {e:?}"))?;
        if buf[buf.len() - TAG_LEN..] != secrets.password {
            bail!("decrypted readback does not end in the password — not an authentic image");
        }
        buf.truncate(buf.len() - TAG_LEN);
    }

    fs::write(out_path, &buf).with_context(|| format!("failed to write {}", out_path.display()))?;
    println!("Wrote {} bytes to {}", buf.len(), out_path.display());
    Ok(())
}

/// Trigger the boot handler and print whatever the device reports. A
/// successful boot hands off to firmware and the serial connection goes
/// away — `read_byte` erroring out at that point is expected, not a bug.
pub fn boot(transport: &mut Transport) -> Result<()> {
    transport.write_byte(CMD_BOOT)?;
    transport.expect_echo(CMD_BOOT)?;

    match transport.read_byte()? {
        FRAME_BAD => bail!("device refused to boot: no valid stored image"),
        b'M' => {
            let mut msg = Vec::new();
            loop {
                let b = transport.read_byte()?;
                if b == 0 {
                    break;
                }
                msg.push(b);
            }
            println!("Booting. Release message: {}", String::from_utf8_lossy(&msg));
            Ok(())
        }
        other => bail!("unexpected reply byte 0x{other:02x} from boot handler"),
    }
}
