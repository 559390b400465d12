//! ASCII armor (RFC 4880 section 6)

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Armor type line for exported public keys.
pub const PUBLIC_KEY_BLOCK: &str = "PGP PUBLIC KEY BLOCK";

const LINE_WIDTH: usize = 64;
const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0186_4CFB;

/// Armor decoding error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArmorError {
    #[error("missing armor header line")]
    MissingHeader,

    #[error("missing armor footer line")]
    MissingFooter,

    #[error("invalid base64 in armor body: {0}")]
    Base64(String),

    #[error("armor checksum mismatch")]
    ChecksumMismatch,
}

/// CRC-24 as used by the armor checksum line.
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for byte in data {
        crc ^= u32::from(*byte) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// Armor `data` as a `block_type` block.
pub fn armor(block_type: &str, data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH + 96);

    out.push_str("-----BEGIN ");
    out.push_str(block_type);
    out.push_str("-----\n\n");
    for line in encoded.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }

    let crc = crc24(data).to_be_bytes();
    out.push('=');
    out.push_str(&STANDARD.encode(&crc[1..]));
    out.push('\n');
    out.push_str("-----END ");
    out.push_str(block_type);
    out.push_str("-----\n");
    out
}

/// Decode the first armored block in `text`, verifying the checksum if present.
pub fn dearmor(text: &str) -> Result<Vec<u8>, ArmorError> {
    let mut lines = text.lines().map(str::trim_end);

    lines
        .by_ref()
        .find(|line| line.starts_with("-----BEGIN ") && line.ends_with("-----"))
        .ok_or(ArmorError::MissingHeader)?;

    // Armor headers ("Version: ...") end at the first blank line
    let mut in_headers = true;
    let mut body = String::new();
    let mut checksum = None;
    let mut saw_footer = false;
    for line in lines {
        if line.starts_with("-----END ") {
            saw_footer = true;
            break;
        }
        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if line.contains(": ") {
                continue;
            }
            in_headers = false;
        }
        if let Some(crc) = line.strip_prefix('=') {
            checksum = Some(crc.to_string());
        } else {
            body.push_str(line.trim());
        }
    }
    if !saw_footer {
        return Err(ArmorError::MissingFooter);
    }

    let data = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| ArmorError::Base64(e.to_string()))?;

    if let Some(checksum) = checksum {
        let expected = STANDARD
            .decode(checksum.as_bytes())
            .map_err(|e| ArmorError::Base64(e.to_string()))?;
        let actual = crc24(&data).to_be_bytes();
        if expected.as_slice() != &actual[1..] {
            return Err(ArmorError::ChecksumMismatch);
        }
    }
    Ok(data)
}
