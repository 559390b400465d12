//! OpenPGP packet framing (RFC 4880 section 4)
//!
//! Only what a keyring reader needs: split a byte stream into packets, find
//! where the public part of a key packet ends, and compute v4 fingerprints.

use sha1::{Digest, Sha1};
use thiserror::Error;

pub const TAG_SIGNATURE: u8 = 2;
pub const TAG_SECRET_KEY: u8 = 5;
pub const TAG_PUBLIC_KEY: u8 = 6;
pub const TAG_SECRET_SUBKEY: u8 = 7;
pub const TAG_TRUST: u8 = 12;
pub const TAG_USER_ID: u8 = 13;
pub const TAG_PUBLIC_SUBKEY: u8 = 14;

/// Packet framing or key layout error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("truncated packet at offset {0}")]
    Truncated(usize),

    #[error("invalid packet header {byte:#04x} at offset {offset}")]
    InvalidHeader { byte: u8, offset: usize },

    #[error("partial body length at offset {0} is not valid in a keyring")]
    PartialLength(usize),

    #[error("unsupported key packet version {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported public key algorithm {0}")]
    UnsupportedAlgorithm(u8),
}

impl PacketError {
    /// A well-formed key this reader cannot handle; the rest of the keyring
    /// is still readable.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedVersion(_) | Self::UnsupportedAlgorithm(_))
    }
}

/// A single packet: tag and body, header stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub tag: u8,
    pub body: Vec<u8>,
}

impl Packet {
    pub fn new(tag: u8, body: Vec<u8>) -> Self {
        Self { tag, body }
    }

    /// Append this packet with a new-format header.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(0xC0 | self.tag);
        let len = self.body.len();
        if len < 192 {
            out.push(len as u8);
        } else if len < 8384 {
            let adjusted = len - 192;
            out.push(((adjusted >> 8) + 192) as u8);
            out.push((adjusted & 0xFF) as u8);
        } else {
            out.push(0xFF);
            out.extend_from_slice(&(len as u32).to_be_bytes());
        }
        out.extend_from_slice(&self.body);
    }
}

/// Split `data` into packets, accepting old and new header formats.
pub fn read_packets(data: &[u8]) -> Result<Vec<Packet>, PacketError> {
    let mut packets = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let (packet, next) = read_packet(data, pos)?;
        packets.push(packet);
        pos = next;
    }
    Ok(packets)
}

fn read_packet(data: &[u8], start: usize) -> Result<(Packet, usize), PacketError> {
    let header = byte_at(data, start)?;
    if header & 0x80 == 0 {
        return Err(PacketError::InvalidHeader {
            byte: header,
            offset: start,
        });
    }

    let mut pos = start + 1;
    let (tag, len) = if header & 0x40 != 0 {
        let tag = header & 0x3F;
        let first = byte_at(data, pos)?;
        pos += 1;
        let len = match first {
            0..=191 => usize::from(first),
            192..=223 => {
                let second = byte_at(data, pos)?;
                pos += 1;
                ((usize::from(first) - 192) << 8) + usize::from(second) + 192
            }
            255 => {
                let len = be_uint(data, pos, 4)?;
                pos += 4;
                len
            }
            _ => return Err(PacketError::PartialLength(start)),
        };
        (tag, len)
    } else {
        let tag = (header >> 2) & 0x0F;
        let len = match header & 0x03 {
            0 => {
                let len = be_uint(data, pos, 1)?;
                pos += 1;
                len
            }
            1 => {
                let len = be_uint(data, pos, 2)?;
                pos += 2;
                len
            }
            2 => {
                let len = be_uint(data, pos, 4)?;
                pos += 4;
                len
            }
            // Indeterminate length runs to the end of the stream
            _ => data.len() - pos,
        };
        (tag, len)
    };

    let end = pos.checked_add(len).ok_or(PacketError::Truncated(start))?;
    let body = data.get(pos..end).ok_or(PacketError::Truncated(start))?;
    Ok((Packet::new(tag, body.to_vec()), end))
}

/// Length of the public-key portion of a key packet body.
///
/// Secret key packets start with the same fields as public key packets; the
/// secret material follows. Only v4 keys are supported.
pub fn public_key_len(body: &[u8]) -> Result<usize, PacketError> {
    let version = byte_at(body, 0)?;
    if version != 4 {
        return Err(PacketError::UnsupportedVersion(version));
    }
    // version(1) + creation time(4) + algorithm(1)
    let algorithm = byte_at(body, 5)?;
    let mut pos = 6;
    match algorithm {
        // RSA: n, e
        1..=3 => {
            pos = skip_mpis(body, pos, 2)?;
        }
        // Elgamal: p, g, y
        16 | 20 => {
            pos = skip_mpis(body, pos, 3)?;
        }
        // DSA: p, q, g, y
        17 => {
            pos = skip_mpis(body, pos, 4)?;
        }
        // ECDH: curve OID, point, KDF parameters
        18 => {
            pos = skip_length_prefixed(body, pos)?;
            pos = skip_mpis(body, pos, 1)?;
            pos = skip_length_prefixed(body, pos)?;
        }
        // ECDSA, EdDSA: curve OID, point
        19 | 22 => {
            pos = skip_length_prefixed(body, pos)?;
            pos = skip_mpis(body, pos, 1)?;
        }
        other => return Err(PacketError::UnsupportedAlgorithm(other)),
    }
    Ok(pos)
}

/// V4 fingerprint: SHA-1 over `0x99 || u16 length || public key body`.
pub fn fingerprint_v4(public_body: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update([0x99]);
    hasher.update((public_body.len() as u16).to_be_bytes());
    hasher.update(public_body);
    let mut fingerprint = [0u8; 20];
    fingerprint.copy_from_slice(&hasher.finalize());
    fingerprint
}

fn skip_mpis(body: &[u8], mut pos: usize, count: usize) -> Result<usize, PacketError> {
    for _ in 0..count {
        let bits = be_uint(body, pos, 2)?;
        pos += 2 + bits.div_ceil(8);
        if pos > body.len() {
            return Err(PacketError::Truncated(pos));
        }
    }
    Ok(pos)
}

fn skip_length_prefixed(body: &[u8], pos: usize) -> Result<usize, PacketError> {
    let len = usize::from(byte_at(body, pos)?);
    let end = pos + 1 + len;
    if end > body.len() {
        return Err(PacketError::Truncated(pos));
    }
    Ok(end)
}

fn byte_at(data: &[u8], pos: usize) -> Result<u8, PacketError> {
    data.get(pos).copied().ok_or(PacketError::Truncated(pos))
}

fn be_uint(data: &[u8], pos: usize, width: usize) -> Result<usize, PacketError> {
    let bytes = data
        .get(pos..pos + width)
        .ok_or(PacketError::Truncated(pos))?;
    Ok(bytes.iter().fold(0usize, |acc, b| (acc << 8) | usize::from(*b)))
}
