//! Uppercase hex codec
//!
//! Every byte becomes two ASCII characters from `0-9A-F`, high nibble first.
//! Decoding accepts exactly that alphabet: lowercase digits and any other
//! byte are rejected rather than mapped to a wrong value.

use crate::error::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Encode one byte as its two uppercase hex characters
pub fn byte_to_hex(b: u8) -> [u8; 2] {
    [HEX_DIGITS[(b >> 4) as usize], HEX_DIGITS[(b & 0x0F) as usize]]
}

fn hex_to_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode a pair of uppercase hex characters into one byte
pub fn hex_to_byte(hi: u8, lo: u8) -> Result<u8> {
    decode_pair(hi, lo, 0)
}

fn decode_pair(hi: u8, lo: u8, offset: u64) -> Result<u8> {
    let high = hex_to_nibble(hi).ok_or_else(|| invalid_byte(hi, offset))?;
    let low = hex_to_nibble(lo).ok_or_else(|| invalid_byte(lo, offset + 1))?;
    Ok((high << 4) | low)
}

fn invalid_byte(c: u8, offset: u64) -> Error {
    Error::decode(offset, format!("byte 0x{c:02X} is not an uppercase hex digit"))
}

/// Hex-encode `data`, producing exactly `2 * data.len()` bytes
pub fn encode_chunk(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    encode_chunk_into(data, &mut out);
    out
}

/// Hex-encode `data`, appending to `out`
pub fn encode_chunk_into(data: &[u8], out: &mut Vec<u8>) {
    out.reserve(data.len() * 2);
    for &b in data {
        out.extend_from_slice(&byte_to_hex(b));
    }
}

/// Decode a hex chunk back into bytes.
///
/// Fails if the chunk has odd length or contains a byte outside `0-9A-F`.
pub fn decode_chunk(hex: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(hex.len() / 2);
    decode_chunk_into(hex, &mut out)?;
    Ok(out)
}

/// Decode a hex chunk, appending the bytes to `out`.
///
/// On error `out` may hold the bytes decoded before the failing pair.
/// Error offsets are relative to the start of `hex`.
pub fn decode_chunk_into(hex: &[u8], out: &mut Vec<u8>) -> Result<()> {
    if hex.len() % 2 != 0 {
        return Err(Error::decode(
            hex.len() as u64 - 1,
            format!("odd number of hex characters ({})", hex.len()),
        ));
    }

    out.reserve(hex.len() / 2);
    for (i, pair) in hex.chunks_exact(2).enumerate() {
        out.push(decode_pair(pair[0], pair[1], (i * 2) as u64)?);
    }
    Ok(())
}
