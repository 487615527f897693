//! Byte-level framing primitives, component C1.
//!
//! Two independent concerns share this module because both are small,
//! pure byte transforms with no state of their own: ISO/IEC 7816-4 TLV
//! length parsing (APDU/PUT DATA framing) and DER unsigned-integer
//! encoding (ECDSA signature assembly, C5).

use crate::error::{ensure, SecurityError};

/// Parses one ISO/IEC 7816-4 BER-TLV length field from the start of
/// `data`, returning `(length, bytes_consumed)`.
///
/// Supports the short form (`0x00..=0x7F`) and the one-byte long form
/// (`0x81 LL`); the two- and three-byte long forms (`0x82`, `0x83`) are
/// rejected as `InvalidData` since no object this crate frames ever
/// exceeds 255 bytes.
pub(crate) fn parse_7816_len(data: &[u8]) -> Result<(u16, usize), SecurityError> {
    let first = *data.first().ok_or(SecurityError::InvalidData)?;
    match first {
        0x00..=0x7F => Ok((u16::from(first), 1)),
        0x81 => {
            let len_byte = *data.get(1).ok_or(SecurityError::InvalidData)?;
            Ok((u16::from(len_byte), 2))
        }
        _ => Err(SecurityError::InvalidData),
    }
}

/// Writes `value` (big-endian, may carry leading zero bytes) into `out` as
/// a DER-minimal unsigned integer's content octets: leading zero bytes are
/// stripped down to the minimum needed, then a single `0x00` is
/// re-prepended if the remaining leading byte's high bit is set. Returns
/// the number of bytes written.
pub(crate) fn write_der_uint(value: &[u8], out: &mut [u8]) -> Result<usize, SecurityError> {
    let trimmed = {
        let mut i = 0;
        while i + 1 < value.len() && value[i] == 0 {
            i += 1;
        }
        &value[i..]
    };
    let needs_pad = trimmed.first().is_some_and(|b| b & 0x80 != 0);
    let written = trimmed.len() + usize::from(needs_pad);
    ensure!(written <= out.len(), SecurityError::InvalidData);
    if needs_pad {
        out[0] = 0x00;
        out[1..written].copy_from_slice(trimmed);
    } else {
        out[..written].copy_from_slice(trimmed);
    }
    Ok(written)
}

/// Writes a short/long-form ISO 7816-4 (equivalently, DER) length octet
/// sequence for `len` into `out`, returning the number of bytes written.
/// `len` is always small enough in this crate (at most a 2048-bit RSA
/// signature plus framing) to need at most the one-byte long form.
pub(crate) fn write_der_len(len: usize, out: &mut [u8]) -> Result<usize, SecurityError> {
    if len <= 0x7F {
        ensure!(!out.is_empty(), SecurityError::InvalidData);
        out[0] = len as u8;
        Ok(1)
    } else {
        ensure!(len <= 0xFF && out.len() >= 2, SecurityError::InvalidData);
        out[0] = 0x81;
        out[1] = len as u8;
        Ok(2)
    }
}
