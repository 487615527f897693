//! ECDSA digest normalization, kernel invocation and DER signature
//! assembly, component C5.

use crate::byte_fns::{write_der_len, write_der_uint};
use crate::curve::CurveParams;
use crate::error::{ensure, SecurityError};
use crate::traits::EcdsaEngine;
use crate::types::{EcScalar, MP_BYTES};

/// Reduces an arbitrary-length digest to the curve's coordinate width, per
/// spec section 4.5: digests shorter than the curve order are left-padded
/// with zero, digests longer are truncated to the leading `byte_len` bytes
/// (the standard ECDSA convention of taking the leftmost `bitlen(n)` bits).
fn normalize_digest(digest: &[u8], byte_len: u8) -> Result<EcScalar, SecurityError> {
    let byte_len = byte_len as usize;
    if digest.len() >= byte_len {
        EcScalar::from_be_bytes(&digest[..byte_len], byte_len as u8)
    } else {
        EcScalar::from_be_bytes(digest, byte_len as u8)
    }
}

/// Signs `digest` with the EC key at `file_id`, returning the DER
/// `SEQUENCE { INTEGER r, INTEGER s }` encoding written to `out`. Returns
/// the number of bytes written.
pub(crate) fn ecdsa_sign(
    engine: &dyn EcdsaEngine, file_id: u16, curve: &CurveParams, digest: &[u8], out: &mut [u8],
) -> Result<usize, SecurityError> {
    let normalized = normalize_digest(digest, curve.order.len())?;
    let mut r = EcScalar::zeroed(curve.order.len());
    let mut s = EcScalar::zeroed(curve.order.len());
    engine.sign(file_id, curve, normalized.as_be_bytes(), &mut r, &mut s)?;
    encode_der_signature(&r, &s, out)
}

/// Assembles the DER `SEQUENCE { INTEGER r, INTEGER s }` an ECDSA
/// signature is conventionally wire-encoded as.
fn encode_der_signature(r: &EcScalar, s: &EcScalar, out: &mut [u8]) -> Result<usize, SecurityError> {
    // Each integer's content is at most one pad byte longer than its
    // natural width (MP_BYTES), per `write_der_uint`'s leading-zero rule.
    let mut r_content = [0u8; MP_BYTES + 1];
    let mut s_content = [0u8; MP_BYTES + 1];
    let r_len = write_der_uint(r.as_be_bytes(), &mut r_content)?;
    let s_len = write_der_uint(s.as_be_bytes(), &mut s_content)?;

    let mut r_len_buf = [0u8; 2];
    let mut s_len_buf = [0u8; 2];
    let r_len_bytes = write_der_len(r_len, &mut r_len_buf)?;
    let s_len_bytes = write_der_len(s_len, &mut s_len_buf)?;
    let body_len = (1 + r_len_bytes + r_len) + (1 + s_len_bytes + s_len);

    let mut outer_len_buf = [0u8; 2];
    let outer_len_bytes = write_der_len(body_len, &mut outer_len_buf)?;
    let total_len = 1 + outer_len_bytes + body_len;
    ensure!(out.len() >= total_len, SecurityError::InvalidData);

    let mut cursor = 0;
    out[cursor] = 0x30;
    cursor += 1;
    out[cursor..cursor + outer_len_bytes].copy_from_slice(&outer_len_buf[..outer_len_bytes]);
    cursor += outer_len_bytes;

    for (len_buf, len_bytes, content, content_len) in
        [(r_len_buf, r_len_bytes, &r_content, r_len), (s_len_buf, s_len_bytes, &s_content, s_len)]
    {
        out[cursor] = 0x02;
        cursor += 1;
        out[cursor..cursor + len_bytes].copy_from_slice(&len_buf[..len_bytes]);
        cursor += len_bytes;
        out[cursor..cursor + content_len].copy_from_slice(&content[..content_len]);
        cursor += content_len;
    }
    Ok(cursor)
}
