//! ECDH peer-point parsing and kernel invocation, component C6.
//!
//! Handles GENERAL AUTHENTICATE's Dynamic Authentication Template
//! (tag `0x7C`): its `0x80` child (an ephemeral-key hint) is accepted but
//! ignored, and its `0x85` child (the peer's uncompressed EC point) is
//! parsed and handed to `EcdhEngine`.

use crate::byte_fns::parse_7816_len;
use crate::curve::CurveParams;
use crate::error::{ensure, SecurityError};
use crate::traits::EcdhEngine;
use crate::types::{EcPoint, EcScalar};

const DYNAMIC_AUTH_TEMPLATE_TAG: u8 = 0x7C;
const EPHEMERAL_HINT_TAG: u8 = 0x80;
const PEER_PUBLIC_POINT_TAG: u8 = 0x85;
const UNCOMPRESSED_POINT_PREFIX: u8 = 0x04;

/// Parses one TLV's tag and length-prefixed value from the front of
/// `data`, returning `(tag, value, bytes_consumed)`. Tags in this template
/// are always single-byte.
fn parse_tlv(data: &[u8]) -> Result<(u8, &[u8], usize), SecurityError> {
    let tag = *data.first().ok_or(SecurityError::InvalidData)?;
    let (len, len_bytes) = parse_7816_len(&data[1..])?;
    let value_start = 1 + len_bytes;
    let value_end = value_start + len as usize;
    ensure!(value_end <= data.len(), SecurityError::InvalidData);
    Ok((tag, &data[value_start..value_end], value_end))
}

/// Parses the peer's uncompressed EC point out of a Dynamic Authentication
/// Template body (spec section 4.6): an optional `0x80` hint, followed by
/// the mandatory `0x85` public point, `0x04`-prefixed.
fn parse_peer_point(body: &[u8], coord_len: u8) -> Result<EcPoint, SecurityError> {
    let mut cursor = body;
    let mut peer_point = None;

    while !cursor.is_empty() {
        let (tag, value, consumed) = parse_tlv(cursor)?;
        match tag {
            EPHEMERAL_HINT_TAG => {}
            PEER_PUBLIC_POINT_TAG => {
                ensure!(
                    value.len() == 1 + 2 * coord_len as usize && value[0] == UNCOMPRESSED_POINT_PREFIX,
                    SecurityError::InvalidData
                );
                let (x_bytes, y_bytes) = value[1..].split_at(coord_len as usize);
                peer_point = Some(EcPoint {
                    x: EcScalar::from_be_bytes(x_bytes, coord_len)?,
                    y: EcScalar::from_be_bytes(y_bytes, coord_len)?,
                });
            }
            _ => return Err(SecurityError::InvalidData),
        }
        cursor = &cursor[consumed..];
    }

    peer_point.ok_or(SecurityError::ReferencedDataNotFound)
}

/// Performs GENERAL AUTHENTICATE's ECDH derivation, per spec section 4.6:
/// parses `template_body` (the Dynamic Authentication Template's content,
/// tag `0x7C` already stripped by the caller) and runs `EcdhEngine::derive`
/// against the private key at `file_id`. Writes the shared secret's X
/// coordinate to `out`, returning the number of bytes written.
pub(crate) fn ecdh_derive(
    engine: &dyn EcdhEngine, file_id: u16, curve: &CurveParams, template_body: &[u8], out: &mut [u8],
) -> Result<usize, SecurityError> {
    let coord_len = curve.prime.len();
    let peer_point = parse_peer_point(template_body, coord_len)?;
    let shared_x = engine.derive(file_id, curve, &peer_point)?;
    let bytes = shared_x.as_be_bytes();
    ensure!(out.len() >= bytes.len(), SecurityError::InvalidData);
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

/// Confirms `data` begins with the Dynamic Authentication Template tag and
/// returns its value (the TLVs `ecdh_derive` expects).
pub(crate) fn unwrap_dynamic_auth_template(data: &[u8]) -> Result<&[u8], SecurityError> {
    let (tag, value, consumed) = parse_tlv(data)?;
    ensure!(tag == DYNAMIC_AUTH_TEMPLATE_TAG && consumed == data.len(), SecurityError::InvalidData);
    Ok(value)
}
