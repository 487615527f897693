//! GENERATE KEY, GET DATA and PUT DATA dispatch, component C10.
//!
//! Grounded on `myeid_generate_key`/`myeid_generate_rsa_key`,
//! `myeid_get_data`, `ec_read_public_key` and `myeid_put_data` in the
//! original firmware. GET DATA/PUT DATA objects that belong to the card
//! filesystem or PIN subsystem (file listing, PIN info, applet
//! initialization) are out of scope here per spec section 1's
//! `Non-goals`; only the key-material objects are implemented.

use crate::byte_fns::write_der_len;
use crate::curve::curve_for;
use crate::error::{ensure, SecurityError};
use crate::traits::{CardTransport, CurveConstants, EcKeyGenEngine, KeyFileStore, RsaKeyGenEngine};
use crate::types::{EcPart, EcPoint, FileType, PartTag, ResponseBuffer, RsaPart, MP_BYTES, RSA_MODULUS_MAX_BYTES};

/// MyEID always generates RSA keys with this public exponent, regardless
/// of what (if anything) the caller's GENERATE KEY data field requests.
const PUBLIC_EXPONENT_65537: [u8; 3] = [0x01, 0x00, 0x01];

/// GET DATA's EC-public-key tag when read back after GENERATE KEY.
const GENERATE_KEY_EC_PUBLIC_TAG: u8 = 0x86;
/// GET DATA's EC-public-key tag in its own P2 `0x86` case — the firmware
/// wraps the same stored bytes under a different outer tag in each context.
const GET_DATA_EC_PUBLIC_TAG: u8 = 0x30;

/// Validates an optional GENERATE KEY data field naming a public exponent
/// (spec section 4.10). MyEID accepts only `3` or `65537`, ASN.1-wrapped
/// as `SEQUENCE { INTEGER exponent }` — and, per a known OpenSC
/// interoperability quirk the original firmware works around, tolerates
/// either the correct INTEGER tag `0x02` or `0x81` in its place. An empty
/// field is also accepted (the exponent is fixed regardless).
fn validate_public_exponent_request(data: &[u8]) -> Result<(), SecurityError> {
    if data.is_empty() {
        return Ok(());
    }
    let &[0x30, seq_len, tag, int_len, ref rest @ ..] = data else {
        return Err(SecurityError::InvalidData);
    };
    ensure!(tag == 0x02 || tag == 0x81, SecurityError::InvalidData);
    ensure!(seq_len as usize == 2 + int_len as usize, SecurityError::InvalidData);
    ensure!(rest.len() == int_len as usize, SecurityError::InvalidData);
    match rest {
        [0x03] | [0x01, 0x00, 0x01] => Ok(()),
        _ => Err(SecurityError::InvalidData),
    }
}

/// Wraps `value` in a one-byte tag, 7816-length-encoded TLV.
fn build_tlv(tag: u8, value: &[u8], out: &mut [u8]) -> Result<usize, SecurityError> {
    let mut len_buf = [0u8; 2];
    let len_bytes = write_der_len(value.len(), &mut len_buf)?;
    let total = 1 + len_bytes + value.len();
    ensure!(out.len() >= total, SecurityError::InvalidData);
    out[0] = tag;
    out[1..1 + len_bytes].copy_from_slice(&len_buf[..len_bytes]);
    out[1 + len_bytes..total].copy_from_slice(value);
    Ok(total)
}

/// GENERATE KEY, per spec section 4.10: P1/P2 must both be `0x00`; the
/// file's type picks the RSA or EC path, and the target modulus width or
/// curve is read from `KeyFileStore::file_size_bits` — the original
/// firmware's `fs_get_file_size` convention — rather than taken from the
/// command body, which carries no size field of its own.
#[allow(clippy::too_many_arguments)]
pub fn generate_key(
    store: &dyn KeyFileStore, rsa_keygen: &mut dyn RsaKeyGenEngine, ec_keygen: &mut dyn EcKeyGenEngine,
    curves: &dyn CurveConstants, response: &mut ResponseBuffer, transport: &mut dyn CardTransport, file_id: u16,
    p1: u8, p2: u8, data: &[u8],
) -> Result<(), SecurityError> {
    ensure!(p1 == 0x00 && p2 == 0x00, SecurityError::IncorrectP1P2);
    let file_type = store.file_type(file_id)?;
    let key_size_bits = store.file_size_bits(file_id)?;

    #[cfg(feature = "log")]
    log::debug!("generate_key: file={file_id:#06x} type={file_type:?} bits={key_size_bits}");

    match file_type {
        FileType::Rsa => {
            ensure!(cfg!(feature = "rsa"), SecurityError::FunctionNotSupported);
            generate_rsa_key(rsa_keygen, response, transport, file_id, key_size_bits, data)
        }
        FileType::NistEc | FileType::Secp256k1 => {
            ensure!(data.is_empty(), SecurityError::ConditionsNotSatisfied);
            generate_ec_key(ec_keygen, curves, response, transport, file_id, file_type, key_size_bits)
        }
        FileType::Des | FileType::Aes => Err(SecurityError::WrongFileType),
    }
}

fn generate_rsa_key(
    engine: &mut dyn RsaKeyGenEngine, response: &mut ResponseBuffer, transport: &mut dyn CardTransport, file_id: u16,
    key_size_bits: u16, data: &[u8],
) -> Result<(), SecurityError> {
    validate_public_exponent_request(data)?;
    let modulus_len = (key_size_bits / 8) as usize;
    ensure!(modulus_len > 0 && modulus_len <= RSA_MODULUS_MAX_BYTES, SecurityError::WrongFileType);

    let out = response.data_mut();
    let written = engine.generate(file_id, key_size_bits, &PUBLIC_EXPONENT_65537, &mut out[..modulus_len])?;
    ensure!(written == modulus_len, SecurityError::ConditionsNotSatisfied);

    response.mark_ready(written as u16)?;
    transport.begin_long_operation(written as u16);
    Ok(())
}

fn generate_ec_key(
    engine: &mut dyn EcKeyGenEngine, curves: &dyn CurveConstants, response: &mut ResponseBuffer,
    transport: &mut dyn CardTransport, file_id: u16, file_type: FileType, key_size_bits: u16,
) -> Result<(), SecurityError> {
    let coord_len = ((key_size_bits + 7) / 8) as u8;
    let curve_id = curve_for(file_type, coord_len)?;
    let curve = curves.params(curve_id)?;
    let point = engine.generate(file_id, &curve)?;

    let mut value = [0u8; 1 + 2 * MP_BYTES];
    let coord_len = point.x.len() as usize;
    value[0] = 0x04;
    value[1..1 + coord_len].copy_from_slice(point.x.as_be_bytes());
    value[1 + coord_len..1 + 2 * coord_len].copy_from_slice(point.y.as_be_bytes());

    let len = build_tlv(GENERATE_KEY_EC_PUBLIC_TAG, &value[..1 + 2 * coord_len], response.data_mut())?;
    response.mark_ready(len as u16)?;
    transport.begin_long_operation(len as u16);
    Ok(())
}

/// GET DATA, per spec section 4.10, restricted to key-material objects:
/// `P2 == 0x00` key info, `0x01` modulus, `0x02` public exponent, `0x86`
/// the stored EC public key.
pub fn get_data(
    store: &dyn KeyFileStore, response: &mut ResponseBuffer, transport: &mut dyn CardTransport, file_id: u16,
    p1: u8, p2: u8,
) -> Result<(), SecurityError> {
    ensure!(p1 == 0x01, SecurityError::ReferencedDataNotFound);
    match p2 {
        0x00 => get_key_info(store, response, transport, file_id),
        0x01 => get_raw_part(store, response, transport, file_id, PartTag::Rsa(RsaPart::Mod)),
        0x02 => get_raw_part(store, response, transport, file_id, PartTag::Rsa(RsaPart::ExpPub)),
        GET_DATA_EC_PUBLIC_TAG_P2 => get_ec_public_key(store, response, transport, file_id),
        _ => Err(SecurityError::ReferencedDataNotFound),
    }
}

const GET_DATA_EC_PUBLIC_TAG_P2: u8 = 0x86;

/// The 6-byte RSA key info object: a fixed CRT algorithm identifier,
/// the public exponent's bit length, and the modulus's bit length —
/// derived from the stored parts' byte lengths, per
/// `myeid_get_data`'s `P2 == 0x00` case.
fn get_key_info(
    store: &dyn KeyFileStore, response: &mut ResponseBuffer, transport: &mut dyn CardTransport, file_id: u16,
) -> Result<(), SecurityError> {
    let mut scratch = [0u8; RSA_MODULUS_MAX_BYTES];
    let exp_len = store.read_part(file_id, PartTag::Rsa(RsaPart::ExpPub), &mut scratch)?;
    ensure!(exp_len > 0, SecurityError::ReferencedDataNotFound);
    let exp_bits = (exp_len * 8) as u16;

    let p_len = store.read_part(file_id, PartTag::Rsa(RsaPart::P), &mut scratch)?;
    ensure!(p_len > 0, SecurityError::ReferencedDataNotFound);
    let modulus_bits = (p_len * 16) as u16;

    let out = response.data_mut();
    out[0] = 0x92;
    out[1] = 0x00;
    out[2..4].copy_from_slice(&exp_bits.to_be_bytes());
    out[4..6].copy_from_slice(&modulus_bits.to_be_bytes());
    response.mark_ready(6)?;
    transport.begin_long_operation(6);
    Ok(())
}

/// Reads one key part directly into the response buffer, per
/// `myeid_get_data`'s modulus/exponent cases. The original firmware's
/// 2048-bit modulus storage was split across two parts by a RAM
/// constraint this crate's `KeyFileStore` does not share, so here the
/// modulus is always read as a single part.
fn get_raw_part(
    store: &dyn KeyFileStore, response: &mut ResponseBuffer, transport: &mut dyn CardTransport, file_id: u16,
    tag: PartTag,
) -> Result<(), SecurityError> {
    let len = store.read_part(file_id, tag, response.data_mut())?;
    ensure!(len > 0, SecurityError::ReferencedDataNotFound);
    response.mark_ready(len as u16)?;
    transport.begin_long_operation(len as u16);
    Ok(())
}

fn get_ec_public_key(
    store: &dyn KeyFileStore, response: &mut ResponseBuffer, transport: &mut dyn CardTransport, file_id: u16,
) -> Result<(), SecurityError> {
    let mut scratch = [0u8; 1 + 2 * MP_BYTES];
    let len = store.read_part(file_id, PartTag::Ec(EcPart::Public), &mut scratch)?;
    ensure!(len > 0, SecurityError::ReferencedDataNotFound);

    let written = build_tlv(GET_DATA_EC_PUBLIC_TAG, &scratch[..len], response.data_mut())?;
    response.mark_ready(written as u16)?;
    transport.begin_long_operation(written as u16);
    Ok(())
}

/// Resolves PUT DATA's `P2` key-part selector against the selected file's
/// type (spec section 4.10): `0x86`/`0x87` name an EC public/private key
/// component on an EC file, or the RSA `ModP2`/`ExpP1` components on an
/// RSA file — the tag space is shared (see [`crate::types::RsaPart`]) and
/// only disambiguated by file type, never by `P2` alone.
fn resolve_part_tag(file_type: FileType, p2: u8) -> Result<PartTag, SecurityError> {
    match (file_type, p2) {
        (FileType::NistEc | FileType::Secp256k1, 0x87) => Ok(PartTag::Ec(EcPart::Private)),
        (FileType::NistEc | FileType::Secp256k1, 0x86) => Ok(PartTag::Ec(EcPart::Public)),
        (FileType::Rsa, 0x80) => Ok(PartTag::Rsa(RsaPart::P)),
        (FileType::Rsa, 0x81) => Ok(PartTag::Rsa(RsaPart::Q)),
        (FileType::Rsa, 0x82) => Ok(PartTag::Rsa(RsaPart::Dp)),
        (FileType::Rsa, 0x83) => Ok(PartTag::Rsa(RsaPart::Dq)),
        (FileType::Rsa, 0x84) => Ok(PartTag::Rsa(RsaPart::QInv)),
        (FileType::Rsa, 0x85) => Ok(PartTag::Rsa(RsaPart::ModP1)),
        (FileType::Rsa, 0x86) => Ok(PartTag::Rsa(RsaPart::ModP2)),
        (FileType::Rsa, 0x87) => Ok(PartTag::Rsa(RsaPart::ExpP1)),
        (FileType::Rsa, 0x88) => Ok(PartTag::Rsa(RsaPart::ExpP2)),
        (FileType::Rsa, 0x89) => Ok(PartTag::Rsa(RsaPart::Exp)),
        (FileType::Rsa, 0x8A) => Ok(PartTag::Rsa(RsaPart::Mod)),
        (FileType::Rsa, 0x8B) => Ok(PartTag::Rsa(RsaPart::ExpPub)),
        _ => Err(SecurityError::FunctionNotSupported),
    }
}

/// Strips a single leading `0x00` pad byte from an odd-length upload, per
/// `myeid_upload_rsa_key`'s workaround for ASN.1 tools that left-pad a CRT
/// component whose top bit happens to be set. Only applies to RSA parts.
fn strip_leading_zero_pad(tag: PartTag, data: &[u8]) -> &[u8] {
    match tag {
        PartTag::Rsa(_) if data.len() % 2 == 1 && data.first() == Some(&0) => &data[1..],
        _ => data,
    }
}

/// PUT DATA, per spec section 4.10, restricted to key-part upload:
/// `P2 == 0xA0` the symmetric key blob, `P2` in `0x80..=0x8B` an RSA or EC
/// key component per [`resolve_part_tag`]. The RSA private-exponent
/// components (`ExpP1`/`ExpP2`/`Exp`, this design's CRT-only key storage
/// has no use for) are accepted and silently discarded rather than
/// written, matching `myeid_upload_rsa_key`'s `KEY_RSA_EXP_p1`/
/// `KEY_RSA_EXP_p2`/`KEY_RSA_EXP` cases, which `return S_RET_OK;` without
/// calling `fs_key_write_part`.
pub fn put_data(store: &mut dyn KeyFileStore, file_id: u16, p1: u8, p2: u8, data: &[u8]) -> Result<(), SecurityError> {
    ensure!(p1 == 0x01, SecurityError::ReferencedDataNotFound);

    if p2 == PartTag::Symmetric.wire_tag() {
        return store.write_part(file_id, PartTag::Symmetric, data);
    }
    ensure!((0x80..=0x8B).contains(&p2), SecurityError::FunctionNotSupported);

    let file_type = store.file_type(file_id)?;
    let tag = resolve_part_tag(file_type, p2)?;
    if matches!(tag, PartTag::Rsa(RsaPart::ExpP1 | RsaPart::ExpP2 | RsaPart::Exp)) {
        return Ok(());
    }
    let trimmed = strip_leading_zero_pad(tag, data);
    store.write_part(file_id, tag, trimmed)
}
