//! PERFORM SECURITY OPERATION and GENERAL AUTHENTICATE dispatch, component C9.
//!
//! Grounded directly on `security_operation` and its callers
//! (`security_operation_rsa_ec_sign`, `security_operation_encrypt`,
//! `security_operation_decrypt`, the shared `decipher`) and on
//! `myeid_ecdh_derive`, all in the original firmware: the selected file
//! must match the security environment's `key_file_id`, P1/P2 pick the
//! sign/decrypt/encrypt sub-operation, and decipher's P2 further
//! distinguishes a single-shot payload (`0x84`) from one carrying a
//! continuation indicator byte (`0x86`) for the two-part 2048-bit RSA
//! decipher split.

use crate::curve::{curve_for, CurveParams};
use crate::ecdh::{ecdh_derive, unwrap_dynamic_auth_template};
use crate::ecdsa::ecdsa_sign;
use crate::error::{ensure, SecurityError};
use crate::rsa_framing::{modulus_len, rsa_decrypt, rsa_sign};
use crate::symmetric::{algorithm_for, block_cipher, block_len};
use crate::traits::{CardTransport, CurveConstants, EcdhEngine, EcdsaEngine, KeyFileStore, RsaEngine, SymmetricEngine};
use crate::types::{
    AlgorithmRef, CipherMode, EcPart, FileType, Operation, PartTag, ResponseBuffer, SecurityEnvironment,
    MP_BYTES, RESPONSE_CAPACITY,
};

const INS_PSO_SIGN_P1: u8 = 0x9E;
const INS_PSO_SIGN_P2: u8 = 0x9A;
const INS_PSO_DECRYPT_P1: u8 = 0x80;
const INS_PSO_ENCRYPT_P1: u8 = 0x84;

const DECIPHER_P2_PLAIN: u8 = 0x84;
const DECIPHER_P2_INDICATED: u8 = 0x86;

const CONTINUATION_SINGLE_PART: u8 = 0x00;
const CONTINUATION_FIRST_HALF: u8 = 0x81;
const CONTINUATION_SECOND_HALF: u8 = 0x82;

const ENCRYPT_P2: u8 = 0x80;
const SYMMETRIC_CLA: u8 = 0x80;

/// Maximum stored symmetric key length this crate supports (AES-256).
const SYMMETRIC_KEY_MAX_BYTES: usize = 32;

/// The cryptographic kernels PERFORM SECURITY OPERATION dispatches to.
/// Bundled into one `Copy` struct purely to keep the dispatch functions'
/// argument lists readable; it carries no state of its own.
#[derive(Clone, Copy)]
pub struct Kernels<'a> {
    pub store: &'a dyn KeyFileStore,
    pub rsa: &'a dyn RsaEngine,
    pub ecdsa: &'a dyn EcdsaEngine,
    pub ecdh: &'a dyn EcdhEngine,
    pub symmetric: &'a dyn SymmetricEngine,
    pub curves: &'a dyn CurveConstants,
}

/// Reads the stored EC public point's coordinate byte length for
/// `file_id`, used to disambiguate a NIST curve by size (spec section
/// 4.3) ahead of an ECDSA sign. The point is `0x04`-prefixed uncompressed,
/// so its byte length is always odd.
fn ec_coord_len(store: &dyn KeyFileStore, file_id: u16) -> Result<u8, SecurityError> {
    let mut scratch = [0u8; 1 + 2 * MP_BYTES];
    let len = store.read_part(file_id, PartTag::Ec(EcPart::Public), &mut scratch)?;
    ensure!(len >= 3 && len % 2 == 1 && scratch[0] == 0x04, SecurityError::ReferencedDataNotFound);
    Ok(((len - 1) / 2) as u8)
}

fn curve_params_for(
    curves: &dyn CurveConstants, store: &dyn KeyFileStore, file_id: u16, file_type: FileType,
) -> Result<CurveParams, SecurityError> {
    let coord_len = ec_coord_len(store, file_id)?;
    let curve_id = curve_for(file_type, coord_len)?;
    curves.params(curve_id)
}

/// Reads the stored symmetric key's byte length for `file_id`, or `0` if
/// no `0xA0`-tagged part is present — the original firmware's test for
/// "this key file holds a symmetric key, not RSA/EC" (`des_aes_cipher`'s
/// `fs_key_read_part(NULL, 0xA0)` probe).
fn symmetric_key_len(store: &dyn KeyFileStore, file_id: u16) -> Result<usize, SecurityError> {
    let mut scratch = [0u8; SYMMETRIC_KEY_MAX_BYTES];
    store.read_part(file_id, PartTag::Symmetric, &mut scratch)
}

/// Top-level PERFORM SECURITY OPERATION dispatch, per spec section 4.4.
/// `selected_file_id` is the card filesystem's currently selected file
/// (out of scope for this crate; the caller supplies it); PSO always
/// requires it to equal the security environment's `key_file_id`.
pub fn perform_security_operation(
    env: &SecurityEnvironment, kernels: Kernels<'_>, response: &mut ResponseBuffer,
    transport: &mut dyn CardTransport, selected_file_id: u16, cla: u8, p1: u8, p2: u8, data: &[u8],
) -> Result<(), SecurityError> {
    ensure!(Some(selected_file_id) == env.key_file_id, SecurityError::ConditionsNotSatisfied);

    #[cfg(feature = "log")]
    log::trace!("perform_security_operation: file={selected_file_id:#06x} p1={p1:#04x} p2={p2:#04x}");

    match p1 {
        INS_PSO_SIGN_P1 if p2 == INS_PSO_SIGN_P2 => pso_sign(env, kernels, response, transport, data),
        INS_PSO_DECRYPT_P1 => pso_decrypt(env, kernels, response, transport, cla, p2, data),
        INS_PSO_ENCRYPT_P1 => pso_encrypt(env, kernels, response, transport, cla, p2, data),
        _ => Err(SecurityError::IncorrectP1P2),
    }
}

/// PERFORM SECURITY OPERATION / COMPUTE DIGITAL SIGNATURE, per spec
/// section 4.4: RSA key files sign via `rsa_framing::rsa_sign`, EC key
/// files (only reachable with `AlgorithmRef::EcdsaRaw`) via
/// `ecdsa::ecdsa_sign`.
fn pso_sign(
    env: &SecurityEnvironment, kernels: Kernels<'_>, response: &mut ResponseBuffer,
    transport: &mut dyn CardTransport, data: &[u8],
) -> Result<(), SecurityError> {
    let (key_file_id, algorithm) = env.require(Operation::Sign)?;
    let file_type = kernels.store.file_type(key_file_id)?;

    let len = if algorithm == AlgorithmRef::EcdsaRaw {
        ensure!(matches!(file_type, FileType::NistEc | FileType::Secp256k1), SecurityError::WrongFileType);
        let curve = curve_params_for(kernels.curves, kernels.store, key_file_id, file_type)?;
        ecdsa_sign(kernels.ecdsa, key_file_id, &curve, data, response.data_mut())?
    } else {
        ensure!(file_type == FileType::Rsa, SecurityError::WrongFileType);
        ensure!(cfg!(feature = "rsa"), SecurityError::FunctionNotSupported);
        let out_len = modulus_len(kernels.store, key_file_id)?;
        rsa_sign(kernels.store, kernels.rsa, key_file_id, algorithm, data, &mut response.data_mut()[..out_len])?;
        out_len
    };

    response.mark_ready(len as u16)?;
    transport.begin_long_operation(len as u16);
    Ok(())
}

/// PERFORM SECURITY OPERATION / ENCIPHER, per spec section 4.4: symmetric
/// only, gated on `CLA == 0x80` and `P2 == 0x80`, matching
/// `security_operation_encrypt`'s refusal to expose RSA public encrypt.
/// `data` must be exactly one cipher block, matching `des_aes_cipher`'s own
/// `size != 8`/`size != 16` checks — there is no chaining across blocks.
fn pso_encrypt(
    env: &SecurityEnvironment, kernels: Kernels<'_>, response: &mut ResponseBuffer,
    transport: &mut dyn CardTransport, cla: u8, p2: u8, data: &[u8],
) -> Result<(), SecurityError> {
    ensure!(p2 == ENCRYPT_P2, SecurityError::InvalidData);
    ensure!(cla == SYMMETRIC_CLA, SecurityError::FunctionNotSupported);

    let (key_file_id, _algorithm) = env.require(Operation::Encrypt)?;
    let file_type = kernels.store.file_type(key_file_id)?;
    let key_len = symmetric_key_len(kernels.store, key_file_id)?;
    ensure!(key_len > 0, SecurityError::ConditionsNotSatisfied);
    let algorithm = algorithm_for(file_type, key_len)?;
    let chunk_len = block_len(algorithm);
    ensure!(data.len() == chunk_len, SecurityError::IncorrectLength);

    let mut iv = [0u8; 16];
    let buf = response.data_mut();
    buf[..data.len()].copy_from_slice(data);
    block_cipher(kernels.symmetric, key_file_id, algorithm, CipherMode::Encrypt, &mut iv[..chunk_len], &mut buf[..data.len()])?;

    response.mark_ready(data.len() as u16)?;
    transport.begin_long_operation(data.len() as u16);
    Ok(())
}

/// PERFORM SECURITY OPERATION / DECIPHER, per spec sections 4.4 and 4.9.
/// `P2 == 0x84` carries the ciphertext directly; `P2 == 0x86` prefixes it
/// with a continuation indicator (`0x00` single-part, `0x81`/`0x82` the
/// two halves of a split 2048-bit RSA decipher). Dispatches to the
/// symmetric engine when the key file holds a `0xA0`-tagged symmetric key,
/// otherwise to RSA raw decrypt with manual PKCS#1 v1.5 type-2 unpadding.
fn pso_decrypt(
    env: &SecurityEnvironment, kernels: Kernels<'_>, response: &mut ResponseBuffer,
    transport: &mut dyn CardTransport, cla: u8, p2: u8, data: &[u8],
) -> Result<(), SecurityError> {
    let (key_file_id, algorithm) = env.require(Operation::Decrypt)?;
    ensure!(!data.is_empty(), SecurityError::InvalidData);

    let mut payload_buf = [0u8; RESPONSE_CAPACITY];
    let payload_len = match p2 {
        DECIPHER_P2_PLAIN => {
            ensure!(data.len() <= payload_buf.len(), SecurityError::InvalidData);
            payload_buf[..data.len()].copy_from_slice(data);
            data.len()
        }
        DECIPHER_P2_INDICATED => {
            let (indicator, rest) = data.split_first().ok_or(SecurityError::InvalidData)?;
            match *indicator {
                CONTINUATION_SINGLE_PART => {
                    ensure!(rest.len() <= payload_buf.len(), SecurityError::InvalidData);
                    payload_buf[..rest.len()].copy_from_slice(rest);
                    rest.len()
                }
                CONTINUATION_FIRST_HALF => {
                    #[cfg(feature = "log")]
                    log::trace!("pso_decrypt: stashing first half, {} bytes", rest.len());
                    response.stash_tmp(rest)?;
                    return Ok(());
                }
                CONTINUATION_SECOND_HALF => {
                    let first_len = response.tmp_bytes().ok_or(SecurityError::ConditionsNotSatisfied)?.len();
                    ensure!(first_len + rest.len() <= payload_buf.len(), SecurityError::InvalidData);
                    payload_buf[..first_len].copy_from_slice(response.tmp_bytes().unwrap());
                    payload_buf[first_len..first_len + rest.len()].copy_from_slice(rest);
                    response.clear_tmp();
                    #[cfg(feature = "log")]
                    log::trace!("pso_decrypt: joined continuation, {} total bytes", first_len + rest.len());
                    first_len + rest.len()
                }
                _ => return Err(SecurityError::InvalidData),
            }
        }
        _ => return Err(SecurityError::IncorrectP1P2),
    };
    let payload = &payload_buf[..payload_len];

    let file_type = kernels.store.file_type(key_file_id)?;
    let sym_key_len = symmetric_key_len(kernels.store, key_file_id)?;

    let plain_len = if sym_key_len > 0 {
        ensure!(cla == SYMMETRIC_CLA, SecurityError::FunctionNotSupported);
        let sym_algorithm = algorithm_for(file_type, sym_key_len)?;
        let chunk_len = block_len(sym_algorithm);
        ensure!(payload_len == chunk_len, SecurityError::IncorrectLength);
        let mut iv = [0u8; 16];
        let out = response.data_mut();
        out[..payload_len].copy_from_slice(payload);
        block_cipher(kernels.symmetric, key_file_id, sym_algorithm, CipherMode::Decrypt, &mut iv[..chunk_len], &mut out[..payload_len])?;
        payload_len
    } else {
        ensure!(file_type == FileType::Rsa, SecurityError::WrongFileType);
        ensure!(cfg!(feature = "rsa"), SecurityError::FunctionNotSupported);
        let out = response.data_mut();
        rsa_decrypt(kernels.store, kernels.rsa, key_file_id, algorithm, payload, out)?
    };

    response.mark_ready(plain_len as u16)?;
    transport.begin_long_operation(plain_len as u16);
    Ok(())
}

/// GENERAL AUTHENTICATE / ECDH derive, per spec section 4.6. Grounded on
/// `myeid_ecdh_derive`: P1 and P2 must both be `0x00` (the Dynamic
/// Authentication Template tag `0x7C` carries all the structure), and the
/// selected file must match the security environment's `key_file_id`.
#[allow(clippy::too_many_arguments)]
pub fn general_authenticate(
    env: &SecurityEnvironment, kernels: Kernels<'_>, response: &mut ResponseBuffer,
    transport: &mut dyn CardTransport, selected_file_id: u16, p1: u8, p2: u8, data: &[u8],
) -> Result<(), SecurityError> {
    ensure!(p1 == 0x00 && p2 == 0x00, SecurityError::IncorrectP1P2);
    let (key_file_id, _algorithm) = env.require(Operation::Ecdh)?;
    ensure!(selected_file_id == key_file_id, SecurityError::ConditionsNotSatisfied);

    let file_type = kernels.store.file_type(key_file_id)?;
    ensure!(matches!(file_type, FileType::NistEc | FileType::Secp256k1), SecurityError::WrongFileType);
    let curve = curve_params_for(kernels.curves, kernels.store, key_file_id, file_type)?;

    let template_body = unwrap_dynamic_auth_template(data)?;
    let len = ecdh_derive(kernels.ecdh, key_file_id, &curve, template_body, response.data_mut())?;

    response.mark_ready(len as u16)?;
    transport.begin_long_operation(len as u16);
    Ok(())
}
