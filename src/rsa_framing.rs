//! RSA padding, digest framing and kernel invocation, component C4.
//!
//! Mirrors `rsa_raw` and its callers in the original firmware: this module
//! never does modular exponentiation itself (that is `RsaEngine`'s job),
//! it only builds and strips the PKCS#1 v1.5 envelope around the
//! kernel's fixed-size input/output buffers.

use crate::error::{ensure, SecurityError, ZeroizeOnFail};
use crate::traits::{KeyFileStore, RsaEngine};
use crate::types::{AlgorithmRef, PartTag, RsaPart, RSA_MODULUS_MAX_BYTES};

/// The fixed 15-byte ASN.1 prefix of a SHA-1 `DigestInfo`, per spec
/// section 4.4. Concatenated with the caller-supplied 20-byte digest it
/// forms the 35-byte value PKCS#1 v1.5 type-1 padding wraps.
const SHA1_DIGEST_INFO_PREFIX: [u8; 15] =
    [0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14];

const SHA1_DIGEST_LEN: usize = 20;

/// Minimum padding-string length PKCS#1 v1.5 requires either side of the
/// `0x00` separator (type 1's `0xFF` run, type 2's nonzero random run).
const MIN_PADDING_LEN: usize = 8;

/// Reads the stored modulus's byte length for `file_id`. The modulus
/// bytes themselves are discarded; only `RsaEngine` needs them.
pub(crate) fn modulus_len(store: &dyn KeyFileStore, file_id: u16) -> Result<usize, SecurityError> {
    let mut scratch = [0u8; RSA_MODULUS_MAX_BYTES];
    let len = store.read_part(file_id, PartTag::Rsa(RsaPart::Mod), &mut scratch)?;
    ensure!((1..=RSA_MODULUS_MAX_BYTES).contains(&len), SecurityError::ReferencedDataNotFound);
    Ok(len)
}

/// Builds the message `RsaEngine::rsa_raw` expects for a sign operation:
/// `0x00 0x01 0xFF..0xFF 0x00 || payload`, filling the full modulus width.
fn pad_type1(payload: &[u8], modulus_len: usize, out: &mut [u8]) -> Result<(), SecurityError> {
    ensure!(out.len() == modulus_len, SecurityError::InvalidData);
    ensure!(payload.len() + 3 + MIN_PADDING_LEN <= modulus_len, SecurityError::IncorrectLength);
    out[0] = 0x00;
    out[1] = 0x01;
    let pad_end = modulus_len - payload.len() - 1;
    out[2..pad_end].fill(0xFF);
    out[pad_end] = 0x00;
    out[pad_end + 1..].copy_from_slice(payload);
    Ok(())
}

/// Strips PKCS#1 v1.5 type-2 padding (`0x00 0x02 <nonzero run> 0x00 ||
/// message`) from a freshly-decrypted block, returning the message slice.
fn unpad_type2(block: &[u8]) -> Result<&[u8], SecurityError> {
    ensure!(block.len() >= 2 + MIN_PADDING_LEN + 1, SecurityError::ConditionsNotSatisfied);
    ensure!(block[0] == 0x00 && block[1] == 0x02, SecurityError::ConditionsNotSatisfied);
    let sep = block[2..]
        .iter()
        .position(|&b| b == 0x00)
        .ok_or(SecurityError::ConditionsNotSatisfied)?;
    ensure!(sep >= MIN_PADDING_LEN, SecurityError::ConditionsNotSatisfied);
    Ok(&block[2 + sep + 1..])
}

/// Performs PERFORM SECURITY OPERATION / COMPUTE DIGITAL SIGNATURE over an
/// RSA key, per spec section 4.4 and 4.8. `payload` is either raw data
/// (`AlgorithmRef::Raw`/`PaddedRsa`) or a 20-byte SHA-1 digest
/// (`AlgorithmRef::Sha1DigestInfo`); the result is written to `out`, which
/// must be exactly the modulus width.
pub(crate) fn rsa_sign(
    store: &dyn KeyFileStore, engine: &dyn RsaEngine, file_id: u16, algorithm: AlgorithmRef,
    payload: &[u8], out: &mut [u8],
) -> Result<(), SecurityError> {
    let modulus_len = modulus_len(store, file_id)?;
    ensure!(out.len() == modulus_len, SecurityError::IncorrectLength);

    let mut message = [0u8; RSA_MODULUS_MAX_BYTES];
    let mut guard = ZeroizeOnFail::new(&mut message[..modulus_len]);
    match algorithm {
        AlgorithmRef::Raw => {
            ensure!(payload.len() == modulus_len, SecurityError::IncorrectLength);
            guard.bytes().copy_from_slice(payload);
        }
        AlgorithmRef::PaddedRsa => pad_type1(payload, modulus_len, guard.bytes())?,
        AlgorithmRef::Sha1DigestInfo => {
            ensure!(payload.len() == SHA1_DIGEST_LEN, SecurityError::IncorrectLength);
            let mut digest_info = [0u8; SHA1_DIGEST_INFO_PREFIX.len() + SHA1_DIGEST_LEN];
            digest_info[..SHA1_DIGEST_INFO_PREFIX.len()].copy_from_slice(&SHA1_DIGEST_INFO_PREFIX);
            digest_info[SHA1_DIGEST_INFO_PREFIX.len()..].copy_from_slice(payload);
            pad_type1(&digest_info, modulus_len, guard.bytes())?;
        }
        AlgorithmRef::EcdsaRaw => return Err(SecurityError::WrongDataInField),
    }

    engine.rsa_raw(file_id, guard.bytes(), out)?;
    guard.disarm();
    Ok(())
}

/// Performs PERFORM SECURITY OPERATION / DECIPHER over an RSA key, per
/// spec section 4.4 and 4.9. Only `AlgorithmRef::PaddedRsa` is supported
/// here, matching the original firmware's `decipher`, which strips type-2
/// padding when `sign_algo == 2` and otherwise fails closed rather than
/// returning an un-depadded block — raw RSA decrypt has no defined
/// plaintext length to report. Returns the number of plaintext bytes
/// written to the front of `out`.
pub(crate) fn rsa_decrypt(
    store: &dyn KeyFileStore, engine: &dyn RsaEngine, file_id: u16, algorithm: AlgorithmRef, input: &[u8],
    out: &mut [u8],
) -> Result<usize, SecurityError> {
    ensure!(algorithm == AlgorithmRef::PaddedRsa, SecurityError::ConditionsNotSatisfied);
    let modulus_len = modulus_len(store, file_id)?;
    ensure!(input.len() == modulus_len, SecurityError::IncorrectLength);
    ensure!(out.len() >= modulus_len, SecurityError::InvalidData);

    let mut block = [0u8; RSA_MODULUS_MAX_BYTES];
    let mut guard = ZeroizeOnFail::new(&mut block[..modulus_len]);
    engine.rsa_raw(file_id, input, guard.bytes())?;
    let message_len = {
        let message = unpad_type2(guard.bytes())?;
        out[..message.len()].copy_from_slice(message);
        message.len()
    };
    guard.disarm();
    Ok(message_len)
}
