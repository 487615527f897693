//! Security-environment state machine and MANAGE SECURITY ENVIRONMENT
//! parsing, component C8.
//!
//! Grounded directly on `security_env_set_reset` in the original
//! firmware: P1 selects SET vs. RESTORE (with the documented `0xA4`
//! ECDH-P1 alias some host middleware uses instead of MyEID's own
//! `P1=0x41, P2=0xA4` convention), P2 names which Control Reference
//! Template is being set, and the template's body is a flat sequence of
//! one-byte-tag/one-byte-length Control Reference Data Objects (CRDOs) —
//! not general BER-TLV, so this module parses them directly rather than
//! reusing [`crate::byte_fns::parse_7816_len`].

use crate::error::{ensure, SecurityError};
use crate::types::{AlgorithmRef, Operation, SecurityEnvironment};

const P1_RESTORE: u8 = 0xF3;
const P1_SET: u8 = 0x41;
const P1_SET_ENCRYPT: u8 = 0x81;
const P1_ECDH_ALIAS: u8 = 0xA4;

const TEMPLATE_DST: u8 = 0xB6;
const TEMPLATE_CT: u8 = 0xB8;
const TEMPLATE_AT: u8 = 0xA4;

const TAG_ALGORITHM_REF: u8 = 0x80;
const TAG_KEY_FILE_ID: u8 = 0x81;
const TAG_KEY_REFERENCE_A: u8 = 0x83;
const TAG_KEY_REFERENCE_B: u8 = 0x84;
const TAG_INIT_VECTOR: u8 = 0x87;

const HAVE_ALGORITHM: u8 = 0b01;
const HAVE_KEY_FILE_ID: u8 = 0b10;
const HAVE_BOTH: u8 = HAVE_ALGORITHM | HAVE_KEY_FILE_ID;

/// Applies one MANAGE SECURITY ENVIRONMENT command to `env`, per spec
/// section 4.8. `data` is the command's data field (the CRDO sequence);
/// empty for RESTORE.
pub fn manage_security_environment(
    env: &mut SecurityEnvironment, p1: u8, p2: u8, data: &[u8],
) -> Result<(), SecurityError> {
    // MyEID manual names P1=0xA4 for ECDH; some middleware instead sends
    // P1=0x41, P2=0xA4. Both are accepted, normalized to the latter.
    let (p1, p2) = if p1 == P1_ECDH_ALIAS { (P1_SET, TEMPLATE_AT) } else { (p1, p2) };

    #[cfg(feature = "log")]
    log::trace!("manage_security_environment: p1={p1:#04x} p2={p2:#04x} lc={}", data.len());

    // Unconditionally invalidated at entry, mirroring `security_env_set_reset`'s
    // `sec_env_valid = 0;` before any other check: a failed SET below must
    // leave no previously-valid environment in place.
    env.reset();

    if p1 == P1_RESTORE {
        ensure!(data.is_empty(), SecurityError::LcInconsistent);
        return Ok(());
    }

    ensure!(p1 == P1_SET || p1 == P1_SET_ENCRYPT, SecurityError::FunctionNotSupported);

    let operation = match p2 {
        TEMPLATE_DST => Operation::Sign,
        TEMPLATE_CT => {
            if p1 == P1_SET_ENCRYPT {
                Operation::Encrypt
            } else {
                Operation::Decrypt
            }
        }
        TEMPLATE_AT => Operation::Ecdh,
        _ => return Err(SecurityError::FunctionNotSupported),
    };

    let mut algorithm = None;
    let mut key_file_id = None;
    let mut init_vector_set = false;
    let mut seen = 0u8;

    let mut cursor = data;
    while !cursor.is_empty() {
        let &[tag, len, ref rest @ ..] = cursor else {
            return Err(SecurityError::WrongDataInField);
        };
        let len = len as usize;
        ensure!(rest.len() >= len, SecurityError::WrongDataInField);
        let value = &rest[..len];
        match tag {
            TAG_ALGORITHM_REF => {
                ensure!(len == 1, SecurityError::FunctionNotSupported);
                algorithm = Some(AlgorithmRef::from_wire(value[0])?);
                seen |= HAVE_ALGORITHM;
            }
            TAG_KEY_FILE_ID => {
                ensure!(len == 2, SecurityError::FunctionNotSupported);
                key_file_id = Some(u16::from_be_bytes([value[0], value[1]]));
                seen |= HAVE_KEY_FILE_ID;
            }
            TAG_KEY_REFERENCE_A | TAG_KEY_REFERENCE_B => {
                ensure!(len == 1, SecurityError::FunctionNotSupported);
                // MyEID stores only one key per file; any other reference
                // number is meaningless here.
                ensure!(value[0] == 0, SecurityError::FunctionNotSupported);
            }
            TAG_INIT_VECTOR => init_vector_set = true,
            _ => return Err(SecurityError::WrongDataInField),
        }
        cursor = &rest[len..];
    }

    ensure!(seen == HAVE_BOTH, SecurityError::FunctionNotSupported);

    *env = SecurityEnvironment {
        operation,
        algorithm,
        key_file_id,
        init_vector_set,
    };
    Ok(())
}
