//! Symmetric cipher key-length dispatch, component C7.
//!
//! Selects the DES/3DES/AES variant implied by a stored key's byte length
//! and file type (spec section 4.7), then hands exactly one bare,
//! block-sized buffer to `SymmetricEngine`. There is no chaining mode and
//! no multi-block request: a PSO encipher/decipher call carries exactly
//! one block of data, matching `des_aes_cipher` in the original firmware,
//! which rejects any other length with SW `0x6700` rather than looping
//! over blocks itself.

use crate::error::{ensure, SecurityError};
use crate::traits::SymmetricEngine;
use crate::types::{CipherMode, DesVariant, FileType, SymmetricAlgorithm};

const DES_BLOCK_LEN: usize = 8;
const AES_BLOCK_LEN: usize = 16;

/// Selects the symmetric algorithm implied by `file_type` and the stored
/// key's byte length, per spec section 4.7. A card build compiled without
/// the matching `des`/`aes` feature (spec section 2's capability
/// configuration, C12) rejects the algorithm family outright.
pub(crate) fn algorithm_for(file_type: FileType, key_len: usize) -> Result<SymmetricAlgorithm, SecurityError> {
    match file_type {
        FileType::Des => ensure!(cfg!(feature = "des"), SecurityError::FunctionNotSupported),
        FileType::Aes => ensure!(cfg!(feature = "aes"), SecurityError::FunctionNotSupported),
        _ => return Err(SecurityError::WrongFileType),
    }
    match (file_type, key_len) {
        (FileType::Des, 7 | 8) => Ok(SymmetricAlgorithm::Des(DesVariant::Single)),
        (FileType::Des, 16) => Ok(SymmetricAlgorithm::Des(DesVariant::TripleTwoKey)),
        (FileType::Des, 24) => Ok(SymmetricAlgorithm::Des(DesVariant::TripleThreeKey)),
        (FileType::Des, _) => Err(SecurityError::ReferencedDataNotFound),
        (FileType::Aes, 16 | 24 | 32) => Ok(SymmetricAlgorithm::Aes),
        (FileType::Aes, _) => Err(SecurityError::ReferencedDataNotFound),
        _ => Err(SecurityError::WrongFileType),
    }
}

/// The cipher's block length, for chunking `data` and validating `iv`.
pub(crate) fn block_len(algorithm: SymmetricAlgorithm) -> usize {
    match algorithm {
        SymmetricAlgorithm::Des(_) => DES_BLOCK_LEN,
        SymmetricAlgorithm::Aes => AES_BLOCK_LEN,
    }
}

/// Runs `algorithm` over exactly one block-sized buffer, per spec section
/// 4.7 and `des_aes_cipher` in the original firmware: no chaining, no
/// multi-block loop, `data.len()` must equal the cipher's block length
/// exactly.
pub(crate) fn block_cipher(
    engine: &dyn SymmetricEngine, file_id: u16, algorithm: SymmetricAlgorithm, mode: CipherMode,
    iv: &mut [u8], data: &mut [u8],
) -> Result<(), SecurityError> {
    let block_len = block_len(algorithm);
    ensure!(iv.len() == block_len, SecurityError::InvalidData);
    ensure!(data.len() == block_len, SecurityError::IncorrectLength);
    engine.cipher(file_id, algorithm, mode, iv, data)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_for_des_key_lengths() {
        assert_eq!(algorithm_for(FileType::Des, 8).unwrap(), SymmetricAlgorithm::Des(DesVariant::Single));
        assert_eq!(
            algorithm_for(FileType::Des, 16).unwrap(),
            SymmetricAlgorithm::Des(DesVariant::TripleTwoKey)
        );
        assert_eq!(
            algorithm_for(FileType::Des, 24).unwrap(),
            SymmetricAlgorithm::Des(DesVariant::TripleThreeKey)
        );
        assert_eq!(algorithm_for(FileType::Des, 10), Err(SecurityError::ReferencedDataNotFound));
    }

    #[test]
    fn algorithm_for_aes_key_lengths() {
        assert_eq!(algorithm_for(FileType::Aes, 32).unwrap(), SymmetricAlgorithm::Aes);
        assert_eq!(algorithm_for(FileType::Aes, 20), Err(SecurityError::ReferencedDataNotFound));
    }

    /// A `SymmetricEngine` stand-in that XORs with a fixed byte, just
    /// enough structure to exercise block dispatch independent of any real
    /// block cipher.
    struct XorEngine(u8);

    impl SymmetricEngine for XorEngine {
        fn cipher(
            &self, _file_id: u16, _algorithm: SymmetricAlgorithm, _mode: CipherMode, _iv: &mut [u8],
            data: &mut [u8],
        ) -> Result<(), SecurityError> {
            data.iter_mut().for_each(|b| *b ^= self.0);
            Ok(())
        }
    }

    #[test]
    fn block_cipher_encrypt_then_decrypt_round_trips_one_block() {
        let engine = XorEngine(0x5A);
        let original = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut data = original;
        let mut iv = [0u8; DES_BLOCK_LEN];
        block_cipher(&engine, 0, SymmetricAlgorithm::Des(DesVariant::Single), CipherMode::Encrypt, &mut iv, &mut data)
            .unwrap();
        assert_ne!(data, original);

        let mut iv = [0u8; DES_BLOCK_LEN];
        block_cipher(&engine, 0, SymmetricAlgorithm::Des(DesVariant::Single), CipherMode::Decrypt, &mut iv, &mut data)
            .unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn rejects_anything_other_than_one_bare_block() {
        let engine = XorEngine(0);
        let mut iv = [0u8; DES_BLOCK_LEN];
        let mut data = [0u8; 16];
        assert_eq!(
            block_cipher(&engine, 0, SymmetricAlgorithm::Des(DesVariant::Single), CipherMode::Encrypt, &mut iv, &mut data),
            Err(SecurityError::IncorrectLength)
        );
        let mut data = [0u8; 5];
        assert_eq!(
            block_cipher(&engine, 0, SymmetricAlgorithm::Des(DesVariant::Single), CipherMode::Encrypt, &mut iv, &mut data),
            Err(SecurityError::IncorrectLength)
        );
    }
}
