//! External collaborator traits, per spec section 1.
//!
//! This crate implements APDU framing, the security-environment state
//! machine, and padding/encoding rules. It never performs modular
//! exponentiation, elliptic-curve arithmetic, block-cipher rounds, or true
//! random generation itself — those are supplied by the host card's
//! existing kernels through the traits below. Every trait here is
//! object-safe so a dispatcher can hold `&dyn` collaborators without
//! monomorphizing per key type, matching the teacher's explicit design
//! goal for its own `KeyGen`/`Encaps`/`Decaps`/`SerDes` traits.

use crate::curve::{CurveId, CurveParams};
use crate::error::SecurityError;
use crate::types::{CipherMode, EcPoint, EcScalar, FileType, PartTag, SymmetricAlgorithm};

/// Reads and writes the canonical parts of a key file, abstracting the
/// card filesystem (out of scope per spec section 1, `Non-goals`).
///
/// # Examples
/// ```
/// use myeid_core::traits::KeyFileStore;
/// use myeid_core::types::{FileType, PartTag, RsaPart};
///
/// struct Empty;
/// impl KeyFileStore for Empty {
///     fn file_type(&self, _file_id: u16) -> Result<FileType, myeid_core::error::SecurityError> {
///         Ok(FileType::Rsa)
///     }
///     fn read_part(&self, _file_id: u16, _tag: PartTag, _buf: &mut [u8]) -> Result<usize, myeid_core::error::SecurityError> {
///         Ok(0)
///     }
///     fn write_part(&mut self, _file_id: u16, _tag: PartTag, _data: &[u8]) -> Result<(), myeid_core::error::SecurityError> {
///         Ok(())
///     }
///     fn file_size_bits(&self, _file_id: u16) -> Result<u16, myeid_core::error::SecurityError> {
///         Ok(2048)
///     }
/// }
/// let store = Empty;
/// assert_eq!(store.file_type(0).unwrap(), FileType::Rsa);
/// let _ = PartTag::Rsa(RsaPart::P);
/// ```
pub trait KeyFileStore {
    /// The file type stored under `file_id`, per spec section 3.
    fn file_type(&self, file_id: u16) -> Result<FileType, SecurityError>;

    /// Reads `tag`'s current bytes for `file_id` into `buf`, returning the
    /// number of bytes written. An empty/unset part returns `Ok(0)`.
    fn read_part(&self, file_id: u16, tag: PartTag, buf: &mut [u8]) -> Result<usize, SecurityError>;

    /// Overwrites `tag`'s bytes for `file_id` with `data`, per PUT DATA
    /// (spec section 4.10).
    fn write_part(&mut self, file_id: u16, tag: PartTag, data: &[u8]) -> Result<(), SecurityError>;

    /// The file's declared size in bits, per spec section 4.10. GENERATE
    /// KEY has no size field of its own in its command body — the original
    /// firmware reads the target RSA modulus width or EC curve's field
    /// size from the selected file's filesystem size
    /// (`fs_get_file_size`/`prepare_ec_param`) — so this crate's
    /// `generate_key` asks the store for it rather than inventing a
    /// parallel filesystem concept of its own.
    fn file_size_bits(&self, file_id: u16) -> Result<u16, SecurityError>;
}


/// Supplies the domain parameters for a named curve, per spec section 4.3.
/// A build without support for a given curve (cargo feature not enabled)
/// returns `FunctionNotSupported` rather than panicking.
pub trait CurveConstants {
    fn params(&self, id: CurveId) -> Result<CurveParams, SecurityError>;
}


/// Performs the raw RSA primitive (modular exponentiation) over an
/// already-framed, already-padded operand, per spec section 4.4.
///
/// `modulus_bytes` is the exact byte length of the RSA modulus; `input`
/// and the written portion of `output` are always that same length. The
/// kernel does not see — and must not need — the CRT components directly;
/// `file_id` lets an implementation look those up itself (e.g. via its own
/// `KeyFileStore` handle) without this crate re-exposing `p`/`q`/`dP`/`dQ`/
/// `qInv` on the trait boundary.
pub trait RsaEngine {
    fn rsa_raw(&self, file_id: u16, input: &[u8], output: &mut [u8]) -> Result<(), SecurityError>;
}


/// Produces a raw `(r, s)` ECDSA signature over a digest already reduced
/// to the curve's order, per spec section 4.5. DER encoding is this
/// crate's responsibility, not the kernel's.
pub trait EcdsaEngine {
    fn sign(
        &self, file_id: u16, curve: &CurveParams, digest: &[u8], r_out: &mut EcScalar, s_out: &mut EcScalar,
    ) -> Result<(), SecurityError>;
}


/// Computes an ECDH shared secret's X coordinate from a stored private
/// scalar and a peer's public point, per spec section 4.6.
pub trait EcdhEngine {
    fn derive(
        &self, file_id: u16, curve: &CurveParams, peer_point: &EcPoint,
    ) -> Result<EcScalar, SecurityError>;
}


/// Runs a block-cipher operation (DES/3DES/AES, per spec section 4.7)
/// over exactly one block-aligned buffer using the key stored at
/// `file_id`. CBC chaining across multiple PSO calls is this crate's
/// responsibility (it tracks and supplies `iv`); the kernel only ever
/// sees one call's worth of ciphertext/plaintext and the current IV.
pub trait SymmetricEngine {
    fn cipher(
        &self, file_id: u16, algorithm: SymmetricAlgorithm, mode: CipherMode, iv: &mut [u8],
        data: &mut [u8],
    ) -> Result<(), SecurityError>;
}


/// Generates and stores a fresh RSA CRT key pair, per spec section 4.10.
/// The private CRT components (`p`, `q`, `dP`, `dQ`, `qInv`) are written
/// directly to `file_id` through the engine's own storage access and never
/// cross this trait boundary; only the public modulus is returned, written
/// to `modulus_out`, since GENERATE KEY's response is the plain modulus.
/// Returns the number of modulus bytes written (`modulus_bits / 8`).
pub trait RsaKeyGenEngine {
    fn generate(
        &mut self, file_id: u16, modulus_bits: u16, public_exponent: &[u8], modulus_out: &mut [u8],
    ) -> Result<usize, SecurityError>;
}

/// Generates and stores a fresh EC key pair on the given curve, per spec
/// section 4.10, returning the public point for the GENERATE KEY response.
pub trait EcKeyGenEngine {
    fn generate(&mut self, file_id: u16, curve: &CurveParams) -> Result<EcPoint, SecurityError>;
}


/// The card's response-chaining hook, per spec section 5.
///
/// `perform_security_operation` and `generate_key` can produce more bytes
/// than fit in one response APDU; rather than this crate blocking or
/// buffering unboundedly, it calls `begin_long_operation` once the
/// response is staged in the `ResponseBuffer` and the caller is
/// responsible for the GET RESPONSE round trip that drains it.
pub trait CardTransport {
    /// Called once a multi-part response has been staged and is ready to
    /// be drained via GET RESPONSE. `total_len` is the number of bytes
    /// now sitting in the response buffer.
    fn begin_long_operation(&mut self, total_len: u16);
}
