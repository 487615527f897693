use crate::error::{ensure, SecurityError};
use zeroize::Zeroize;

/// Maximum byte length of one RSA CRT half (`p` or `q`), sized for a
/// 2048-bit modulus. The modulus itself is at most `2 * RSA_BYTES` bytes.
pub const RSA_BYTES: usize = 128;

/// Maximum byte length of an RSA modulus (2048 bits).
pub const RSA_MODULUS_MAX_BYTES: usize = 2 * RSA_BYTES;

/// Maximum byte length of an EC field element, sized for secp521r1
/// (`ceil(521 / 8)`).
pub const MP_BYTES: usize = 66;

/// Capacity of the per-APDU response buffer (spec section 3).
pub const RESPONSE_CAPACITY: usize = 256;


/// The key-file type byte, per spec section 3.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileType {
    /// `0x11` — RSA, CRT form.
    Rsa,
    /// `0x22` — a NIST P-192/256/384/521 key.
    NistEc,
    /// `0x23` — secp256k1 (not part of the MyEID reference, OsEID extension).
    Secp256k1,
    /// `0x19` — DES/3DES.
    Des,
    /// `0x29` — AES.
    Aes,
}

impl FileType {
    /// Recovers the file type from its on-wire byte, per spec section 3.
    pub fn from_wire(byte: u8) -> Result<Self, SecurityError> {
        match byte {
            0x11 => Ok(Self::Rsa),
            0x22 => Ok(Self::NistEc),
            0x23 => Ok(Self::Secp256k1),
            0x19 => Ok(Self::Des),
            0x29 => Ok(Self::Aes),
            _ => Err(SecurityError::WrongFileType),
        }
    }
}


/// Canonical RSA key part, per spec section 3. The discriminants are the
/// PUT DATA P2 byte this implementation assigns to each part; see
/// `DESIGN.md` for why this assignment, rather than the original firmware's
/// (unavailable) `key.h`, is authoritative here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum RsaPart {
    P = 0x80,
    Q = 0x81,
    Dp = 0x82,
    Dq = 0x83,
    QInv = 0x84,
    ModP1 = 0x85,
    ModP2 = 0x86,
    ExpP1 = 0x87,
    ExpP2 = 0x88,
    Exp = 0x89,
    Mod = 0x8A,
    ExpPub = 0x8B,
}

/// Canonical EC key part, per spec section 3.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum EcPart {
    /// `0x87` in PUT DATA — private scalar.
    Private = 0x87,
    /// `0x86` in PUT DATA — public point, `0x04`-prefixed uncompressed.
    Public = 0x86,
}

/// A tagged key-file part, abstracting the filesystem collaborator's
/// per-file-type tag namespace (spec section 3) behind one Rust type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PartTag {
    /// An RSA CRT component.
    Rsa(RsaPart),
    /// An EC key component.
    Ec(EcPart),
    /// The single symmetric key blob, wire tag `0xA0`.
    Symmetric,
}

impl PartTag {
    /// The tag's byte value, as written/read at the filesystem boundary.
    #[must_use]
    pub fn wire_tag(self) -> u8 {
        match self {
            Self::Rsa(part) => part as u8,
            Self::Ec(part) => part as u8,
            Self::Symmetric => 0xA0,
        }
    }
}


/// The algorithm reference carried by the `0x80` CRDO in MANAGE SE and
/// consulted by PERFORM SECURITY OPERATION, per spec sections 3 and 4.8.
/// Named variants replace the source's magic numbers `{0x00, 0x02, 0x04,
/// 0x12}`, per the REDESIGN note in spec section 9.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AlgorithmRef {
    /// `0x00` — raw data, length must match the key exactly.
    Raw,
    /// `0x02` — data must be padded (PKCS#1 v1.5 type 1) to match the key.
    PaddedRsa,
    /// `0x12` — a 20-byte SHA-1 digest, DigestInfo-wrapped then padded.
    Sha1DigestInfo,
    /// `0x04` — raw ECDSA digest, no RSA framing.
    EcdsaRaw,
}

impl AlgorithmRef {
    /// Parses the `0x80` CRDO's single-byte algorithm reference.
    pub fn from_wire(byte: u8) -> Result<Self, SecurityError> {
        match byte {
            0x00 => Ok(Self::Raw),
            0x02 => Ok(Self::PaddedRsa),
            0x12 => Ok(Self::Sha1DigestInfo),
            0x04 => Ok(Self::EcdsaRaw),
            _ => Err(SecurityError::FunctionNotSupported),
        }
    }
}


/// Encrypt vs. decrypt, for the symmetric cipher dispatch (C7) and the RSA
/// kernel invocation direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CipherMode {
    Encrypt,
    Decrypt,
}


/// The DES key schedule variant selected by the stored key length, per
/// spec section 4.7.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DesVariant {
    /// 7 or 8-byte stored key, used as single DES.
    Single,
    /// 16-byte stored key: 2-key 3DES (low 8 bytes copied into the high half).
    TripleTwoKey,
    /// 24-byte stored key: 3-key 3DES.
    TripleThreeKey,
}

/// The symmetric algorithm and key form selected by file type and key
/// length (spec section 4.7).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymmetricAlgorithm {
    Des(DesVariant),
    Aes,
}


/// A big-endian, fixed-capacity EC coordinate or scalar, sized for the
/// largest supported curve (secp521r1).
///
/// Only the first `len` bytes are meaningful; the remainder is always
/// zeroed. Kept as an inline array with no heap allocation, matching the
/// teacher's array-backed key types.
#[derive(Clone, Copy, Zeroize)]
pub struct EcScalar {
    bytes: [u8; MP_BYTES],
    len: u8,
}

impl EcScalar {
    /// An all-zero scalar of the given byte length.
    #[must_use]
    pub fn zeroed(len: u8) -> Self { Self { bytes: [0u8; MP_BYTES], len } }

    /// Builds a scalar from a big-endian byte slice, zero-extending on the
    /// left to `len` bytes.
    pub fn from_be_bytes(src: &[u8], len: u8) -> Result<Self, SecurityError> {
        ensure!(src.len() <= len as usize && len as usize <= MP_BYTES, SecurityError::InvalidData);
        let mut bytes = [0u8; MP_BYTES];
        bytes[len as usize - src.len()..len as usize].copy_from_slice(src);
        Ok(Self { bytes, len })
    }

    /// The meaningful big-endian bytes (length `self.len()`).
    #[must_use]
    pub fn as_be_bytes(&self) -> &[u8] { &self.bytes[..self.len as usize] }

    /// Number of meaningful bytes.
    #[must_use]
    pub fn len(&self) -> u8 { self.len }

    /// True when this scalar carries no bytes (degenerate/unset).
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len == 0 }
}


/// An uncompressed EC point `(X, Y)`, per spec section 3.
#[derive(Clone, Copy)]
pub struct EcPoint {
    pub x: EcScalar,
    pub y: EcScalar,
}

impl EcPoint {
    /// An all-zero point of the given coordinate byte length.
    #[must_use]
    pub fn zeroed(len: u8) -> Self { Self { x: EcScalar::zeroed(len), y: EcScalar::zeroed(len) } }
}


/// The operation a security environment has been configured for, per spec
/// section 3. `None` replaces the source's `SEC_OPERATION_NONE` sentinel so
/// "no operation selected" is a variant rather than a reachable default.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    None,
    Sign,
    Decrypt,
    Encrypt,
    Ecdh,
}

impl Default for Operation {
    fn default() -> Self { Self::None }
}

/// The security environment set by MANAGE SECURITY ENVIRONMENT and
/// consulted by PERFORM SECURITY OPERATION / GENERAL AUTHENTICATE, per
/// spec sections 3 and 4.8. A fresh `SecurityEnvironment` (`Operation::None`)
/// rejects every cryptographic operation, matching the source's
/// power-on/reset state.
#[derive(Clone, Copy, Debug, Default)]
pub struct SecurityEnvironment {
    pub operation: Operation,
    pub algorithm: Option<AlgorithmRef>,
    pub key_file_id: Option<u16>,
    /// Set once an INIT VECTOR has been supplied via PUT DATA for the
    /// currently selected symmetric key, per spec section 4.7.
    pub init_vector_set: bool,
}

impl SecurityEnvironment {
    /// Resets to the "no operation selected" state, per RESTORE SE and
    /// ACTIVATE APPLET (spec section 4.8).
    pub fn reset(&mut self) { *self = Self::default(); }

    /// Validates that `op` matches the currently configured operation and
    /// that a key file and algorithm reference are present, the common
    /// precondition every PERFORM SECURITY OPERATION variant shares.
    pub fn require(&self, op: Operation) -> Result<(u16, AlgorithmRef), SecurityError> {
        ensure!(self.operation == op, SecurityError::ConditionsNotSatisfied);
        let key_file_id = self.key_file_id.ok_or(SecurityError::ConditionsNotSatisfied)?;
        let algorithm = self.algorithm.ok_or(SecurityError::ConditionsNotSatisfied)?;
        Ok((key_file_id, algorithm))
    }
}


/// The per-APDU response buffer `R`, per spec section 3.
///
/// `Ready` means the outer command loop must emit a `0x61xx` status and
/// stream `len` bytes on GET RESPONSE. `Tmp` holds the first-half
/// ciphertext across the two-part 2048-bit decipher continuation (spec
/// section 4.9).
pub struct ResponseBuffer {
    data: [u8; RESPONSE_CAPACITY],
    state: ResponseState,
}

/// The response buffer's lifecycle state, replacing the source's
/// `r->flag`/`r->len` pair with one enum so `Tmp`'s length cannot drift
/// from its flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseState {
    /// No response has been staged for this APDU.
    Empty,
    /// `len` bytes are ready for GET RESPONSE.
    Ready { len: u16 },
    /// `len` bytes of ciphertext are staged across a decipher continuation.
    Tmp { len: u16 },
    /// The buffer was consumed and holds nothing further.
    NoData,
}

impl Default for ResponseBuffer {
    fn default() -> Self { Self::new() }
}

impl ResponseBuffer {
    /// A freshly cleared response buffer.
    #[must_use]
    pub fn new() -> Self { Self { data: [0u8; RESPONSE_CAPACITY], state: ResponseState::Empty } }

    /// Direct access to the backing storage, for framing code that writes
    /// the response in place before calling [`Self::mark_ready`].
    pub fn data_mut(&mut self) -> &mut [u8; RESPONSE_CAPACITY] { &mut self.data }

    /// The buffer's current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ResponseState { self.state }

    /// Marks the first `len` bytes of the buffer as ready for GET RESPONSE.
    pub fn mark_ready(&mut self, len: u16) -> Result<(), SecurityError> {
        ensure!((len as usize) <= self.data.len(), SecurityError::InvalidData);
        self.state = ResponseState::Ready { len };
        Ok(())
    }

    /// The ready response bytes, or `None` if the buffer is not in the
    /// `Ready` state.
    #[must_use]
    pub fn ready_bytes(&self) -> Option<&[u8]> {
        match self.state {
            ResponseState::Ready { len } => Some(&self.data[..len as usize]),
            _ => None,
        }
    }

    /// Stashes `bytes` as the first half of a split decipher (spec section
    /// 4.9).
    pub fn stash_tmp(&mut self, bytes: &[u8]) -> Result<(), SecurityError> {
        ensure!(bytes.len() <= self.data.len(), SecurityError::InvalidData);
        self.data[..bytes.len()].copy_from_slice(bytes);
        self.state = ResponseState::Tmp { len: bytes.len() as u16 };
        Ok(())
    }

    /// The staged first-half bytes, or `None` if no continuation is in
    /// progress.
    #[must_use]
    pub fn tmp_bytes(&self) -> Option<&[u8]> {
        match self.state {
            ResponseState::Tmp { len } => Some(&self.data[..len as usize]),
            _ => None,
        }
    }

    /// Clears a pending continuation without producing a response, e.g.
    /// after a framing error on the second half (spec section 7).
    pub fn clear_tmp(&mut self) {
        if matches!(self.state, ResponseState::Tmp { .. }) {
            self.data.zeroize();
            self.state = ResponseState::NoData;
        }
    }

    /// Zeroes the backing storage and resets to `Empty`, used on any
    /// failure path that touched sensitive plaintext (spec sections 5, 7).
    pub fn scrub(&mut self) {
        self.data.zeroize();
        self.state = ResponseState::Empty;
    }

    /// Translates the buffer's current state into the [`crate::Outcome`]
    /// the command loop uses to pick a status word, per spec section 6.
    /// `Tmp` (a pending decipher continuation) and `NoData` both report as
    /// [`crate::Outcome::Complete`]: neither leaves bytes for GET RESPONSE.
    #[must_use]
    pub fn outcome(&self) -> crate::Outcome {
        match self.state {
            ResponseState::Ready { len } => crate::Outcome::Ready { len },
            ResponseState::Empty | ResponseState::Tmp { .. } | ResponseState::NoData => crate::Outcome::Complete,
        }
    }
}
