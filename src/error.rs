use crate::status::StatusWord;
use zeroize::Zeroize;

/// If the condition is not met, return an error. Borrowed from the `anyhow` crate.
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err);
        }
    };
}

pub(crate) use ensure; // make available throughout crate


/// Failure taxonomy for the security-environment and cryptographic command
/// core, per the error classes of spec section 7. Every fallible function in
/// this crate returns `Result<_, SecurityError>`; the outer command loop (not
/// part of this crate) maps the error to a single 2-byte status word via
/// `StatusWord::from`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SecurityError {
    /// Lc/Le did not match what the operation required (`0x6700`).
    IncorrectLength,
    /// The selected file's type does not match the requested operation (`0x6981`).
    WrongFileType,
    /// A TLV, ASN.1 length, or framing byte was malformed (`0x6984`).
    InvalidData,
    /// The security environment is missing, mismatched, or a padding/state
    /// check failed after a kernel was invoked (`0x6985`).
    ConditionsNotSatisfied,
    /// Field contents were well-formed but semantically rejected, e.g. an
    /// unsupported algorithm reference or CRDO value (`0x6A80`).
    WrongDataInField,
    /// The requested algorithm, curve, or mode is not supported by this
    /// build's capabilities (`0x6A81`).
    FunctionNotSupported,
    /// P1/P2 did not name a recognized command variant (`0x6A86`).
    IncorrectP1P2,
    /// Lc was inconsistent with P1/P2 (`0x6A87`).
    LcInconsistent,
    /// The file referenced by the current selection does not exist or has
    /// no size (`0x6A82`).
    FileNotFound,
    /// A GET/PUT DATA object, key part, or curve parameter was not found
    /// (`0x6A88`).
    ReferencedDataNotFound,
}

impl From<SecurityError> for StatusWord {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::IncorrectLength => StatusWord::INCORRECT_LENGTH,
            SecurityError::WrongFileType => StatusWord::WRONG_FILE_TYPE,
            SecurityError::InvalidData => StatusWord::INVALID_DATA,
            SecurityError::ConditionsNotSatisfied => StatusWord::CONDITIONS_NOT_SATISFIED,
            SecurityError::WrongDataInField => StatusWord::WRONG_DATA_IN_FIELD,
            SecurityError::FunctionNotSupported => StatusWord::FUNCTION_NOT_SUPPORTED,
            SecurityError::IncorrectP1P2 => StatusWord::INCORRECT_P1_P2,
            SecurityError::LcInconsistent => StatusWord::LC_INCONSISTENT,
            SecurityError::FileNotFound => StatusWord::FILE_NOT_FOUND,
            SecurityError::ReferencedDataNotFound => StatusWord::REFERENCED_DATA_NOT_FOUND,
        }
    }
}


/// Scrubs a sensitive working buffer unless explicitly [`disarm`](Self::disarm)ed.
///
/// Padding assembly and key-part handling touch plaintext/private values in
/// fixed scratch buffers; an early `?` return on a malformed-input or
/// kernel-error path must not leave that material sitting in memory. Rather
/// than repeating a zeroize call on every error arm, the guard is armed for
/// the duration of the fallible section and only disarmed once the result
/// has been copied out to its destination.
pub(crate) struct ZeroizeOnFail<'a> {
    buf: &'a mut [u8],
    armed: bool,
}

impl<'a> ZeroizeOnFail<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self { Self { buf, armed: true } }

    /// Reborrows the guarded buffer for use inside the fallible section.
    pub(crate) fn bytes(&mut self) -> &mut [u8] { self.buf }

    /// Marks the buffer as successfully consumed; the destructor will not
    /// zeroize it.
    pub(crate) fn disarm(mut self) { self.armed = false; }
}

impl Drop for ZeroizeOnFail<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.buf.zeroize();
        }
    }
}
