/// A 2-byte ISO 7816-4 status word, per the table in spec section 6.
///
/// `0x61xx` (response ready, `xx` bytes pending on GET RESPONSE) is produced
/// by the outer command loop from a successful [`crate::Outcome::Ready`], not
/// constructed here directly; this type only carries final, fully-resolved
/// status words.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusWord(pub u16);

#[allow(missing_docs)] // each constant is self-describing via its name
impl StatusWord {
    pub const OK: Self = Self(0x9000);
    pub const INCORRECT_LENGTH: Self = Self(0x6700);
    pub const WRONG_FILE_TYPE: Self = Self(0x6981);
    pub const INVALID_DATA: Self = Self(0x6984);
    pub const CONDITIONS_NOT_SATISFIED: Self = Self(0x6985);
    pub const WRONG_DATA_IN_FIELD: Self = Self(0x6A80);
    pub const FUNCTION_NOT_SUPPORTED: Self = Self(0x6A81);
    pub const INCORRECT_P1_P2: Self = Self(0x6A86);
    pub const LC_INCONSISTENT: Self = Self(0x6A87);
    pub const FILE_NOT_FOUND: Self = Self(0x6A82);
    pub const REFERENCED_DATA_NOT_FOUND: Self = Self(0x6A88);

    /// Builds the `0x61xx` "response ready" status for `len` pending bytes,
    /// where `len = 0` conventionally means 256 bytes are available.
    #[must_use]
    pub fn response_ready(len: u8) -> Self { Self(0x6100 | u16::from(len)) }
}
