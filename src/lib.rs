#![no_std]
#![deny(clippy::pedantic, warnings, missing_docs, unsafe_code)]
// Most of the 'allow' category...
#![deny(absolute_paths_not_starting_with_crate, box_pointers, dead_code)]
#![deny(elided_lifetimes_in_paths, explicit_outlives_requirements, keyword_idents)]
#![deny(let_underscore_drop, macro_use_extern_crate, meta_variable_misuse, missing_abi)]
#![deny(non_ascii_idents, rust_2021_incompatible_closure_captures)]
#![deny(rust_2021_incompatible_or_patterns, rust_2021_prefixes_incompatible_syntax)]
#![deny(rust_2021_prelude_collisions, single_use_lifetimes, trivial_casts)]
#![deny(trivial_numeric_casts, unreachable_pub, unsafe_op_in_unsafe_fn, unstable_features)]
#![deny(unused_extern_crates, unused_import_braces, unused_lifetimes, unused_macro_rules)]
#![deny(unused_qualifications, unused_results, variant_size_differences)]
//
//! Cryptographic command dispatcher and security-environment state machine
//! for a MyEID-compatible PKI smart-card applet.
//!
//! This crate covers MANAGE SECURITY ENVIRONMENT, PERFORM SECURITY
//! OPERATION, GENERAL AUTHENTICATE (ECDH derive), GENERATE KEY, GET DATA
//! and PUT DATA: parsing each command's P1/P2/data, maintaining the
//! security-environment state machine across calls, and applying the
//! PKCS#1 v1.5/DigestInfo/DER framing each operation requires. It never
//! performs modular exponentiation, elliptic-curve arithmetic, block-cipher
//! rounds, or true random generation itself; those, along with the card
//! filesystem, the curve-constant table and the physical APDU transport,
//! are external collaborators described by the traits in [`traits`]. The
//! outer ISO 7816 command loop that selects a file and dispatches by CLA/INS
//! is likewise external — this crate is called once that loop has already
//! routed to one of the operations above.
//!
//! Typical usage flow for a single command:
//! 1. The command loop resolves CLA/INS/P1/P2/data and the currently
//!    selected file, then calls the matching function here
//!    ([`se::manage_security_environment`], [`pso::perform_security_operation`],
//!    [`pso::general_authenticate`], [`keygen::generate_key`],
//!    [`keygen::get_data`], [`keygen::put_data`]), passing its own
//!    implementations of the [`traits`] collaborators plus a
//!    [`types::ResponseBuffer`] and [`types::SecurityEnvironment`] it owns
//!    across commands.
//! 2. On `Ok(())`, the loop reads [`types::ResponseBuffer::state`] (via
//!    [`ResponseBuffer::outcome`](types::ResponseBuffer::outcome)) to decide
//!    between an immediate `0x9000` and a `0x61xx` GET RESPONSE cycle.
//! 3. On `Err(e)`, `StatusWord::from(e)` gives the 2-byte status to return.
//!
//! **--> See [`traits`] for the external collaborator contracts, and
//! [`error::SecurityError`]/[`status::StatusWord`] for the failure model.**

mod byte_fns;
mod curve;
mod ecdh;
mod ecdsa;
mod error;
mod keygen;
mod pso;
mod rsa_framing;
mod se;
mod status;
mod symmetric;
pub mod types;

/// All functionality is covered by traits, such that consumers can utilize trait objects if desired.
pub mod traits;

pub use curve::{CurveId, CurveParams};
pub use error::SecurityError;
pub use keygen::{generate_key, get_data, put_data};
pub use pso::{general_authenticate, perform_security_operation, Kernels};
pub use se::manage_security_environment;
pub use status::StatusWord;

/// What an APDU handler in this crate produced, for the (external) command
/// loop to translate into a status word, per spec section 6.
///
/// `0x61xx` (response ready, `xx` bytes pending on GET RESPONSE) is built
/// from [`Outcome::Ready`] by [`Outcome::status`]; this crate never
/// constructs a `StatusWord` for the success path directly, since whether a
/// command produced a response is a property of the [`types::ResponseBuffer`]
/// it was handed, not of the `Result` it returns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The command completed with nothing staged for GET RESPONSE.
    Complete,
    /// `len` bytes are staged in the response buffer, awaiting GET RESPONSE.
    Ready {
        /// Number of bytes pending.
        len: u16,
    },
}

impl Outcome {
    /// The success-path status word for this outcome. `len` wraps to the
    /// wire convention where a `0x6100` length byte of `0` means 256 bytes.
    #[must_use]
    pub fn status(self) -> StatusWord {
        match self {
            Self::Complete => StatusWord::OK,
            Self::Ready { len } => StatusWord::response_ready((len % 256) as u8),
        }
    }
}

/// ACTIVATE APPLET (INS `0xE6`), per spec sections 4.8 and 6.
///
/// Grounded on `myeid_activate_applet` in the original firmware: beyond
/// reading and discarding an optional data field, the command only flips
/// the card's lifecycle byte (`fs_set_lifecycle`), a filesystem concern
/// out of scope here per spec section 1's `Non-goals`. It notably does
/// *not* reset the security environment the way RESTORE SE does — a
/// `SecurityEnvironment` already configured via MANAGE SECURITY
/// ENVIRONMENT survives an ACTIVATE APPLET call. This crate's part of the
/// command is therefore a no-op that always succeeds.
#[must_use]
pub fn activate_applet(_data: &[u8]) -> Outcome { Outcome::Complete }
