//! End-to-end flows through the public command functions, using fake
//! in-memory implementations of every external collaborator trait. These
//! exercise the security-environment state machine and command dispatch,
//! not any real cryptographic primitive — the kernels are identity/echo
//! stand-ins, matching the unit tests each module already carries.

use std::collections::HashMap;

use myeid_core::traits::{
    CardTransport, CurveConstants, EcKeyGenEngine, EcdhEngine, EcdsaEngine, KeyFileStore, RsaEngine,
    RsaKeyGenEngine, SymmetricEngine,
};
use myeid_core::types::{
    CipherMode, EcPart, EcPoint, EcScalar, FileType, PartTag, ResponseBuffer, RsaPart, SecurityEnvironment,
    SymmetricAlgorithm,
};
use myeid_core::{
    generate_key, general_authenticate, get_data, manage_security_environment, perform_security_operation,
    put_data, CurveId, CurveParams, Kernels,
};

/// A key file store backed by a plain map, indexed by `(file_id, wire tag)`.
#[derive(Default)]
struct MemStore {
    types: HashMap<u16, FileType>,
    sizes: HashMap<u16, u16>,
    parts: HashMap<(u16, u8), Vec<u8>>,
}

impl MemStore {
    fn with_file(mut self, file_id: u16, file_type: FileType, size_bits: u16) -> Self {
        self.types.insert(file_id, file_type);
        self.sizes.insert(file_id, size_bits);
        self
    }
}

impl KeyFileStore for MemStore {
    fn file_type(&self, file_id: u16) -> Result<FileType, myeid_core::SecurityError> {
        self.types.get(&file_id).copied().ok_or(myeid_core::SecurityError::FileNotFound)
    }

    fn read_part(&self, file_id: u16, tag: PartTag, buf: &mut [u8]) -> Result<usize, myeid_core::SecurityError> {
        match self.parts.get(&(file_id, tag.wire_tag())) {
            Some(bytes) => {
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok(bytes.len())
            }
            None => Ok(0),
        }
    }

    fn write_part(&mut self, file_id: u16, tag: PartTag, data: &[u8]) -> Result<(), myeid_core::SecurityError> {
        self.parts.insert((file_id, tag.wire_tag()), data.to_vec());
        Ok(())
    }

    fn file_size_bits(&self, file_id: u16) -> Result<u16, myeid_core::SecurityError> {
        self.sizes.get(&file_id).copied().ok_or(myeid_core::SecurityError::FileNotFound)
    }
}

struct IdentityRsa;
impl RsaEngine for IdentityRsa {
    fn rsa_raw(&self, _file_id: u16, input: &[u8], output: &mut [u8]) -> Result<(), myeid_core::SecurityError> {
        output.copy_from_slice(input);
        Ok(())
    }
}

struct FixedEcdsa;
impl EcdsaEngine for FixedEcdsa {
    fn sign(
        &self, _file_id: u16, curve: &CurveParams, _digest: &[u8], r_out: &mut EcScalar, s_out: &mut EcScalar,
    ) -> Result<(), myeid_core::SecurityError> {
        let len = curve.order.len();
        *r_out = EcScalar::from_be_bytes(&vec![0x01u8; len as usize], len)?;
        *s_out = EcScalar::from_be_bytes(&vec![0x02u8; len as usize], len)?;
        Ok(())
    }
}

struct EchoXEcdh;
impl EcdhEngine for EchoXEcdh {
    fn derive(
        &self, _file_id: u16, _curve: &CurveParams, peer_point: &EcPoint,
    ) -> Result<EcScalar, myeid_core::SecurityError> {
        Ok(peer_point.x)
    }
}

struct XorSymmetric(u8);
impl SymmetricEngine for XorSymmetric {
    fn cipher(
        &self, _file_id: u16, _algorithm: SymmetricAlgorithm, _mode: CipherMode, _iv: &mut [u8], data: &mut [u8],
    ) -> Result<(), myeid_core::SecurityError> {
        data.iter_mut().for_each(|b| *b ^= self.0);
        Ok(())
    }
}

struct FixedCurves;
impl CurveConstants for FixedCurves {
    fn params(&self, id: CurveId) -> Result<CurveParams, myeid_core::SecurityError> {
        let len = id.byte_len();
        Ok(CurveParams {
            id,
            prime: EcScalar::zeroed(len),
            a: EcScalar::zeroed(len),
            b: EcScalar::zeroed(len),
            generator_x: EcScalar::zeroed(len),
            generator_y: EcScalar::zeroed(len),
            order: EcScalar::zeroed(len),
            cofactor: 1,
        })
    }
}

struct FixedRsaKeyGen;
impl RsaKeyGenEngine for FixedRsaKeyGen {
    fn generate(
        &mut self, _file_id: u16, modulus_bits: u16, _public_exponent: &[u8], modulus_out: &mut [u8],
    ) -> Result<usize, myeid_core::SecurityError> {
        let len = (modulus_bits / 8) as usize;
        modulus_out[..len].fill(0x77);
        Ok(len)
    }
}

struct FixedEcKeyGen;
impl EcKeyGenEngine for FixedEcKeyGen {
    fn generate(&mut self, _file_id: u16, curve: &CurveParams) -> Result<EcPoint, myeid_core::SecurityError> {
        let len = curve.id.byte_len();
        Ok(EcPoint {
            x: EcScalar::from_be_bytes(&vec![0xAAu8; len as usize], len)?,
            y: EcScalar::from_be_bytes(&vec![0xBBu8; len as usize], len)?,
        })
    }
}

struct NoopTransport;
impl CardTransport for NoopTransport {
    fn begin_long_operation(&mut self, _total_len: u16) {}
}

fn kernels<'a>(
    store: &'a MemStore, rsa: &'a IdentityRsa, ecdsa: &'a FixedEcdsa, ecdh: &'a EchoXEcdh,
    symmetric: &'a XorSymmetric, curves: &'a FixedCurves,
) -> Kernels<'a> {
    Kernels { store, rsa, ecdsa, ecdh, symmetric, curves }
}

#[test]
fn manage_se_then_sign_round_trip() {
    let mut store = MemStore::default().with_file(1, FileType::Rsa, 128);
    store.write_part(1, PartTag::Rsa(RsaPart::Mod), &[0xFFu8; 16]).unwrap();
    let rsa = IdentityRsa;
    let ecdsa = FixedEcdsa;
    let ecdh = EchoXEcdh;
    let symmetric = XorSymmetric(0);
    let curves = FixedCurves;
    let mut transport = NoopTransport;

    let mut env = SecurityEnvironment::default();
    let crdo = [0x80, 1, 0x00, 0x81, 2, 0x00, 0x01];
    manage_security_environment(&mut env, 0x41, 0xB6, &crdo).unwrap();
    assert_eq!(env.key_file_id, Some(1));

    let mut response = ResponseBuffer::new();
    let payload = [0x55u8; 16];
    perform_security_operation(
        &env,
        kernels(&store, &rsa, &ecdsa, &ecdh, &symmetric, &curves),
        &mut response,
        &mut transport,
        1,
        0x00,
        0x9E,
        0x9A,
        &payload,
    )
    .unwrap();
    assert_eq!(response.ready_bytes(), Some(payload.as_slice()));
}

#[test]
fn decipher_continuation_then_restore_clears_environment() {
    let mut store = MemStore::default().with_file(1, FileType::Rsa, 128);
    store.write_part(1, PartTag::Rsa(RsaPart::Mod), &[0xFFu8; 16]).unwrap();
    let rsa = IdentityRsa;
    let ecdsa = FixedEcdsa;
    let ecdh = EchoXEcdh;
    let symmetric = XorSymmetric(0);
    let curves = FixedCurves;
    let mut transport = NoopTransport;

    let mut env = SecurityEnvironment::default();
    let crdo = [0x80, 1, 0x02, 0x81, 2, 0x00, 0x01];
    manage_security_environment(&mut env, 0x41, 0xB8, &crdo).unwrap();

    let mut block = [0x11u8; 16];
    block[0] = 0x00;
    block[1] = 0x02;
    block[10] = 0x00;
    block[11..].copy_from_slice(&[9, 8, 7, 6, 5]);

    let mut response = ResponseBuffer::new();
    let mut first_half = [0u8; 9];
    first_half[0] = 0x81;
    first_half[1..].copy_from_slice(&block[..8]);
    perform_security_operation(
        &env,
        kernels(&store, &rsa, &ecdsa, &ecdh, &symmetric, &curves),
        &mut response,
        &mut transport,
        1,
        0x00,
        0x80,
        0x86,
        &first_half,
    )
    .unwrap();
    assert!(response.ready_bytes().is_none());

    let mut second_half = [0u8; 9];
    second_half[0] = 0x82;
    second_half[1..].copy_from_slice(&block[8..]);
    perform_security_operation(
        &env,
        kernels(&store, &rsa, &ecdsa, &ecdh, &symmetric, &curves),
        &mut response,
        &mut transport,
        1,
        0x00,
        0x80,
        0x86,
        &second_half,
    )
    .unwrap();
    assert_eq!(response.ready_bytes(), Some([9u8, 8, 7, 6, 5].as_slice()));

    manage_security_environment(&mut env, 0xF3, 0x00, &[]).unwrap();
    assert_eq!(
        perform_security_operation(
            &env,
            kernels(&store, &rsa, &ecdsa, &ecdh, &symmetric, &curves),
            &mut response,
            &mut transport,
            1,
            0x00,
            0x80,
            0x84,
            &[0u8; 16],
        ),
        Err(myeid_core::SecurityError::ConditionsNotSatisfied)
    );
}

#[test]
fn ecdh_derive_round_trip() {
    let mut store = MemStore::default().with_file(2, FileType::NistEc, 256);
    let mut point = vec![0x04u8];
    point.extend([0xCCu8; 32]);
    point.extend([0xDDu8; 32]);
    store.write_part(2, PartTag::Ec(EcPart::Public), &point).unwrap();

    let rsa = IdentityRsa;
    let ecdsa = FixedEcdsa;
    let ecdh = EchoXEcdh;
    let symmetric = XorSymmetric(0);
    let curves = FixedCurves;
    let mut transport = NoopTransport;

    let mut env = SecurityEnvironment::default();
    let crdo = [0x80, 1, 0x00, 0x81, 2, 0x00, 0x02];
    manage_security_environment(&mut env, 0x41, 0xA4, &crdo).unwrap();

    let mut template = vec![0x7C, 67, 0x85, 65, 0x04];
    template.extend([0xABu8; 32]);
    template.extend([0xCDu8; 32]);

    let mut response = ResponseBuffer::new();
    general_authenticate(
        &env,
        kernels(&store, &rsa, &ecdsa, &ecdh, &symmetric, &curves),
        &mut response,
        &mut transport,
        2,
        0x00,
        0x00,
        &template,
    )
    .unwrap();
    assert_eq!(response.ready_bytes(), Some([0xABu8; 32].as_slice()));
}

#[test]
fn generate_rsa_key_then_read_back_via_get_data() {
    let store = MemStore::default().with_file(3, FileType::Rsa, 128);
    let mut rsa_keygen = FixedRsaKeyGen;
    let mut ec_keygen = FixedEcKeyGen;
    let curves = FixedCurves;
    let mut transport = NoopTransport;

    let mut response = ResponseBuffer::new();
    generate_key(&store, &mut rsa_keygen, &mut ec_keygen, &curves, &mut response, &mut transport, 3, 0x00, 0x00, &[])
        .unwrap();
    assert_eq!(response.ready_bytes(), Some([0x77u8; 16].as_slice()));
}

#[test]
fn generate_ec_key_then_read_back_via_get_data() {
    let mut store = MemStore::default().with_file(5, FileType::NistEc, 256);
    let mut rsa_keygen = FixedRsaKeyGen;
    let mut ec_keygen = FixedEcKeyGen;
    let curves = FixedCurves;
    let mut transport = NoopTransport;

    let mut response = ResponseBuffer::new();
    generate_key(&store, &mut rsa_keygen, &mut ec_keygen, &curves, &mut response, &mut transport, 5, 0x00, 0x00, &[])
        .unwrap();
    let generated = response.ready_bytes().unwrap().to_vec();
    assert_eq!(generated[0], 0x86);

    // GENERATE KEY doesn't write through the store in this fake (the real
    // engine would); simulate that side effect directly before reading back.
    let mut point = vec![0x04u8];
    point.extend([0xAAu8; 32]);
    point.extend([0xBBu8; 32]);
    store.write_part(5, PartTag::Ec(EcPart::Public), &point).unwrap();

    get_data(&store, &mut response, &mut transport, 5, 0x01, 0x86).unwrap();
    let bytes = response.ready_bytes().unwrap();
    assert_eq!(bytes[0], 0x30);
}

#[test]
fn put_data_then_get_data_round_trips_rsa_public_exponent() {
    let mut store = MemStore::default().with_file(4, FileType::Rsa, 128);
    put_data(&mut store, 4, 0x01, 0x8B, &[0x01, 0x00, 0x01]).unwrap();

    let mut response = ResponseBuffer::new();
    let mut transport = NoopTransport;
    get_data(&store, &mut response, &mut transport, 4, 0x01, 0x02).unwrap();
    assert_eq!(response.ready_bytes(), Some([0x01u8, 0x00, 0x01].as_slice()));
}

#[test]
fn put_data_on_unselected_tag_leaves_get_data_empty() {
    let store = MemStore::default().with_file(4, FileType::Rsa, 128);

    let mut response = ResponseBuffer::new();
    let mut transport = NoopTransport;
    assert_eq!(
        get_data(&store, &mut response, &mut transport, 4, 0x01, 0x02),
        Err(myeid_core::SecurityError::ReferencedDataNotFound)
    );
}
