use jwkkit::key::KeyPairFactory;
use jwkkit::kid::KeyIdStrategy;
use jwkkit::record::{Algorithm, KeyRecord, KeyUsage};

/// Generates a signing key with a kid derived from its public key.
pub fn generate_signing_record(bits: usize) -> KeyRecord {
    let key_pair = KeyPairFactory::new().generate(bits).unwrap();
    let kid = KeyIdStrategy::lookup("derive")
        .unwrap()
        .generate(KeyUsage::Signing, &key_pair.public_key_der().unwrap());

    KeyRecord::from_key_pair(key_pair, KeyUsage::Signing, Algorithm::RS256, kid).unwrap()
}
