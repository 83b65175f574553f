use pkcs8::EncodePublicKey;
use rand_core::{CryptoRngCore, OsRng};
use rsa::{RsaPrivateKey, RsaPublicKey, traits::PublicKeyParts};

use crate::error::{JwkKitError, Result};

/// Smallest modulus size, in bits, the factory will generate.
pub const MIN_KEY_SIZE: usize = 512;

/// Largest modulus size, in bits, the factory will generate.
pub const MAX_KEY_SIZE: usize = 16384;

/// Checks that `bits` is a positive multiple of 8 inside the supported range.
pub fn validate_key_size(bits: usize) -> Result<()> {
    if bits == 0 || bits % 8 != 0 {
        return Err(JwkKitError::ValidationError(format!(
            "Key size (in bits) must be divisible by 8, got {bits}"
        )));
    }
    if !(MIN_KEY_SIZE..=MAX_KEY_SIZE).contains(&bits) {
        return Err(JwkKitError::ValidationError(format!(
            "Key size (in bits) must be between {MIN_KEY_SIZE} and {MAX_KEY_SIZE}, got {bits}"
        )));
    }
    Ok(())
}

/// A freshly generated RSA key pair.
#[derive(Debug, Clone)]
pub struct KeyPair {
    private: Box<RsaPrivateKey>,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Wraps an existing private key, deriving the public half from it.
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair {
            private: Box::new(private),
            public,
        }
    }

    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Modulus length in bits.
    pub fn size_bits(&self) -> usize {
        self.public.n().bits()
    }

    /// DER encoding of the SubjectPublicKeyInfo for the public half.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        public_key_der(&self.public)
    }

    pub fn into_parts(self) -> (RsaPublicKey, RsaPrivateKey) {
        (self.public, *self.private)
    }
}

/// DER encoding of the SubjectPublicKeyInfo structure for `public`.
pub fn public_key_der(public: &RsaPublicKey) -> Result<Vec<u8>> {
    let der = public.to_public_key_der()?;
    Ok(der.as_bytes().to_vec())
}

/// Generates RSA key pairs from a cryptographically secure randomness source.
///
/// The source defaults to the operating system RNG. Any other
/// [`CryptoRngCore`] can be supplied with [`KeyPairFactory::with_rng`].
#[derive(Debug)]
pub struct KeyPairFactory<R = OsRng> {
    rng: R,
}

impl KeyPairFactory<OsRng> {
    /// Creates a factory backed by the operating system RNG.
    pub fn new() -> Self {
        Self { rng: OsRng }
    }
}

impl Default for KeyPairFactory<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CryptoRngCore> KeyPairFactory<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Generate an RSA key pair with the specified number of bits.
    ///
    /// The size is validated first; an invalid size never reaches the
    /// randomness source. Blocks while entropy is drawn.
    pub fn generate(&mut self, bits: usize) -> Result<KeyPair> {
        validate_key_size(bits)?;

        let private = RsaPrivateKey::new(&mut self.rng, bits)
            .map_err(|e| JwkKitError::KeyGenerationError(e.to_string()))?;
        let key_pair = KeyPair::from_private(private);

        tracing::debug!(bits, modulus_bits = key_pair.size_bits(), "generated RSA key pair");
        Ok(key_pair)
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::{CryptoRng, RngCore};

    /// Counts every draw made from the wrapped RNG.
    struct CountingRng {
        inner: OsRng,
        draws: usize,
    }

    impl RngCore for CountingRng {
        fn next_u32(&mut self) -> u32 {
            self.draws += 1;
            self.inner.next_u32()
        }

        fn next_u64(&mut self) -> u64 {
            self.draws += 1;
            self.inner.next_u64()
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            self.draws += 1;
            self.inner.fill_bytes(dest)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand_core::Error> {
            self.draws += 1;
            self.inner.try_fill_bytes(dest)
        }
    }

    impl CryptoRng for CountingRng {}

    fn counting_factory() -> KeyPairFactory<CountingRng> {
        KeyPairFactory::with_rng(CountingRng {
            inner: OsRng,
            draws: 0,
        })
    }

    #[test]
    fn test_generated_modulus_matches_requested_size() {
        let mut factory = KeyPairFactory::new();
        for bits in [512, 776, 1024] {
            let key_pair = factory.generate(bits).unwrap();
            assert_eq!(key_pair.size_bits(), bits);
            assert_eq!(key_pair.public(), &RsaPublicKey::from(key_pair.private()));
        }
    }

    #[test]
    fn test_size_not_multiple_of_eight_never_draws_randomness() {
        let mut factory = counting_factory();
        let err = factory.generate(1001).unwrap_err();
        assert!(matches!(err, JwkKitError::ValidationError(_)));
        assert_eq!(factory.into_inner().draws, 0);
    }

    #[test]
    fn test_out_of_range_sizes_rejected() {
        let mut factory = counting_factory();
        for bits in [0, 8, 256, 504, MAX_KEY_SIZE + 8] {
            assert!(matches!(
                factory.generate(bits),
                Err(JwkKitError::ValidationError(_))
            ));
        }
        assert_eq!(factory.into_inner().draws, 0);
    }

    #[test]
    fn test_valid_size_draws_randomness() {
        let mut factory = counting_factory();
        factory.generate(MIN_KEY_SIZE).unwrap();
        assert!(factory.into_inner().draws > 0);
    }

    #[test]
    fn test_public_key_der_is_spki() {
        use pkcs8::DecodePublicKey;

        let key_pair = KeyPairFactory::new().generate(512).unwrap();
        let der = key_pair.public_key_der().unwrap();
        let decoded = RsaPublicKey::from_public_key_der(&der).unwrap();
        assert_eq!(&decoded, key_pair.public());
    }
}
