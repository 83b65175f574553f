//! The immutable key record every encoder consumes.

use std::fmt;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::{
    BigUint, RsaPrivateKey, RsaPublicKey,
    traits::{PrivateKeyParts, PublicKeyParts},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{JwkKitError, Result};
use crate::key::{self, KeyPair};

/// Key family of a record. Only RSA is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
}

impl KeyFamily {
    /// The JWK `kty` value.
    pub fn as_jwk_kty(&self) -> &'static str {
        match self {
            KeyFamily::Rsa => "RSA",
        }
    }
}

/// Intended use of a key, serialized as the JWK `use` member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyUsage {
    #[default]
    #[serde(rename = "sig", alias = "signing")]
    Signing,
    #[serde(rename = "enc", alias = "encryption")]
    Encryption,
}

impl KeyUsage {
    pub fn as_jwk_use(&self) -> &'static str {
        match self {
            KeyUsage::Signing => "sig",
            KeyUsage::Encryption => "enc",
        }
    }
}

impl FromStr for KeyUsage {
    type Err = JwkKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sig" | "signing" => Ok(KeyUsage::Signing),
            "enc" | "encryption" => Ok(KeyUsage::Encryption),
            other => Err(JwkKitError::ValidationError(format!(
                "Unknown key usage: {other}"
            ))),
        }
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_jwk_use())
    }
}

/// JOSE algorithm identifiers usable with an RSA key.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    #[default]
    RS256,
    RS384,
    RS512,
    PS256,
    PS384,
    PS512,
    RSA1_5,
    RSA_OAEP,
    RSA_OAEP_256,
    RSA_OAEP_384,
    RSA_OAEP_512,
}

// Registered JOSE identifiers that belong to other key families.
const FOREIGN_ALGORITHMS: &[&str] = &[
    "HS256", "HS384", "HS512", "ES256", "ES256K", "ES384", "ES512", "EdDSA", "Ed25519",
    "Ed448", "ECDH-ES", "ECDH-ES+A128KW", "ECDH-ES+A192KW", "ECDH-ES+A256KW", "A128KW",
    "A192KW", "A256KW", "A128GCMKW", "A192GCMKW", "A256GCMKW", "dir", "PBES2-HS256+A128KW",
    "PBES2-HS384+A192KW", "PBES2-HS512+A256KW", "none",
];

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RS256 => "RS256",
            Algorithm::RS384 => "RS384",
            Algorithm::RS512 => "RS512",
            Algorithm::PS256 => "PS256",
            Algorithm::PS384 => "PS384",
            Algorithm::PS512 => "PS512",
            Algorithm::RSA1_5 => "RSA1_5",
            Algorithm::RSA_OAEP => "RSA-OAEP",
            Algorithm::RSA_OAEP_256 => "RSA-OAEP-256",
            Algorithm::RSA_OAEP_384 => "RSA-OAEP-384",
            Algorithm::RSA_OAEP_512 => "RSA-OAEP-512",
        }
    }

    /// The usage this algorithm is registered for.
    pub fn natural_usage(&self) -> KeyUsage {
        match self {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => KeyUsage::Signing,
            _ => KeyUsage::Encryption,
        }
    }
}

impl FromStr for Algorithm {
    type Err = JwkKitError;

    fn from_str(s: &str) -> Result<Self> {
        let alg = match s {
            "RS256" => Algorithm::RS256,
            "RS384" => Algorithm::RS384,
            "RS512" => Algorithm::RS512,
            "PS256" => Algorithm::PS256,
            "PS384" => Algorithm::PS384,
            "PS512" => Algorithm::PS512,
            "RSA1_5" => Algorithm::RSA1_5,
            "RSA-OAEP" => Algorithm::RSA_OAEP,
            "RSA-OAEP-256" => Algorithm::RSA_OAEP_256,
            "RSA-OAEP-384" => Algorithm::RSA_OAEP_384,
            "RSA-OAEP-512" => Algorithm::RSA_OAEP_512,
            other if FOREIGN_ALGORITHMS.contains(&other) => {
                return Err(JwkKitError::ValidationError(format!(
                    "Algorithm {other} is not compatible with RSA keys"
                )));
            }
            other => {
                return Err(JwkKitError::ValidationError(format!(
                    "Unknown algorithm: {other}"
                )));
            }
        };
        Ok(alg)
    }
}

impl TryFrom<String> for Algorithm {
    type Error = JwkKitError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public RSA components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicComponents {
    pub n: BigUint,
    pub e: BigUint,
}

/// Private RSA components, including the CRT parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateComponents {
    pub d: BigUint,
    pub p: BigUint,
    pub q: BigUint,
    pub dp: BigUint,
    pub dq: BigUint,
    pub qi: BigUint,
}

impl PrivateComponents {
    /// Extracts `d` and the CRT parameters of a two-prime key.
    pub fn from_private_key(private: &RsaPrivateKey) -> Result<Self> {
        let missing = |name: &str| JwkKitError::EncodingError(format!("Missing CRT parameter {name}"));

        let [p, q] = private.primes() else {
            return Err(JwkKitError::EncodingError(format!(
                "Expected a two-prime RSA key, found {} primes",
                private.primes().len()
            )));
        };
        let dp = private.dp().ok_or_else(|| missing("dp"))?;
        let dq = private.dq().ok_or_else(|| missing("dq"))?;
        let qi = private
            .qinv()
            .and_then(|qinv| qinv.to_biguint())
            .ok_or_else(|| missing("qi"))?;

        Ok(Self {
            d: private.d().clone(),
            p: p.clone(),
            q: q.clone(),
            dp: dp.clone(),
            dq: dq.clone(),
            qi,
        })
    }
}

/// An RSA key with its usage, algorithm and kid.
///
/// Records are built once through [`KeyRecord::assemble`] and never change
/// afterwards. A public-only record (see [`KeyRecord::to_public`]) carries no
/// private key at all.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    size_bits: usize,
    usage: KeyUsage,
    algorithm: Algorithm,
    public: RsaPublicKey,
    private: Option<Box<RsaPrivateKey>>,
    kid: String,
}

impl KeyRecord {
    /// Assembles a record from a public key and an optional matching private key.
    ///
    /// Fails with [`JwkKitError::ValidationError`] when the kid is empty, the
    /// private key does not belong to `public`, or the modulus size is out of
    /// range.
    pub fn assemble(
        public: RsaPublicKey,
        private: Option<RsaPrivateKey>,
        usage: KeyUsage,
        algorithm: Algorithm,
        kid: impl Into<String>,
    ) -> Result<Self> {
        let kid = kid.into();
        if kid.is_empty() {
            return Err(JwkKitError::ValidationError(
                "kid must not be empty".to_string(),
            ));
        }

        if let Some(private) = &private {
            if RsaPublicKey::from(private) != public {
                return Err(JwkKitError::ValidationError(
                    "Private key does not match public key".to_string(),
                ));
            }
        }

        let size_bits = public.n().bits();
        key::validate_key_size(size_bits)?;

        Ok(Self {
            size_bits,
            usage,
            algorithm,
            public,
            private: private.map(Box::new),
            kid,
        })
    }

    /// Assembles a record from a freshly generated key pair.
    pub fn from_key_pair(
        key_pair: KeyPair,
        usage: KeyUsage,
        algorithm: Algorithm,
        kid: impl Into<String>,
    ) -> Result<Self> {
        let (public, private) = key_pair.into_parts();
        Self::assemble(public, Some(private), usage, algorithm, kid)
    }

    /// The same key without private material.
    pub fn to_public(&self) -> Self {
        Self {
            size_bits: self.size_bits,
            usage: self.usage,
            algorithm: self.algorithm,
            public: self.public.clone(),
            private: None,
            kid: self.kid.clone(),
        }
    }

    pub fn key_family(&self) -> KeyFamily {
        KeyFamily::Rsa
    }

    pub fn size_bits(&self) -> usize {
        self.size_bits
    }

    pub fn usage(&self) -> KeyUsage {
        self.usage
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private.as_deref()
    }

    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    /// DER encoding of the SubjectPublicKeyInfo for this record's key.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        key::public_key_der(&self.public)
    }

    pub fn public_components(&self) -> PublicComponents {
        PublicComponents {
            n: self.public.n().clone(),
            e: self.public.e().clone(),
        }
    }

    /// Private components, or `None` for a public-only record.
    pub fn private_components(&self) -> Result<Option<PrivateComponents>> {
        self.private
            .as_deref()
            .map(PrivateComponents::from_private_key)
            .transpose()
    }

    /// RFC 7638 JWK thumbprint (SHA-256, base64url).
    pub fn thumbprint(&self) -> String {
        let canonical = format!(
            r#"{{"e":"{}","kty":"{}","n":"{}"}}"#,
            URL_SAFE_NO_PAD.encode(self.public.e().to_bytes_be()),
            self.key_family().as_jwk_kty(),
            URL_SAFE_NO_PAD.encode(self.public.n().to_bytes_be()),
        );
        URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
    }
}
