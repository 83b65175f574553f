//! Key identifier ("kid") strategies.
//!
//! A kid is either derived from the public key or supplied verbatim by the
//! caller. Strategies are selected by name through [`KeyIdStrategy::lookup`].

use std::fmt;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{JwkKitError, Result};
use crate::record::KeyUsage;

const LITERAL_PREFIX: &str = "literal:";

/// How the kid of a new key is obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyIdStrategy {
    /// base64url (unpadded) SHA-256 digest of the SubjectPublicKeyInfo DER.
    #[default]
    HashDerived,
    /// A fixed, caller-supplied identifier.
    Literal(String),
}

impl KeyIdStrategy {
    /// Resolves a strategy by name.
    ///
    /// `derive` and `sha256` select [`KeyIdStrategy::HashDerived`];
    /// `literal:<value>` selects [`KeyIdStrategy::Literal`].
    pub fn lookup(name: &str) -> Result<Self> {
        match name {
            "derive" | "sha256" => Ok(KeyIdStrategy::HashDerived),
            _ => match name.strip_prefix(LITERAL_PREFIX) {
                Some(value) => Self::literal(value),
                None => Err(JwkKitError::ConfigurationError(format!(
                    "Unknown kid strategy: {name}"
                ))),
            },
        }
    }

    /// A literal strategy returning `kid` for every key.
    pub fn literal(kid: impl Into<String>) -> Result<Self> {
        let kid = kid.into();
        if kid.is_empty() {
            return Err(JwkKitError::ConfigurationError(
                "Literal kid must not be empty".to_string(),
            ));
        }
        Ok(KeyIdStrategy::Literal(kid))
    }

    /// Produces the kid for a key with the given usage and SPKI DER encoding.
    pub fn generate(&self, usage: KeyUsage, public_key_der: &[u8]) -> String {
        match self {
            KeyIdStrategy::HashDerived => {
                let kid = derive_kid(public_key_der);
                tracing::debug!(use_ = usage.as_jwk_use(), %kid, "derived kid from public key");
                kid
            }
            KeyIdStrategy::Literal(kid) => kid.clone(),
        }
    }
}

/// SHA-256 over `public_key_der`, rendered as unpadded base64url.
pub fn derive_kid(public_key_der: &[u8]) -> String {
    let fp: [u8; 32] = Sha256::digest(public_key_der).into();
    URL_SAFE_NO_PAD.encode(fp)
}

impl FromStr for KeyIdStrategy {
    type Err = JwkKitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::lookup(s)
    }
}

impl TryFrom<String> for KeyIdStrategy {
    type Error = JwkKitError;

    fn try_from(value: String) -> Result<Self> {
        Self::lookup(&value)
    }
}

impl From<KeyIdStrategy> for String {
    fn from(value: KeyIdStrategy) -> Self {
        value.to_string()
    }
}

impl fmt::Display for KeyIdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyIdStrategy::HashDerived => f.write_str("derive"),
            KeyIdStrategy::Literal(kid) => write!(f, "{LITERAL_PREFIX}{kid}"),
        }
    }
}
