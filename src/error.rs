//! use jwkkit::error::JwkKitError;

use thiserror::Error;

/// Represents errors that can occur in the JwkKit library.
///
/// Every failure aborts the current generation or encoding call; no partially
/// built record is ever returned alongside an error. Callers branch on the
/// variant, the message is for humans.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwkKitError {
    /// Bad key size, usage, algorithm identifier or kid. Raised before any
    /// key generation or encoding work starts.
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// The RSA provider failed to produce a key pair.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Unknown kid strategy name or otherwise unusable configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Building or signing a self-signed certificate failed.
    #[error("Certificate build error: {0}")]
    CertificateBuildError(String),

    /// A secret store collaborator rejected a write.
    #[error("Secret store error: {0}")]
    SecretStoreError(String),
}

pub type Result<T> = std::result::Result<T, JwkKitError>;

impl From<der::Error> for JwkKitError {
    /// Converts a `der::Error` into a `JwkKitError`.
    fn from(err: der::Error) -> Self {
        JwkKitError::EncodingError(err.to_string())
    }
}

impl From<rsa::Error> for JwkKitError {
    fn from(err: rsa::Error) -> Self {
        JwkKitError::KeyGenerationError(err.to_string())
    }
}

impl From<pkcs8::Error> for JwkKitError {
    fn from(err: pkcs8::Error) -> Self {
        JwkKitError::EncodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for JwkKitError {
    fn from(err: pkcs8::spki::Error) -> Self {
        JwkKitError::EncodingError(err.to_string())
    }
}

impl From<pem::PemError> for JwkKitError {
    fn from(err: pem::PemError) -> Self {
        JwkKitError::DecodingError(err.to_string())
    }
}

impl From<serde_json::Error> for JwkKitError {
    fn from(err: serde_json::Error) -> Self {
        JwkKitError::DecodingError(err.to_string())
    }
}
