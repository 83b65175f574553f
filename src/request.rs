//! Parameters of a key generation run.

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::cert::SignatureAlgorithm;
use crate::error::{JwkKitError, Result};
use crate::key;
use crate::kid::KeyIdStrategy;
use crate::record::{Algorithm, KeyUsage};

/// Default modulus size, in bits.
pub const DEFAULT_KEY_SIZE: usize = 2048;

/// Default secret field the private key PEM is stored under.
pub const DEFAULT_SECRET_FIELD: &str = "PRIVATE_KEY";

/// Everything needed to generate and encode one key.
///
/// Built with [`GenerationRequest::builder`] or deserialized from a config
/// document; missing members take their defaults.
///
/// # Fields
/// * `size_bits` - RSA modulus size (default 2048).
/// * `usage` - JWK `use` (default `sig`).
/// * `algorithm` - JWK `alg` (default `RS256`).
/// * `kid_strategy` - How the kid is obtained (default `derive`).
/// * `subject` - Certificate subject CN; the kid when absent.
/// * `self_signed_certificate` - Also build a self-signed certificate.
/// * `certificate_algorithm` - Certificate signature algorithm (default `SHA256withRSA`).
/// * `secret_path` - Secret store path; the private key is discarded when absent.
/// * `secret_field` - Field name for the private key PEM (default `PRIVATE_KEY`).
#[derive(Clone, Debug, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationRequest {
    #[builder(default = DEFAULT_KEY_SIZE)]
    pub size_bits: usize,
    #[builder(default)]
    pub usage: KeyUsage,
    #[builder(default)]
    pub algorithm: Algorithm,
    #[builder(default)]
    pub kid_strategy: KeyIdStrategy,
    #[builder(into)]
    pub subject: Option<String>,
    #[builder(default)]
    pub self_signed_certificate: bool,
    #[builder(default)]
    pub certificate_algorithm: SignatureAlgorithm,
    #[builder(into)]
    pub secret_path: Option<String>,
    #[builder(into, default = DEFAULT_SECRET_FIELD.to_string())]
    pub secret_field: String,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GenerationRequest {
    /// Runs every check that does not need key material.
    pub fn validate(&self) -> Result<()> {
        key::validate_key_size(self.size_bits)?;

        if let KeyIdStrategy::Literal(kid) = &self.kid_strategy {
            if kid.is_empty() {
                return Err(JwkKitError::ConfigurationError(
                    "Literal kid must not be empty".to_string(),
                ));
            }
        }
        if matches!(self.subject.as_deref(), Some("")) {
            return Err(JwkKitError::ValidationError(
                "Certificate subject must not be empty".to_string(),
            ));
        }
        if self.secret_field.is_empty() {
            return Err(JwkKitError::ConfigurationError(
                "Secret field name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = GenerationRequest::default();
        assert_eq!(request.size_bits, 2048);
        assert_eq!(request.usage, KeyUsage::Signing);
        assert_eq!(request.algorithm, Algorithm::RS256);
        assert_eq!(request.kid_strategy, KeyIdStrategy::HashDerived);
        assert_eq!(request.secret_field, "PRIVATE_KEY");
        assert_eq!(request.certificate_algorithm, SignatureAlgorithm::Sha256WithRSA);
        assert!(!request.self_signed_certificate);
        request.validate().unwrap();
    }

    #[test]
    fn test_from_json_config() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{
                "size_bits": 3072,
                "usage": "enc",
                "algorithm": "RSA-OAEP-256",
                "kid_strategy": "literal:svc-key",
                "secret_path": "k8s/service"
            }"#,
        )
        .unwrap();
        assert_eq!(request.size_bits, 3072);
        assert_eq!(request.usage, KeyUsage::Encryption);
        assert_eq!(request.algorithm, Algorithm::RSA_OAEP_256);
        assert_eq!(
            request.kid_strategy,
            KeyIdStrategy::Literal("svc-key".to_string())
        );
        assert_eq!(request.secret_path.as_deref(), Some("k8s/service"));
        assert_eq!(request.secret_field, DEFAULT_SECRET_FIELD);
    }

    #[test]
    fn test_config_rejects_foreign_algorithm_and_unknown_strategy() {
        assert!(serde_json::from_str::<GenerationRequest>(r#"{"algorithm": "ES256"}"#).is_err());
        assert!(
            serde_json::from_str::<GenerationRequest>(r#"{"kid_strategy": "timestamp"}"#).is_err()
        );
    }

    #[test]
    fn test_validate_rejects_bad_size() {
        let request = GenerationRequest::builder().size_bits(2047).build();
        assert!(matches!(
            request.validate(),
            Err(JwkKitError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_secret_field() {
        let request = GenerationRequest::builder().secret_field("").build();
        assert!(matches!(
            request.validate(),
            Err(JwkKitError::ConfigurationError(_))
        ));
    }
}
