//! The JWKS generation pipeline.
//!
//! validate → generate → kid → assemble → encode, then optionally hand the
//! private key PEM to a [`SecretStore`].

use rand_core::{CryptoRngCore, OsRng};

use crate::cert::CertificateRecord;
use crate::error::{JwkKitError, Result};
use crate::jwk::{self, JsonOptions};
use crate::key::KeyPairFactory;
use crate::pem_utils;
use crate::record::KeyRecord;
use crate::request::GenerationRequest;
use crate::secret::{SecretData, SecretStore};

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct JwksBundle {
    record: KeyRecord,
    public_jwks: String,
    public_pem: String,
    private_pem: String,
    certificate: Option<CertificateRecord>,
}

impl JwksBundle {
    pub fn record(&self) -> &KeyRecord {
        &self.record
    }

    pub fn kid(&self) -> &str {
        self.record.kid()
    }

    /// Public JWK Set JSON.
    pub fn public_jwks(&self) -> &str {
        &self.public_jwks
    }

    /// `PUBLIC KEY` PEM block.
    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    /// Unencrypted `PRIVATE KEY` PEM block.
    pub fn private_pem(&self) -> &str {
        &self.private_pem
    }

    pub fn certificate(&self) -> Option<&CertificateRecord> {
        self.certificate.as_ref()
    }

    pub fn certificate_pem(&self) -> Result<Option<String>> {
        self.certificate
            .as_ref()
            .map(pem_utils::encode_certificate)
            .transpose()
    }

    /// The private key PEM under `field`, ready for a secret store.
    pub fn secret_data(&self, field: &str) -> SecretData {
        SecretData::from([(field.to_string(), self.private_pem.clone())])
    }
}

/// Runs the JWKS pipeline with a [`KeyPairFactory`].
#[derive(Debug)]
pub struct JwksHandler<R = OsRng> {
    factory: KeyPairFactory<R>,
}

impl JwksHandler<OsRng> {
    pub fn new() -> Self {
        Self {
            factory: KeyPairFactory::new(),
        }
    }
}

impl Default for JwksHandler<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CryptoRngCore> JwksHandler<R> {
    pub fn with_factory(factory: KeyPairFactory<R>) -> Self {
        Self { factory }
    }

    /// Generates a key and encodes it in every output format.
    ///
    /// The request is validated before any randomness is drawn.
    #[tracing::instrument(skip(self, request), fields(size_bits = request.size_bits, alg = %request.algorithm))]
    pub fn generate(&mut self, request: &GenerationRequest) -> Result<JwksBundle> {
        request.validate()?;

        tracing::info!("generating key");
        let key_pair = self.factory.generate(request.size_bits)?;
        let kid = request
            .kid_strategy
            .generate(request.usage, &key_pair.public_key_der()?);
        let record = KeyRecord::from_key_pair(key_pair, request.usage, request.algorithm, kid)?;

        let public_jwks = jwk::encode(
            &record,
            &JsonOptions::builder().as_key_set(true).build(),
        )?;
        let public_pem = pem_utils::encode_public_key(record.public_key())?;
        let private_key = record.private_key().ok_or_else(|| {
            JwkKitError::EncodingError("Generated record lost its private key".to_string())
        })?;
        let private_pem = pem_utils::encode_private_key(private_key)?;

        let certificate = if request.self_signed_certificate {
            Some(CertificateRecord::new_self_signed(
                &record,
                request.subject.as_deref(),
                request.certificate_algorithm,
            )?)
        } else {
            None
        };

        tracing::info!(kid = record.kid(), "key generated");
        Ok(JwksBundle {
            record,
            public_jwks,
            public_pem,
            private_pem,
            certificate,
        })
    }

    /// Writes the private key of `bundle` to `store` at the request's secret path.
    ///
    /// Without a secret path the private key is discarded. Returns whether a
    /// secret was written.
    pub fn publish<S: SecretStore + ?Sized>(
        &self,
        bundle: &JwksBundle,
        request: &GenerationRequest,
        store: &mut S,
    ) -> Result<bool> {
        let Some(path) = request.secret_path.as_deref().filter(|path| !path.is_empty()) else {
            tracing::warn!(
                kid = bundle.kid(),
                "private key discarded as no secret path was specified"
            );
            return Ok(false);
        };

        store.write_secret(path, &bundle.secret_data(&request.secret_field))?;
        tracing::info!(kid = bundle.kid(), path, "private key stored");
        Ok(true)
    }

    /// [`generate`](Self::generate) followed by [`publish`](Self::publish).
    pub fn run<S: SecretStore + ?Sized>(
        &mut self,
        request: &GenerationRequest,
        store: &mut S,
    ) -> Result<JwksBundle> {
        let bundle = self.generate(request)?;
        self.publish(&bundle, request, store)?;
        Ok(bundle)
    }
}
