pub mod params;

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use const_oid::AssociatedOid;
use der::{Any, Decode, Encode, Tag};
use params::{DistinguishedName, SELF_SIGNED_VALIDITY_DAYS, Validity};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey, pkcs1v15};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{JwkKitError, Result};
use crate::issuer::Issuer;
use crate::record::KeyRecord;
use crate::tbs_certificate::TbsCertificate;

fn build_err(err: impl std::fmt::Display) -> JwkKitError {
    JwkKitError::CertificateBuildError(err.to_string())
}

/// Signature algorithms available for RSA certificates.
///
/// Names follow the JCA convention (`SHA256withRSA`); all use RSASSA-PKCS1-v1_5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    #[default]
    Sha256WithRSA,
    /// SHA-384 with RSA encryption.
    Sha384WithRSA,
    /// SHA-512 with RSA encryption.
    Sha512WithRSA,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha256WithRSA => "SHA256withRSA",
            SignatureAlgorithm::Sha384WithRSA => "SHA384withRSA",
            SignatureAlgorithm::Sha512WithRSA => "SHA512withRSA",
        }
    }

    pub fn oid(&self) -> const_oid::ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRSA => const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha384WithRSA => const_oid::db::rfc5912::SHA_384_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha512WithRSA => const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION,
        }
    }

    pub fn from_oid(oid: &const_oid::ObjectIdentifier) -> Result<Self> {
        [
            SignatureAlgorithm::Sha256WithRSA,
            SignatureAlgorithm::Sha384WithRSA,
            SignatureAlgorithm::Sha512WithRSA,
        ]
        .into_iter()
        .find(|alg| alg.oid() == *oid)
        .ok_or_else(|| JwkKitError::DecodingError(format!("Unsupported signature algorithm {oid}")))
    }

    /// AlgorithmIdentifier with the NULL parameters RFC 4055 requires.
    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        Ok(AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Some(Any::new(Tag::Null, Vec::<u8>::new()).map_err(build_err)?),
        })
    }

    /// Signs `data` with PKCS#1 v1.5 over this algorithm's digest.
    pub fn sign(&self, key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            SignatureAlgorithm::Sha256WithRSA => sign_with::<Sha256>(key, data),
            SignatureAlgorithm::Sha384WithRSA => sign_with::<Sha384>(key, data),
            SignatureAlgorithm::Sha512WithRSA => sign_with::<Sha512>(key, data),
        }
    }

    pub fn verify(&self, key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            SignatureAlgorithm::Sha256WithRSA => verify_with::<Sha256>(key, data, signature),
            SignatureAlgorithm::Sha384WithRSA => verify_with::<Sha384>(key, data, signature),
            SignatureAlgorithm::Sha512WithRSA => verify_with::<Sha512>(key, data, signature),
        }
    }
}

fn sign_with<D: Digest + AssociatedOid>(key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
    let signing_key = pkcs1v15::SigningKey::<D>::new(key.clone());
    let signature = signing_key.try_sign(data).map_err(build_err)?;
    Ok(signature.to_vec())
}

fn verify_with<D: Digest + AssociatedOid>(
    key: &RsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> Result<()> {
    let verifying_key = pkcs1v15::VerifyingKey::<D>::new(key.clone());
    let signature = pkcs1v15::Signature::try_from(signature).map_err(build_err)?;
    verifying_key.verify(data, &signature).map_err(build_err)
}

impl FromStr for SignatureAlgorithm {
    type Err = JwkKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA256WITHRSA" => Ok(SignatureAlgorithm::Sha256WithRSA),
            "SHA384WITHRSA" => Ok(SignatureAlgorithm::Sha384WithRSA),
            "SHA512WITHRSA" => Ok(SignatureAlgorithm::Sha512WithRSA),
            upper if upper.contains("DSA") || upper.starts_with("ED") => {
                Err(JwkKitError::CertificateBuildError(format!(
                    "Signature algorithm {s} is not supported for RSA keys"
                )))
            }
            _ => Err(JwkKitError::CertificateBuildError(format!(
                "Unsupported signature algorithm: {s}"
            ))),
        }
    }
}

impl TryFrom<String> for SignatureAlgorithm {
    type Error = JwkKitError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SignatureAlgorithm> for String {
    fn from(value: SignatureAlgorithm) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static LAST_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Serial number from the current time in milliseconds.
///
/// Serials handed out by this process strictly increase, even when two
/// certificates are built within the same millisecond.
fn next_serial(now: OffsetDateTime) -> u64 {
    let millis = u64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
    let previous = LAST_SERIAL
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(millis.max(last.saturating_add(1)))
        })
        .unwrap_or(0);
    millis.max(previous.saturating_add(1))
}

/// A self-signed X.509 certificate together with its decoded fields.
#[derive(Debug, Clone)]
pub struct CertificateRecord {
    subject: DistinguishedName,
    issuer: DistinguishedName,
    serial_number: u64,
    validity: Validity,
    signature_algorithm: SignatureAlgorithm,
    public_key_der: Vec<u8>,
    inner: CertificateInner,
}

impl CertificateRecord {
    /// Creates a new self-signed certificate for `record`.
    ///
    /// The subject defaults to the record's kid. Validity starts now and
    /// lasts 300 days.
    #[tracing::instrument(skip(record), fields(kid = record.kid()))]
    pub fn new_self_signed(
        record: &KeyRecord,
        subject_name: Option<&str>,
        signature_algorithm: SignatureAlgorithm,
    ) -> Result<Self> {
        let private = record.private_key().ok_or_else(|| {
            JwkKitError::CertificateBuildError(format!(
                "Key {} carries no private key to sign with",
                record.kid()
            ))
        })?;

        let name = match subject_name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if !record.kid().is_empty() => record.kid().to_string(),
            _ => record.thumbprint(),
        };

        let now = OffsetDateTime::now_utc();
        let self_issuer = SelfIssuer {
            name: DistinguishedName::new(name),
            key: private,
            serial_number: next_serial(now),
        };
        let validity = Validity::starting_at(now, SELF_SIGNED_VALIDITY_DAYS)?;

        let inner = self_issuer.issue(
            &self_issuer.name,
            record.public_key(),
            signature_algorithm,
            validity.clone(),
        )?;
        let public_key_der = inner
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(build_err)?;

        tracing::debug!(
            serial = self_issuer.serial_number,
            subject = %self_issuer.name.common_name,
            algorithm = %signature_algorithm,
            "built self-signed certificate"
        );

        Ok(Self {
            subject: self_issuer.name.clone(),
            issuer: self_issuer.name,
            serial_number: self_issuer.serial_number,
            validity,
            signature_algorithm,
            public_key_der,
            inner,
        })
    }

    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| JwkKitError::DecodingError(e.to_string()))?;
        let tbs = TbsCertificate::from_tbs_certificate_inner(&inner.tbs_certificate)?;
        let public_key_der = inner
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| JwkKitError::DecodingError(e.to_string()))?;
        Ok(Self {
            subject: tbs.subject,
            issuer: tbs.issuer,
            serial_number: tbs.serial_number,
            validity: tbs.validity,
            signature_algorithm: tbs.signature_algorithm,
            public_key_der,
            inner,
        })
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn serial_number(&self) -> u64 {
        self.serial_number
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    /// DER SubjectPublicKeyInfo embedded in the certificate.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    pub fn inner(&self) -> &CertificateInner {
        &self.inner
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| JwkKitError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        crate::pem_utils::encode_certificate(self)
    }

    /// Checks the signature against the embedded public key.
    pub fn verify_self_signature(&self) -> Result<()> {
        use pkcs8::DecodePublicKey;

        let public = RsaPublicKey::from_public_key_der(&self.public_key_der)
            .map_err(|e| JwkKitError::DecodingError(e.to_string()))?;
        let tbs_der = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| JwkKitError::EncodingError(e.to_string()))?;
        self.signature_algorithm
            .verify(&public, &tbs_der, self.inner.signature.raw_bytes())
    }
}

/// Builds a self-signed certificate for `record`.
///
/// `signature_algorithm` is a JCA-style name such as `SHA256withRSA`.
pub fn self_sign(
    record: &KeyRecord,
    subject_name: Option<&str>,
    signature_algorithm: &str,
) -> Result<CertificateRecord> {
    let signature_algorithm = signature_algorithm.parse()?;
    CertificateRecord::new_self_signed(record, subject_name, signature_algorithm)
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: DistinguishedName,
    key: &'a RsaPrivateKey,
    serial_number: u64,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> DistinguishedName {
        self.name.clone()
    }

    fn signing_key(&self) -> Option<&RsaPrivateKey> {
        Some(self.key)
    }

    fn serial_number(&self) -> u64 {
        self.serial_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyPairFactory;
    use crate::record::{Algorithm, KeyUsage};

    fn record(kid: &str) -> KeyRecord {
        let key_pair = KeyPairFactory::new().generate(1024).unwrap();
        KeyRecord::from_key_pair(key_pair, KeyUsage::Signing, Algorithm::RS256, kid).unwrap()
    }

    #[test]
    fn test_self_signed_fields() {
        let record = record("kid-1");
        let cert = self_sign(&record, Some("example"), "SHA256withRSA").unwrap();

        assert_eq!(cert.subject().common_name, "example");
        assert_eq!(cert.issuer(), cert.subject());
        assert_eq!(cert.validity().duration(), time::Duration::days(300));
        assert_eq!(cert.public_key_der(), record.public_key_der().unwrap());
        assert_eq!(cert.signature_algorithm(), SignatureAlgorithm::Sha256WithRSA);
        cert.verify_self_signature().unwrap();
    }

    #[test]
    fn test_subject_defaults_to_kid() {
        let record = record("kid-default");
        let cert = self_sign(&record, None, "SHA512withRSA").unwrap();
        assert_eq!(cert.subject().common_name, "kid-default");
        cert.verify_self_signature().unwrap();
    }

    #[test]
    fn test_der_round_trip() {
        let record = record("kid-der");
        let cert = self_sign(&record, None, "SHA384withRSA").unwrap();
        let parsed = CertificateRecord::from_der(&cert.to_der().unwrap()).unwrap();

        assert_eq!(parsed.subject(), cert.subject());
        assert_eq!(parsed.issuer(), cert.issuer());
        assert_eq!(parsed.serial_number(), cert.serial_number());
        assert_eq!(parsed.validity(), cert.validity());
        assert_eq!(parsed.signature_algorithm(), SignatureAlgorithm::Sha384WithRSA);
        assert_eq!(parsed.public_key_der(), cert.public_key_der());
        parsed.verify_self_signature().unwrap();
    }

    #[test]
    fn test_serials_strictly_increase() {
        let now = OffsetDateTime::now_utc();
        let first = next_serial(now);
        let second = next_serial(now);
        assert!(second > first);
    }

    #[test]
    fn test_unsupported_algorithms() {
        let record = record("kid-bad");
        for name in ["SHA256withECDSA", "Ed25519", "MD5withRSA"] {
            assert!(matches!(
                self_sign(&record, None, name),
                Err(JwkKitError::CertificateBuildError(_))
            ));
        }
    }

    #[test]
    fn test_public_only_record_cannot_sign() {
        let record = record("kid-pub").to_public();
        assert!(matches!(
            self_sign(&record, None, "SHA256withRSA"),
            Err(JwkKitError::CertificateBuildError(_))
        ));
    }
}
