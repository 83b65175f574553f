use der::Encode;
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_cert::certificate::CertificateInner;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{DistinguishedName, Validity};
use crate::error::{JwkKitError, Result};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> DistinguishedName;

    /// Returns the signing key of the issuer, if it holds one.
    fn signing_key(&self) -> Option<&RsaPrivateKey>;

    /// Returns the serial number for the next certificate.
    fn serial_number(&self) -> u64;

    /// Issues a certificate for `subject_public_key`.
    ///
    /// # Returns
    /// The signed certificate, or [`JwkKitError::CertificateBuildError`] when
    /// the issuer holds no private key or signing fails.
    fn issue(
        &self,
        subject: &DistinguishedName,
        subject_public_key: &RsaPublicKey,
        signature_algorithm: SignatureAlgorithm,
        validity: Validity,
    ) -> Result<CertificateInner> {
        let signing_key = self.signing_key().ok_or_else(|| {
            JwkKitError::CertificateBuildError(
                "Issuer has no private key to sign with".to_string(),
            )
        })?;

        let tbs_cert = TbsCertificate {
            serial_number: self.serial_number(),
            signature_algorithm,
            issuer: self.issuer_name(),
            validity,
            subject: subject.clone(),
            subject_public_key: subject_public_key.clone(),
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let tbs_der = tbs_cert_inner
            .to_der()
            .map_err(|e| JwkKitError::CertificateBuildError(e.to_string()))?;

        let signature = signature_algorithm.sign(signing_key, &tbs_der)?;

        Ok(CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algorithm.algorithm_identifier()?,
            signature: der::asn1::BitString::from_bytes(&signature)
                .map_err(|e| JwkKitError::CertificateBuildError(e.to_string()))?,
        })
    }
}
