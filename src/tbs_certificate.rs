use rsa::RsaPublicKey;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{DistinguishedName, Validity};
use crate::error::{JwkKitError, Result};

fn build_err(err: impl std::fmt::Display) -> JwkKitError {
    JwkKitError::CertificateBuildError(err.to_string())
}

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `serial_number` - The certificate serial number.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The notBefore / notAfter window.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
pub struct TbsCertificate {
    pub serial_number: u64,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: DistinguishedName,
    pub validity: Validity,
    pub subject: DistinguishedName,
    pub subject_public_key: RsaPublicKey,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let not_before = x509_cert::time::Time::UtcTime(
            der::asn1::UtcTime::from_system_time(self.validity.not_before.into())
                .map_err(build_err)?,
        );
        let not_after = x509_cert::time::Time::UtcTime(
            der::asn1::UtcTime::from_system_time(self.validity.not_after.into())
                .map_err(build_err)?,
        );

        let serial_number =
            SerialNumber::new(&self.serial_number.to_be_bytes()).map_err(build_err)?;

        let subject_public_key_info =
            SubjectPublicKeyInfoOwned::from_key(self.subject_public_key.clone())
                .map_err(build_err)?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.algorithm_identifier()?,
            issuer: self.issuer.as_x509_name()?,
            validity: x509_cert::time::Validity {
                not_before,
                not_after,
            },
            subject: self.subject.as_x509_name()?,
            subject_public_key_info,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: None,
        })
    }

    /// Creates a `TbsCertificate` from a `TbsCertificateInner`.
    pub fn from_tbs_certificate_inner(inner: &TbsCertificateInner) -> Result<Self> {
        let decode_err = |what: &str| JwkKitError::DecodingError(format!("Certificate {what}"));

        let issuer = DistinguishedName::from_x509_name(&inner.issuer)
            .ok_or_else(|| decode_err("issuer has no common name"))?;
        let subject = DistinguishedName::from_x509_name(&inner.subject)
            .ok_or_else(|| decode_err("subject has no common name"))?;

        let spki_der = der::Encode::to_der(&inner.subject_public_key_info)?;
        let subject_public_key = {
            use pkcs8::DecodePublicKey;
            RsaPublicKey::from_public_key_der(&spki_der)
                .map_err(|e| JwkKitError::DecodingError(e.to_string()))?
        };

        let to_offset = |t: &x509_cert::time::Time| match t {
            x509_cert::time::Time::UtcTime(ut) => time::OffsetDateTime::from(ut.to_system_time()),
            x509_cert::time::Time::GeneralTime(gt) => {
                time::OffsetDateTime::from(gt.to_system_time())
            }
        };
        let validity = Validity {
            not_before: to_offset(&inner.validity.not_before),
            not_after: to_offset(&inner.validity.not_after),
        };

        let serial_bytes: Vec<u8> = inner
            .serial_number
            .as_bytes()
            .iter()
            .copied()
            .skip_while(|byte| *byte == 0)
            .collect();
        if serial_bytes.len() > 8 {
            return Err(decode_err("serial number does not fit in 64 bits"));
        }
        let serial_number = serial_bytes
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));

        Ok(Self {
            serial_number,
            signature_algorithm: SignatureAlgorithm::from_oid(&inner.signature.oid)?,
            issuer,
            validity,
            subject,
            subject_public_key,
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        der::Encode::to_der(&self.to_tbs_certificate_inner()?).map_err(build_err)
    }
}
