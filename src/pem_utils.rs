//! PEM encoding of keys and certificates.

use pkcs8::{EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::cert::CertificateRecord;
use crate::error::{JwkKitError, Result};

pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
///
/// The body is wrapped at 64 columns with LF line endings.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Convert a PEM‑encoded string to DER‑encoded bytes, checking its label.
pub fn pem_to_der(pem_str: &str, expected_label: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str)?;
    if pem.tag() != expected_label {
        return Err(JwkKitError::DecodingError(format!(
            "Expected PEM label {expected_label}, found {}",
            pem.tag()
        )));
    }
    Ok(pem.contents().to_vec())
}

/// Unencrypted PKCS#8 `PRIVATE KEY` block.
///
/// The caller is responsible for protecting the returned text.
pub fn encode_private_key(private_key: &RsaPrivateKey) -> Result<String> {
    let der = private_key.to_pkcs8_der()?;
    Ok(der_to_pem(der.as_bytes(), PRIVATE_KEY_LABEL))
}

/// SubjectPublicKeyInfo `PUBLIC KEY` block.
pub fn encode_public_key(public_key: &RsaPublicKey) -> Result<String> {
    let der = public_key.to_public_key_der()?;
    Ok(der_to_pem(der.as_bytes(), PUBLIC_KEY_LABEL))
}

/// X.509 `CERTIFICATE` block.
pub fn encode_certificate(certificate: &CertificateRecord) -> Result<String> {
    Ok(der_to_pem(&certificate.to_der()?, CERTIFICATE_LABEL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyPairFactory;
    use pkcs8::{DecodePrivateKey, DecodePublicKey};

    fn assert_framed(text: &str, label: &str) {
        assert!(text.starts_with(&format!("-----BEGIN {label}-----\n")));
        assert!(text.trim_end().ends_with(&format!("-----END {label}-----")));
        for line in text.lines() {
            assert!(line.len() <= 64, "line too long: {line}");
        }
    }

    #[test]
    fn test_private_key_pem() {
        let key_pair = KeyPairFactory::new().generate(512).unwrap();
        let pem = encode_private_key(key_pair.private()).unwrap();
        assert_framed(&pem, PRIVATE_KEY_LABEL);

        let der = pem_to_der(&pem, PRIVATE_KEY_LABEL).unwrap();
        let decoded = RsaPrivateKey::from_pkcs8_der(&der).unwrap();
        assert_eq!(&decoded, key_pair.private());
    }

    #[test]
    fn test_public_key_pem() {
        let key_pair = KeyPairFactory::new().generate(512).unwrap();
        let pem = encode_public_key(key_pair.public()).unwrap();
        assert_framed(&pem, PUBLIC_KEY_LABEL);

        let der = pem_to_der(&pem, PUBLIC_KEY_LABEL).unwrap();
        assert_eq!(der, key_pair.public_key_der().unwrap());
        let decoded = RsaPublicKey::from_public_key_der(&der).unwrap();
        assert_eq!(&decoded, key_pair.public());
    }

    #[test]
    fn test_label_mismatch() {
        let pem = der_to_pem(&[0x30, 0x00], CERTIFICATE_LABEL);
        assert!(matches!(
            pem_to_der(&pem, PUBLIC_KEY_LABEL),
            Err(JwkKitError::DecodingError(_))
        ));
    }
}
