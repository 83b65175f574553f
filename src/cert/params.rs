use der::asn1::SetOfVec;
use der::{Any, Tag};
use time::{Duration, OffsetDateTime};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use crate::error::{JwkKitError, Result};

/// Lifetime of a self-signed certificate, in days.
pub const SELF_SIGNED_VALIDITY_DAYS: i64 = 300;

/// Distinguished name of a certificate subject or issuer.
///
/// Only the common name (CN) is carried; it is encoded as a UTF8String so any
/// kid can be used verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
}

impl DistinguishedName {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
        }
    }

    /// Converts the distinguished name to an X.509-compatible format.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName> {
        let value = Any::new(Tag::Utf8String, self.common_name.as_bytes())
            .map_err(|e| JwkKitError::CertificateBuildError(e.to_string()))?;
        let atv = AttributeTypeAndValue {
            oid: const_oid::db::rfc4519::CN,
            value,
        };
        let set = SetOfVec::try_from(vec![atv])
            .map_err(|e| JwkKitError::CertificateBuildError(e.to_string()))?;
        Ok(RdnSequence(vec![RelativeDistinguishedName(set)]))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Returns `None` when the name carries no UTF8String or PrintableString CN.
    pub fn from_x509_name(x509dn: &x509_cert::name::DistinguishedName) -> Option<Self> {
        x509dn
            .0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .filter(|attr| attr.oid == const_oid::db::rfc4519::CN)
            .find_map(|attr| {
                attr.value.decode_as::<String>().ok().or_else(|| {
                    attr.value
                        .decode_as::<der::asn1::PrintableStringRef<'_>>()
                        .ok()
                        .map(|s| s.to_string())
                })
            })
            .map(Self::new)
    }
}

/// Certificate validity period.
///
/// Both ends are whole seconds, the resolution X.509 time values carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting at `start` for the given number of days.
    pub fn starting_at(start: OffsetDateTime, days: i64) -> Result<Self> {
        let not_before = OffsetDateTime::from_unix_timestamp(start.unix_timestamp())
            .map_err(|e| JwkKitError::CertificateBuildError(e.to_string()))?;
        Ok(Self {
            not_before,
            not_after: not_before + Duration::days(days),
        })
    }

    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Result<Self> {
        Self::starting_at(OffsetDateTime::now_utc(), days)
    }

    pub fn duration(&self) -> Duration {
        self.not_after - self.not_before
    }
}
