//! JSON Web Key (RFC 7517) encoding of key records.
//!
//! Big integers are written as unsigned big-endian, unpadded base64url.
//! Output is pretty-printed with a fixed member order.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bon::Builder;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::{JwkKitError, Result};
use crate::key::MAX_KEY_SIZE;
use crate::record::{KeyRecord, PrivateComponents, PublicComponents};

/// Options controlling [`encode`].
///
/// # Fields
/// * `as_key_set` - Wrap the key in a one-element JWK Set (`{"keys": [...]}`).
/// * `include_private` - Emit `d`, `p`, `q`, `dp`, `dq` and `qi`.
#[derive(Clone, Copy, Debug, Default, Builder)]
pub struct JsonOptions {
    #[builder(default)]
    pub as_key_set: bool,
    #[builder(default)]
    pub include_private: bool,
}

/// A single RSA JSON Web Key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    pub n: String,
    pub e: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

/// A JWK Set: an object holding an array of keys under `keys`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

fn encode_uint(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

fn decode_uint(member: &str, value: &str) -> Result<BigUint> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| JwkKitError::DecodingError(format!("Invalid base64url in '{member}': {e}")))?;
    if bytes.is_empty() {
        return Err(JwkKitError::DecodingError(format!(
            "Empty value for '{member}'"
        )));
    }
    Ok(BigUint::from_bytes_be(&bytes))
}

impl Jwk {
    /// Builds the JWK for `record`, with private members when `include_private` is set.
    pub fn from_record(record: &KeyRecord, include_private: bool) -> Result<Self> {
        let public = record.public_components();
        let mut jwk = Jwk {
            kty: record.key_family().as_jwk_kty().to_string(),
            key_use: Some(record.usage().as_jwk_use().to_string()),
            alg: Some(record.algorithm().as_str().to_string()),
            kid: Some(record.kid().to_string()),
            n: encode_uint(&public.n),
            e: encode_uint(&public.e),
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
        };

        if include_private {
            let private = record.private_components()?.ok_or_else(|| {
                JwkKitError::EncodingError(format!(
                    "Key {} carries no private material",
                    record.kid()
                ))
            })?;
            jwk.d = Some(encode_uint(&private.d));
            jwk.p = Some(encode_uint(&private.p));
            jwk.q = Some(encode_uint(&private.q));
            jwk.dp = Some(encode_uint(&private.dp));
            jwk.dq = Some(encode_uint(&private.dq));
            jwk.qi = Some(encode_uint(&private.qi));
        }

        Ok(jwk)
    }

    /// Parses a single JWK from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let jwk: Jwk = serde_json::from_str(json)?;
        jwk.check_kty()?;
        Ok(jwk)
    }

    fn check_kty(&self) -> Result<()> {
        if self.kty != "RSA" {
            return Err(JwkKitError::DecodingError(format!(
                "Unsupported key type: {}",
                self.kty
            )));
        }
        Ok(())
    }

    /// True when any private member is present.
    pub fn is_private(&self) -> bool {
        [&self.d, &self.p, &self.q, &self.dp, &self.dq, &self.qi]
            .iter()
            .any(|member| member.is_some())
    }

    /// Strips the private members.
    pub fn to_public(&self) -> Self {
        Jwk {
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            ..self.clone()
        }
    }

    pub fn public_components(&self) -> Result<PublicComponents> {
        self.check_kty()?;
        Ok(PublicComponents {
            n: decode_uint("n", &self.n)?,
            e: decode_uint("e", &self.e)?,
        })
    }

    /// Decoded private members; `None` for a public JWK.
    ///
    /// A JWK carrying only some of the private members is rejected.
    pub fn private_components(&self) -> Result<Option<PrivateComponents>> {
        if !self.is_private() {
            return Ok(None);
        }
        let member = |name: &str, value: &Option<String>| -> Result<BigUint> {
            let value = value.as_deref().ok_or_else(|| {
                JwkKitError::DecodingError(format!("Missing private member '{name}'"))
            })?;
            decode_uint(name, value)
        };
        Ok(Some(PrivateComponents {
            d: member("d", &self.d)?,
            p: member("p", &self.p)?,
            q: member("q", &self.q)?,
            dp: member("dp", &self.dp)?,
            dq: member("dq", &self.dq)?,
            qi: member("qi", &self.qi)?,
        }))
    }

    pub fn to_public_key(&self) -> Result<RsaPublicKey> {
        let PublicComponents { n, e } = self.public_components()?;
        RsaPublicKey::new_with_max_size(n, e, MAX_KEY_SIZE)
            .map_err(|e| JwkKitError::DecodingError(e.to_string()))
    }

    pub fn to_private_key(&self) -> Result<RsaPrivateKey> {
        let PublicComponents { n, e } = self.public_components()?;
        let private = self.private_components()?.ok_or_else(|| {
            JwkKitError::DecodingError("JWK carries no private material".to_string())
        })?;
        let key = RsaPrivateKey::from_components(n, e, private.d, vec![private.p, private.q])
            .map_err(|e| JwkKitError::DecodingError(e.to_string()))?;
        key.validate()
            .map_err(|e| JwkKitError::DecodingError(e.to_string()))?;
        Ok(key)
    }
}

impl JwkSet {
    pub fn from_json(json: &str) -> Result<Self> {
        let set: JwkSet = serde_json::from_str(json)?;
        for jwk in &set.keys {
            jwk.check_kty()?;
        }
        Ok(set)
    }

    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|jwk| jwk.kid.as_deref() == Some(kid))
    }

    pub fn to_public(&self) -> Self {
        JwkSet {
            keys: self.keys.iter().map(Jwk::to_public).collect(),
        }
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| JwkKitError::EncodingError(e.to_string()))
}

/// Serializes `record` as a JWK or a one-element JWK Set.
pub fn encode(record: &KeyRecord, options: &JsonOptions) -> Result<String> {
    let jwk = Jwk::from_record(record, options.include_private)?;
    if options.as_key_set {
        to_pretty_json(&JwkSet { keys: vec![jwk] })
    } else {
        to_pretty_json(&jwk)
    }
}

/// Adds `record` to an existing JWK Set document, or starts a new set.
///
/// `options.as_key_set` is implied. A key whose kid is already present in the
/// set is rejected.
pub fn append_to_set(
    existing: Option<&str>,
    record: &KeyRecord,
    options: &JsonOptions,
) -> Result<String> {
    let mut set = match existing {
        Some(json) => JwkSet::from_json(json)?,
        None => JwkSet::default(),
    };
    if set.find(record.kid()).is_some() {
        return Err(JwkKitError::ValidationError(format!(
            "Key set already contains kid {}",
            record.kid()
        )));
    }
    set.keys.push(Jwk::from_record(record, options.include_private)?);
    tracing::debug!(kid = record.kid(), keys = set.keys.len(), "appended key to set");

    if !options.include_private {
        set = set.to_public();
    }
    to_pretty_json(&set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyPairFactory;
    use crate::record::{Algorithm, KeyUsage};

    fn record(kid: &str) -> KeyRecord {
        let key_pair = KeyPairFactory::new().generate(512).unwrap();
        KeyRecord::from_key_pair(key_pair, KeyUsage::Signing, Algorithm::RS256, kid).unwrap()
    }

    #[test]
    fn test_private_round_trip() {
        let record = record("rt");
        let options = JsonOptions::builder().include_private(true).build();
        let json = encode(&record, &options).unwrap();

        let jwk = Jwk::from_json(&json).unwrap();
        assert_eq!(jwk.public_components().unwrap(), record.public_components());
        assert_eq!(
            jwk.private_components().unwrap(),
            record.private_components().unwrap()
        );
        assert_eq!(&jwk.to_private_key().unwrap(), record.private_key().unwrap());
        assert_eq!(&jwk.to_public_key().unwrap(), record.public_key());
    }

    #[test]
    fn test_public_output_has_no_private_members() {
        let record = record("pub");
        for as_key_set in [false, true] {
            let options = JsonOptions::builder().as_key_set(as_key_set).build();
            let json = encode(&record, &options).unwrap();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            let key = if as_key_set { &value["keys"][0] } else { &value };
            for member in ["d", "p", "q", "dp", "dq", "qi"] {
                assert!(key.get(member).is_none(), "{member} leaked");
            }
            assert_eq!(key["kty"], "RSA");
            assert_eq!(key["use"], "sig");
            assert_eq!(key["alg"], "RS256");
            assert_eq!(key["kid"], "pub");
        }
    }

    #[test]
    fn test_key_set_is_single_element_array() {
        let record = record("set");
        let json = encode(&record, &JsonOptions::builder().as_key_set(true).build()).unwrap();
        let set = JwkSet::from_json(&json).unwrap();
        assert_eq!(set.keys.len(), 1);
        assert!(set.find("set").is_some());
        assert!(json.contains('\n'), "output should be pretty-printed");
    }

    #[test]
    fn test_private_output_of_public_record_fails() {
        let record = record("p").to_public();
        let options = JsonOptions::builder().include_private(true).build();
        assert!(matches!(
            encode(&record, &options),
            Err(JwkKitError::EncodingError(_))
        ));
    }

    #[test]
    fn test_partial_private_members_rejected() {
        let record = record("partial");
        let mut jwk = Jwk::from_record(&record, true).unwrap();
        jwk.qi = None;
        assert!(matches!(
            jwk.private_components(),
            Err(JwkKitError::DecodingError(_))
        ));
    }

    #[test]
    fn test_non_rsa_jwk_rejected() {
        let json = r#"{"kty":"EC","n":"AQAB","e":"AQAB"}"#;
        assert!(matches!(
            Jwk::from_json(json),
            Err(JwkKitError::DecodingError(_))
        ));
    }

    #[test]
    fn test_append_to_set() {
        let first = record("one");
        let second = record("two");
        let options = JsonOptions::default();

        let json = append_to_set(None, &first, &options).unwrap();
        let json = append_to_set(Some(&json), &second, &options).unwrap();
        let set = JwkSet::from_json(&json).unwrap();
        assert_eq!(set.keys.len(), 2);
        assert!(set.keys.iter().all(|jwk| !jwk.is_private()));

        assert!(matches!(
            append_to_set(Some(&json), &first, &options),
            Err(JwkKitError::ValidationError(_))
        ));
    }
}
