//! Seams to the collaborators that receive generated material.
//!
//! The library never talks to a secret store or runs an external signer
//! itself; callers inject implementations of these traits.

use std::collections::BTreeMap;

use crate::error::{JwkKitError, Result};

/// Field/value pairs written to a single secret path.
pub type SecretData = BTreeMap<String, String>;

/// A key/value secret store, such as a Vault KV mount.
pub trait SecretStore {
    /// Writes `data` at `path`, replacing whatever was there.
    fn write_secret(&mut self, path: &str, data: &SecretData) -> Result<()>;
}

/// Secret store held in memory. Useful for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    secrets: BTreeMap<String, SecretData>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&SecretData> {
        self.secrets.get(path)
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl SecretStore for MemorySecretStore {
    fn write_secret(&mut self, path: &str, data: &SecretData) -> Result<()> {
        if path.is_empty() {
            return Err(JwkKitError::SecretStoreError(
                "Secret path must not be empty".to_string(),
            ));
        }
        self.secrets.insert(path.to_string(), data.clone());
        Ok(())
    }
}

/// Key material produced by an external signing tool.
///
/// Both artifacts are held in memory; the signer must leave no files behind.
#[derive(Clone, PartialEq, Eq)]
pub struct ExternalKeyMaterial {
    pub public_artifact: String,
    pub private_artifact: String,
}

impl std::fmt::Debug for ExternalKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalKeyMaterial")
            .field("public_artifact", &self.public_artifact)
            .field("private_artifact", &"<redacted>")
            .finish()
    }
}

impl ExternalKeyMaterial {
    /// Secret layout used for externally generated key pairs.
    ///
    /// The private artifact is stored unencrypted, so `password` is empty.
    pub fn secret_data(&self) -> SecretData {
        BTreeMap::from([
            ("privateKey".to_string(), self.private_artifact.clone()),
            ("password".to_string(), String::new()),
            ("publicKey".to_string(), self.public_artifact.clone()),
        ])
    }
}

/// Invokes an external key generation tool.
pub trait ExternalSigner {
    fn generate_key_pair(&self) -> Result<ExternalKeyMaterial>;
}

/// Generates a key pair with `signer` and writes it to `store` at `path`.
///
/// With no path the material is discarded. Returns whether anything was written.
pub fn store_external_key_pair<G, S>(
    signer: &G,
    store: &mut S,
    path: Option<&str>,
) -> Result<bool>
where
    G: ExternalSigner + ?Sized,
    S: SecretStore + ?Sized,
{
    let material = signer.generate_key_pair()?;
    match path.filter(|path| !path.is_empty()) {
        Some(path) => {
            store.write_secret(path, &material.secret_data())?;
            tracing::info!(path, "stored external key pair");
            Ok(true)
        }
        None => {
            tracing::warn!("external key pair discarded as no secret path was specified");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSigner;

    impl ExternalSigner for FixedSigner {
        fn generate_key_pair(&self) -> Result<ExternalKeyMaterial> {
            Ok(ExternalKeyMaterial {
                public_artifact: "public".to_string(),
                private_artifact: "private".to_string(),
            })
        }
    }

    struct FailingSigner;

    impl ExternalSigner for FailingSigner {
        fn generate_key_pair(&self) -> Result<ExternalKeyMaterial> {
            Err(JwkKitError::KeyGenerationError(
                "signer exited with status 1".to_string(),
            ))
        }
    }

    #[test]
    fn test_external_key_pair_layout() {
        let mut store = MemorySecretStore::new();
        assert!(store_external_key_pair(&FixedSigner, &mut store, Some("k8s/cosign")).unwrap());

        let data = store.get("k8s/cosign").unwrap();
        assert_eq!(data["privateKey"], "private");
        assert_eq!(data["publicKey"], "public");
        assert_eq!(data["password"], "");
    }

    #[test]
    fn test_external_key_pair_discarded_without_path() {
        let mut store = MemorySecretStore::new();
        assert!(!store_external_key_pair(&FixedSigner, &mut store, None).unwrap());
        assert!(!store_external_key_pair(&FixedSigner, &mut store, Some("")).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_signer_failure_propagates() {
        let mut store = MemorySecretStore::new();
        assert!(matches!(
            store_external_key_pair(&FailingSigner, &mut store, Some("k8s/cosign")),
            Err(JwkKitError::KeyGenerationError(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_debug_redacts_private_artifact() {
        let material = FixedSigner.generate_key_pair().unwrap();
        let debug = format!("{material:?}");
        assert!(!debug.contains("\"private\""));
        assert!(debug.contains("<redacted>"));
    }
}
