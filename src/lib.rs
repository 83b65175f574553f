//! # JwkKit - RSA JSON Web Key Generation
//!
//! JwkKit generates RSA key pairs and publishes them in the formats a JWT
//! issuer and its verifiers need, built entirely with rustcrypto libraries:
//! - **JWK / JWK Set**: RFC 7517 JSON, public or with private members
//! - **PEM**: PKCS#8 `PRIVATE KEY` and SPKI `PUBLIC KEY` blocks
//! - **X.509**: self-signed certificates wrapping the generated key
//!
//! ## Key IDs
//!
//! By default the kid is derived from the key itself: the unpadded base64url
//! SHA-256 digest of the DER SubjectPublicKeyInfo. The same public key always
//! gets the same kid. A fixed kid can be configured instead.
//!
//! ## Quick Start
//!
//! ### Generating a JWK Set
//!
//! ```rust,no_run
//! use jwkkit::{
//!     jwk::{self, JsonOptions},
//!     key::KeyPairFactory,
//!     kid::KeyIdStrategy,
//!     record::{Algorithm, KeyRecord, KeyUsage},
//! };
//!
//! # fn main() -> Result<(), jwkkit::error::JwkKitError> {
//! let key_pair = KeyPairFactory::new().generate(2048)?;
//! let kid = KeyIdStrategy::lookup("derive")?
//!     .generate(KeyUsage::Signing, &key_pair.public_key_der()?);
//! let record = KeyRecord::from_key_pair(key_pair, KeyUsage::Signing, Algorithm::RS256, kid)?;
//!
//! let jwks = jwk::encode(&record, &JsonOptions::builder().as_key_set(true).build())?;
//! println!("{jwks}");
//! # Ok(())
//! # }
//! ```
//!
//! ### Running the Whole Pipeline
//!
//! ```rust,no_run
//! use jwkkit::{
//!     handler::JwksHandler,
//!     request::GenerationRequest,
//!     secret::MemorySecretStore,
//! };
//!
//! # fn main() -> Result<(), jwkkit::error::JwkKitError> {
//! let request = GenerationRequest::builder()
//!     .self_signed_certificate(true)
//!     .secret_path("k8s/issuer")
//!     .build();
//!
//! let mut store = MemorySecretStore::new();
//! let bundle = JwksHandler::new().run(&request, &mut store)?;
//!
//! println!("{}", bundle.public_jwks());
//! if let Some(cert) = bundle.certificate_pem()? {
//!     println!("{cert}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns a [`error::JwkKitError`]:
//!
//! ```rust
//! use jwkkit::{error::JwkKitError, key::KeyPairFactory};
//!
//! match KeyPairFactory::new().generate(1000) {
//!     Ok(_) => println!("Key generated"),
//!     Err(JwkKitError::ValidationError(msg)) => println!("Invalid size: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: RSA key pair generation
//! - [`kid`]: Key ID strategies
//! - [`record`]: Immutable key records and their JWK parameters
//! - [`jwk`]: JWK and JWK Set encoding and decoding
//! - [`pem_utils`]: PEM encoding of keys and certificates
//! - [`cert`]: Self-signed certificate creation and parsing
//! - [`issuer`]: Certificate signing
//! - [`tbs_certificate`]: Low-level certificate structure manipulation
//! - [`request`]: Generation parameters
//! - [`handler`]: The end-to-end generation pipeline
//! - [`secret`]: Secret store and external signer seams
//! - [`error`]: Error types

pub mod cert;
pub mod error;
pub mod handler;
pub mod issuer;
pub mod jwk;
pub mod key;
pub mod kid;
pub mod pem_utils;
pub mod record;
pub mod request;
pub mod secret;
pub mod tbs_certificate;
