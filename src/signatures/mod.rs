//! Deferred PDF digital signatures.
//!
//! Signing is split into three phases so that the private key only has to be
//! present for the middle one:
//!
//! 1. **Prepare**: a document engine writes an empty `/Contents` placeholder
//!    and a [`DigestCapture`] adapter records the digest of every byte outside
//!    it.
//! 2. **Sign**: [`SignatureContainerBuilder`] turns that digest into a detached
//!    CMS SignedData container using a [`SignerIdentity`].
//! 3. **Finalize**: a [`DeferredInjection`] adapter hands the container back to
//!    the engine, which writes it into the placeholder.
//!
//! [`SigningSession`] drives the phases and enforces their order.
//!
//! ## Signature Types Supported
//!
//! - PKCS#7 detached signatures (adbe.pkcs7.detached)
//! - PKCS#7 SHA-1 signatures (adbe.pkcs7.sha1)
//! - PAdES signatures (ETSI.CAdES.detached)
//!
//! ## PDF Specification Reference
//!
//! - ISO 32000-1:2008 Section 12.8 - Digital Signatures
//! - RFC 5652 - Cryptographic Message Syntax

mod adapter;
mod byterange;
mod container;
mod identity;
mod session;
mod types;
mod verifier;

pub use adapter::{DeferredInjection, DigestCapture, ExternalSignature, SignatureDictionary};
pub use byterange::ByteRangeCalculator;
pub use container::SignatureContainerBuilder;
pub use identity::{IdentityProvider, PemIdentityProvider, SignerIdentity};
pub use session::{sign_document, SessionState, SigningSession};
pub use types::{
    ContainerProfile, DigestAlgorithm, DocumentDigest, PlaceholderReservation, SignatureContainer,
    SignatureFilter, SignatureInfo, SignatureMetadata, SignatureSubFilter, VerificationResult,
    VerificationStatus,
};
pub use verifier::SignatureVerifier;
