// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # PDF Deferred Sign
//!
//! Deferred (externally computed) digital signing of PDF documents with
//! detached CMS/PKCS#7 SignedData containers.
//!
//! ## Core Features
//!
//! - **Three-phase protocol**: reserve a placeholder and capture the digest,
//!   build the container, inject it into the reserved bytes
//! - **Explicit state machine**: phases run in order or fail with
//!   [`Error::InvalidStateTransition`]
//! - **Size guard**: oversized containers are rejected before any output is produced
//! - **Scoped keys**: the signer identity is consumed by the signing phase
//! - **Verification**: message-digest and RSA PKCS#1 v1.5 checks of signed fields
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_deferred_sign::{
//!     ByteRangeEngine, SignatureVerifier, SignerIdentity, SigningConfig, SigningSession,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = std::fs::read("contract.pdf")?;
//! let identity = SignerIdentity::generate_self_signed("Example Signer", 2048)?;
//! let engine = ByteRangeEngine::new();
//!
//! let config = SigningConfig::new()
//!     .with_field_name("Sig1")
//!     .with_reserved_size_for(&identity);
//! let mut session = SigningSession::new(config);
//!
//! // Phase 1: placeholder + digest
//! let digest = session.prepare(&engine, &document)?;
//! println!("digest: {}", digest.to_hex());
//!
//! // Phase 2: container (the identity is dropped here)
//! session.sign(identity)?;
//!
//! // Phase 3: injection
//! let signed = session.finalize(&engine)?;
//!
//! let report = SignatureVerifier::new().verify_field(&signed, "Sig1")?;
//! assert!(report.status.is_valid());
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Document mutation engines
pub mod engine;

// Signing protocol, containers and verification
pub mod signatures;

// Re-exports
pub use config::SigningConfig;
pub use engine::{ByteRangeEngine, DocumentEngine, PreparedDocument};
pub use error::{Error, Result};
pub use signatures::{
    sign_document, DigestAlgorithm, DocumentDigest, IdentityProvider, PemIdentityProvider,
    SessionState, SignatureContainer, SignatureContainerBuilder, SignatureVerifier,
    SignerIdentity, SigningSession, VerificationResult, VerificationStatus,
};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        // VERSION is populated from CARGO_PKG_VERSION at compile time
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_deferred_sign");
    }
}
